//! HTTP server receiving Bitbucket webhooks.
//!
//! # Endpoints
//!
//! - `POST /?key=<shared key>` - Accepts webhook deliveries (returns 200)
//! - `GET /` - Legacy probe, returns 200 with a JSON `null` body
//! - `GET /health` - Returns 200 if the server is running

use axum::{
    Json, Router,
    http::StatusCode,
    routing::{get, post},
};
use secrecy::{ExposeSecret, SecretString};
use std::sync::Arc;

use crate::worker::Dispatcher;

pub mod health;
pub mod webhook;

pub use health::health_handler;
pub use webhook::webhook_handler;

/// Shared application state.
///
/// This is passed to all handlers via Axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    /// Value the `key` query parameter must carry.
    shared_key: SecretString,

    /// Queue feeding the worker pool.
    dispatcher: Dispatcher,
}

impl AppState {
    pub fn new(shared_key: SecretString, dispatcher: Dispatcher) -> Self {
        AppState {
            inner: Arc::new(AppStateInner {
                shared_key,
                dispatcher,
            }),
        }
    }

    /// Whether `candidate` matches the configured shared key.
    pub fn is_authorized(&self, candidate: &str) -> bool {
        let expected = self.inner.shared_key.expose_secret().as_bytes();
        let candidate = candidate.as_bytes();

        // compare every byte so timing does not leak the matching prefix
        expected.len() == candidate.len()
            && expected
                .iter()
                .zip(candidate)
                .fold(0u8, |acc, (a, b)| acc | (a ^ b))
                == 0
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.inner.dispatcher
    }
}

async fn root_handler() -> (StatusCode, Json<serde_json::Value>) {
    (StatusCode::OK, Json(serde_json::Value::Null))
}

/// Builds the axum Router with all endpoints.
pub fn build_router(app_state: AppState) -> Router {
    Router::new()
        .route("/", post(webhook_handler).get(root_handler))
        .route("/health", get(health_handler))
        .with_state(app_state)
}
