//! Webhook endpoint handler.
//!
//! Checks the shared key, parses the delivery and hands it to the worker
//! pool. The response never waits on the hosting service.

use axum::Json;
use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use log::*;
use serde::Deserialize;
use thiserror::Error;

use super::AppState;
use crate::CascadeError;
use crate::event::{CascadeEvent, EVENT_KEY_HEADER};
use crate::worker::DispatchError;

/// Query parameters accepted by the webhook endpoint.
#[derive(Debug, Deserialize)]
pub struct WebhookQuery {
    #[serde(default)]
    pub key: Option<String>,
}

/// Errors that can occur when accepting a webhook.
#[derive(Debug, Error)]
pub enum WebhookError {
    /// Missing or wrong shared key.
    #[error("forbidden")]
    Forbidden,

    /// Payload could not be turned into an event.
    #[error(transparent)]
    Malformed(CascadeError),

    /// Event could not be queued.
    #[error(transparent)]
    Dispatch(#[from] DispatchError),
}

impl IntoResponse for WebhookError {
    fn into_response(self) -> Response {
        let status = match &self {
            WebhookError::Forbidden => StatusCode::FORBIDDEN,
            WebhookError::Malformed(_) => StatusCode::BAD_REQUEST,
            WebhookError::Dispatch(_) => StatusCode::SERVICE_UNAVAILABLE,
        };

        (status, self.to_string()).into_response()
    }
}

/// Webhook handler.
///
/// # Response
///
/// - 200 OK: Event queued (body is JSON `null`)
/// - 400 Bad Request: Missing `X-Event-Key` or unusable payload
/// - 403 Forbidden: Missing or wrong `key` query parameter
/// - 503 Service Unavailable: Event queue full
pub async fn webhook_handler(
    State(app_state): State<AppState>,
    Query(query): Query<WebhookQuery>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, Json<serde_json::Value>), WebhookError> {
    let Some(key) = query.key.as_deref().filter(|k| !k.is_empty()) else {
        warn!("url param 'key' is missing");
        return Err(WebhookError::Forbidden);
    };

    if !app_state.is_authorized(key) {
        warn!("rejecting webhook with invalid key");
        return Err(WebhookError::Forbidden);
    }

    let event_key = headers
        .get(EVENT_KEY_HEADER)
        .and_then(|v| v.to_str().ok());

    let event = CascadeEvent::parse(event_key, &body).map_err(|err| {
        warn!("rejecting malformed webhook ({event_key:?}): {err}");
        WebhookError::Malformed(err)
    })?;

    debug!(
        "accepted {:?} for {}",
        event_key.unwrap_or_default(),
        event.repository()
    );

    if let Err(err) = app_state.dispatcher().dispatch(event) {
        error!("failed to queue webhook: {err}");
        return Err(err.into());
    }

    Ok((StatusCode::OK, Json(serde_json::Value::Null)))
}
