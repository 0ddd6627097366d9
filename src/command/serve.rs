//! Webhook server command.
use log::*;
use std::sync::Arc;
use tokio::net::TcpListener;

use crate::{
    Result,
    cli::Args,
    forge::{bitbucket::Bitbucket, traits::Forge},
    orchestrator::Orchestrator,
    router::EventRouter,
    server::{AppState, build_router},
    worker::WorkerPool,
};

/// Runs the webhook server until it is stopped.
pub async fn execute(args: &Args) -> Result<()> {
    let remote_config = args.remote_config()?;
    let cascade_config = args.cascade_config()?;
    let shared_key = args.shared_key()?;
    let addr = args.listen_addr()?;

    info!(
        "cascading release branches '{}*' into '{}' (auto merge: {})",
        cascade_config.release_prefix,
        cascade_config.development_branch,
        cascade_config.auto_merge
    );

    let forge: Arc<dyn Forge> = Arc::new(Bitbucket::new(remote_config)?);

    let orchestrator = Orchestrator::builder()
        .config(Arc::new(cascade_config))
        .forge(forge)
        .build()?;

    let router = Arc::new(EventRouter::new(Arc::new(orchestrator)));
    let pool = WorkerPool::spawn(router, args.workers, args.queue_size);

    let app = build_router(AppState::new(shared_key, pool.dispatcher()));

    let listener = TcpListener::bind(addr).await?;
    info!("listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("server stopped, draining queued events");
    pool.shutdown().await;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!("failed to listen for shutdown signal: {err}");
        std::future::pending::<()>().await;
    }
}
