//! Parlance language server entry point.

use std::time::Duration;

use anyhow::Context;
use parlance_server::{build_router, AppState, ServerSettings};
use tracing::{debug, info};

/// How often expired hand-off entries are swept.
const HANDOFF_PURGE_INTERVAL: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = ServerSettings::from_env();
    init_tracing(&settings.log_level);

    let state = AppState::from_settings(&settings)?;
    info!(settings = ?settings.runtime_settings(), "Parlance starting");

    let service = state.service.clone();
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(HANDOFF_PURGE_INTERVAL);
        loop {
            ticker.tick().await;
            let purged = service.purge_expired_audio();
            if purged > 0 {
                debug!(purged, "expired hand-off entries removed");
            }
        }
    });

    let addr = settings.bind_addr();
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("Parlance language server listening on http://{addr}");

    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("Parlance stopped");
    Ok(())
}

fn init_tracing(level: &str) {
    let fallback = format!("parlance={level},parlance_core={level},parlance_server={level}");
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(fallback)),
        )
        .init();
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}
