use anyhow::Context;
use std::sync::Arc;
use tokio::net::TcpListener;

use fille_chat::bootstrap;
use fille_core::Config;
use fille_server::{init_tracing, router};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load()?;
    let settings = config.settings()?;
    init_tracing(&settings.log);
    tracing::info!(env = config.env_name(), "Starting fille chat server");

    // Model loading and corpus encoding are CPU-bound.
    let boot_settings = settings.clone();
    let orchestrator = tokio::task::spawn_blocking(move || bootstrap(&boot_settings))
        .await
        .context("bootstrap task panicked")??;

    let app = router(Arc::new(orchestrator), &settings.server)?;
    let addr = format!("{}:{}", settings.server.host, settings.server.port);
    let listener = TcpListener::bind(&addr).await.with_context(|| format!("binding {addr}"))?;
    tracing::info!(addr = %addr, "Listening on http://{addr}");

    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;
    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown requested");
}
