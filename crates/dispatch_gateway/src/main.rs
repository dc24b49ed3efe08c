use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use dispatch_core::account::InMemoryAccountStore;
use dispatch_core::LifecycleCoordinator;
use dispatch_gateway::config::ServerConfig;
use dispatch_gateway::{create_router, telemetry, AppState};
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ServerConfig::parse();
    telemetry::initialise(&config.log_filter, config.log_format)?;

    let dispatch = config.dispatch_config()?;
    tracing::info!(
        match_radius_km = dispatch.match_radius_km,
        h3_resolution = dispatch.h3_resolution,
        "loaded dispatch configuration"
    );

    let state = AppState::new(
        LifecycleCoordinator::builder()
            .config(dispatch)
            .accounts(Arc::new(InMemoryAccountStore::new())),
    )?;
    let app = create_router(state);

    let listener = TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("failed to bind {}", config.bind))?;
    tracing::info!(bind = %config.bind, "dispatch server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    tracing::info!("dispatch server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::error!(%error, "failed to listen for shutdown signal");
    }
}
