//! Chirp API Server Entry Point
//!
//! Loads configuration, wires the in-process store and cache, and serves
//! the Axum router until Ctrl-C.

use std::net::SocketAddr;
use std::sync::Arc;

use chirp_api::telemetry::{init_tracing, TelemetryConfig};
use chirp_api::{create_api_router, ApiConfig, ApiError, ApiResult, AppState, AuthConfig};
use chirp_storage::{InMemoryCacheBackend, InMemoryGraphStore};

#[tokio::main]
async fn main() -> ApiResult<()> {
    let telemetry_config = TelemetryConfig::default();
    init_tracing(&telemetry_config)?;

    let api_config = ApiConfig::from_env()?;
    let auth_config = AuthConfig::from_env();
    let addr = api_config.bind_addr;

    let state = AppState::new(
        Arc::new(InMemoryGraphStore::new()),
        Arc::new(InMemoryCacheBackend::new()),
        api_config,
        auth_config,
    );
    let app = create_api_router(state)?;

    tracing::info!(
        %addr,
        service = %telemetry_config.service_name,
        version = %telemetry_config.service_version,
        environment = %telemetry_config.environment,
        "Starting Chirp API server"
    );

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| ApiError::internal_error(format!("Failed to bind {}: {}", addr, e)))?;

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .map_err(|e| ApiError::internal_error(format!("Server error: {}", e)))?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        return;
    }
    tracing::info!("Shutdown signal received");
}
