//! gamestat API Server Entry Point
//!
//! Loads configuration from the environment, wires the upstream client and
//! peak store into shared state, and starts the Axum HTTP server.

use std::net::SocketAddr;
use std::sync::Arc;

use gamestat_api::telemetry::{init_tracing, TelemetryConfig};
use gamestat_api::{create_router, ApiConfig, ApiError, ApiResult, AppState, GamesApiClient};
use gamestat_storage::FilePeakStore;

#[tokio::main]
async fn main() -> ApiResult<()> {
    let telemetry_config = TelemetryConfig::default();
    init_tracing(&telemetry_config)?;

    let config = ApiConfig::from_env();
    let addr = config.bind_addr()?;

    let upstream = Arc::new(GamesApiClient::from_config(&config)?);
    let peaks = Arc::new(FilePeakStore::new(config.peak_file.clone()));

    tracing::info!(
        upstream = upstream.base_url(),
        peak_file = %peaks.path().display(),
        peak_period = %config.peak_period,
        "Configured gamestat proxy"
    );

    let state = AppState::new(config, upstream, peaks);
    if state.config.rate_limit_enabled {
        state
            .rate_limits
            .spawn_sweeper(state.config.rate_limit_sweep_interval);
    }
    let app = create_router(state);

    tracing::info!(%addr, "Starting gamestat API server");
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| ApiError::internal_error(format!("Failed to bind {}: {}", addr, e)))?;

    let server = axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>());
    tokio::select! {
        result = server => {
            result.map_err(|e| ApiError::internal_error(format!("Server error: {}", e)))?;
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown signal received");
        }
    }

    Ok(())
}
