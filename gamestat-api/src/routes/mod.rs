//! REST API Route Handlers
//!
//! - `/get_game` - single game counters
//! - `/peak_ccu` - aggregate counters and peak (GET and POST)
//! - `/health/*` - probes
//! - `/metrics`, `/openapi.json`
//!
//! Middleware order, outermost first: CORS, observability, rate limiting.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    http::{header, Method},
    middleware::{from_fn, from_fn_with_state},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use utoipa::OpenApi;

use crate::config::ApiConfig;
use crate::error::ApiError;
use crate::middleware::rate_limit_middleware;
use crate::openapi::ApiDoc;
use crate::state::AppState;
use crate::telemetry::{metrics_handler, observability_middleware};

pub mod game;
pub mod health;
pub mod peak;

/// Handler for /openapi.json endpoint.
async fn openapi_json() -> impl IntoResponse {
    Json(ApiDoc::openapi())
}

async fn not_found() -> ApiError {
    ApiError::not_found("Not found")
}

/// Build the complete application router.
pub fn create_router(state: AppState) -> Router {
    let rate_limit_state = state.rate_limits.clone();
    let cors = build_cors_layer(state.config.clone());

    Router::new()
        .merge(game::create_router())
        .merge(peak::create_router())
        .nest("/health", health::create_router())
        .route("/metrics", get(metrics_handler))
        .route("/openapi.json", get(openapi_json))
        .fallback(not_found)
        .with_state(state)
        .layer(from_fn_with_state(rate_limit_state, rate_limit_middleware))
        .layer(from_fn(observability_middleware))
        .layer(cors)
}

// ============================================================================
// CORS LAYER
// ============================================================================

/// Build the CORS layer from ApiConfig.
///
/// With no configured origins every origin is allowed.
fn build_cors_layer(config: Arc<ApiConfig>) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .expose_headers([
            header::RETRY_AFTER,
            header::HeaderName::from_static("x-ratelimit-limit"),
        ])
        .max_age(Duration::from_secs(config.cors_max_age_secs));

    if config.cors_origins.is_empty() {
        tracing::info!("CORS: allowing all origins");
        cors.allow_origin(Any)
    } else {
        tracing::info!(origins = ?config.cors_origins, "CORS: restricting origins");
        cors.allow_origin(AllowOrigin::predicate(move |origin, _| {
            origin
                .to_str()
                .map(|o| config.is_origin_allowed(o))
                .unwrap_or(false)
        }))
    }
}
