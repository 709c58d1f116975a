//! OpenAPI document for the gamestat API
//!
//! Generated by utoipa from the handler annotations and response types.

use utoipa::OpenApi;

use crate::error::{ApiError, ErrorCode};
use crate::routes::game::GameResponse;
use crate::routes::health::{CacheHealth, HealthDetails, HealthResponse, HealthStatus};
use crate::routes::peak::PeakResponse;
use crate::routes::{game, health, peak};
use crate::telemetry::metrics;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "gamestat API",
        version = "0.1.0",
        description = "Caching proxy for live game statistics with persisted peak tracking",
        license(name = "MIT", url = "https://opensource.org/licenses/MIT")
    ),
    servers(
        (url = "http://localhost:3000", description = "Local Development")
    ),
    tags(
        (name = "Games", description = "Live player and visit counters"),
        (name = "Health", description = "Liveness and readiness probes"),
        (name = "Observability", description = "Prometheus metrics"),
    ),
    paths(
        game::get_game,
        peak::peak_ccu,
        health::ping,
        health::liveness,
        health::readiness,
        metrics::metrics_handler,
    ),
    components(schemas(
        GameResponse,
        PeakResponse,
        HealthResponse,
        HealthStatus,
        HealthDetails,
        CacheHealth,
        ApiError,
        ErrorCode,
    ))
)]
pub struct ApiDoc;

impl ApiDoc {
    /// Render the document as pretty-printed JSON.
    pub fn to_json() -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&Self::openapi())
    }
}
