//! gamestat API - HTTP Proxy Layer
//!
//! Axum server in front of the games statistics API. Responses are cached
//! per endpoint with stale fallback when the upstream fails, and the
//! aggregate endpoint tracks a persisted peak of concurrent players.

pub mod config;
pub mod constants;
pub mod error;
pub mod macros;
pub mod middleware;
pub mod openapi;
pub mod routes;
pub mod state;
pub mod telemetry;
pub mod upstream;

// Re-export commonly used types
pub use config::ApiConfig;
pub use error::{ApiError, ApiResult, ErrorCode};
pub use openapi::ApiDoc;
pub use routes::create_router;
pub use routes::game::GameResponse;
pub use routes::peak::PeakResponse;
pub use state::AppState;
pub use upstream::GamesApiClient;
