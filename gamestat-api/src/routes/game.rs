//! Single-game lookup.

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use gamestat_core::{format_count, parse_game_id, GameStats};
use serde::{Deserialize, Serialize};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use crate::telemetry::with_metrics;

const CACHE_NAME: &str = "get_game";

// ============================================================================
// TYPES
// ============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::IntoParams))]
#[cfg_attr(feature = "openapi", into_params(parameter_in = Query))]
pub struct GameQuery {
    /// Universe id of the game.
    pub id: Option<String>,
}

/// Formatted counters for one game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct GameResponse {
    /// Concurrent players, abbreviated (e.g. `1.50K`).
    pub playing: String,
    /// Lifetime visits, abbreviated.
    pub visits: String,
    /// `true` when served from cache after an upstream failure.
    pub stale: bool,
}

impl GameResponse {
    pub fn from_stats(stats: &GameStats) -> Self {
        Self {
            playing: format_count(stats.playing),
            visits: format_count(stats.visits),
            stale: false,
        }
    }

    pub fn into_stale(self) -> Self {
        Self { stale: true, ..self }
    }
}

// ============================================================================
// HANDLERS
// ============================================================================

/// Live player and visit counts for one game.
#[utoipa::path(
    get,
    path = "/get_game",
    tag = "Games",
    params(GameQuery),
    responses(
        (status = 200, description = "Game counters, possibly stale", body = GameResponse),
        (status = 400, description = "Missing or invalid id", body = ApiError),
        (status = 503, description = "Upstream failed and nothing is cached", body = ApiError),
    ),
)]
pub async fn get_game(
    State(state): State<AppState>,
    Query(params): Query<GameQuery>,
) -> ApiResult<Json<GameResponse>> {
    let id = parse_game_id(params.id.as_deref())?;
    let key = id.to_string();

    if let Some(hit) = state.game_cache.get_fresh(&key).await {
        with_metrics(|m| m.record_cache_lookup(CACHE_NAME, "fresh"));
        return Ok(Json(hit.into_value()));
    }
    with_metrics(|m| m.record_cache_lookup(CACHE_NAME, "miss"));

    match state.upstream.fetch_one(id).await {
        Ok(stats) => {
            let response = GameResponse::from_stats(&stats);
            state.game_cache.put(key, response.clone()).await;
            Ok(Json(response))
        }
        Err(err) => match state.game_cache.get_any(&key).await {
            Some(cached) => {
                with_metrics(|m| m.record_cache_lookup(CACHE_NAME, "stale"));
                tracing::warn!(
                    game_id = id,
                    error = %err,
                    age_ms = cached.age().as_millis(),
                    "Serving stale game stats"
                );
                Ok(Json(cached.into_value().into_stale()))
            }
            None => Err(ApiError::from(err)),
        },
    }
}

// ============================================================================
// ROUTER
// ============================================================================

pub fn create_router() -> Router<AppState> {
    Router::new().route("/get_game", get(get_game))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_formats_counters() {
        let response = GameResponse::from_stats(&GameStats::new(1, 1500, 2_500_000));
        assert_eq!(response.playing, "1.50K");
        assert_eq!(response.visits, "2.5M");
        assert!(!response.stale);
        assert!(response.into_stale().stale);
    }

    #[test]
    fn test_response_shape() -> Result<(), serde_json::Error> {
        let json = serde_json::to_value(GameResponse::from_stats(&GameStats::new(1, 12, 999)))?;
        assert_eq!(
            json,
            serde_json::json!({"playing": "12", "visits": "999", "stale": false})
        );
        Ok(())
    }
}
