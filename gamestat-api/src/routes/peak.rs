//! Aggregate concurrent players across a set of games, with peak tracking.

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use chrono::{DateTime, NaiveDate, Utc};
use gamestat_core::{
    format_count, AggregateStats, PeakObservation, UniverseSet, ValidationError,
};
use serde::{Deserialize, Serialize};

use crate::error::{ApiError, ApiResult, ErrorCode};
use crate::state::AppState;
use crate::telemetry::with_metrics;

const CACHE_NAME: &str = "peak_ccu";

// ============================================================================
// TYPES
// ============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::IntoParams))]
#[cfg_attr(feature = "openapi", into_params(parameter_in = Query))]
pub struct PeakQuery {
    /// Comma-separated universe ids, e.g. `1,2,3`.
    pub universes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct PeakResponse {
    /// Sum of concurrent players across the universes.
    pub current_ccu: u64,
    /// Highest aggregate seen in the tracked period.
    pub peak_ccu: u64,
    /// Sum of visits, abbreviated.
    pub total_visits: String,
    pub stale: bool,
    /// UTC day the peak belongs to.
    pub date: NaiveDate,
    /// `true` when this fetch raised the peak.
    pub is_new_peak: bool,
    /// `true` when this fetch opened a new tracking period (daily reset).
    pub is_new_period: bool,
    pub peak_updated_at: Option<DateTime<Utc>>,
}

impl PeakResponse {
    pub fn new(aggregate: &AggregateStats, observation: &PeakObservation, now: DateTime<Utc>) -> Self {
        Self {
            current_ccu: aggregate.current_ccu,
            peak_ccu: observation.record.peak,
            total_visits: format_count(aggregate.total_visits),
            stale: false,
            date: observation.record.date.unwrap_or_else(|| now.date_naive()),
            is_new_peak: observation.is_new_peak,
            is_new_period: observation.is_new_period,
            peak_updated_at: observation.record.updated_at,
        }
    }

    pub fn into_stale(self) -> Self {
        Self { stale: true, ..self }
    }
}

fn universes_error(err: ValidationError) -> ApiError {
    match err {
        ValidationError::RequiredFieldMissing { .. } => {
            ApiError::new(ErrorCode::MissingField, "No universes provided")
        }
        ValidationError::InvalidValue { .. } => {
            ApiError::new(ErrorCode::InvalidFormat, "Invalid universes")
        }
    }
}

// ============================================================================
// HANDLERS
// ============================================================================

/// Aggregate counters for a set of games and the tracked peak.
///
/// Accepts GET and POST; both read `universes` from the query string.
#[utoipa::path(
    get,
    path = "/peak_ccu",
    tag = "Games",
    params(PeakQuery),
    responses(
        (status = 200, description = "Aggregate counters and peak, possibly stale", body = PeakResponse),
        (status = 400, description = "No valid universe ids", body = ApiError),
        (status = 503, description = "Upstream failed and nothing is cached", body = ApiError),
    ),
)]
pub async fn peak_ccu(
    State(state): State<AppState>,
    Query(params): Query<PeakQuery>,
) -> ApiResult<Json<PeakResponse>> {
    let universes = UniverseSet::parse(params.universes.as_deref()).map_err(universes_error)?;
    let key = universes.cache_key();

    if let Some(hit) = state.peak_cache.get_fresh(&key).await {
        with_metrics(|m| m.record_cache_lookup(CACHE_NAME, "fresh"));
        return Ok(Json(hit.into_value()));
    }
    with_metrics(|m| m.record_cache_lookup(CACHE_NAME, "miss"));

    let fetched = state
        .upstream
        .fetch_all(universes.ids(), state.config.upstream_batch_size)
        .await;

    match fetched {
        Ok(stats) => {
            let aggregate = AggregateStats::from_stats(&stats);
            let now = Utc::now();
            let observation = state
                .peaks
                .observe(aggregate.current_ccu, now, state.config.peak_period)
                .await;

            let response = PeakResponse::new(&aggregate, &observation, now);
            with_metrics(|m| m.set_ccu(response.current_ccu, response.peak_ccu));
            tracing::debug!(
                universes = universes.len(),
                current_ccu = response.current_ccu,
                peak_ccu = response.peak_ccu,
                is_new_peak = response.is_new_peak,
                "Aggregated peak stats"
            );

            state.peak_cache.put(key, response.clone()).await;
            Ok(Json(response))
        }
        Err(err) => match state.peak_cache.get_any(&key).await {
            Some(cached) => {
                with_metrics(|m| m.record_cache_lookup(CACHE_NAME, "stale"));
                tracing::warn!(
                    universes = universes.len(),
                    error = %err,
                    age_ms = cached.age().as_millis(),
                    "Serving stale peak stats"
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
    Router::new().route("/peak_ccu", get(peak_ccu).post(peak_ccu))
}
