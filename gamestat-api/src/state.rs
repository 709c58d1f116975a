//! Shared application state for Axum routers.

use std::sync::Arc;
use std::time::Instant;

use gamestat_core::StatsSource;
use gamestat_storage::{PeakStore, StalenessCache};

use crate::config::ApiConfig;
use crate::middleware::RateLimitState;
use crate::routes::game::GameResponse;
use crate::routes::peak::PeakResponse;

/// Cache of formatted `/get_game` payloads keyed by game id.
pub type GameCache = StalenessCache<GameResponse>;

/// Cache of `/peak_ccu` payloads keyed by the sorted universe list.
pub type PeakCache = StalenessCache<PeakResponse>;

/// Application-wide state shared across all routes.
///
/// Every piece is constructed once at startup and injected; nothing lives in
/// module-level globals apart from the metrics registry.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ApiConfig>,
    pub upstream: Arc<dyn StatsSource>,
    pub peaks: Arc<dyn PeakStore>,
    pub game_cache: Arc<GameCache>,
    pub peak_cache: Arc<PeakCache>,
    pub rate_limits: RateLimitState,
    pub start_time: Instant,
}

impl AppState {
    /// Build state with empty caches sized and timed from `config`.
    pub fn new(
        config: ApiConfig,
        upstream: Arc<dyn StatsSource>,
        peaks: Arc<dyn PeakStore>,
    ) -> Self {
        let game_cache = StalenessCache::new("get_game", config.game_cache_ttl, config.cache_capacity);
        let peak_cache = StalenessCache::new("peak_ccu", config.peak_cache_ttl, config.cache_capacity);

        let config = Arc::new(config);

        Self {
            rate_limits: RateLimitState::new(config.clone()),
            config,
            upstream,
            peaks,
            game_cache: Arc::new(game_cache),
            peak_cache: Arc::new(peak_cache),
            start_time: Instant::now(),
        }
    }
}

crate::impl_from_ref!(Arc<ApiConfig>, config);
crate::impl_from_ref!(Arc<GameCache>, game_cache);
crate::impl_from_ref!(Arc<PeakCache>, peak_cache);
crate::impl_from_ref!(RateLimitState, rate_limits);
crate::impl_from_ref!(Instant, start_time);
