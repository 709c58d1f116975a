//! API Configuration Module
//!
//! Upstream, cache, peak-tracking, CORS and rate-limit settings. Configuration
//! is loaded from environment variables with defaults suitable for local runs.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use gamestat_core::{PeakPeriod, DEFAULT_BATCH_SIZE};
use gamestat_storage::DEFAULT_CACHE_CAPACITY;

use crate::constants::*;
use crate::error::{ApiError, ApiResult};

// ============================================================================
// API CONFIGURATION
// ============================================================================

#[derive(Debug, Clone)]
pub struct ApiConfig {
    // ========================================================================
    // Server
    // ========================================================================
    pub bind_host: String,
    pub port: u16,

    // ========================================================================
    // Upstream
    // ========================================================================
    /// Base URL of the games API, without the `/v1/games` path.
    pub upstream_base_url: String,
    pub upstream_timeout: Duration,
    /// Maximum ids per upstream request.
    pub upstream_batch_size: usize,

    // ========================================================================
    // Caching
    // ========================================================================
    pub game_cache_ttl: Duration,
    pub peak_cache_ttl: Duration,
    /// Entries kept per endpoint cache before LRU eviction.
    pub cache_capacity: usize,

    // ========================================================================
    // Peak tracking
    // ========================================================================
    pub peak_file: PathBuf,
    pub peak_period: PeakPeriod,

    // ========================================================================
    // CORS
    // ========================================================================
    /// Allowed CORS origins (comma-separated in env var).
    /// Empty means allow all origins.
    pub cors_origins: Vec<String>,
    pub cors_max_age_secs: u64,

    // ========================================================================
    // Rate limiting
    // ========================================================================
    pub rate_limit_enabled: bool,
    /// Requests per minute per client IP.
    pub rate_limit_per_minute: u32,
    pub rate_limit_burst: u32,
    /// Key clients by `X-Forwarded-For` / `X-Real-IP`. Only enable behind a
    /// proxy that overwrites those headers.
    pub trust_proxy_headers: bool,
    pub rate_limit_sweep_interval: Duration,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_host: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,

            upstream_base_url: DEFAULT_UPSTREAM_URL.to_string(),
            upstream_timeout: Duration::from_millis(DEFAULT_UPSTREAM_TIMEOUT_MS),
            upstream_batch_size: DEFAULT_BATCH_SIZE,

            game_cache_ttl: Duration::from_millis(DEFAULT_GAME_CACHE_TTL_MS),
            peak_cache_ttl: Duration::from_millis(DEFAULT_PEAK_CACHE_TTL_MS),
            cache_capacity: DEFAULT_CACHE_CAPACITY,

            peak_file: PathBuf::from(DEFAULT_PEAK_FILE),
            peak_period: PeakPeriod::Daily,

            cors_origins: Vec::new(),
            cors_max_age_secs: DEFAULT_CORS_MAX_AGE_SECS,

            rate_limit_enabled: true,
            rate_limit_per_minute: DEFAULT_RATE_LIMIT_PER_MINUTE,
            rate_limit_burst: DEFAULT_RATE_LIMIT_BURST,
            trust_proxy_headers: false,
            rate_limit_sweep_interval: Duration::from_secs(DEFAULT_RATE_LIMIT_SWEEP_INTERVAL_SECS),
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    let raw = std::env::var(key).ok()?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(key, value = %raw, "Ignoring unparseable environment value");
            None
        }
    }
}

fn env_millis(key: &str) -> Option<Duration> {
    env_parse::<u64>(key).map(Duration::from_millis)
}

impl ApiConfig {
    /// Create ApiConfig from environment variables.
    ///
    /// Environment variables:
    /// - `GAMESTAT_API_BIND`: bind host (default: 0.0.0.0)
    /// - `PORT` or `GAMESTAT_API_PORT`: port (default: 3000)
    /// - `GAMESTAT_UPSTREAM_URL`: games API base URL
    /// - `GAMESTAT_UPSTREAM_TIMEOUT_MS`: upstream timeout (default: 5000)
    /// - `GAMESTAT_UPSTREAM_BATCH_SIZE`: ids per upstream request (default: 100)
    /// - `GAMESTAT_GAME_CACHE_TTL_MS`: /get_game TTL (default: 5000)
    /// - `GAMESTAT_PEAK_CACHE_TTL_MS`: /peak_ccu TTL (default: 10000)
    /// - `GAMESTAT_CACHE_CAPACITY`: entries per cache (default: 1024)
    /// - `GAMESTAT_PEAK_FILE`: peak record path (default: peak_ccu.json)
    /// - `GAMESTAT_PEAK_PERIOD`: `daily` or `all_time` (default: daily)
    /// - `GAMESTAT_CORS_ORIGINS`: comma-separated origins (empty = allow all)
    /// - `GAMESTAT_RATE_LIMIT_ENABLED`: "true" or "false" (default: true)
    /// - `GAMESTAT_RATE_LIMIT_PER_MINUTE`: per client IP (default: 120)
    /// - `GAMESTAT_RATE_LIMIT_BURST`: burst capacity (default: 20)
    /// - `GAMESTAT_TRUST_PROXY_HEADERS`: "true" to key clients by forwarded headers (default: false)
    /// - `GAMESTAT_RATE_LIMIT_SWEEP_SECS`: idle bucket sweep interval (default: 60)
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let cors_origins = std::env::var("GAMESTAT_CORS_ORIGINS")
            .ok()
            .map(|s| {
                s.split(',')
                    .map(|o| o.trim().to_string())
                    .filter(|o| !o.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        let rate_limit_enabled = std::env::var("GAMESTAT_RATE_LIMIT_ENABLED")
            .ok()
            .map(|s| s.to_lowercase() != "false")
            .unwrap_or(defaults.rate_limit_enabled);

        let trust_proxy_headers = std::env::var("GAMESTAT_TRUST_PROXY_HEADERS")
            .ok()
            .map(|s| s.trim().eq_ignore_ascii_case("true"))
            .unwrap_or(defaults.trust_proxy_headers);

        Self {
            bind_host: std::env::var("GAMESTAT_API_BIND").unwrap_or(defaults.bind_host),
            port: env_parse("PORT")
                .or_else(|| env_parse("GAMESTAT_API_PORT"))
                .unwrap_or(defaults.port),

            upstream_base_url: std::env::var("GAMESTAT_UPSTREAM_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or(defaults.upstream_base_url),
            upstream_timeout: env_millis("GAMESTAT_UPSTREAM_TIMEOUT_MS")
                .unwrap_or(defaults.upstream_timeout),
            upstream_batch_size: env_parse::<usize>("GAMESTAT_UPSTREAM_BATCH_SIZE")
                .filter(|size| *size > 0)
                .unwrap_or(defaults.upstream_batch_size),

            game_cache_ttl: env_millis("GAMESTAT_GAME_CACHE_TTL_MS")
                .unwrap_or(defaults.game_cache_ttl),
            peak_cache_ttl: env_millis("GAMESTAT_PEAK_CACHE_TTL_MS")
                .unwrap_or(defaults.peak_cache_ttl),
            cache_capacity: env_parse::<usize>("GAMESTAT_CACHE_CAPACITY")
                .filter(|cap| *cap > 0)
                .unwrap_or(defaults.cache_capacity),

            peak_file: std::env::var("GAMESTAT_PEAK_FILE")
                .map(PathBuf::from)
                .unwrap_or(defaults.peak_file),
            peak_period: env_parse("GAMESTAT_PEAK_PERIOD").unwrap_or(defaults.peak_period),

            cors_origins,
            cors_max_age_secs: env_parse("GAMESTAT_CORS_MAX_AGE_SECS")
                .unwrap_or(defaults.cors_max_age_secs),

            rate_limit_enabled,
            rate_limit_per_minute: env_parse("GAMESTAT_RATE_LIMIT_PER_MINUTE")
                .unwrap_or(defaults.rate_limit_per_minute),
            rate_limit_burst: env_parse("GAMESTAT_RATE_LIMIT_BURST")
                .unwrap_or(defaults.rate_limit_burst),
            trust_proxy_headers,
            rate_limit_sweep_interval: env_parse::<u64>("GAMESTAT_RATE_LIMIT_SWEEP_SECS")
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs)
                .unwrap_or(defaults.rate_limit_sweep_interval),
        }
    }

    /// Socket address the server binds to.
    pub fn bind_addr(&self) -> ApiResult<SocketAddr> {
        let addr = format!("{}:{}", self.bind_host, self.port);
        addr.parse::<SocketAddr>().map_err(|e| {
            ApiError::invalid_input(format!("Invalid bind address {}: {}", addr, e))
        })
    }

    /// Check if a given origin is allowed.
    pub fn is_origin_allowed(&self, origin: &str) -> bool {
        self.cors_origins.is_empty() || self.cors_origins.iter().any(|allowed| allowed == origin)
    }
}
