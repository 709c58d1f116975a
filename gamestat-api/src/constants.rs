//! Constants for the gamestat API
//!
//! Default values used by [`crate::config::ApiConfig`].

// ============================================================================
// SERVER
// ============================================================================

/// Default listen port
pub const DEFAULT_PORT: u16 = 3000;

// ============================================================================
// UPSTREAM
// ============================================================================

/// Games API base URL
pub const DEFAULT_UPSTREAM_URL: &str = "https://games.roblox.com";

/// Per-request upstream timeout (5 seconds)
pub const DEFAULT_UPSTREAM_TIMEOUT_MS: u64 = 5_000;

// ============================================================================
// CACHING
// ============================================================================

/// TTL for single-game lookups (5 seconds)
pub const DEFAULT_GAME_CACHE_TTL_MS: u64 = 5_000;

/// TTL for aggregate peak lookups (10 seconds)
pub const DEFAULT_PEAK_CACHE_TTL_MS: u64 = 10_000;

// ============================================================================
// PEAK TRACKING
// ============================================================================

/// Peak record file, relative to the working directory
pub const DEFAULT_PEAK_FILE: &str = "peak_ccu.json";

// ============================================================================
// CORS
// ============================================================================

/// Default CORS max age in seconds (24 hours)
pub const DEFAULT_CORS_MAX_AGE_SECS: u64 = 86400;

// ============================================================================
// RATE LIMITING
// ============================================================================

/// Requests per minute per client IP
pub const DEFAULT_RATE_LIMIT_PER_MINUTE: u32 = 120;

/// Default burst size for rate limiting
pub const DEFAULT_RATE_LIMIT_BURST: u32 = 20;

/// Interval between sweeps of idle per-client buckets (1 minute)
pub const DEFAULT_RATE_LIMIT_SWEEP_INTERVAL_SECS: u64 = 60;
