//! Response caches with explicit staleness.
//!
//! Reads return [`CacheRead<T>`], which says whether the value is fresh
//! (younger than the TTL) or a stale fallback served after a failed refresh.
//!
//! # Example
//!
//! ```ignore
//! let cache = StalenessCache::new("get_game", Duration::from_secs(5), 1024);
//!
//! if let Some(read) = cache.get_fresh("12345").await {
//!     return read.into_value();
//! }
//! match upstream.fetch_one(12345).await {
//!     Ok(stats) => cache.put("12345", render(stats)).await,
//!     Err(_) => cache.get_any("12345").await, // tagged stale
//! }
//! ```

pub mod freshness;
pub mod staleness;

pub use freshness::{CacheRead, Freshness};
pub use staleness::{CacheStats, StalenessCache, DEFAULT_CACHE_CAPACITY};
