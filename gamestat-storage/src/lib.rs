//! gamestat Storage
//!
//! Process-local state behind the proxy:
//! - [`StalenessCache`]: bounded per-endpoint response cache with TTL and
//!   stale fallback
//! - [`PeakStore`]: the persisted peak record, file-backed or in memory
//!
//! Both are constructed explicitly and injected into handler state.

pub mod cache;
pub mod peak_store;

pub use cache::{CacheRead, CacheStats, Freshness, StalenessCache, DEFAULT_CACHE_CAPACITY};
pub use peak_store::{FilePeakStore, InMemoryPeakStore, PeakStore};
