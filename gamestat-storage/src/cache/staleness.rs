//! Bounded TTL cache with stale fallback.

use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use lru::LruCache;
use tokio::sync::Mutex;
use tokio::time::Instant;

use super::freshness::{CacheRead, Freshness};

/// Default number of entries kept per cache.
pub const DEFAULT_CACHE_CAPACITY: usize = 1024;

struct Entry<T> {
    value: T,
    fetched_at: Instant,
    fetched_at_utc: DateTime<Utc>,
}

/// Statistics about cache usage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub fresh_hits: u64,
    pub stale_hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub entry_count: u64,
}

impl CacheStats {
    /// Fraction of lookups answered from a fresh entry (0.0 to 1.0).
    pub fn hit_rate(&self) -> f64 {
        let total = self.fresh_hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.fresh_hits as f64 / total as f64
        }
    }
}

/// Per-endpoint response cache.
///
/// An entry younger than the TTL is served as fresh and its fetch time is
/// pushed forward (sliding expiry). Older entries stay available through
/// [`StalenessCache::get_any`] for serving after an upstream failure, until
/// the least-recently-used entry is evicted at capacity.
pub struct StalenessCache<T> {
    name: &'static str,
    ttl: Duration,
    entries: Mutex<LruCache<String, Entry<T>>>,
    fresh_hits: AtomicU64,
    stale_hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

impl<T: Clone + Send> StalenessCache<T> {
    pub fn new(name: &'static str, ttl: Duration, capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            name,
            ttl,
            entries: Mutex::new(LruCache::new(capacity)),
            fresh_hits: AtomicU64::new(0),
            stale_hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Return the entry if it is younger than the TTL, refreshing its fetch time.
    pub async fn get_fresh(&self, key: &str) -> Option<CacheRead<T>> {
        let mut entries = self.entries.lock().await;
        let now = Instant::now();

        let read = entries.get_mut(key).and_then(|entry| {
            let age = now.saturating_duration_since(entry.fetched_at);
            if age >= self.ttl {
                return None;
            }
            entry.fetched_at = now;
            entry.fetched_at_utc = Utc::now();
            Some(CacheRead::new(
                entry.value.clone(),
                entry.fetched_at_utc,
                age,
                Freshness::Fresh,
            ))
        });

        match read {
            Some(_) => self.fresh_hits.fetch_add(1, Ordering::Relaxed),
            None => self.misses.fetch_add(1, Ordering::Relaxed),
        };
        read
    }

    /// Return the entry regardless of age, tagged stale.
    pub async fn get_any(&self, key: &str) -> Option<CacheRead<T>> {
        let mut entries = self.entries.lock().await;
        let now = Instant::now();

        let read = entries.get(key).map(|entry| {
            CacheRead::new(
                entry.value.clone(),
                entry.fetched_at_utc,
                now.saturating_duration_since(entry.fetched_at),
                Freshness::Stale,
            )
        });

        if read.is_some() {
            self.stale_hits.fetch_add(1, Ordering::Relaxed);
        }
        read
    }

    /// Insert or overwrite the entry for `key` with a fresh fetch time.
    pub async fn put(&self, key: impl Into<String>, value: T) {
        let key = key.into();
        let entry = Entry {
            value,
            fetched_at: Instant::now(),
            fetched_at_utc: Utc::now(),
        };

        let mut entries = self.entries.lock().await;
        if let Some((evicted, _)) = entries.push(key.clone(), entry) {
            if evicted != key {
                self.evictions.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(cache = self.name, key = %evicted, "Evicted least recently used entry");
            }
        }
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }

    pub async fn stats(&self) -> CacheStats {
        CacheStats {
            fresh_hits: self.fresh_hits.load(Ordering::Relaxed),
            stale_hits: self.stale_hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            entry_count: self.len().await as u64,
        }
    }
}

impl<T> std::fmt::Debug for StalenessCache<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StalenessCache")
            .field("name", &self.name)
            .field("ttl", &self.ttl)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cache(ttl_secs: u64, capacity: usize) -> StalenessCache<String> {
        StalenessCache::new("test", Duration::from_secs(ttl_secs), capacity)
    }

    #[tokio::test(start_paused = true)]
    async fn test_fresh_within_ttl() {
        let cache = cache(5, 8);
        cache.put("1", "payload".to_string()).await;

        tokio::time::advance(Duration::from_secs(4)).await;
        let read = cache.get_fresh("1").await;

        assert_eq!(read.as_ref().map(|r| r.value().as_str()), Some("payload"));
        assert_eq!(read.map(|r| r.freshness()), Some(Freshness::Fresh));
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_entry_is_not_fresh_but_still_available() {
        let cache = cache(5, 8);
        cache.put("1", "payload".to_string()).await;

        tokio::time::advance(Duration::from_secs(5)).await;

        assert!(cache.get_fresh("1").await.is_none());
        let stale = cache.get_any("1").await;
        assert!(stale.as_ref().map(|r| r.is_stale()).unwrap_or(false));
        assert_eq!(stale.map(|r| r.age()), Some(Duration::from_secs(5)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_fresh_hit_slides_expiry() {
        let cache = cache(5, 8);
        cache.put("1", "payload".to_string()).await;

        tokio::time::advance(Duration::from_secs(4)).await;
        assert!(cache.get_fresh("1").await.is_some());

        // 8s after insert but only 4s after the last hit.
        tokio::time::advance(Duration::from_secs(4)).await;
        assert!(cache.get_fresh("1").await.is_some());
    }

    #[tokio::test]
    async fn test_missing_key() {
        let cache = cache(5, 8);
        assert!(cache.get_fresh("nope").await.is_none());
        assert!(cache.get_any("nope").await.is_none());
        assert_eq!(cache.stats().await.misses, 1);
    }

    #[tokio::test]
    async fn test_put_overwrites() {
        let cache = cache(5, 8);
        cache.put("1", "old".to_string()).await;
        cache.put("1", "new".to_string()).await;

        assert_eq!(cache.len().await, 1);
        assert_eq!(
            cache.get_fresh("1").await.map(CacheRead::into_value),
            Some("new".to_string())
        );
        assert_eq!(cache.stats().await.evictions, 0);
    }

    #[tokio::test]
    async fn test_capacity_evicts_least_recently_used() {
        let cache = cache(5, 2);
        cache.put("a", "A".to_string()).await;
        cache.put("b", "B".to_string()).await;

        // Touch "a" so "b" becomes the eviction candidate.
        assert!(cache.get_any("a").await.is_some());
        cache.put("c", "C".to_string()).await;

        assert_eq!(cache.len().await, 2);
        assert!(cache.get_any("a").await.is_some());
        assert!(cache.get_any("b").await.is_none());
        assert!(cache.get_any("c").await.is_some());
        assert_eq!(cache.stats().await.evictions, 1);
    }

    #[tokio::test]
    async fn test_zero_ttl_is_never_fresh() {
        let cache = StalenessCache::new("zero", Duration::ZERO, 4);
        cache.put("1", 1u64).await;
        assert!(cache.get_fresh("1").await.is_none());
        assert!(cache.get_any("1").await.is_some());
    }

    proptest::proptest! {
        #[test]
        fn prop_len_never_exceeds_capacity(
            keys in proptest::collection::vec(0u32..64, 0..128),
            capacity in 1usize..16,
        ) {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_time()
                .build()
                .map_err(|e| proptest::test_runner::TestCaseError::fail(e.to_string()))?;

            let (len, stats) = runtime.block_on(async {
                let cache = StalenessCache::new("prop", Duration::from_secs(5), capacity);
                for key in &keys {
                    cache.put(key.to_string(), *key).await;
                }
                (cache.len().await, cache.stats().await)
            });

            let distinct = keys.iter().collect::<std::collections::HashSet<_>>().len();
            proptest::prop_assert_eq!(len, distinct.min(capacity));
            proptest::prop_assert!(stats.evictions as usize >= distinct.saturating_sub(capacity));
        }
    }

    #[test]
    fn test_hit_rate() {
        let stats = CacheStats {
            fresh_hits: 3,
            misses: 1,
            ..Default::default()
        };
        assert!((stats.hit_rate() - 0.75).abs() < f64::EPSILON);
        assert_eq!(CacheStats::default().hit_rate(), 0.0);
    }
}
