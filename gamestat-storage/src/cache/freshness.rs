//! Freshness metadata carried by cache reads.

use chrono::{DateTime, Utc};
use std::time::Duration;

/// How a cached value relates to its TTL at the time it was read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Freshness {
    /// Younger than the TTL.
    Fresh,
    /// Served after a failed refresh, regardless of age.
    Stale,
}

impl Freshness {
    pub fn is_stale(&self) -> bool {
        matches!(self, Self::Stale)
    }

    /// Label used for metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fresh => "fresh",
            Self::Stale => "stale",
        }
    }
}

/// Result of a cache read, carrying staleness metadata.
#[derive(Debug, Clone)]
pub struct CacheRead<T> {
    value: T,
    fetched_at: DateTime<Utc>,
    age: Duration,
    freshness: Freshness,
}

impl<T> CacheRead<T> {
    pub fn new(value: T, fetched_at: DateTime<Utc>, age: Duration, freshness: Freshness) -> Self {
        Self {
            value,
            fetched_at,
            age,
            freshness,
        }
    }

    /// Consume the wrapper and return the underlying value.
    pub fn into_value(self) -> T {
        self.value
    }

    pub fn value(&self) -> &T {
        &self.value
    }

    /// When the entry was last fetched or refreshed.
    pub fn fetched_at(&self) -> DateTime<Utc> {
        self.fetched_at
    }

    /// Age of the entry at read time (before any sliding refresh).
    pub fn age(&self) -> Duration {
        self.age
    }

    pub fn freshness(&self) -> Freshness {
        self.freshness
    }

    pub fn is_stale(&self) -> bool {
        self.freshness.is_stale()
    }

    /// Map the inner value to a new type.
    pub fn map<U, F>(self, f: F) -> CacheRead<U>
    where
        F: FnOnce(T) -> U,
    {
        CacheRead {
            value: f(self.value),
            fetched_at: self.fetched_at,
            age: self.age,
            freshness: self.freshness,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_freshness_labels() {
        assert_eq!(Freshness::Fresh.as_str(), "fresh");
        assert_eq!(Freshness::Stale.as_str(), "stale");
        assert!(Freshness::Stale.is_stale());
        assert!(!Freshness::Fresh.is_stale());
    }

    #[test]
    fn test_cache_read_map() {
        let read = CacheRead::new(42i32, Utc::now(), Duration::from_secs(1), Freshness::Stale);
        let mapped = read.map(|v| v.to_string());

        assert!(mapped.is_stale());
        assert_eq!(mapped.age(), Duration::from_secs(1));
        assert_eq!(mapped.into_value(), "42");
    }
}
