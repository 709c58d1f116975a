//! Upstream statistics source trait.
//!
//! The HTTP implementation lives in gamestat-api; tests use the scripted
//! source from gamestat-test-utils.

use async_trait::async_trait;

use crate::error::UpstreamError;
use crate::stats::GameStats;
use crate::universe::join_ids;

/// Largest number of ids sent in one upstream request.
pub const DEFAULT_BATCH_SIZE: usize = 100;

/// A source of live game statistics.
#[async_trait]
pub trait StatsSource: Send + Sync {
    /// Fetch one batch of ids in a single upstream request.
    async fn fetch_batch(&self, ids: &[u64]) -> Result<Vec<GameStats>, UpstreamError>;

    /// Fetch a single game.
    async fn fetch_one(&self, id: u64) -> Result<GameStats, UpstreamError> {
        let stats = self.fetch_batch(&[id]).await?;
        stats
            .iter()
            .find(|game| game.id == id)
            .or_else(|| stats.first())
            .copied()
            .ok_or_else(|| UpstreamError::Empty { ids: id.to_string() })
    }

    /// Fetch every id, `batch_size` at a time.
    ///
    /// The first failing batch aborts the whole fetch; partial results are
    /// never returned.
    async fn fetch_all(
        &self,
        ids: &[u64],
        batch_size: usize,
    ) -> Result<Vec<GameStats>, UpstreamError> {
        if ids.is_empty() {
            return Err(UpstreamError::Empty { ids: String::new() });
        }

        let mut all = Vec::with_capacity(ids.len());
        for batch in ids.chunks(batch_size.max(1)) {
            let stats = self.fetch_batch(batch).await?;
            if stats.is_empty() {
                return Err(UpstreamError::Empty { ids: join_ids(batch) });
            }
            all.extend(stats);
        }
        Ok(all)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Records batch sizes and fails on the batch index given.
    struct Recording {
        batches: Mutex<Vec<usize>>,
        fail_on: Option<usize>,
    }

    impl Recording {
        fn new(fail_on: Option<usize>) -> Self {
            Self {
                batches: Mutex::new(Vec::new()),
                fail_on,
            }
        }

        fn batch_sizes(&self) -> Vec<usize> {
            self.batches.lock().map(|b| b.clone()).unwrap_or_default()
        }
    }

    #[async_trait]
    impl StatsSource for Recording {
        async fn fetch_batch(&self, ids: &[u64]) -> Result<Vec<GameStats>, UpstreamError> {
            let index = {
                let mut batches = self.batches.lock().map_err(|_| UpstreamError::Transport {
                    reason: "poisoned".to_string(),
                })?;
                batches.push(ids.len());
                batches.len() - 1
            };
            if self.fail_on == Some(index) {
                return Err(UpstreamError::Status { status: 500 });
            }
            Ok(ids.iter().map(|id| GameStats::new(*id, 1, 10)).collect())
        }
    }

    #[tokio::test]
    async fn test_fetch_all_splits_into_batches() -> Result<(), UpstreamError> {
        let source = Recording::new(None);
        let ids: Vec<u64> = (1..=250).collect();

        let stats = source.fetch_all(&ids, DEFAULT_BATCH_SIZE).await?;

        assert_eq!(stats.len(), 250);
        assert_eq!(source.batch_sizes(), vec![100, 100, 50]);
        Ok(())
    }

    #[tokio::test]
    async fn test_fetch_all_aborts_on_failed_batch() {
        let source = Recording::new(Some(1));
        let ids: Vec<u64> = (1..=250).collect();

        let result = source.fetch_all(&ids, DEFAULT_BATCH_SIZE).await;

        assert_eq!(result, Err(UpstreamError::Status { status: 500 }));
        // The third batch is never attempted.
        assert_eq!(source.batch_sizes(), vec![100, 100]);
    }

    #[tokio::test]
    async fn test_fetch_one_picks_matching_id() -> Result<(), UpstreamError> {
        let source = Recording::new(None);
        let game = source.fetch_one(42).await?;
        assert_eq!(game, GameStats::new(42, 1, 10));
        Ok(())
    }

    #[tokio::test]
    async fn test_fetch_all_rejects_empty_input() {
        let source = Recording::new(None);
        assert!(matches!(
            source.fetch_all(&[], 100).await,
            Err(UpstreamError::Empty { .. })
        ));
    }
}
