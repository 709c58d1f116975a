//! gamestat Test Utilities
//!
//! Shared test infrastructure for the gamestat workspace:
//! - A scripted [`StatsSource`] that records every upstream batch
//! - Fixtures for common game and peak scenarios
//! - Proptest generators for observation sequences

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use tempfile::TempDir;

// Re-export core types for convenience
pub use gamestat_core::{
    GameStats, PeakPeriod, PeakRecord, StatsSource, UniverseSet, UpstreamError,
    PEAK_SCHEMA_VERSION,
};
pub use gamestat_storage::{FilePeakStore, InMemoryPeakStore, PeakStore};

// ============================================================================
// MOCK UPSTREAM
// ============================================================================

/// Scripted statistics source.
///
/// Returns the configured games for the ids it is asked about, or a
/// configured failure. Every batch is recorded so tests can assert how many
/// upstream calls were made and how ids were split.
#[derive(Debug, Default)]
pub struct MockStatsSource {
    games: Mutex<HashMap<u64, GameStats>>,
    failure: Mutex<Option<UpstreamError>>,
    fail_on_batch: Mutex<Option<usize>>,
    batches: Mutex<Vec<Vec<u64>>>,
    calls: AtomicUsize,
}

impl MockStatsSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Source preloaded with `games`.
    pub fn with_games(games: impl IntoIterator<Item = GameStats>) -> Self {
        let source = Self::new();
        for game in games {
            source.set_game(game);
        }
        source
    }

    /// Add or replace one game's counters.
    pub fn set_game(&self, game: GameStats) {
        self.games
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(game.id, game);
    }

    /// Fail every following call with `error`.
    pub fn fail_with(&self, error: UpstreamError) {
        *self.failure.lock().unwrap_or_else(PoisonError::into_inner) = Some(error);
    }

    /// Fail only the batch with this zero-based call index.
    pub fn fail_on_batch(&self, index: usize) {
        *self.fail_on_batch.lock().unwrap_or_else(PoisonError::into_inner) = Some(index);
    }

    /// Clear any scripted failure.
    pub fn recover(&self) {
        *self.failure.lock().unwrap_or_else(PoisonError::into_inner) = None;
        *self.fail_on_batch.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }

    /// Number of upstream calls made so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Ids of each batch, in call order.
    pub fn batches(&self) -> Vec<Vec<u64>> {
        self.batches
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl StatsSource for MockStatsSource {
    async fn fetch_batch(&self, ids: &[u64]) -> Result<Vec<GameStats>, UpstreamError> {
        let index = self.calls.fetch_add(1, Ordering::SeqCst);
        self.batches
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(ids.to_vec());

        if let Some(error) = self
            .failure
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
        {
            return Err(error);
        }
        if *self.fail_on_batch.lock().unwrap_or_else(PoisonError::into_inner) == Some(index) {
            return Err(UpstreamError::Status { status: 500 });
        }

        let games = self.games.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(ids.iter().filter_map(|id| games.get(id).copied()).collect())
    }
}

// ============================================================================
// FIXTURES
// ============================================================================

/// Three games with distinct counters; ccu sums to 1_800, visits to 3_800_000.
pub fn sample_games() -> Vec<GameStats> {
    vec![
        GameStats::new(1, 1_000, 2_500_000),
        GameStats::new(2, 500, 1_000_000),
        GameStats::new(3, 300, 300_000),
    ]
}

/// A temp directory holding a peak file path that does not exist yet.
///
/// Keep the returned `TempDir` alive for as long as the path is used.
pub fn temp_peak_file() -> std::io::Result<(TempDir, PathBuf)> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("peak_ccu.json");
    Ok((dir, path))
}

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    use proptest::prelude::*;

    /// Aggregate ccu values observed over time.
    pub fn arb_ccu_sequence() -> impl Strategy<Value = Vec<u64>> {
        prop::collection::vec(0u64..5_000_000, 1..50)
    }
}
