//! Persisted peak record.
//!
//! Load-compare-save runs under a single async mutex so concurrent
//! observations cannot lose an update. The file is replaced atomically by
//! writing `<file>.tmp` and renaming it over the target. A peak that could
//! not be written is held as unsaved and takes precedence over the older file
//! until a later save succeeds.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use gamestat_core::{PeakObservation, PeakPeriod, PeakRecord, PersistenceError};
use tokio::sync::Mutex;

/// Storage for the tracked peak.
///
/// Implementations never fail outward: persistence problems are logged and
/// the last record held in memory is used instead.
#[async_trait]
pub trait PeakStore: Send + Sync {
    /// Current stored record.
    async fn load(&self) -> PeakRecord;

    /// Compare `current` against the stored peak and persist it when higher.
    async fn observe(
        &self,
        current: u64,
        now: DateTime<Utc>,
        period: PeakPeriod,
    ) -> PeakObservation;
}

// ============================================================================
// FILE STORE
// ============================================================================

/// JSON-file backed peak store.
#[derive(Debug)]
pub struct FilePeakStore {
    path: PathBuf,
    state: Mutex<PeakState>,
}

#[derive(Debug, Default)]
struct PeakState {
    /// Last record read or written; the fallback when the file is unusable.
    last_known: PeakRecord,
    /// Record that failed to persist and is newer than the file.
    unsaved: Option<PeakRecord>,
}

/// Whether `pending` should win over `stored`: a later period always does,
/// within the same period only a strictly higher peak.
fn supersedes(pending: &PeakRecord, stored: &PeakRecord) -> bool {
    match (pending.date, stored.date) {
        (Some(p), Some(s)) if p != s => p > s,
        _ => pending.peak > stored.peak,
    }
}

impl FilePeakStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            state: Mutex::new(PeakState::default()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn display_path(&self) -> String {
        self.path.display().to_string()
    }

    fn temp_path(&self) -> PathBuf {
        let mut tmp = self.path.as_os_str().to_owned();
        tmp.push(".tmp");
        PathBuf::from(tmp)
    }

    /// Read the file. A missing file is `Ok(None)`.
    pub async fn read_record(&self) -> Result<Option<PeakRecord>, PersistenceError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(PersistenceError::Io {
                    path: self.display_path(),
                    reason: e.to_string(),
                })
            }
        };

        let value: serde_json::Value =
            serde_json::from_slice(&bytes).map_err(|e| PersistenceError::Decode {
                path: self.display_path(),
                reason: e.to_string(),
            })?;

        PeakRecord::from_json(&value, &self.display_path()).map(Some)
    }

    /// Write the record through a temp file and rename.
    pub async fn write_record(&self, record: &PeakRecord) -> Result<(), PersistenceError> {
        let bytes = serde_json::to_vec_pretty(record).map_err(|e| PersistenceError::Encode {
            reason: e.to_string(),
        })?;

        let tmp = self.temp_path();
        tokio::fs::write(&tmp, &bytes)
            .await
            .map_err(|e| PersistenceError::Io {
                path: tmp.display().to_string(),
                reason: e.to_string(),
            })?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| PersistenceError::Io {
                path: self.display_path(),
                reason: e.to_string(),
            })
    }

    async fn current(&self, state: &mut PeakState) -> PeakRecord {
        match self.read_record().await {
            Ok(Some(record)) => state.last_known = record,
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(error = %e, "Peak file unreadable, using in-memory record");
            }
        }

        if let Some(pending) = state.unsaved.take() {
            if supersedes(&pending, &state.last_known) {
                state.last_known = pending.clone();
                state.unsaved = Some(pending);
            }
        }
        state.last_known.clone()
    }

    /// Write `record`, remembering it as unsaved on failure.
    async fn persist(&self, state: &mut PeakState, record: &PeakRecord) -> bool {
        match self.write_record(record).await {
            Ok(()) => {
                state.unsaved = None;
                true
            }
            Err(e) => {
                tracing::warn!(error = %e, peak = record.peak, "Failed to persist peak");
                state.unsaved = Some(record.clone());
                false
            }
        }
    }
}

#[async_trait]
impl PeakStore for FilePeakStore {
    async fn load(&self) -> PeakRecord {
        let mut state = self.state.lock().await;
        self.current(&mut state).await
    }

    async fn observe(
        &self,
        current: u64,
        now: DateTime<Utc>,
        period: PeakPeriod,
    ) -> PeakObservation {
        let mut state = self.state.lock().await;
        let stored = self.current(&mut state).await;
        let observation = stored.observe(current, now, period);

        if observation.is_new_peak {
            if self.persist(&mut state, &observation.record).await {
                tracing::info!(
                    peak = current,
                    previous = stored.peak,
                    date = ?observation.record.date,
                    "New peak recorded"
                );
            }
            state.last_known = observation.record.clone();
        } else if let Some(pending) = state.unsaved.clone() {
            if self.persist(&mut state, &pending).await {
                tracing::info!(peak = pending.peak, "Persisted previously unsaved peak");
            }
        }

        observation
    }
}

// ============================================================================
// IN-MEMORY STORE
// ============================================================================

/// Peak store that lives only in process memory.
#[derive(Debug, Default)]
pub struct InMemoryPeakStore {
    record: Mutex<PeakRecord>,
}

impl InMemoryPeakStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_record(record: PeakRecord) -> Self {
        Self {
            record: Mutex::new(record),
        }
    }
}

#[async_trait]
impl PeakStore for InMemoryPeakStore {
    async fn load(&self) -> PeakRecord {
        self.record.lock().await.clone()
    }

    async fn observe(
        &self,
        current: u64,
        now: DateTime<Utc>,
        period: PeakPeriod,
    ) -> PeakObservation {
        let mut record = self.record.lock().await;
        let observation = record.observe(current, now, period);
        if observation.is_new_peak {
            *record = observation.record.clone();
        }
        observation
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_in_memory_store_tracks_max() {
        let store = InMemoryPeakStore::new();
        let now = Utc::now();

        assert!(store.observe(10, now, PeakPeriod::AllTime).await.is_new_peak);
        assert!(!store.observe(5, now, PeakPeriod::AllTime).await.is_new_peak);
        assert_eq!(store.load().await.peak, 10);
    }

    #[test]
    fn test_unsaved_record_supersedes_older_file() {
        let day = |d| chrono::NaiveDate::from_ymd_opt(2024, 5, d);
        let record = |peak, date| PeakRecord {
            peak,
            date,
            ..PeakRecord::default()
        };

        assert!(supersedes(&record(150, day(1)), &record(100, day(1))));
        assert!(!supersedes(&record(100, day(1)), &record(100, day(1))));
        assert!(supersedes(&record(5, day(2)), &record(100, day(1))));
        assert!(!supersedes(&record(500, day(1)), &record(5, day(2))));
    }

    #[test]
    fn test_temp_path_appends_suffix() {
        let store = FilePeakStore::new("/var/lib/gamestat/peak_ccu.json");
        assert_eq!(
            store.temp_path(),
            PathBuf::from("/var/lib/gamestat/peak_ccu.json.tmp")
        );
    }
}
