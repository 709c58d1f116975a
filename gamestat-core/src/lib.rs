//! gamestat Core - Domain Types
//!
//! Data types shared by every gamestat crate: upstream game statistics, the
//! persisted peak record, identifier parsing, number formatting and the
//! error taxonomy. The only behavior here is pure; I/O lives in
//! gamestat-storage and gamestat-api.

pub mod error;
pub mod format;
pub mod peak;
pub mod source;
pub mod stats;
pub mod universe;

pub use error::{PersistenceError, UpstreamError, ValidationError};
pub use format::{format_count, format_number, format_value};
pub use peak::{PeakObservation, PeakPeriod, PeakPeriodParseError, PeakRecord, PEAK_SCHEMA_VERSION};
pub use source::{StatsSource, DEFAULT_BATCH_SIZE};
pub use stats::{AggregateStats, GameStats, GamesPage};
pub use universe::{join_ids, parse_game_id, UniverseSet};

/// Timestamp type using UTC timezone.
pub type Timestamp = chrono::DateTime<chrono::Utc>;
