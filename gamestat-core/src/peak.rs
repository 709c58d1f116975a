//! Peak concurrent-player tracking.
//!
//! The persisted record uses an explicit, versioned schema. Two legacy layouts
//! are still accepted on load and upgraded in memory:
//!
//! - v1 with a calendar day: `{"peak": 120, "date": "2024-05-01"}`
//! - v1 with a raw unix timestamp: `{"peak": 120, "date": 1714521600.5}` or
//!   `{"peak": 120, "timestamp": 1714521600}`

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::PersistenceError;

/// Current on-disk schema version.
pub const PEAK_SCHEMA_VERSION: u32 = 2;

/// Period over which the peak is tracked before it resets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PeakPeriod {
    /// Reset at each new UTC calendar day.
    #[default]
    Daily,
    /// Never reset.
    AllTime,
}

impl fmt::Display for PeakPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Daily => write!(f, "daily"),
            Self::AllTime => write!(f, "all_time"),
        }
    }
}

/// Error parsing a [`PeakPeriod`] from a string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeakPeriodParseError(pub String);

impl fmt::Display for PeakPeriodParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid peak period: {}", self.0)
    }
}

impl std::error::Error for PeakPeriodParseError {}

impl FromStr for PeakPeriod {
    type Err = PeakPeriodParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "daily" | "day" => Ok(Self::Daily),
            "all_time" | "alltime" | "all-time" => Ok(Self::AllTime),
            other => Err(PeakPeriodParseError(other.to_string())),
        }
    }
}

/// The persisted peak.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeakRecord {
    pub version: u32,
    pub peak: u64,
    /// UTC day of the tracked period.
    pub date: Option<NaiveDate>,
    /// Fetch time of the observation that set `peak`.
    pub updated_at: Option<DateTime<Utc>>,
}

impl Default for PeakRecord {
    fn default() -> Self {
        Self {
            version: PEAK_SCHEMA_VERSION,
            peak: 0,
            date: None,
            updated_at: None,
        }
    }
}

/// Outcome of comparing a fresh aggregate against the stored peak.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeakObservation {
    /// Record effective after the observation.
    pub record: PeakRecord,
    /// `true` when the observation raised the peak and must be persisted.
    pub is_new_peak: bool,
    /// `true` when the stored record belonged to an earlier period.
    pub is_new_period: bool,
}

impl PeakRecord {
    /// Decode a stored record, upgrading legacy layouts.
    pub fn from_json(value: &Value, path: &str) -> Result<Self, PersistenceError> {
        let obj = value.as_object().ok_or_else(|| PersistenceError::Decode {
            path: path.to_string(),
            reason: "expected a JSON object".to_string(),
        })?;

        let peak = match obj.get("peak") {
            None | Some(Value::Null) => 0,
            Some(v) => v
                .as_u64()
                .or_else(|| v.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64))
                .ok_or_else(|| PersistenceError::Decode {
                    path: path.to_string(),
                    reason: format!("invalid peak value {}", v),
                })?,
        };

        let mut date = None;
        let mut updated_at = obj
            .get("updated_at")
            .and_then(Value::as_str)
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.with_timezone(&Utc));

        match obj.get("date") {
            Some(Value::String(s)) => {
                if let Ok(day) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
                    date = Some(day);
                } else if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
                    let dt = dt.with_timezone(&Utc);
                    date = Some(dt.date_naive());
                    updated_at = updated_at.or(Some(dt));
                }
            }
            Some(Value::Number(n)) => {
                if let Some(dt) = n.as_f64().and_then(timestamp_to_datetime) {
                    date = Some(dt.date_naive());
                    updated_at = updated_at.or(Some(dt));
                }
            }
            _ => {}
        }

        if date.is_none() {
            if let Some(dt) = obj
                .get("timestamp")
                .and_then(Value::as_f64)
                .and_then(timestamp_to_datetime)
            {
                date = Some(dt.date_naive());
                updated_at = updated_at.or(Some(dt));
            }
        }

        Ok(Self {
            version: PEAK_SCHEMA_VERSION,
            peak,
            date,
            updated_at,
        })
    }

    /// The record as it applies to the period containing `now`.
    ///
    /// A daily record from an earlier day counts as zero for today.
    pub fn baseline(&self, now: DateTime<Utc>, period: PeakPeriod) -> PeakRecord {
        let today = now.date_naive();
        match period {
            PeakPeriod::Daily if self.date != Some(today) => PeakRecord {
                date: Some(today),
                ..PeakRecord::default()
            },
            _ => PeakRecord {
                version: PEAK_SCHEMA_VERSION,
                date: self.date.or(Some(today)),
                ..self.clone()
            },
        }
    }

    /// Compare `current` against this record. The peak only moves when
    /// `current` is strictly greater than the baseline for the period.
    pub fn observe(&self, current: u64, now: DateTime<Utc>, period: PeakPeriod) -> PeakObservation {
        let is_new_period = period == PeakPeriod::Daily && self.date != Some(now.date_naive());
        let baseline = self.baseline(now, period);

        if current > baseline.peak {
            PeakObservation {
                record: PeakRecord {
                    version: PEAK_SCHEMA_VERSION,
                    peak: current,
                    date: Some(now.date_naive()),
                    updated_at: Some(now),
                },
                is_new_peak: true,
                is_new_period,
            }
        } else {
            PeakObservation {
                record: baseline,
                is_new_peak: false,
                is_new_period,
            }
        }
    }
}

fn timestamp_to_datetime(secs: f64) -> Option<DateTime<Utc>> {
    if !secs.is_finite() || secs < 0.0 {
        return None;
    }
    let whole = secs.trunc();
    let nanos = ((secs - whole) * 1_000_000_000.0) as u32;
    DateTime::from_timestamp(whole as i64, nanos)
}
