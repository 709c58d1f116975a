//! Error types for gamestat operations

use thiserror::Error;

/// Failures talking to the upstream statistics API.
///
/// Every variant is recoverable at the handler level: the caller falls back
/// to the last cached response, and only surfaces a `503` when nothing is cached.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum UpstreamError {
    #[error("Upstream request timed out")]
    Timeout,

    #[error("Upstream returned status {status}")]
    Status { status: u16 },

    #[error("Upstream transport failed: {reason}")]
    Transport { reason: String },

    #[error("Malformed upstream response: {reason}")]
    Malformed { reason: String },

    #[error("Upstream returned no results for universes {ids}")]
    Empty { ids: String },
}

impl UpstreamError {
    /// Short label used for metrics and structured logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Timeout => "timeout",
            Self::Status { .. } => "status",
            Self::Transport { .. } => "transport",
            Self::Malformed { .. } => "malformed",
            Self::Empty { .. } => "empty",
        }
    }
}

/// Failures reading or writing the persisted peak record.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PersistenceError {
    #[error("I/O error on {path}: {reason}")]
    Io { path: String, reason: String },

    #[error("Failed to decode peak record from {path}: {reason}")]
    Decode { path: String, reason: String },

    #[error("Failed to encode peak record: {reason}")]
    Encode { reason: String },
}

/// Request validation errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Required field missing: {field}")]
    RequiredFieldMissing { field: String },

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },
}
