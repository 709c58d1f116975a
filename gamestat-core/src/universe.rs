//! Parsing of universe (game) identifiers from query strings.

use crate::error::ValidationError;

/// Parse the `id` query parameter of a single-game lookup.
pub fn parse_game_id(raw: Option<&str>) -> Result<u64, ValidationError> {
    let raw = raw.map(str::trim).filter(|s| !s.is_empty()).ok_or_else(|| {
        ValidationError::RequiredFieldMissing {
            field: "id".to_string(),
        }
    })?;

    raw.parse::<u64>().map_err(|_| ValidationError::InvalidValue {
        field: "id".to_string(),
        reason: format!("'{}' is not a non-negative integer", raw),
    })
}

/// A sorted, de-duplicated set of universe ids.
///
/// Two requests naming the same games in any order produce the same set and
/// therefore the same cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UniverseSet(Vec<u64>);

impl UniverseSet {
    /// Parse a comma-separated list. Tokens that are not made entirely of
    /// ASCII digits are skipped, as are digit runs too large for a `u64`.
    /// At least one valid id must remain.
    pub fn parse(raw: Option<&str>) -> Result<Self, ValidationError> {
        let raw = raw.filter(|s| !s.trim().is_empty()).ok_or_else(|| {
            ValidationError::RequiredFieldMissing {
                field: "universes".to_string(),
            }
        })?;

        let mut ids: Vec<u64> = raw
            .split(',')
            .map(str::trim)
            .filter(|token| !token.is_empty() && token.bytes().all(|b| b.is_ascii_digit()))
            .filter_map(|token| token.parse::<u64>().ok())
            .collect();

        if ids.is_empty() {
            return Err(ValidationError::InvalidValue {
                field: "universes".to_string(),
                reason: "no valid universe ids".to_string(),
            });
        }

        ids.sort_unstable();
        ids.dedup();
        Ok(Self(ids))
    }

    pub fn from_ids(ids: impl IntoIterator<Item = u64>) -> Option<Self> {
        let mut ids: Vec<u64> = ids.into_iter().collect();
        if ids.is_empty() {
            return None;
        }
        ids.sort_unstable();
        ids.dedup();
        Some(Self(ids))
    }

    pub fn ids(&self) -> &[u64] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Order-independent cache key: the sorted ids joined by commas.
    pub fn cache_key(&self) -> String {
        join_ids(&self.0)
    }
}

/// Join ids with commas, as the upstream `universeIds` parameter expects.
pub fn join_ids(ids: &[u64]) -> String {
    ids.iter()
        .map(u64::to_string)
        .collect::<Vec<_>>()
        .join(",")
}
