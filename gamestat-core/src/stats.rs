//! Game statistics as returned by the upstream games API.

use serde::{Deserialize, Deserializer, Serialize};

/// Live counters for one game (universe).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct GameStats {
    #[serde(default, deserialize_with = "null_as_zero")]
    pub id: u64,
    #[serde(default, deserialize_with = "null_as_zero")]
    pub playing: u64,
    #[serde(default, deserialize_with = "null_as_zero")]
    pub visits: u64,
}

impl GameStats {
    pub fn new(id: u64, playing: u64, visits: u64) -> Self {
        Self { id, playing, visits }
    }
}

fn null_as_zero<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<u64>::deserialize(deserializer)?.unwrap_or_default())
}

/// Envelope of a `GET /v1/games?universeIds=...` response.
///
/// Upstream entries carry many more fields (name, creator, ...); only the
/// counters are kept.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GamesPage {
    pub data: Vec<GameStats>,
}

/// Sums across a set of games.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AggregateStats {
    pub games: usize,
    pub current_ccu: u64,
    pub total_visits: u64,
}

impl AggregateStats {
    pub fn from_stats(stats: &[GameStats]) -> Self {
        stats.iter().fold(Self::default(), |acc, game| Self {
            games: acc.games + 1,
            current_ccu: acc.current_ccu.saturating_add(game.playing),
            total_visits: acc.total_visits.saturating_add(game.visits),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_games_page_ignores_extra_fields() -> Result<(), serde_json::Error> {
        let body = r#"{"data":[{"id":1,"rootPlaceId":9,"name":"Obby","playing":12,"visits":3400}]}"#;
        let page: GamesPage = serde_json::from_str(body)?;
        assert_eq!(page.data, vec![GameStats::new(1, 12, 3400)]);
        Ok(())
    }

    #[test]
    fn test_missing_and_null_counters_default_to_zero() -> Result<(), serde_json::Error> {
        let body = r#"{"data":[{"id":7},{"id":8,"playing":null,"visits":5}]}"#;
        let page: GamesPage = serde_json::from_str(body)?;
        assert_eq!(page.data[0], GameStats::new(7, 0, 0));
        assert_eq!(page.data[1], GameStats::new(8, 0, 5));
        Ok(())
    }

    #[test]
    fn test_aggregate_sums_counters() {
        let stats = [
            GameStats::new(1, 10, 100),
            GameStats::new(2, 5, 50),
            GameStats::new(3, 0, 1),
        ];
        let agg = AggregateStats::from_stats(&stats);
        assert_eq!(agg.games, 3);
        assert_eq!(agg.current_ccu, 15);
        assert_eq!(agg.total_visits, 151);
    }

    #[test]
    fn test_aggregate_saturates() {
        let stats = [GameStats::new(1, u64::MAX, 0), GameStats::new(2, 1, 0)];
        assert_eq!(AggregateStats::from_stats(&stats).current_ccu, u64::MAX);
    }
}
