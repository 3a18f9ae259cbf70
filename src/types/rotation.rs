//! Free champion rotation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The set of champions currently free to play.
///
/// A singleton entity: there is exactly one rotation at a time and it is
/// replaced wholesale on every refresh.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FreeRotation {
    /// Champion ids free for all players this week.
    pub free_champion_ids: Vec<i64>,
    /// Reduced set free for accounts below `max_new_player_level`.
    pub free_champion_ids_for_new_players: Vec<i64>,
    pub max_new_player_level: i64,
    /// Last successful refresh.
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub fetched_at: DateTime<Utc>,
}
