//! Summoner (player identity) type and name normalization.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A player identity.
///
/// Redundantly keyed: the normalized name, `summoner_id`, `account_id`,
/// and `puuid` must all resolve to the same stored record. Backends
/// enforce this by purging every alternate key before a write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summoner {
    /// Display name as returned by the upstream API.
    pub name: String,
    pub summoner_id: String,
    pub account_id: String,
    /// Persistent cross-region player id.
    pub puuid: String,
    pub profile_icon_id: i32,
    pub summoner_level: i64,
    /// Upstream revision timestamp, epoch milliseconds.
    pub revision_date: i64,
    /// Last successful refresh.
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub fetched_at: DateTime<Utc>,
}

impl Summoner {
    /// The name key this record is stored under.
    pub fn normalized_name(&self) -> String {
        normalize_summoner_name(&self.name)
    }
}

/// Normalize a summoner name for use as a lookup key.
///
/// Lowercases and strips whitespace and punctuation, so "Best Mïd NA",
/// "bestmïdna" and "best.mïd.na" all key the same record.
pub fn normalize_summoner_name(name: &str) -> String {
    name.chars()
        .filter(|c| !c.is_whitespace() && !c.is_ascii_punctuation())
        .flat_map(char::to_lowercase)
        .collect()
}
