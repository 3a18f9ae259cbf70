//! League standings types.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{FafnirError, Result};

/// Apex league tiers exposed by the upstream league-by-queue endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LeagueTier {
    Challenger,
    Grandmaster,
    Master,
}

impl LeagueTier {
    /// Path segment used by the upstream league endpoints.
    pub fn as_str(&self) -> &'static str {
        match self {
            LeagueTier::Challenger => "challenger",
            LeagueTier::Grandmaster => "grandmaster",
            LeagueTier::Master => "master",
        }
    }
}

impl fmt::Display for LeagueTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LeagueTier {
    type Err = FafnirError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "challenger" => Ok(LeagueTier::Challenger),
            "grandmaster" => Ok(LeagueTier::Grandmaster),
            "master" => Ok(LeagueTier::Master),
            other => Err(FafnirError::Configuration(format!(
                "unknown league tier '{other}'"
            ))),
        }
    }
}

/// One summoner's standing within a league.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeagueEntry {
    pub summoner_id: String,
    pub summoner_name: String,
    pub rank: String,
    pub league_points: i32,
    pub wins: i32,
    pub losses: i32,
}

/// Standings for one (tier, queue) pair.
///
/// A refreshable list, not a merge target: replaced wholesale
/// (delete-then-upsert) on every refresh.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct League {
    pub tier: LeagueTier,
    /// Queue identifier (e.g. "RANKED_SOLO_5x5").
    pub queue: String,
    pub name: String,
    pub entries: Vec<LeagueEntry>,
    /// Last successful refresh.
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub fetched_at: DateTime<Utc>,
}
