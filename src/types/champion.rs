//! Champion catalog types.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single playable champion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Champion {
    /// Internal string identifier (e.g. "Aatrox").
    pub id: String,
    /// Numeric key as a string (e.g. "266"). Primary lookup key.
    pub key: String,
    pub name: String,
    pub title: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// The full champion catalog for one game patch.
///
/// Replaced wholesale on every refresh; entries are never merged.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChampionList {
    /// Game patch the catalog was generated from (e.g. "14.3.1").
    pub version: String,
    /// Champions keyed by their numeric key.
    pub champions: HashMap<String, Champion>,
    /// Last successful refresh.
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub fetched_at: DateTime<Utc>,
}

impl ChampionList {
    /// Look up a champion by its numeric key.
    pub fn by_key(&self, key: &str) -> Option<&Champion> {
        self.champions.get(key)
    }
}
