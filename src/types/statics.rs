//! Static per-patch catalogs: items, summoner spells, runes.
//!
//! All three are keyed by `(game_version, language)` and replaced
//! wholesale on refresh, like the champion catalog.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A purchasable item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub key: String,
    pub name: String,
    #[serde(default)]
    pub plaintext: String,
}

/// Item catalog for one (game version, language) pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemList {
    pub game_version: String,
    pub language: String,
    pub items: HashMap<String, Item>,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub fetched_at: DateTime<Utc>,
}

/// A summoner spell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummonerSpell {
    pub key: String,
    pub name: String,
    #[serde(default)]
    pub summoner_level: i32,
}

/// Summoner spell catalog for one (game version, language) pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummonerSpellList {
    pub game_version: String,
    pub language: String,
    pub spells: HashMap<String, SummonerSpell>,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub fetched_at: DateTime<Utc>,
}

/// A rune tree (path) with its slotted runes kept opaque.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuneTree {
    pub id: i32,
    pub key: String,
    pub name: String,
}

/// Runes-reforged catalog for one (game version, language) pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunesReforgedList {
    pub game_version: String,
    pub language: String,
    pub trees: Vec<RuneTree>,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub fetched_at: DateTime<Utc>,
}
