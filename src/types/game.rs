//! Match, timeline, and matchlist types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One participant in a completed match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub account_id: String,
    #[serde(default)]
    pub summoner_id: Option<String>,
    #[serde(default)]
    pub summoner_name: Option<String>,
    pub champion_id: i32,
    pub team_id: i32,
    pub win: bool,
}

/// A completed game.
///
/// Immutable once fetched: keyed by `(game_id, platform_id)`, stored once,
/// never refreshed or overwritten.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchRecord {
    pub game_id: i64,
    /// Platform the game was played on (e.g. "EUW1").
    pub platform_id: String,
    /// Game start, epoch milliseconds.
    pub game_creation: i64,
    /// Duration in seconds.
    pub game_duration: i64,
    pub queue_id: i32,
    pub map_id: i32,
    /// Full patch string (e.g. "14.3.558.1934").
    pub game_version: String,
    pub participants: Vec<Participant>,
    /// When the record was first fetched. Informational only — matches are
    /// never judged for freshness.
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub fetched_at: DateTime<Utc>,
}

/// One snapshot frame of a match timeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimelineFrame {
    /// Offset from game start, milliseconds.
    pub timestamp_ms: i64,
    /// Raw event payload. Kept opaque — the aggregation scripts that
    /// consume timelines are out of process.
    #[serde(default)]
    pub events: Vec<serde_json::Value>,
}

/// Supplementary per-match timeline data, 1:1 with [`MatchRecord`].
///
/// Immutable once fetched, same as the match itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchTimeline {
    pub game_id: i64,
    pub platform_id: String,
    pub frame_interval: i64,
    pub frames: Vec<TimelineFrame>,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub fetched_at: DateTime<Utc>,
}

/// A reference to a match within an account's match history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchReference {
    pub game_id: i64,
    pub platform_id: String,
    pub champion_id: i32,
    pub queue_id: i32,
    pub season_id: i32,
    /// Game start, epoch milliseconds.
    pub timestamp_ms: i64,
}

/// One page of an account's match history.
///
/// Transient: pages are traversed by the backfill workers and never
/// persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchlistPage {
    pub matches: Vec<MatchReference>,
    pub start_index: u32,
    pub end_index: u32,
    pub total_games: u32,
}
