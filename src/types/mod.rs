//! Cached entity model.
//!
//! Every persisted entity carries a `fetched_at` timestamp, stamped by
//! [`Storage`](crate::storage::Storage) on successful refresh and used for
//! the age-based invalidation policy. Timestamps serialize as BSON
//! datetimes so the document-store backend can round-trip them.

mod champion;
mod game;
mod league;
mod rotation;
mod statics;
mod summoner;

pub use champion::{Champion, ChampionList};
pub use game::{
    MatchRecord, MatchReference, MatchTimeline, MatchlistPage, Participant, TimelineFrame,
};
pub use league::{League, LeagueEntry, LeagueTier};
pub use rotation::FreeRotation;
pub use statics::{
    Item, ItemList, RuneTree, RunesReforgedList, SummonerSpell, SummonerSpellList,
};
pub use summoner::{Summoner, normalize_summoner_name};
