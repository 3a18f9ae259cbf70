//! Storage backend adapters.
//!
//! A [`Backend`] stores and retrieves typed entities by their natural
//! keys. No freshness logic lives here — backends answer "what is
//! stored" and "store this"; the age policy belongs to
//! [`Storage`](crate::storage::Storage).
//!
//! Two implementations:
//!
//! - [`MemoryBackend`] — map-backed, process-lifetime only, one coarse
//!   lock. Used for tests and small deployments.
//! - [`MongoBackend`] — document store, index-backed uniqueness,
//!   cursor-based range queries.
//!
//! The implementation is selected at construction from configuration via
//! [`connect`], never by type inspection.
//!
//! # Cursors
//!
//! Range queries return a [`MatchCursor`]: a lazy, finite, non-restartable
//! stream of decoded records. Dropping the cursor releases its underlying
//! resources on every exit path, including early return on a decode error.

pub mod memory;
pub mod mongo;

pub use memory::MemoryBackend;
pub use mongo::MongoBackend;

use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::Stream;

use crate::Result;
use crate::config::{BackendConfig, BackendKind};
use crate::types::{
    ChampionList, FreeRotation, ItemList, League, LeagueTier, MatchRecord, MatchTimeline,
    RunesReforgedList, Summoner, SummonerSpellList,
};

/// A lazy stream of decoded match records from a range query.
pub type MatchCursor = Pin<Box<dyn Stream<Item = Result<MatchRecord>> + Send>>;

/// Contract implemented by every storage backend.
///
/// `store_*` upserts by the entity's natural key(s). For the
/// multi-keyed [`Summoner`], prior records under every alternate key are
/// purged before the write, preserving "one summoner, one record".
/// Matches and timelines are append-only: `store_match` and
/// `store_match_timeline` never overwrite an existing record.
#[async_trait]
pub trait Backend: Send + Sync {
    // Champion catalog
    async fn get_champions(&self) -> Result<Option<ChampionList>>;
    async fn store_champions(&self, list: &ChampionList) -> Result<()>;

    // Free rotation (singleton)
    async fn get_free_rotation(&self) -> Result<Option<FreeRotation>>;
    async fn store_free_rotation(&self, rotation: &FreeRotation) -> Result<()>;

    // Summoners (multi-keyed)
    async fn get_summoner_by_name(&self, normalized_name: &str) -> Result<Option<Summoner>>;
    async fn get_summoner_by_summoner_id(&self, summoner_id: &str) -> Result<Option<Summoner>>;
    async fn get_summoner_by_account_id(&self, account_id: &str) -> Result<Option<Summoner>>;
    async fn get_summoner_by_puuid(&self, puuid: &str) -> Result<Option<Summoner>>;
    async fn store_summoner(&self, summoner: &Summoner) -> Result<()>;
    async fn summoner_count(&self) -> Result<u64>;

    // League standings
    async fn get_league(&self, tier: LeagueTier, queue: &str) -> Result<Option<League>>;
    async fn store_league(&self, league: &League) -> Result<()>;

    // Matches (append-only)
    async fn get_match(&self, game_id: i64, platform_id: &str) -> Result<Option<MatchRecord>>;
    async fn store_match(&self, record: &MatchRecord) -> Result<()>;
    async fn match_count(&self) -> Result<u64>;

    // Match timelines (append-only)
    async fn get_match_timeline(
        &self,
        game_id: i64,
        platform_id: &str,
    ) -> Result<Option<MatchTimeline>>;
    async fn store_match_timeline(&self, timeline: &MatchTimeline) -> Result<()>;

    // Static catalogs, keyed (game_version, language)
    async fn get_items(&self, game_version: &str, language: &str) -> Result<Option<ItemList>>;
    async fn store_items(&self, list: &ItemList) -> Result<()>;
    async fn get_summoner_spells(
        &self,
        game_version: &str,
        language: &str,
    ) -> Result<Option<SummonerSpellList>>;
    async fn store_summoner_spells(&self, list: &SummonerSpellList) -> Result<()>;
    async fn get_runes_reforged(
        &self,
        game_version: &str,
        language: &str,
    ) -> Result<Option<RunesReforgedList>>;
    async fn store_runes_reforged(&self, list: &RunesReforgedList) -> Result<()>;

    // Range queries
    /// Matches whose game version starts with `prefix`.
    async fn matches_by_game_version(&self, prefix: &str) -> Result<MatchCursor>;
    /// Matches played on the given map.
    async fn matches_by_map(&self, map_id: i32) -> Result<MatchCursor>;
    /// Matches whose queue id falls within `[lo, hi]`.
    async fn matches_by_queue_range(&self, lo: i32, hi: i32) -> Result<MatchCursor>;
}

/// Construct the backend selected by configuration.
///
/// Mongo construction performs the connection handshake and index setup;
/// failure to establish the required uniqueness constraints is fatal.
pub async fn connect(config: &BackendConfig) -> Result<Arc<dyn Backend>> {
    match config.kind {
        BackendKind::Memory => Ok(Arc::new(MemoryBackend::new())),
        BackendKind::Mongo => Ok(Arc::new(
            MongoBackend::connect(&config.uri, &config.database).await?,
        )),
    }
}
