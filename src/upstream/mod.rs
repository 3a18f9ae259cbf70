//! The upstream fetch capability.
//!
//! [`UpstreamApi`] is the narrow seam through which the rest of the crate
//! obtains fresh data. [`Storage`](crate::storage::Storage) is its only
//! consumer; nothing above it knows whether bytes came over the wire or
//! from a test double.
//!
//! The production implementation is [`RiotClient`]. Retry and rate-limit
//! handling live inside the client (see [`retry`]) — callers see either a
//! final value or a final error, never an attempt in progress.

mod retry;
mod riot;

pub use retry::RetryConfig;
pub use riot::RiotClient;

use async_trait::async_trait;

use crate::Result;
use crate::types::{
    ChampionList, FreeRotation, ItemList, League, LeagueTier, MatchRecord, MatchTimeline,
    MatchlistPage, RunesReforgedList, Summoner, SummonerSpellList,
};

/// The opaque fetch capability consumed by the entity cache.
///
/// Every method returns a freshly fetched entity or an error. The
/// implementation may be rate-limited and slow; no caching happens at
/// this layer.
#[async_trait]
pub trait UpstreamApi: Send + Sync {
    /// Fetch the champion catalog for the current patch.
    async fn fetch_champions(&self) -> Result<ChampionList>;

    /// Fetch the current free champion rotation.
    async fn fetch_free_rotation(&self) -> Result<FreeRotation>;

    /// Fetch a summoner by display name.
    async fn fetch_summoner_by_name(&self, name: &str) -> Result<Summoner>;

    /// Fetch a summoner by summoner id.
    async fn fetch_summoner_by_summoner_id(&self, summoner_id: &str) -> Result<Summoner>;

    /// Fetch a summoner by account id.
    async fn fetch_summoner_by_account_id(&self, account_id: &str) -> Result<Summoner>;

    /// Fetch a summoner by persistent player id.
    async fn fetch_summoner_by_puuid(&self, puuid: &str) -> Result<Summoner>;

    /// Fetch the standings of one (tier, queue) league.
    async fn fetch_league_by_queue(&self, tier: LeagueTier, queue: &str) -> Result<League>;

    /// Fetch one page of an account's match history.
    ///
    /// `begin_index` is inclusive, `end_index` exclusive; the upstream
    /// returns at most 100 references per request.
    async fn fetch_matches_page(
        &self,
        account_id: &str,
        begin_index: u32,
        end_index: u32,
    ) -> Result<MatchlistPage>;

    /// Fetch a completed match.
    async fn fetch_match(&self, game_id: i64) -> Result<MatchRecord>;

    /// Fetch the timeline of a completed match.
    async fn fetch_match_timeline(&self, game_id: i64) -> Result<MatchTimeline>;

    /// Fetch the item catalog for a (game version, language) pair.
    async fn fetch_items(&self, game_version: &str, language: &str) -> Result<ItemList>;

    /// Fetch the summoner spell catalog for a (game version, language) pair.
    async fn fetch_summoner_spells(
        &self,
        game_version: &str,
        language: &str,
    ) -> Result<SummonerSpellList>;

    /// Fetch the runes-reforged catalog for a (game version, language) pair.
    async fn fetch_runes_reforged(
        &self,
        game_version: &str,
        language: &str,
    ) -> Result<RunesReforgedList>;
}
