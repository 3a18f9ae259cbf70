//! Fetch-through entity cache.
//!
//! [`Storage`] sits between consumers (background workers, the
//! request-serving layer) and the two capabilities it orchestrates: a
//! [`Backend`] holding cached copies and an [`UpstreamApi`] producing
//! fresh ones. For each entity category it decides whether the cached
//! copy is fresh enough to serve or must be refreshed, and writes
//! refreshed copies back through the backend.
//!
//! # Freshness
//!
//! Staleness is `now - fetched_at`, compared in whole minutes against the
//! per-category maximum age from [`CacheMaxAges`]. A maximum age of zero
//! means "always refetch". Matches and timelines bypass the freshness
//! check entirely: once stored they are immutable and never refetched.
//!
//! # Error policy
//!
//! On upstream failure the error is surfaced even when a stale copy
//! exists — stale data is never silently served. A caller that prefers
//! stale-on-error can catch the error and read the backend directly.
//!
//! # Concurrency
//!
//! Safe for concurrent use. Refreshes are serialized per key: the first
//! requester performs the upstream fetch and write while concurrent
//! requesters wait, then re-check the backend and ride the fresh copy.

mod flight;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::backend::{Backend, MatchCursor};
use crate::config::CacheMaxAges;
use crate::telemetry;
use crate::types::{
    ChampionList, FreeRotation, ItemList, League, LeagueTier, MatchRecord, MatchTimeline,
    MatchlistPage, RunesReforgedList, Summoner, SummonerSpellList, normalize_summoner_name,
};
use crate::upstream::UpstreamApi;
use crate::Result;

use flight::FlightLocks;

/// Whether a cached entity is still servable under the given maximum age.
fn is_fresh(fetched_at: DateTime<Utc>, max_age_minutes: i64) -> bool {
    max_age_minutes > 0 && (Utc::now() - fetched_at).num_minutes() < max_age_minutes
}

fn hit(category: &'static str) {
    metrics::counter!(telemetry::CACHE_HITS_TOTAL, "category" => category).increment(1);
}

fn miss(category: &'static str) {
    metrics::counter!(telemetry::CACHE_MISSES_TOTAL, "category" => category).increment(1);
}

fn refreshed(category: &'static str, ok: bool) {
    let status = if ok { "ok" } else { "error" };
    metrics::counter!(telemetry::CACHE_REFRESHES_TOTAL,
        "category" => category,
        "status" => status,
    )
    .increment(1);
}

/// The entity cache.
///
/// Cheap to share: wrap in an [`Arc`] and hand clones of that to every
/// worker and request handler. Its public getters are the read surface
/// the request-serving layer registers its handlers against.
pub struct Storage {
    backend: Arc<dyn Backend>,
    upstream: Arc<dyn UpstreamApi>,
    max_ages: CacheMaxAges,
    flight: FlightLocks,
}

impl Storage {
    /// Build a cache over the given backend and upstream capability.
    pub fn new(
        backend: Arc<dyn Backend>,
        upstream: Arc<dyn UpstreamApi>,
        max_ages: CacheMaxAges,
    ) -> Self {
        Self {
            backend,
            upstream,
            max_ages,
            flight: FlightLocks::new(),
        }
    }

    // ========================================================================
    // Champion catalog
    // ========================================================================

    /// The champion catalog, refreshed when older than the configured
    /// maximum age or when `force_refresh` is set.
    pub async fn champions(&self, force_refresh: bool) -> Result<ChampionList> {
        let max_age = self.max_ages.champions_max_age_minutes;
        if !force_refresh {
            if let Some(cached) = self.backend.get_champions().await? {
                if is_fresh(cached.fetched_at, max_age) {
                    hit("champions");
                    return Ok(cached);
                }
            }
        }
        let _flight = self.flight.acquire("champions").await;
        if !force_refresh {
            if let Some(cached) = self.backend.get_champions().await? {
                if is_fresh(cached.fetched_at, max_age) {
                    hit("champions");
                    return Ok(cached);
                }
            }
        }
        miss("champions");
        let mut list = match self.upstream.fetch_champions().await {
            Ok(list) => list,
            Err(e) => {
                refreshed("champions", false);
                return Err(e);
            }
        };
        list.fetched_at = Utc::now();
        self.backend.store_champions(&list).await?;
        refreshed("champions", true);
        debug!(version = %list.version, "champion catalog refreshed");
        Ok(list)
    }

    // ========================================================================
    // Free rotation
    // ========================================================================

    /// The current free rotation. The rotation worker calls this with
    /// `force_refresh = true` every cycle.
    pub async fn free_rotation(&self, force_refresh: bool) -> Result<FreeRotation> {
        let max_age = self.max_ages.free_rotation_max_age_minutes;
        if !force_refresh {
            if let Some(cached) = self.backend.get_free_rotation().await? {
                if is_fresh(cached.fetched_at, max_age) {
                    hit("free_rotation");
                    return Ok(cached);
                }
            }
        }
        let _flight = self.flight.acquire("free_rotation").await;
        if !force_refresh {
            if let Some(cached) = self.backend.get_free_rotation().await? {
                if is_fresh(cached.fetched_at, max_age) {
                    hit("free_rotation");
                    return Ok(cached);
                }
            }
        }
        miss("free_rotation");
        let mut rotation = match self.upstream.fetch_free_rotation().await {
            Ok(rotation) => rotation,
            Err(e) => {
                refreshed("free_rotation", false);
                return Err(e);
            }
        };
        rotation.fetched_at = Utc::now();
        self.backend.store_free_rotation(&rotation).await?;
        refreshed("free_rotation", true);
        debug!(
            champions = rotation.free_champion_ids.len(),
            "free rotation refreshed"
        );
        Ok(rotation)
    }

    // ========================================================================
    // Summoners
    // ========================================================================

    /// A summoner looked up by display name.
    pub async fn summoner_by_name(&self, name: &str, force_refresh: bool) -> Result<Summoner> {
        let normalized = normalize_summoner_name(name);
        if !force_refresh {
            if let Some(s) = self.backend.get_summoner_by_name(&normalized).await? {
                if is_fresh(s.fetched_at, self.max_ages.summoner_max_age_minutes) {
                    hit("summoner");
                    return Ok(s);
                }
            }
        }
        let _flight = self.flight.acquire(&format!("summoner/name/{normalized}")).await;
        if !force_refresh {
            if let Some(s) = self.backend.get_summoner_by_name(&normalized).await? {
                if is_fresh(s.fetched_at, self.max_ages.summoner_max_age_minutes) {
                    hit("summoner");
                    return Ok(s);
                }
            }
        }
        miss("summoner");
        self.store_refreshed_summoner(self.upstream.fetch_summoner_by_name(name).await)
            .await
    }

    /// A summoner looked up by summoner id.
    pub async fn summoner_by_summoner_id(
        &self,
        summoner_id: &str,
        force_refresh: bool,
    ) -> Result<Summoner> {
        if !force_refresh {
            if let Some(s) = self.backend.get_summoner_by_summoner_id(summoner_id).await? {
                if is_fresh(s.fetched_at, self.max_ages.summoner_max_age_minutes) {
                    hit("summoner");
                    return Ok(s);
                }
            }
        }
        let _flight = self.flight.acquire(&format!("summoner/id/{summoner_id}")).await;
        if !force_refresh {
            if let Some(s) = self.backend.get_summoner_by_summoner_id(summoner_id).await? {
                if is_fresh(s.fetched_at, self.max_ages.summoner_max_age_minutes) {
                    hit("summoner");
                    return Ok(s);
                }
            }
        }
        miss("summoner");
        self.store_refreshed_summoner(self.upstream.fetch_summoner_by_summoner_id(summoner_id).await)
            .await
    }

    /// A summoner looked up by account id.
    pub async fn summoner_by_account_id(
        &self,
        account_id: &str,
        force_refresh: bool,
    ) -> Result<Summoner> {
        if !force_refresh {
            if let Some(s) = self.backend.get_summoner_by_account_id(account_id).await? {
                if is_fresh(s.fetched_at, self.max_ages.summoner_max_age_minutes) {
                    hit("summoner");
                    return Ok(s);
                }
            }
        }
        let _flight = self.flight.acquire(&format!("summoner/account/{account_id}")).await;
        if !force_refresh {
            if let Some(s) = self.backend.get_summoner_by_account_id(account_id).await? {
                if is_fresh(s.fetched_at, self.max_ages.summoner_max_age_minutes) {
                    hit("summoner");
                    return Ok(s);
                }
            }
        }
        miss("summoner");
        self.store_refreshed_summoner(self.upstream.fetch_summoner_by_account_id(account_id).await)
            .await
    }

    /// A summoner looked up by persistent player id.
    pub async fn summoner_by_puuid(&self, puuid: &str, force_refresh: bool) -> Result<Summoner> {
        if !force_refresh {
            if let Some(s) = self.backend.get_summoner_by_puuid(puuid).await? {
                if is_fresh(s.fetched_at, self.max_ages.summoner_max_age_minutes) {
                    hit("summoner");
                    return Ok(s);
                }
            }
        }
        let _flight = self.flight.acquire(&format!("summoner/puuid/{puuid}")).await;
        if !force_refresh {
            if let Some(s) = self.backend.get_summoner_by_puuid(puuid).await? {
                if is_fresh(s.fetched_at, self.max_ages.summoner_max_age_minutes) {
                    hit("summoner");
                    return Ok(s);
                }
            }
        }
        miss("summoner");
        self.store_refreshed_summoner(self.upstream.fetch_summoner_by_puuid(puuid).await)
            .await
    }

    /// Stamp and persist a freshly fetched summoner. The backend purges
    /// stale records under every alternate key as part of the store.
    async fn store_refreshed_summoner(&self, fetched: Result<Summoner>) -> Result<Summoner> {
        let mut summoner = match fetched {
            Ok(s) => s,
            Err(e) => {
                refreshed("summoner", false);
                return Err(e);
            }
        };
        summoner.fetched_at = Utc::now();
        self.backend.store_summoner(&summoner).await?;
        refreshed("summoner", true);
        debug!(name = %summoner.name, "summoner refreshed");
        Ok(summoner)
    }

    /// Number of stored summoners.
    pub async fn summoner_count(&self) -> Result<u64> {
        self.backend.summoner_count().await
    }

    // ========================================================================
    // League standings
    // ========================================================================

    /// Standings for one (tier, queue) league.
    pub async fn league(
        &self,
        tier: LeagueTier,
        queue: &str,
        force_refresh: bool,
    ) -> Result<League> {
        let max_age = self.max_ages.league_max_age_minutes;
        if !force_refresh {
            if let Some(cached) = self.backend.get_league(tier, queue).await? {
                if is_fresh(cached.fetched_at, max_age) {
                    hit("league");
                    return Ok(cached);
                }
            }
        }
        let _flight = self.flight.acquire(&format!("league/{tier}/{queue}")).await;
        if !force_refresh {
            if let Some(cached) = self.backend.get_league(tier, queue).await? {
                if is_fresh(cached.fetched_at, max_age) {
                    hit("league");
                    return Ok(cached);
                }
            }
        }
        miss("league");
        let mut league = match self.upstream.fetch_league_by_queue(tier, queue).await {
            Ok(league) => league,
            Err(e) => {
                refreshed("league", false);
                return Err(e);
            }
        };
        league.fetched_at = Utc::now();
        self.backend.store_league(&league).await?;
        refreshed("league", true);
        debug!(%tier, queue, entries = league.entries.len(), "league refreshed");
        Ok(league)
    }

    // ========================================================================
    // Matches and timelines (immutable once fetched)
    // ========================================================================

    /// A completed match. No freshness check: if a record is stored it is
    /// served as-is; otherwise it is fetched once, stored, and never
    /// refetched.
    pub async fn match_record(&self, game_id: i64, platform_id: &str) -> Result<MatchRecord> {
        if let Some(m) = self.backend.get_match(game_id, platform_id).await? {
            hit("match");
            return Ok(m);
        }
        let _flight = self.flight.acquire(&format!("match/{platform_id}/{game_id}")).await;
        if let Some(m) = self.backend.get_match(game_id, platform_id).await? {
            hit("match");
            return Ok(m);
        }
        miss("match");
        let mut record = self.upstream.fetch_match(game_id).await?;
        record.fetched_at = Utc::now();
        self.backend.store_match(&record).await?;
        metrics::counter!(telemetry::MATCHES_STORED_TOTAL).increment(1);
        Ok(record)
    }

    /// A match timeline, same once-only semantics as [`match_record`].
    ///
    /// The upstream timeline response does not carry the platform, so the
    /// lookup key's platform id is stamped onto the stored record.
    ///
    /// [`match_record`]: Storage::match_record
    pub async fn match_timeline(&self, game_id: i64, platform_id: &str) -> Result<MatchTimeline> {
        if let Some(t) = self.backend.get_match_timeline(game_id, platform_id).await? {
            hit("timeline");
            return Ok(t);
        }
        let _flight = self
            .flight
            .acquire(&format!("timeline/{platform_id}/{game_id}"))
            .await;
        if let Some(t) = self.backend.get_match_timeline(game_id, platform_id).await? {
            hit("timeline");
            return Ok(t);
        }
        miss("timeline");
        let mut timeline = self.upstream.fetch_match_timeline(game_id).await?;
        timeline.platform_id = platform_id.to_owned();
        timeline.fetched_at = Utc::now();
        self.backend.store_match_timeline(&timeline).await?;
        Ok(timeline)
    }

    /// Number of stored matches.
    pub async fn match_count(&self) -> Result<u64> {
        self.backend.match_count().await
    }

    /// One page of an account's match history, straight from upstream.
    /// Match lists are transient and never cached.
    pub async fn matches_page(
        &self,
        account_id: &str,
        begin_index: u32,
        end_index: u32,
    ) -> Result<MatchlistPage> {
        self.upstream
            .fetch_matches_page(account_id, begin_index, end_index)
            .await
    }

    /// Stored matches whose game version starts with `prefix`.
    pub async fn matches_by_game_version(&self, prefix: &str) -> Result<MatchCursor> {
        self.backend.matches_by_game_version(prefix).await
    }

    /// Stored matches played on the given map.
    pub async fn matches_by_map(&self, map_id: i32) -> Result<MatchCursor> {
        self.backend.matches_by_map(map_id).await
    }

    /// Stored matches whose queue id falls within `[lo, hi]`.
    pub async fn matches_by_queue_range(&self, lo: i32, hi: i32) -> Result<MatchCursor> {
        self.backend.matches_by_queue_range(lo, hi).await
    }

    // ========================================================================
    // Static catalogs
    // ========================================================================

    /// The item catalog for a (game version, language) pair.
    pub async fn items(
        &self,
        game_version: &str,
        language: &str,
        force_refresh: bool,
    ) -> Result<ItemList> {
        let max_age = self.max_ages.statics_max_age_minutes;
        if !force_refresh {
            if let Some(cached) = self.backend.get_items(game_version, language).await? {
                if is_fresh(cached.fetched_at, max_age) {
                    hit("items");
                    return Ok(cached);
                }
            }
        }
        let _flight = self
            .flight
            .acquire(&format!("items/{game_version}/{language}"))
            .await;
        if !force_refresh {
            if let Some(cached) = self.backend.get_items(game_version, language).await? {
                if is_fresh(cached.fetched_at, max_age) {
                    hit("items");
                    return Ok(cached);
                }
            }
        }
        miss("items");
        let mut list = match self.upstream.fetch_items(game_version, language).await {
            Ok(list) => list,
            Err(e) => {
                refreshed("items", false);
                return Err(e);
            }
        };
        list.fetched_at = Utc::now();
        self.backend.store_items(&list).await?;
        refreshed("items", true);
        Ok(list)
    }

    /// The summoner spell catalog for a (game version, language) pair.
    pub async fn summoner_spells(
        &self,
        game_version: &str,
        language: &str,
        force_refresh: bool,
    ) -> Result<SummonerSpellList> {
        let max_age = self.max_ages.statics_max_age_minutes;
        if !force_refresh {
            if let Some(cached) = self.backend.get_summoner_spells(game_version, language).await? {
                if is_fresh(cached.fetched_at, max_age) {
                    hit("summoner_spells");
                    return Ok(cached);
                }
            }
        }
        let _flight = self
            .flight
            .acquire(&format!("spells/{game_version}/{language}"))
            .await;
        if !force_refresh {
            if let Some(cached) = self.backend.get_summoner_spells(game_version, language).await? {
                if is_fresh(cached.fetched_at, max_age) {
                    hit("summoner_spells");
                    return Ok(cached);
                }
            }
        }
        miss("summoner_spells");
        let mut list = match self.upstream.fetch_summoner_spells(game_version, language).await {
            Ok(list) => list,
            Err(e) => {
                refreshed("summoner_spells", false);
                return Err(e);
            }
        };
        list.fetched_at = Utc::now();
        self.backend.store_summoner_spells(&list).await?;
        refreshed("summoner_spells", true);
        Ok(list)
    }

    /// The runes-reforged catalog for a (game version, language) pair.
    pub async fn runes_reforged(
        &self,
        game_version: &str,
        language: &str,
        force_refresh: bool,
    ) -> Result<RunesReforgedList> {
        let max_age = self.max_ages.statics_max_age_minutes;
        if !force_refresh {
            if let Some(cached) = self.backend.get_runes_reforged(game_version, language).await? {
                if is_fresh(cached.fetched_at, max_age) {
                    hit("runes_reforged");
                    return Ok(cached);
                }
            }
        }
        let _flight = self
            .flight
            .acquire(&format!("runes/{game_version}/{language}"))
            .await;
        if !force_refresh {
            if let Some(cached) = self.backend.get_runes_reforged(game_version, language).await? {
                if is_fresh(cached.fetched_at, max_age) {
                    hit("runes_reforged");
                    return Ok(cached);
                }
            }
        }
        miss("runes_reforged");
        let mut list = match self.upstream.fetch_runes_reforged(game_version, language).await {
            Ok(list) => list,
            Err(e) => {
                refreshed("runes_reforged", false);
                return Err(e);
            }
        };
        list.fetched_at = Utc::now();
        self.backend.store_runes_reforged(&list).await?;
        refreshed("runes_reforged", true);
        Ok(list)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn freshness_boundary_is_exclusive() {
        let now = Utc::now();
        assert!(is_fresh(now, 5));
        assert!(is_fresh(now - Duration::minutes(4), 5));
        // At exactly the maximum age the entity is stale.
        assert!(!is_fresh(now - Duration::minutes(5), 5));
        assert!(!is_fresh(now - Duration::minutes(6), 5));
    }

    #[test]
    fn zero_max_age_is_never_fresh() {
        assert!(!is_fresh(Utc::now(), 0));
    }
}
