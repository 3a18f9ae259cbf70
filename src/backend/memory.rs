//! In-memory backend.
//!
//! Map-backed, process-lifetime only. One coarse mutex guards all state;
//! critical sections are short (clone in, clone out), so holding a
//! synchronous lock inside async methods is fine at this scale.
//! Contention is not a design goal.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use futures_util::stream;

use super::{Backend, MatchCursor};
use crate::types::{
    ChampionList, FreeRotation, ItemList, League, LeagueTier, MatchRecord, MatchTimeline,
    RunesReforgedList, Summoner, SummonerSpellList,
};
use crate::{FafnirError, Result};

#[derive(Default)]
struct MemoryState {
    champions: Option<ChampionList>,
    free_rotation: Option<FreeRotation>,
    summoners: Vec<Summoner>,
    leagues: HashMap<(LeagueTier, String), League>,
    matches: HashMap<(i64, String), MatchRecord>,
    timelines: HashMap<(i64, String), MatchTimeline>,
    items: HashMap<(String, String), ItemList>,
    spells: HashMap<(String, String), SummonerSpellList>,
    runes: HashMap<(String, String), RunesReforgedList>,
}

/// Map-backed backend for tests and small deployments.
#[derive(Default)]
pub struct MemoryBackend {
    state: Mutex<MemoryState>,
}

impl MemoryBackend {
    /// Create an empty backend.
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        // Poisoning only happens if a holder panicked; propagate the panic.
        self.state.lock().expect("memory backend lock poisoned")
    }

    /// Find at most one summoner matching `pred`; two or more matches is
    /// a [`FafnirError::DuplicateRecord`].
    fn find_summoner(
        &self,
        key: &str,
        pred: impl Fn(&Summoner) -> bool,
    ) -> Result<Option<Summoner>> {
        let state = self.state();
        let mut found = state.summoners.iter().filter(|s| pred(s));
        let first = found.next().cloned();
        if found.next().is_some() {
            return Err(FafnirError::DuplicateRecord {
                collection: "summoners",
                key: key.to_owned(),
            });
        }
        Ok(first)
    }

    fn match_cursor(&self, pred: impl Fn(&MatchRecord) -> bool) -> MatchCursor {
        let records: Vec<MatchRecord> = self
            .state()
            .matches
            .values()
            .filter(|m| pred(m))
            .cloned()
            .collect();
        Box::pin(stream::iter(
            records.into_iter().map(Ok::<_, FafnirError>),
        ))
    }
}

#[async_trait]
impl Backend for MemoryBackend {
    async fn get_champions(&self) -> Result<Option<ChampionList>> {
        Ok(self.state().champions.clone())
    }

    async fn store_champions(&self, list: &ChampionList) -> Result<()> {
        self.state().champions = Some(list.clone());
        Ok(())
    }

    async fn get_free_rotation(&self) -> Result<Option<FreeRotation>> {
        Ok(self.state().free_rotation.clone())
    }

    async fn store_free_rotation(&self, rotation: &FreeRotation) -> Result<()> {
        self.state().free_rotation = Some(rotation.clone());
        Ok(())
    }

    async fn get_summoner_by_name(&self, normalized_name: &str) -> Result<Option<Summoner>> {
        self.find_summoner(normalized_name, |s| s.normalized_name() == normalized_name)
    }

    async fn get_summoner_by_summoner_id(&self, summoner_id: &str) -> Result<Option<Summoner>> {
        self.find_summoner(summoner_id, |s| s.summoner_id == summoner_id)
    }

    async fn get_summoner_by_account_id(&self, account_id: &str) -> Result<Option<Summoner>> {
        self.find_summoner(account_id, |s| s.account_id == account_id)
    }

    async fn get_summoner_by_puuid(&self, puuid: &str) -> Result<Option<Summoner>> {
        self.find_summoner(puuid, |s| s.puuid == puuid)
    }

    async fn store_summoner(&self, summoner: &Summoner) -> Result<()> {
        let mut state = self.state();
        // Purge every alternate key first: one summoner, one record.
        let name = summoner.normalized_name();
        state.summoners.retain(|s| {
            s.normalized_name() != name
                && s.summoner_id != summoner.summoner_id
                && s.account_id != summoner.account_id
                && s.puuid != summoner.puuid
        });
        state.summoners.push(summoner.clone());
        Ok(())
    }

    async fn summoner_count(&self) -> Result<u64> {
        Ok(self.state().summoners.len() as u64)
    }

    async fn get_league(&self, tier: LeagueTier, queue: &str) -> Result<Option<League>> {
        Ok(self.state().leagues.get(&(tier, queue.to_owned())).cloned())
    }

    async fn store_league(&self, league: &League) -> Result<()> {
        self.state()
            .leagues
            .insert((league.tier, league.queue.clone()), league.clone());
        Ok(())
    }

    async fn get_match(&self, game_id: i64, platform_id: &str) -> Result<Option<MatchRecord>> {
        Ok(self
            .state()
            .matches
            .get(&(game_id, platform_id.to_owned()))
            .cloned())
    }

    async fn store_match(&self, record: &MatchRecord) -> Result<()> {
        self.state()
            .matches
            .entry((record.game_id, record.platform_id.clone()))
            .or_insert_with(|| record.clone());
        Ok(())
    }

    async fn match_count(&self) -> Result<u64> {
        Ok(self.state().matches.len() as u64)
    }

    async fn get_match_timeline(
        &self,
        game_id: i64,
        platform_id: &str,
    ) -> Result<Option<MatchTimeline>> {
        Ok(self
            .state()
            .timelines
            .get(&(game_id, platform_id.to_owned()))
            .cloned())
    }

    async fn store_match_timeline(&self, timeline: &MatchTimeline) -> Result<()> {
        self.state()
            .timelines
            .entry((timeline.game_id, timeline.platform_id.clone()))
            .or_insert_with(|| timeline.clone());
        Ok(())
    }

    async fn get_items(&self, game_version: &str, language: &str) -> Result<Option<ItemList>> {
        Ok(self
            .state()
            .items
            .get(&(game_version.to_owned(), language.to_owned()))
            .cloned())
    }

    async fn store_items(&self, list: &ItemList) -> Result<()> {
        self.state()
            .items
            .insert((list.game_version.clone(), list.language.clone()), list.clone());
        Ok(())
    }

    async fn get_summoner_spells(
        &self,
        game_version: &str,
        language: &str,
    ) -> Result<Option<SummonerSpellList>> {
        Ok(self
            .state()
            .spells
            .get(&(game_version.to_owned(), language.to_owned()))
            .cloned())
    }

    async fn store_summoner_spells(&self, list: &SummonerSpellList) -> Result<()> {
        self.state()
            .spells
            .insert((list.game_version.clone(), list.language.clone()), list.clone());
        Ok(())
    }

    async fn get_runes_reforged(
        &self,
        game_version: &str,
        language: &str,
    ) -> Result<Option<RunesReforgedList>> {
        Ok(self
            .state()
            .runes
            .get(&(game_version.to_owned(), language.to_owned()))
            .cloned())
    }

    async fn store_runes_reforged(&self, list: &RunesReforgedList) -> Result<()> {
        self.state()
            .runes
            .insert((list.game_version.clone(), list.language.clone()), list.clone());
        Ok(())
    }

    async fn matches_by_game_version(&self, prefix: &str) -> Result<MatchCursor> {
        let prefix = prefix.to_owned();
        Ok(self.match_cursor(move |m| m.game_version.starts_with(&prefix)))
    }

    async fn matches_by_map(&self, map_id: i32) -> Result<MatchCursor> {
        Ok(self.match_cursor(move |m| m.map_id == map_id))
    }

    async fn matches_by_queue_range(&self, lo: i32, hi: i32) -> Result<MatchCursor> {
        Ok(self.match_cursor(move |m| m.queue_id >= lo && m.queue_id <= hi))
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use futures_util::TryStreamExt;

    use super::*;

    fn summoner(name: &str, summoner_id: &str, account_id: &str, puuid: &str) -> Summoner {
        Summoner {
            name: name.to_owned(),
            summoner_id: summoner_id.to_owned(),
            account_id: account_id.to_owned(),
            puuid: puuid.to_owned(),
            profile_icon_id: 1,
            summoner_level: 30,
            revision_date: 0,
            fetched_at: Utc::now(),
        }
    }

    fn match_record(game_id: i64, queue_id: i32, map_id: i32, version: &str) -> MatchRecord {
        MatchRecord {
            game_id,
            platform_id: "EUW1".to_owned(),
            game_creation: 0,
            game_duration: 1800,
            queue_id,
            map_id,
            game_version: version.to_owned(),
            participants: Vec::new(),
            fetched_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn summoner_roundtrips_under_all_four_keys() {
        let backend = MemoryBackend::new();
        backend
            .store_summoner(&summoner("Best Mid NA", "sid-1", "aid-1", "puuid-1"))
            .await
            .unwrap();

        assert!(backend.get_summoner_by_name("bestmidna").await.unwrap().is_some());
        assert!(backend.get_summoner_by_summoner_id("sid-1").await.unwrap().is_some());
        assert!(backend.get_summoner_by_account_id("aid-1").await.unwrap().is_some());
        assert!(backend.get_summoner_by_puuid("puuid-1").await.unwrap().is_some());
        assert_eq!(backend.summoner_count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn storing_under_new_name_purges_shared_account_id() {
        let backend = MemoryBackend::new();
        backend
            .store_summoner(&summoner("Old Name", "sid-1", "aid-1", "puuid-1"))
            .await
            .unwrap();
        // Same account, renamed: the old record must disappear under
        // every key, leaving exactly one record for the account id.
        backend
            .store_summoner(&summoner("New Name", "sid-1", "aid-1", "puuid-1"))
            .await
            .unwrap();

        assert_eq!(backend.summoner_count().await.unwrap(), 1);
        assert!(backend.get_summoner_by_name("oldname").await.unwrap().is_none());
        let found = backend.get_summoner_by_account_id("aid-1").await.unwrap().unwrap();
        assert_eq!(found.name, "New Name");
    }

    #[tokio::test]
    async fn match_store_is_insert_if_absent() {
        let backend = MemoryBackend::new();
        let first = match_record(7, 420, 11, "14.3.1");
        backend.store_match(&first).await.unwrap();

        let mut second = match_record(7, 420, 11, "14.3.1");
        second.game_duration = 99;
        backend.store_match(&second).await.unwrap();

        let stored = backend.get_match(7, "EUW1").await.unwrap().unwrap();
        assert_eq!(stored.game_duration, 1800); // first write wins
        assert_eq!(backend.match_count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn cursors_filter_by_version_map_and_queue() {
        let backend = MemoryBackend::new();
        backend.store_match(&match_record(1, 420, 11, "14.3.1")).await.unwrap();
        backend.store_match(&match_record(2, 450, 12, "14.3.2")).await.unwrap();
        backend.store_match(&match_record(3, 700, 11, "13.9.1")).await.unwrap();

        let by_version: Vec<_> = backend
            .matches_by_game_version("14.3")
            .await
            .unwrap()
            .try_collect()
            .await
            .unwrap();
        assert_eq!(by_version.len(), 2);

        let by_map: Vec<_> = backend
            .matches_by_map(11)
            .await
            .unwrap()
            .try_collect()
            .await
            .unwrap();
        assert_eq!(by_map.len(), 2);

        let by_queue: Vec<_> = backend
            .matches_by_queue_range(400, 500)
            .await
            .unwrap()
            .try_collect()
            .await
            .unwrap();
        assert_eq!(by_queue.len(), 2);
    }

    #[tokio::test]
    async fn league_replaced_wholesale() {
        let backend = MemoryBackend::new();
        let mut league = League {
            tier: LeagueTier::Challenger,
            queue: "RANKED_SOLO_5x5".to_owned(),
            name: "Fiora's Duelists".to_owned(),
            entries: Vec::new(),
            fetched_at: Utc::now(),
        };
        backend.store_league(&league).await.unwrap();

        league.name = "Renamed".to_owned();
        backend.store_league(&league).await.unwrap();

        let stored = backend
            .get_league(LeagueTier::Challenger, "RANKED_SOLO_5x5")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.name, "Renamed");
    }
}
