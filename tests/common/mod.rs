//! Shared test doubles and entity builders.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Notify;

use fafnir::upstream::UpstreamApi;
use fafnir::{
    CacheMaxAges, Champion, ChampionList, FafnirError, FreeRotation, ItemList, League, LeagueEntry,
    LeagueTier, MatchRecord, MatchReference, MatchTimeline, MatchlistPage, Participant, Result,
    RunesReforgedList, Summoner, SummonerSpellList, normalize_summoner_name,
};

/// A [`CacheMaxAges`] with every category set to the same value.
pub fn max_ages(minutes: i64) -> CacheMaxAges {
    CacheMaxAges {
        champions_max_age_minutes: minutes,
        free_rotation_max_age_minutes: minutes,
        summoner_max_age_minutes: minutes,
        league_max_age_minutes: minutes,
        statics_max_age_minutes: minutes,
    }
}

pub fn summoner(name: &str, summoner_id: &str, account_id: &str, puuid: &str) -> Summoner {
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

pub fn match_record(game_id: i64, participant_accounts: &[&str]) -> MatchRecord {
    MatchRecord {
        game_id,
        platform_id: "EUW1".to_owned(),
        game_creation: 0,
        game_duration: 1800,
        queue_id: 420,
        map_id: 11,
        game_version: "14.3.558.1934".to_owned(),
        participants: participant_accounts
            .iter()
            .enumerate()
            .map(|(i, account)| Participant {
                account_id: (*account).to_owned(),
                summoner_id: None,
                summoner_name: None,
                champion_id: i as i32 + 1,
                team_id: if i % 2 == 0 { 100 } else { 200 },
                win: i % 2 == 0,
            })
            .collect(),
        fetched_at: Utc::now(),
    }
}

pub fn match_reference(game_id: i64) -> MatchReference {
    MatchReference {
        game_id,
        platform_id: "EUW1".to_owned(),
        champion_id: 1,
        queue_id: 420,
        season_id: 13,
        timestamp_ms: 0,
    }
}

pub fn league(tier: LeagueTier, queue: &str, summoner_ids: &[&str]) -> League {
    League {
        tier,
        queue: queue.to_owned(),
        name: "Test League".to_owned(),
        entries: summoner_ids
            .iter()
            .map(|id| LeagueEntry {
                summoner_id: (*id).to_owned(),
                summoner_name: format!("summoner-{id}"),
                rank: "I".to_owned(),
                league_points: 100,
                wins: 50,
                losses: 40,
            })
            .collect(),
        fetched_at: Utc::now(),
    }
}

pub fn rotation(ids: &[i64]) -> FreeRotation {
    FreeRotation {
        free_champion_ids: ids.to_vec(),
        free_champion_ids_for_new_players: vec![1, 2, 3],
        max_new_player_level: 10,
        fetched_at: Utc::now(),
    }
}

pub fn champion_list(version: &str) -> ChampionList {
    let mut champions = HashMap::new();
    champions.insert(
        "266".to_owned(),
        Champion {
            id: "Aatrox".to_owned(),
            key: "266".to_owned(),
            name: "Aatrox".to_owned(),
            title: "the Darkin Blade".to_owned(),
            tags: vec!["Fighter".to_owned()],
        },
    );
    ChampionList {
        version: version.to_owned(),
        champions,
        fetched_at: Utc::now(),
    }
}

/// Per-operation upstream call counters.
#[derive(Default)]
pub struct Counters {
    pub champions: AtomicUsize,
    pub free_rotation: AtomicUsize,
    pub summoner: AtomicUsize,
    pub league: AtomicUsize,
    pub matches_page: AtomicUsize,
    pub match_fetch: AtomicUsize,
    pub timeline: AtomicUsize,
}

/// Blocks one specific `fetch_matches_page` call until released, so a
/// test can stop the workers while a pagination is in flight.
pub struct PageGate {
    pub at_call: usize,
    pub entered: Notify,
    pub release: Notify,
}

impl PageGate {
    pub fn new(at_call: usize) -> Self {
        Self {
            at_call,
            entered: Notify::new(),
            release: Notify::new(),
        }
    }
}

/// Scriptable in-memory [`UpstreamApi`] double.
#[derive(Default)]
pub struct MockUpstream {
    pub counters: Counters,
    /// When set, every fetch fails with a transport error.
    pub fail: AtomicBool,
    /// Artificial latency applied to every fetch, milliseconds.
    pub delay_ms: AtomicU64,
    pub champions: Mutex<Option<ChampionList>>,
    pub rotation: Mutex<Option<FreeRotation>>,
    pub summoners: Mutex<Vec<Summoner>>,
    pub leagues: Mutex<HashMap<(LeagueTier, String), League>>,
    /// Full match histories by account id; pages are sliced on demand.
    pub histories: Mutex<HashMap<String, Vec<MatchReference>>>,
    pub matches: Mutex<HashMap<i64, MatchRecord>>,
    pub timelines: Mutex<HashMap<i64, MatchTimeline>>,
    pub page_gate: Mutex<Option<std::sync::Arc<PageGate>>>,
}

impl MockUpstream {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_summoner(&self, s: Summoner) {
        self.summoners.lock().unwrap().push(s);
    }

    pub fn add_league(&self, l: League) {
        self.leagues
            .lock()
            .unwrap()
            .insert((l.tier, l.queue.clone()), l);
    }

    pub fn add_history(&self, account_id: &str, references: Vec<MatchReference>) {
        self.histories
            .lock()
            .unwrap()
            .insert(account_id.to_owned(), references);
    }

    pub fn add_match(&self, record: MatchRecord) {
        self.matches.lock().unwrap().insert(record.game_id, record);
    }

    async fn observe(&self) -> Result<()> {
        let delay = self.delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        if self.fail.load(Ordering::SeqCst) {
            return Err(FafnirError::Http("mock upstream failure".into()));
        }
        Ok(())
    }

    fn find_summoner(&self, pred: impl Fn(&Summoner) -> bool, key: &str) -> Result<Summoner> {
        self.summoners
            .lock()
            .unwrap()
            .iter()
            .find(|s| pred(s))
            .cloned()
            .ok_or_else(|| FafnirError::NotFound(key.to_owned()))
    }
}

#[async_trait]
impl UpstreamApi for MockUpstream {
    async fn fetch_champions(&self) -> Result<ChampionList> {
        self.counters.champions.fetch_add(1, Ordering::SeqCst);
        self.observe().await?;
        self.champions
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| FafnirError::NotFound("champions".into()))
    }

    async fn fetch_free_rotation(&self) -> Result<FreeRotation> {
        self.counters.free_rotation.fetch_add(1, Ordering::SeqCst);
        self.observe().await?;
        self.rotation
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| FafnirError::NotFound("free rotation".into()))
    }

    async fn fetch_summoner_by_name(&self, name: &str) -> Result<Summoner> {
        self.counters.summoner.fetch_add(1, Ordering::SeqCst);
        self.observe().await?;
        let normalized = normalize_summoner_name(name);
        self.find_summoner(|s| s.normalized_name() == normalized, name)
    }

    async fn fetch_summoner_by_summoner_id(&self, summoner_id: &str) -> Result<Summoner> {
        self.counters.summoner.fetch_add(1, Ordering::SeqCst);
        self.observe().await?;
        self.find_summoner(|s| s.summoner_id == summoner_id, summoner_id)
    }

    async fn fetch_summoner_by_account_id(&self, account_id: &str) -> Result<Summoner> {
        self.counters.summoner.fetch_add(1, Ordering::SeqCst);
        self.observe().await?;
        self.find_summoner(|s| s.account_id == account_id, account_id)
    }

    async fn fetch_summoner_by_puuid(&self, puuid: &str) -> Result<Summoner> {
        self.counters.summoner.fetch_add(1, Ordering::SeqCst);
        self.observe().await?;
        self.find_summoner(|s| s.puuid == puuid, puuid)
    }

    async fn fetch_league_by_queue(&self, tier: LeagueTier, queue: &str) -> Result<League> {
        self.counters.league.fetch_add(1, Ordering::SeqCst);
        self.observe().await?;
        self.leagues
            .lock()
            .unwrap()
            .get(&(tier, queue.to_owned()))
            .cloned()
            .ok_or_else(|| FafnirError::NotFound(format!("{tier}/{queue}")))
    }

    async fn fetch_matches_page(
        &self,
        account_id: &str,
        begin_index: u32,
        end_index: u32,
    ) -> Result<MatchlistPage> {
        let call = self.counters.matches_page.fetch_add(1, Ordering::SeqCst) + 1;
        let gate = self.page_gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            if call == gate.at_call {
                gate.entered.notify_one();
                gate.release.notified().await;
            }
        }
        self.observe().await?;
        let histories = self.histories.lock().unwrap();
        let history = histories
            .get(account_id)
            .ok_or_else(|| FafnirError::NotFound(account_id.to_owned()))?;
        let begin = (begin_index as usize).min(history.len());
        let end = (end_index as usize).min(history.len());
        Ok(MatchlistPage {
            matches: history[begin..end].to_vec(),
            start_index: begin_index,
            end_index: end as u32,
            total_games: history.len() as u32,
        })
    }

    async fn fetch_match(&self, game_id: i64) -> Result<MatchRecord> {
        self.counters.match_fetch.fetch_add(1, Ordering::SeqCst);
        self.observe().await?;
        self.matches
            .lock()
            .unwrap()
            .get(&game_id)
            .cloned()
            .ok_or_else(|| FafnirError::NotFound(game_id.to_string()))
    }

    async fn fetch_match_timeline(&self, game_id: i64) -> Result<MatchTimeline> {
        self.counters.timeline.fetch_add(1, Ordering::SeqCst);
        self.observe().await?;
        self.timelines
            .lock()
            .unwrap()
            .get(&game_id)
            .cloned()
            .ok_or_else(|| FafnirError::NotFound(game_id.to_string()))
    }

    async fn fetch_items(&self, game_version: &str, _language: &str) -> Result<ItemList> {
        self.observe().await?;
        Err(FafnirError::NotFound(format!("items/{game_version}")))
    }

    async fn fetch_summoner_spells(
        &self,
        game_version: &str,
        _language: &str,
    ) -> Result<SummonerSpellList> {
        self.observe().await?;
        Err(FafnirError::NotFound(format!("spells/{game_version}")))
    }

    async fn fetch_runes_reforged(
        &self,
        game_version: &str,
        _language: &str,
    ) -> Result<RunesReforgedList> {
        self.observe().await?;
        Err(FafnirError::NotFound(format!("runes/{game_version}")))
    }
}
