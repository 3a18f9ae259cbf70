//! Riot HTTP client.
//!
//! Talks to two hosts: the platform API (summoners, leagues, matches,
//! rotation — authenticated via the `X-Riot-Token` header) and ddragon
//! (static catalogs — unauthenticated). Both base URLs are overridable
//! for testing with wiremock.
//!
//! Wire DTOs live here and nowhere else; everything is converted to the
//! crate's entity types before leaving this module.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::{Client, Response, StatusCode, Url};
use serde::Deserialize;
use serde::de::DeserializeOwned;

use super::retry::{RetryConfig, with_retry};
use crate::config::UpstreamConfig;
use crate::telemetry;
use crate::types::{
    Champion, ChampionList, FreeRotation, Item, ItemList, League, LeagueEntry, LeagueTier,
    MatchRecord, MatchReference, MatchTimeline, MatchlistPage, Participant, RuneTree,
    RunesReforgedList, Summoner, SummonerSpell, SummonerSpellList, TimelineFrame,
};
use crate::{FafnirError, Result};

/// Default platform host.
const DEFAULT_PLATFORM_BASE_URL: &str = "https://euw1.api.riotgames.com";

/// Default static-data host.
const DEFAULT_DDRAGON_BASE_URL: &str = "https://ddragon.leagueoflegends.com";

/// Client for the Riot platform and ddragon APIs.
///
/// One client serves one platform (the region is baked into the base
/// URL). Retries transient failures per its [`RetryConfig`], honouring
/// `Retry-After` on rate limits.
#[derive(Clone)]
pub struct RiotClient {
    api_key: String,
    http: Client,
    platform_base_url: String,
    ddragon_base_url: String,
    language: String,
    retry: RetryConfig,
}

impl RiotClient {
    /// Create a client with the default base URLs.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_base_urls(api_key, DEFAULT_PLATFORM_BASE_URL, DEFAULT_DDRAGON_BASE_URL)
    }

    /// Create a client from an [`UpstreamConfig`] section.
    pub fn from_config(config: &UpstreamConfig) -> Self {
        Self::with_base_urls(
            config.api_key.clone(),
            config.platform_base_url.clone(),
            config.ddragon_base_url.clone(),
        )
        .language(config.language.clone())
    }

    /// Create a client with custom base URLs (for testing with wiremock).
    pub fn with_base_urls(
        api_key: impl Into<String>,
        platform_base_url: impl Into<String>,
        ddragon_base_url: impl Into<String>,
    ) -> Self {
        let http = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("failed to build HTTP client");

        Self {
            api_key: api_key.into(),
            http,
            platform_base_url: platform_base_url.into(),
            ddragon_base_url: ddragon_base_url.into(),
            language: "en_US".to_string(),
            retry: RetryConfig::default(),
        }
    }

    /// Set the language used for static catalogs (default: `en_US`).
    pub fn language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    /// Replace the retry configuration.
    pub fn retry_config(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    fn url(base: &str, segments: &[&str]) -> Result<Url> {
        let mut url = Url::parse(base)
            .map_err(|e| FafnirError::Configuration(format!("invalid base url '{base}': {e}")))?;
        url.path_segments_mut()
            .map_err(|_| FafnirError::Configuration(format!("base url '{base}' cannot be a base")))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// GET a JSON document with retry, emitting request metrics.
    async fn get_json<T: DeserializeOwned>(
        &self,
        url: Url,
        operation: &'static str,
        authenticated: bool,
    ) -> Result<T> {
        let result = with_retry(&self.retry, operation, || {
            self.get_json_once::<T>(url.clone(), authenticated)
        })
        .await;
        let status = if result.is_ok() { "ok" } else { "error" };
        metrics::counter!(telemetry::UPSTREAM_REQUESTS_TOTAL,
            "operation" => operation,
            "status" => status,
        )
        .increment(1);
        result
    }

    async fn get_json_once<T: DeserializeOwned>(&self, url: Url, authenticated: bool) -> Result<T> {
        let mut request = self.http.get(url);
        if authenticated {
            request = request.header("X-Riot-Token", &self.api_key);
        }
        let response = request
            .send()
            .await
            .map_err(|e| FafnirError::Http(e.to_string()))?;
        let response = Self::check_status(response).await?;
        response
            .json()
            .await
            .map_err(|e| FafnirError::Http(e.to_string()))
    }

    /// Map upstream HTTP statuses onto the crate error taxonomy.
    async fn check_status(response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let url = response.url().to_string();
        Err(match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => FafnirError::AuthenticationFailed,
            StatusCode::NOT_FOUND => FafnirError::NotFound(url),
            StatusCode::TOO_MANY_REQUESTS => {
                let retry_after = response
                    .headers()
                    .get("retry-after")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.parse::<u64>().ok())
                    .map(Duration::from_secs);
                FafnirError::RateLimited { retry_after }
            }
            _ => {
                let message = response.text().await.unwrap_or_default();
                FafnirError::Api {
                    status: status.as_u16(),
                    message,
                }
            }
        })
    }

    /// Latest game version known to ddragon.
    async fn latest_ddragon_version(&self) -> Result<String> {
        let url = Self::url(&self.ddragon_base_url, &["api", "versions.json"])?;
        let versions: Vec<String> = self.get_json(url, "fetch_versions", false).await?;
        versions
            .into_iter()
            .next()
            .ok_or_else(|| FafnirError::Data("empty version list from ddragon".into()))
    }

    async fn ddragon_catalog<T: DeserializeOwned>(
        &self,
        game_version: &str,
        language: &str,
        file: &str,
        operation: &'static str,
    ) -> Result<T> {
        let url = Self::url(
            &self.ddragon_base_url,
            &["cdn", game_version, "data", language, file],
        )?;
        self.get_json(url, operation, false).await
    }
}

#[async_trait]
impl super::UpstreamApi for RiotClient {
    async fn fetch_champions(&self) -> Result<ChampionList> {
        let version = self.latest_ddragon_version().await?;
        let dto: ChampionCatalogDto = self
            .ddragon_catalog(&version, &self.language, "champion.json", "fetch_champions")
            .await?;
        let champions = dto
            .data
            .into_values()
            .map(|c| {
                (
                    c.key.clone(),
                    Champion {
                        id: c.id,
                        key: c.key,
                        name: c.name,
                        title: c.title,
                        tags: c.tags,
                    },
                )
            })
            .collect();
        Ok(ChampionList {
            version: dto.version,
            champions,
            fetched_at: Utc::now(),
        })
    }

    async fn fetch_free_rotation(&self) -> Result<FreeRotation> {
        let url = Self::url(
            &self.platform_base_url,
            &["lol", "platform", "v3", "champion-rotations"],
        )?;
        let dto: FreeRotationDto = self.get_json(url, "fetch_free_rotation", true).await?;
        Ok(FreeRotation {
            free_champion_ids: dto.free_champion_ids,
            free_champion_ids_for_new_players: dto.free_champion_ids_for_new_players,
            max_new_player_level: dto.max_new_player_level,
            fetched_at: Utc::now(),
        })
    }

    async fn fetch_summoner_by_name(&self, name: &str) -> Result<Summoner> {
        let url = Self::url(
            &self.platform_base_url,
            &["lol", "summoner", "v4", "summoners", "by-name", name],
        )?;
        let dto: SummonerDto = self.get_json(url, "fetch_summoner", true).await?;
        Ok(dto.into_summoner())
    }

    async fn fetch_summoner_by_summoner_id(&self, summoner_id: &str) -> Result<Summoner> {
        let url = Self::url(
            &self.platform_base_url,
            &["lol", "summoner", "v4", "summoners", summoner_id],
        )?;
        let dto: SummonerDto = self.get_json(url, "fetch_summoner", true).await?;
        Ok(dto.into_summoner())
    }

    async fn fetch_summoner_by_account_id(&self, account_id: &str) -> Result<Summoner> {
        let url = Self::url(
            &self.platform_base_url,
            &["lol", "summoner", "v4", "summoners", "by-account", account_id],
        )?;
        let dto: SummonerDto = self.get_json(url, "fetch_summoner", true).await?;
        Ok(dto.into_summoner())
    }

    async fn fetch_summoner_by_puuid(&self, puuid: &str) -> Result<Summoner> {
        let url = Self::url(
            &self.platform_base_url,
            &["lol", "summoner", "v4", "summoners", "by-puuid", puuid],
        )?;
        let dto: SummonerDto = self.get_json(url, "fetch_summoner", true).await?;
        Ok(dto.into_summoner())
    }

    async fn fetch_league_by_queue(&self, tier: LeagueTier, queue: &str) -> Result<League> {
        let endpoint = match tier {
            LeagueTier::Challenger => "challengerleagues",
            LeagueTier::Grandmaster => "grandmasterleagues",
            LeagueTier::Master => "masterleagues",
        };
        let url = Self::url(
            &self.platform_base_url,
            &["lol", "league", "v4", endpoint, "by-queue", queue],
        )?;
        let dto: LeagueDto = self.get_json(url, "fetch_league", true).await?;
        Ok(League {
            tier,
            queue: queue.to_owned(),
            name: dto.name,
            entries: dto
                .entries
                .into_iter()
                .map(|e| LeagueEntry {
                    summoner_id: e.summoner_id,
                    summoner_name: e.summoner_name,
                    rank: e.rank,
                    league_points: e.league_points,
                    wins: e.wins,
                    losses: e.losses,
                })
                .collect(),
            fetched_at: Utc::now(),
        })
    }

    async fn fetch_matches_page(
        &self,
        account_id: &str,
        begin_index: u32,
        end_index: u32,
    ) -> Result<MatchlistPage> {
        let mut url = Self::url(
            &self.platform_base_url,
            &["lol", "match", "v4", "matchlists", "by-account", account_id],
        )?;
        url.query_pairs_mut()
            .append_pair("beginIndex", &begin_index.to_string())
            .append_pair("endIndex", &end_index.to_string());
        let dto: MatchlistDto = self.get_json(url, "fetch_matches_page", true).await?;
        Ok(MatchlistPage {
            matches: dto
                .matches
                .into_iter()
                .map(|m| MatchReference {
                    game_id: m.game_id,
                    platform_id: m.platform_id,
                    champion_id: m.champion,
                    queue_id: m.queue,
                    season_id: m.season,
                    timestamp_ms: m.timestamp,
                })
                .collect(),
            start_index: dto.start_index,
            end_index: dto.end_index,
            total_games: dto.total_games,
        })
    }

    async fn fetch_match(&self, game_id: i64) -> Result<MatchRecord> {
        let url = Self::url(
            &self.platform_base_url,
            &["lol", "match", "v4", "matches", &game_id.to_string()],
        )?;
        let dto: MatchDto = self.get_json(url, "fetch_match", true).await?;
        dto.into_record()
    }

    async fn fetch_match_timeline(&self, game_id: i64) -> Result<MatchTimeline> {
        let url = Self::url(
            &self.platform_base_url,
            &["lol", "match", "v4", "timelines", "by-match", &game_id.to_string()],
        )?;
        let dto: TimelineDto = self.get_json(url, "fetch_match_timeline", true).await?;
        Ok(MatchTimeline {
            game_id,
            // The timeline endpoint does not echo the platform; Storage
            // stamps it from the lookup key before persisting.
            platform_id: String::new(),
            frame_interval: dto.frame_interval,
            frames: dto
                .frames
                .into_iter()
                .map(|f| TimelineFrame {
                    timestamp_ms: f.timestamp,
                    events: f.events,
                })
                .collect(),
            fetched_at: Utc::now(),
        })
    }

    async fn fetch_items(&self, game_version: &str, language: &str) -> Result<ItemList> {
        let dto: ItemCatalogDto = self
            .ddragon_catalog(game_version, language, "item.json", "fetch_items")
            .await?;
        Ok(ItemList {
            game_version: game_version.to_owned(),
            language: language.to_owned(),
            items: dto
                .data
                .into_iter()
                .map(|(key, item)| {
                    (
                        key.clone(),
                        Item {
                            key,
                            name: item.name,
                            plaintext: item.plaintext,
                        },
                    )
                })
                .collect(),
            fetched_at: Utc::now(),
        })
    }

    async fn fetch_summoner_spells(
        &self,
        game_version: &str,
        language: &str,
    ) -> Result<SummonerSpellList> {
        let dto: SpellCatalogDto = self
            .ddragon_catalog(game_version, language, "summoner.json", "fetch_summoner_spells")
            .await?;
        Ok(SummonerSpellList {
            game_version: game_version.to_owned(),
            language: language.to_owned(),
            spells: dto
                .data
                .into_values()
                .map(|s| {
                    (
                        s.key.clone(),
                        SummonerSpell {
                            key: s.key,
                            name: s.name,
                            summoner_level: s.summoner_level,
                        },
                    )
                })
                .collect(),
            fetched_at: Utc::now(),
        })
    }

    async fn fetch_runes_reforged(
        &self,
        game_version: &str,
        language: &str,
    ) -> Result<RunesReforgedList> {
        let trees: Vec<RuneTreeDto> = self
            .ddragon_catalog(game_version, language, "runesReforged.json", "fetch_runes_reforged")
            .await?;
        Ok(RunesReforgedList {
            game_version: game_version.to_owned(),
            language: language.to_owned(),
            trees: trees
                .into_iter()
                .map(|t| RuneTree {
                    id: t.id,
                    key: t.key,
                    name: t.name,
                })
                .collect(),
            fetched_at: Utc::now(),
        })
    }
}

// ============================================================================
// Wire DTOs
// ============================================================================

#[derive(Deserialize)]
struct ChampionCatalogDto {
    version: String,
    data: HashMap<String, ChampionDto>,
}

#[derive(Deserialize)]
struct ChampionDto {
    id: String,
    key: String,
    name: String,
    title: String,
    #[serde(default)]
    tags: Vec<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct FreeRotationDto {
    free_champion_ids: Vec<i64>,
    free_champion_ids_for_new_players: Vec<i64>,
    max_new_player_level: i64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SummonerDto {
    id: String,
    account_id: String,
    puuid: String,
    name: String,
    profile_icon_id: i32,
    revision_date: i64,
    summoner_level: i64,
}

impl SummonerDto {
    fn into_summoner(self) -> Summoner {
        Summoner {
            name: self.name,
            summoner_id: self.id,
            account_id: self.account_id,
            puuid: self.puuid,
            profile_icon_id: self.profile_icon_id,
            summoner_level: self.summoner_level,
            revision_date: self.revision_date,
            fetched_at: Utc::now(),
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LeagueDto {
    name: String,
    entries: Vec<LeagueEntryDto>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LeagueEntryDto {
    summoner_id: String,
    summoner_name: String,
    rank: String,
    league_points: i32,
    wins: i32,
    losses: i32,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct MatchlistDto {
    matches: Vec<MatchReferenceDto>,
    #[serde(default)]
    start_index: u32,
    #[serde(default)]
    end_index: u32,
    #[serde(default)]
    total_games: u32,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct MatchReferenceDto {
    game_id: i64,
    platform_id: String,
    champion: i32,
    queue: i32,
    season: i32,
    timestamp: i64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct MatchDto {
    game_id: i64,
    platform_id: String,
    game_creation: i64,
    game_duration: i64,
    queue_id: i32,
    map_id: i32,
    game_version: String,
    participants: Vec<ParticipantDto>,
    participant_identities: Vec<ParticipantIdentityDto>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ParticipantDto {
    participant_id: i32,
    champion_id: i32,
    team_id: i32,
    stats: ParticipantStatsDto,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ParticipantStatsDto {
    win: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ParticipantIdentityDto {
    participant_id: i32,
    player: PlayerDto,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlayerDto {
    account_id: String,
    #[serde(default)]
    summoner_id: Option<String>,
    #[serde(default)]
    summoner_name: Option<String>,
}

impl MatchDto {
    /// Join `participants` with `participantIdentities` on participant id.
    fn into_record(self) -> Result<MatchRecord> {
        let mut identities: HashMap<i32, PlayerDto> = self
            .participant_identities
            .into_iter()
            .map(|i| (i.participant_id, i.player))
            .collect();
        let participants = self
            .participants
            .into_iter()
            .map(|p| {
                let player = identities.remove(&p.participant_id).ok_or_else(|| {
                    FafnirError::Data(format!(
                        "match {} has no identity for participant {}",
                        self.game_id, p.participant_id
                    ))
                })?;
                Ok(Participant {
                    account_id: player.account_id,
                    summoner_id: player.summoner_id,
                    summoner_name: player.summoner_name,
                    champion_id: p.champion_id,
                    team_id: p.team_id,
                    win: p.stats.win,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(MatchRecord {
            game_id: self.game_id,
            platform_id: self.platform_id,
            game_creation: self.game_creation,
            game_duration: self.game_duration,
            queue_id: self.queue_id,
            map_id: self.map_id,
            game_version: self.game_version,
            participants,
            fetched_at: Utc::now(),
        })
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TimelineDto {
    frame_interval: i64,
    frames: Vec<TimelineFrameDto>,
}

#[derive(Deserialize)]
struct TimelineFrameDto {
    timestamp: i64,
    #[serde(default)]
    events: Vec<serde_json::Value>,
}

#[derive(Deserialize)]
struct ItemCatalogDto {
    data: HashMap<String, ItemDto>,
}

#[derive(Deserialize)]
struct ItemDto {
    name: String,
    #[serde(default)]
    plaintext: String,
}

#[derive(Deserialize)]
struct SpellCatalogDto {
    data: HashMap<String, SpellDto>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SpellDto {
    key: String,
    name: String,
    #[serde(default)]
    summoner_level: i32,
}

#[derive(Deserialize)]
struct RuneTreeDto {
    id: i32,
    key: String,
    name: String,
}
