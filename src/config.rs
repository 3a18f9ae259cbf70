//! Configuration loading.
//!
//! Configuration is a single TOML file. The daemon passes its path via
//! `--config`; library consumers can also build a [`Config`] directly or
//! parse one with [`Config::from_toml`].
//!
//! Every field has a default, so an empty file is a valid configuration
//! for a memory-backed deployment. Validation runs on every load path;
//! invalid values (zero worker intervals, a game-version gate without a
//! version) are fatal before anything starts.

use std::path::Path;

use serde::Deserialize;

use crate::types::LeagueTier;
use crate::{FafnirError, Result};

/// Top-level configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub upstream: UpstreamConfig,
    #[serde(default)]
    pub cache: CacheMaxAges,
    #[serde(default)]
    pub runner: RunnerConfig,
}

impl Config {
    /// Load and validate configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            FafnirError::Configuration(format!(
                "cannot read config file {}: {e}",
                path.as_ref().display()
            ))
        })?;
        Self::from_toml(&raw)
    }

    /// Parse and validate configuration from a TOML string.
    pub fn from_toml(raw: &str) -> Result<Self> {
        let config: Config = toml::from_str(raw)
            .map_err(|e| FafnirError::Configuration(format!("invalid config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Check cross-field invariants.
    pub fn validate(&self) -> Result<()> {
        self.runner.validate()
    }
}

/// Which storage backend to construct.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    #[default]
    Memory,
    Mongo,
}

/// Storage backend selection and connection settings.
#[derive(Debug, Clone, Deserialize)]
pub struct BackendConfig {
    #[serde(default)]
    pub kind: BackendKind,
    /// Connection string for the document store.
    #[serde(default = "default_mongo_uri")]
    pub uri: String,
    #[serde(default = "default_mongo_database")]
    pub database: String,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            kind: BackendKind::Memory,
            uri: default_mongo_uri(),
            database: default_mongo_database(),
        }
    }
}

fn default_mongo_uri() -> String {
    "mongodb://localhost:27017".to_string()
}

fn default_mongo_database() -> String {
    "fafnir".to_string()
}

/// Upstream API client settings.
#[derive(Debug, Clone, Deserialize)]
pub struct UpstreamConfig {
    /// API key sent with every platform request.
    #[serde(default)]
    pub api_key: String,
    /// Platform host (default: EUW).
    #[serde(default = "default_platform_base_url")]
    pub platform_base_url: String,
    /// Static-data host.
    #[serde(default = "default_ddragon_base_url")]
    pub ddragon_base_url: String,
    /// Language for static catalogs.
    #[serde(default = "default_language")]
    pub language: String,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            platform_base_url: default_platform_base_url(),
            ddragon_base_url: default_ddragon_base_url(),
            language: default_language(),
        }
    }
}

fn default_platform_base_url() -> String {
    "https://euw1.api.riotgames.com".to_string()
}

fn default_ddragon_base_url() -> String {
    "https://ddragon.leagueoflegends.com".to_string()
}

fn default_language() -> String {
    "en_US".to_string()
}

/// Per-category maximum age, in minutes, before a cached entity must be
/// refetched. Zero means "always refetch".
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct CacheMaxAges {
    #[serde(default = "default_champions_max_age")]
    pub champions_max_age_minutes: i64,
    #[serde(default = "default_rotation_max_age")]
    pub free_rotation_max_age_minutes: i64,
    #[serde(default = "default_summoner_max_age")]
    pub summoner_max_age_minutes: i64,
    #[serde(default = "default_league_max_age")]
    pub league_max_age_minutes: i64,
    #[serde(default = "default_statics_max_age")]
    pub statics_max_age_minutes: i64,
}

impl Default for CacheMaxAges {
    fn default() -> Self {
        Self {
            champions_max_age_minutes: default_champions_max_age(),
            free_rotation_max_age_minutes: default_rotation_max_age(),
            summoner_max_age_minutes: default_summoner_max_age(),
            league_max_age_minutes: default_league_max_age(),
            statics_max_age_minutes: default_statics_max_age(),
        }
    }
}

fn default_champions_max_age() -> i64 {
    2 * 24 * 60
}

fn default_rotation_max_age() -> i64 {
    60
}

fn default_summoner_max_age() -> i64 {
    24 * 60
}

fn default_league_max_age() -> i64 {
    2 * 60
}

fn default_statics_max_age() -> i64 {
    7 * 24 * 60
}

/// Background worker settings.
#[derive(Debug, Clone, Deserialize)]
pub struct RunnerConfig {
    /// Minutes between summoner-matches cycles. Must be > 0.
    #[serde(default = "default_matches_interval")]
    pub matches_interval_minutes: u64,
    /// Minutes between free-rotation refreshes. Must be > 0.
    #[serde(default = "default_rotation_interval")]
    pub rotation_interval_minutes: u64,
    /// Summoner names whose match history is backfilled every cycle.
    #[serde(default)]
    pub summoners: Vec<String>,
    /// League tiers traversed for account discovery.
    #[serde(default)]
    pub league_tiers: Vec<LeagueTier>,
    /// Queues traversed for account discovery.
    #[serde(default)]
    pub queues: Vec<String>,
    /// Cap on matches pulled per account. Zero means "all".
    #[serde(default)]
    pub matches_per_account: u32,
    /// Whether to also backfill accounts discovered as match participants
    /// (one hop, no transitive expansion).
    #[serde(default)]
    pub expand_seen_summoners: bool,
    /// Stop a summoner's backfill at the first match from an older patch.
    #[serde(default)]
    pub fetch_only_latest_game_version: bool,
    /// Patch the gate compares against (major.minor is what counts).
    #[serde(default)]
    pub latest_game_version: Option<String>,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            matches_interval_minutes: default_matches_interval(),
            rotation_interval_minutes: default_rotation_interval(),
            summoners: Vec::new(),
            league_tiers: Vec::new(),
            queues: Vec::new(),
            matches_per_account: 0,
            expand_seen_summoners: false,
            fetch_only_latest_game_version: false,
            latest_game_version: None,
        }
    }
}

impl RunnerConfig {
    /// Check worker invariants. Called at config load and again by
    /// `FetchRunner::new`, so a hand-built config cannot sneak past.
    pub fn validate(&self) -> Result<()> {
        if self.matches_interval_minutes == 0 {
            return Err(FafnirError::Configuration(
                "runner.matches_interval_minutes must be greater than zero".into(),
            ));
        }
        if self.rotation_interval_minutes == 0 {
            return Err(FafnirError::Configuration(
                "runner.rotation_interval_minutes must be greater than zero".into(),
            ));
        }
        if self.fetch_only_latest_game_version && self.latest_game_version.is_none() {
            return Err(FafnirError::Configuration(
                "runner.latest_game_version is required when \
                 fetch_only_latest_game_version is set"
                    .into(),
            ));
        }
        Ok(())
    }
}

fn default_matches_interval() -> u64 {
    120
}

fn default_rotation_interval() -> u64 {
    60
}
