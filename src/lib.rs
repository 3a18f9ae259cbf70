//! Fafnir — fetch-through cache and match-history backfill engine for
//! League of Legends statistics.
//!
//! The crate ingests player and match data from the Riot API, caches it
//! with age-based invalidation across interchangeable storage backends,
//! and runs autonomous background workers that discover and backfill
//! match history for a configured population of players and leagues.
//!
//! Three layers, bottom up:
//!
//! - [`backend`] — typed get/store by natural key, in memory or in a
//!   document store; no freshness logic.
//! - [`storage`] — the entity cache: decides per request whether a
//!   cached copy is fresh enough to serve or must be refetched through
//!   the [`upstream`] capability and written back.
//! - [`runner`] — the supervisor and the periodic workers that walk
//!   league → summoner → account → match graphs.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use fafnir::{Config, FetchRunner, MemoryBackend, RiotClient, Storage};
//!
//! #[tokio::main]
//! async fn main() -> fafnir::Result<()> {
//!     let config = Config::load("fafnir.toml")?;
//!
//!     let backend = Arc::new(MemoryBackend::new());
//!     let upstream = Arc::new(RiotClient::from_config(&config.upstream));
//!     let storage = Arc::new(Storage::new(backend, upstream, config.cache));
//!
//!     let mut runner = FetchRunner::new(Arc::clone(&storage), config.runner)?;
//!     runner.start();
//!
//!     // ... serve requests from `storage` ...
//!
//!     runner.stop().await;
//!     Ok(())
//! }
//! ```

pub mod backend;
pub mod config;
pub mod error;
pub mod runner;
pub mod storage;
pub mod telemetry;
pub mod types;
pub mod upstream;

// Re-export main types at crate root
pub use backend::{Backend, MatchCursor, MemoryBackend, MongoBackend};
pub use config::{BackendKind, CacheMaxAges, Config, RunnerConfig, UpstreamConfig};
pub use error::{FafnirError, Result};
pub use runner::{CycleOutcome, FetchRunner};
pub use storage::Storage;
pub use upstream::{RetryConfig, RiotClient, UpstreamApi};

// Re-export the entity model
pub use types::{
    Champion, ChampionList, FreeRotation, Item, ItemList, League, LeagueEntry, LeagueTier,
    MatchRecord, MatchReference, MatchTimeline, MatchlistPage, Participant, RuneTree,
    RunesReforgedList, Summoner, SummonerSpell, SummonerSpellList, TimelineFrame,
    normalize_summoner_name,
};
