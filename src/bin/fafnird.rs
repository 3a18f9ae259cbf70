//! fafnird — Fafnir daemon.
//!
//! Runs the discovery/backfill workers against the configured backend
//! until interrupted, then shuts them down gracefully.

use std::sync::Arc;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use fafnir::{Config, FetchRunner, RiotClient, Storage, backend};

/// Fafnir daemon — League of Legends statistics cache and backfill.
#[derive(Parser)]
#[command(name = "fafnird")]
#[command(version)]
#[command(about = "Fafnir cache and backfill daemon")]
struct Args {
    /// Path to configuration file.
    #[arg(short, long, default_value = "fafnir.toml")]
    config: std::path::PathBuf,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let config = Config::load(&args.config)?;

    let backend = backend::connect(&config.backend).await?;
    let upstream = Arc::new(RiotClient::from_config(&config.upstream));
    let storage = Arc::new(Storage::new(backend, upstream, config.cache));

    let mut runner = FetchRunner::new(Arc::clone(&storage), config.runner)?;
    runner.start();
    info!(config = %args.config.display(), "fafnird started");

    tokio::signal::ctrl_c().await?;
    info!("interrupt received, shutting down");
    runner.stop().await;

    info!(
        summoners = storage.summoner_count().await.unwrap_or(0),
        matches = storage.match_count().await.unwrap_or(0),
        "fafnird stopped"
    );
    Ok(())
}
