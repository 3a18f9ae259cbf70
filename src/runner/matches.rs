//! Summoner matches worker.
//!
//! Each cycle walks the configured population and backfills match
//! history through the entity cache:
//!
//! 1. every explicitly configured summoner name, harvesting other
//!    participants' account ids into a run-scoped *seen* set;
//! 2. every configured (league tier × queue) pair, resolving each entry
//!    to an account id and accumulating a deduplicated *primary* set;
//! 3. pagination over every primary account, harvesting into *seen*;
//! 4. primary accounts are subtracted from *seen*;
//! 5. optionally, one pagination pass over the remaining *seen* accounts
//!    with no further harvesting — discovery expands a single hop.
//!
//! A stop signal observed anywhere aborts the remainder of the cycle
//! (already-stored matches are kept); individual fetch failures are
//! logged and skipped, never aborting the cycle.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::{CycleOutcome, wait_interruptible};
use crate::config::RunnerConfig;
use crate::storage::Storage;
use crate::telemetry;

/// Upstream match history page size.
const PAGE_SIZE: u32 = 100;

/// How one account's pagination ended.
enum Paging {
    Done,
    Cancelled,
}

pub(super) struct SummonerMatchesWorker {
    storage: Arc<Storage>,
    config: RunnerConfig,
    cancel: CancellationToken,
}

impl SummonerMatchesWorker {
    pub(super) fn new(
        storage: Arc<Storage>,
        config: RunnerConfig,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            storage,
            config,
            cancel,
        }
    }

    pub(super) async fn run(self) {
        let interval = Duration::from_secs(self.config.matches_interval_minutes * 60);
        info!(
            interval_secs = interval.as_secs(),
            summoners = self.config.summoners.len(),
            leagues = self.config.league_tiers.len(),
            queues = self.config.queues.len(),
            "summoner matches worker started"
        );
        loop {
            let outcome = self.cycle().await;
            metrics::counter!(telemetry::WORKER_CYCLES_TOTAL,
                "worker" => "summoner_matches",
                "outcome" => outcome.as_str(),
            )
            .increment(1);
            if outcome == CycleOutcome::Cancelled {
                debug!("cycle cancelled, returning to wait loop");
            }

            if wait_interruptible(&self.cancel, interval).await {
                break;
            }
        }
        info!("summoner matches worker stopping");
    }

    async fn cycle(&self) -> CycleOutcome {
        let mut seen: HashSet<String> = HashSet::new();

        // Pass 1: explicitly configured summoners.
        for name in &self.config.summoners {
            if self.cancel.is_cancelled() {
                return CycleOutcome::Cancelled;
            }
            let account_id = match self.storage.summoner_by_name(name, false).await {
                Ok(summoner) => summoner.account_id,
                Err(e) => {
                    warn!(summoner = %name, error = %e, "skipping summoner");
                    continue;
                }
            };
            if let Paging::Cancelled = self.backfill_account(&account_id, Some(&mut seen)).await {
                return CycleOutcome::Cancelled;
            }
        }

        // Pass 2: league standings, accumulated into a primary set that
        // is deduplicated across all (tier, queue) pairs.
        let mut primary: HashSet<String> = HashSet::new();
        for tier in &self.config.league_tiers {
            for queue in &self.config.queues {
                if self.cancel.is_cancelled() {
                    return CycleOutcome::Cancelled;
                }
                let league = match self.storage.league(*tier, queue, false).await {
                    Ok(league) => league,
                    Err(e) => {
                        warn!(%tier, queue, error = %e, "skipping league");
                        continue;
                    }
                };
                for entry in &league.entries {
                    if self.cancel.is_cancelled() {
                        return CycleOutcome::Cancelled;
                    }
                    match self
                        .storage
                        .summoner_by_summoner_id(&entry.summoner_id, false)
                        .await
                    {
                        Ok(summoner) => {
                            primary.insert(summoner.account_id);
                        }
                        Err(e) => {
                            warn!(summoner = %entry.summoner_name, error = %e, "skipping league entry");
                        }
                    }
                }
            }
        }
        debug!(accounts = primary.len(), "primary account set resolved");

        // Pass 3: backfill every primary account, still harvesting.
        for account_id in &primary {
            if self.cancel.is_cancelled() {
                return CycleOutcome::Cancelled;
            }
            if let Paging::Cancelled = self.backfill_account(account_id, Some(&mut seen)).await {
                return CycleOutcome::Cancelled;
            }
        }

        // Pass 4: whatever pass 3 already covered is dropped from seen.
        for account_id in &primary {
            seen.remove(account_id);
        }

        // Pass 5: one hop into discovered accounts, no further harvest.
        if self.config.expand_seen_summoners {
            debug!(accounts = seen.len(), "expanding into seen accounts");
            for account_id in &seen {
                if self.cancel.is_cancelled() {
                    return CycleOutcome::Cancelled;
                }
                if let Paging::Cancelled = self.backfill_account(account_id, None).await {
                    return CycleOutcome::Cancelled;
                }
            }
        }

        CycleOutcome::Completed
    }

    /// Pull an account's match history in pages of [`PAGE_SIZE`],
    /// stopping at a short page, the configured cap (zero = all), the
    /// version gate, or cancellation.
    ///
    /// When `harvest` is given, every participant other than the subject
    /// account is recorded for the one-hop expansion pass.
    async fn backfill_account(
        &self,
        account_id: &str,
        mut harvest: Option<&mut HashSet<String>>,
    ) -> Paging {
        let cap = self.config.matches_per_account;
        let mut fetched: u32 = 0;
        let mut begin: u32 = 0;
        loop {
            if self.cancel.is_cancelled() {
                return Paging::Cancelled;
            }
            let page = match self
                .storage
                .matches_page(account_id, begin, begin + PAGE_SIZE)
                .await
            {
                Ok(page) => page,
                Err(e) => {
                    warn!(account = account_id, begin, error = %e, "skipping match history page");
                    return Paging::Done;
                }
            };
            let page_len = page.matches.len();

            for reference in &page.matches {
                if self.cancel.is_cancelled() {
                    return Paging::Cancelled;
                }
                if cap > 0 && fetched >= cap {
                    return Paging::Done;
                }
                let record = match self
                    .storage
                    .match_record(reference.game_id, &reference.platform_id)
                    .await
                {
                    Ok(record) => record,
                    Err(e) => {
                        warn!(game_id = reference.game_id, error = %e, "skipping match");
                        continue;
                    }
                };
                fetched += 1;

                if self.config.fetch_only_latest_game_version {
                    if let Some(latest) = &self.config.latest_game_version {
                        if !same_major_minor(&record.game_version, latest) {
                            debug!(
                                account = account_id,
                                version = %record.game_version,
                                "older game version reached, stopping backfill"
                            );
                            return Paging::Done;
                        }
                    }
                }

                if let Some(seen) = harvest.as_deref_mut() {
                    for participant in &record.participants {
                        if participant.account_id != account_id {
                            seen.insert(participant.account_id.clone());
                        }
                    }
                }
            }

            if page_len < PAGE_SIZE as usize {
                return Paging::Done;
            }
            begin += PAGE_SIZE;
        }
    }
}

/// Whether two game versions share major.minor (patch-level differences
/// do not count as a different patch for the backfill gate).
fn same_major_minor(version: &str, latest: &str) -> bool {
    fn major_minor(v: &str) -> (&str, &str) {
        let mut parts = v.split('.');
        (parts.next().unwrap_or(""), parts.next().unwrap_or(""))
    }
    major_minor(version) == major_minor(latest)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_gate_compares_major_minor_only() {
        assert!(same_major_minor("14.3.558.1934", "14.3"));
        assert!(same_major_minor("14.3.1", "14.3.9999"));
        assert!(!same_major_minor("14.2.558.1934", "14.3"));
        assert!(!same_major_minor("13.3.1", "14.3"));
    }
}
