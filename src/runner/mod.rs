//! Background fetch workers and their supervisor.
//!
//! [`FetchRunner`] owns the worker lifecycle: `start()` spawns one tokio
//! task per worker against a shared [`CancellationToken`]; `stop()`
//! cancels the token and joins every task before returning. Both are
//! no-ops when already in the requested state.
//!
//! Cancellation is cooperative: workers observe the token at their
//! checkpoints (between pages, between accounts, and inside the
//! interval wait, which is sliced at one-second resolution), so shutdown
//! latency is bounded by any in-flight I/O plus roughly a second.

mod matches;
mod rotation;

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::Result;
use crate::config::RunnerConfig;
use crate::storage::Storage;

/// How one worker cycle ended. Cancellation is a normal outcome, not an
/// error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    Completed,
    Cancelled,
}

impl CycleOutcome {
    fn as_str(self) -> &'static str {
        match self {
            CycleOutcome::Completed => "completed",
            CycleOutcome::Cancelled => "cancelled",
        }
    }
}

/// Supervisor for the discovery/backfill workers.
///
/// State machine: stopped → running → stopped.
pub struct FetchRunner {
    storage: Arc<Storage>,
    config: RunnerConfig,
    cancel: Option<CancellationToken>,
    handles: Vec<JoinHandle<()>>,
}

impl std::fmt::Debug for FetchRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetchRunner")
            .field("config", &self.config)
            .field("cancel", &self.cancel)
            .field("handles", &self.handles.len())
            .finish_non_exhaustive()
    }
}

impl FetchRunner {
    /// Create a supervisor. Fails fast on invalid worker configuration
    /// (zero intervals, a version gate without a version) — nothing is
    /// deferred to run time.
    pub fn new(storage: Arc<Storage>, config: RunnerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            storage,
            config,
            cancel: None,
            handles: Vec::new(),
        })
    }

    /// Launch the workers. No-op if already running.
    ///
    /// Must be called within a tokio runtime.
    pub fn start(&mut self) {
        if self.cancel.is_some() {
            debug!("fetch runner already running");
            return;
        }
        info!(
            matches_interval_minutes = self.config.matches_interval_minutes,
            rotation_interval_minutes = self.config.rotation_interval_minutes,
            "fetch runner starting"
        );
        let cancel = CancellationToken::new();

        let rotation_interval = Duration::from_secs(self.config.rotation_interval_minutes * 60);
        self.handles.push(tokio::spawn(rotation::run(
            Arc::clone(&self.storage),
            rotation_interval,
            cancel.clone(),
        )));

        let worker = matches::SummonerMatchesWorker::new(
            Arc::clone(&self.storage),
            self.config.clone(),
            cancel.clone(),
        );
        self.handles.push(tokio::spawn(worker.run()));

        self.cancel = Some(cancel);
    }

    /// Signal every worker to stop and wait for all of them to exit.
    /// No-op if already stopped.
    pub async fn stop(&mut self) {
        let Some(cancel) = self.cancel.take() else {
            debug!("fetch runner already stopped");
            return;
        };
        info!("fetch runner stopping");
        cancel.cancel();
        for handle in self.handles.drain(..) {
            if let Err(e) = handle.await {
                error!(error = %e, "worker task panicked");
            }
        }
        info!("fetch runner stopped");
    }

    /// Whether the workers are currently running.
    pub fn is_running(&self) -> bool {
        self.cancel.is_some()
    }
}

/// Wait for `duration` in one-second slices, returning `true` as soon as
/// the token is cancelled and `false` once the full duration elapsed.
pub(crate) async fn wait_interruptible(cancel: &CancellationToken, duration: Duration) -> bool {
    let mut remaining = duration;
    while !remaining.is_zero() {
        let slice = remaining.min(Duration::from_secs(1));
        tokio::select! {
            _ = cancel.cancelled() => return true,
            _ = tokio::time::sleep(slice) => {}
        }
        remaining -= slice;
    }
    false
}
