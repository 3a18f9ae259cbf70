//! Free rotation worker.
//!
//! Unconditionally force-refreshes the free rotation through the entity
//! cache every cycle, then sleeps for the configured interval.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::{CycleOutcome, wait_interruptible};
use crate::storage::Storage;
use crate::telemetry;

pub(super) async fn run(storage: Arc<Storage>, interval: Duration, cancel: CancellationToken) {
    info!(interval_secs = interval.as_secs(), "free rotation worker started");
    loop {
        match storage.free_rotation(true).await {
            Ok(rotation) => {
                debug!(
                    champions = rotation.free_champion_ids.len(),
                    "free rotation refreshed"
                );
            }
            Err(e) => warn!(error = %e, "free rotation refresh failed"),
        }
        metrics::counter!(telemetry::WORKER_CYCLES_TOTAL,
            "worker" => "free_rotation",
            "outcome" => CycleOutcome::Completed.as_str(),
        )
        .increment(1);

        if wait_interruptible(&cancel, interval).await {
            break;
        }
    }
    info!("free rotation worker stopping");
}
