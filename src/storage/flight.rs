//! Per-key serialization of cache refreshes.
//!
//! Concurrent requests for the same stale key must not both hit the
//! upstream and double-write the backend. [`FlightLocks`] hands out one
//! async mutex per refresh key; the caller re-checks the backend after
//! acquiring the lock, so followers of a completed refresh see the fresh
//! copy instead of refetching.
//!
//! Entries are never removed: the key space is bounded by the configured
//! population (summoner names, league pairs, catalog keys), so the map
//! stays small for the life of the process.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard};

#[derive(Default)]
pub(crate) struct FlightLocks {
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl FlightLocks {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Acquire the refresh lock for `key`, creating it on first use.
    pub(crate) async fn acquire(&self, key: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().await;
            Arc::clone(locks.entry(key.to_owned()).or_default())
        };
        lock.lock_owned().await
    }
}
