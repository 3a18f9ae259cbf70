//! Telemetry metric name constants.
//!
//! Centralised metric names for fafnir operations. Consumers install their
//! own `metrics` recorder (e.g. prometheus, statsd); without a recorder
//! installed, all metric calls are no-ops.
//!
//! # Metric naming conventions
//!
//! All metrics are prefixed with `fafnir_`. Counters end in `_total`.
//!
//! # Common labels
//!
//! - `category` — cached entity category (e.g. "champions", "summoner")
//! - `operation` — upstream call invoked (e.g. "fetch_match")
//! - `status` — outcome: "ok" or "error"
//! - `worker` — background worker name ("free_rotation", "summoner_matches")

/// Total cache hits served without an upstream call.
///
/// Labels: `category`.
pub const CACHE_HITS_TOTAL: &str = "fafnir_cache_hits_total";

/// Total cache misses (absent or stale entries).
///
/// Labels: `category`.
pub const CACHE_MISSES_TOTAL: &str = "fafnir_cache_misses_total";

/// Total refreshes written back through the backend.
///
/// Labels: `category`, `status` ("ok" | "error").
pub const CACHE_REFRESHES_TOTAL: &str = "fafnir_cache_refreshes_total";

/// Total requests dispatched to the upstream API.
///
/// Labels: `operation`, `status` ("ok" | "error").
pub const UPSTREAM_REQUESTS_TOTAL: &str = "fafnir_upstream_requests_total";

/// Total retry attempts against the upstream API (not counting the
/// initial request).
///
/// Labels: `operation`.
pub const UPSTREAM_RETRIES_TOTAL: &str = "fafnir_upstream_retries_total";

/// Total worker cycles.
///
/// Labels: `worker`, `outcome` ("completed" | "cancelled").
pub const WORKER_CYCLES_TOTAL: &str = "fafnir_worker_cycles_total";

/// Total matches newly stored by the backfill traversal.
pub const MATCHES_STORED_TOTAL: &str = "fafnir_matches_stored_total";
