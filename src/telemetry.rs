//! Telemetry metric name constants.
//!
//! Centralised metric names for heimdall operations. Consumers install
//! their own `metrics` recorder (e.g. prometheus, statsd); without a
//! recorder installed, all metric calls are no-ops.
//!
//! # Metric naming conventions
//!
//! All metrics are prefixed with `heimdall_`. Counters end in `_total`,
//! histograms use meaningful units (e.g. `_seconds`).
//!
//! # Common labels
//!
//! - `host`: upstream host the fetcher talked to
//! - `source`: collector / cache source name (e.g. "neo", "iss")
//! - `status`: outcome: "ok" or "error"
//! - `outcome`: read-path result: "fresh", "refreshed", "stale", "no_data"

/// Total upstream HTTP attempts (including retries).
///
/// Labels: `host`, `status` ("ok" | "error").
pub const UPSTREAM_REQUESTS_TOTAL: &str = "heimdall_upstream_requests_total";

/// Upstream call duration in seconds, across all attempts of one fetch.
///
/// Labels: `host`.
pub const UPSTREAM_DURATION_SECONDS: &str = "heimdall_upstream_duration_seconds";

/// Total retry attempts (not counting the initial request).
///
/// Labels: `host`.
pub const RETRIES_TOTAL: &str = "heimdall_retries_total";

/// Total collector runs.
///
/// Labels: `source`, `status` ("ok" | "error").
pub const COLLECTIONS_TOTAL: &str = "heimdall_collections_total";

/// Rows removed by retention trimming.
///
/// Labels: `source`.
pub const TRIMMED_ROWS_TOTAL: &str = "heimdall_trimmed_rows_total";

/// Read-path lookups of cached snapshots.
///
/// Labels: `source`, `outcome` ("fresh" | "refreshed" | "stale" | "no_data").
pub const READS_TOTAL: &str = "heimdall_reads_total";
