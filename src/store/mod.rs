//! Snapshot storage.
//!
//! Three logical tables, one trait each:
//!
//! - [`SnapshotStore`]: append-only cache snapshots per source, read back
//!   as "freshest within a TTL" or "latest regardless of age", trimmed to the
//!   newest K rows or by age.
//! - [`PositionStore`]: the orbital-telemetry time series, queried as
//!   latest / range and trimmed by a rolling age window.
//! - [`CatalogStore`]: keyed catalog entities written by upsert.
//!
//! Every mutation is either a pure insert or a keyed upsert, so concurrent
//! writers (a scheduled collector and an on-demand refresh for the same
//! source) may interleave freely. Implementations must offer read-your-writes:
//! the refresh path re-queries right after a collector's write.
//!
//! [`MemoryStore`] implements all three; [`persist`] dumps and restores it.

mod memory;
pub mod persist;
mod types;

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::Result;

pub use memory::MemoryStore;
pub use types::{CatalogFields, CatalogItem, Position, PositionRecord, Snapshot};

/// Append-only, per-source table of timestamped payload snapshots.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Most recent snapshot for `source` by `fetched_at`, of any age.
    async fn latest(&self, source: &str) -> Result<Option<Snapshot>>;

    /// Most recent snapshot with `fetched_at >= now - ttl`, or `None`.
    ///
    /// Never returns a snapshot older than `ttl`, even if it is the only one.
    async fn freshest_within(&self, source: &str, ttl: Duration) -> Result<Option<Snapshot>>;

    /// Insert a snapshot stamped with the current time.
    async fn append(&self, source: &str, payload: Value) -> Result<Snapshot> {
        self.append_at(source, payload, Utc::now()).await
    }

    /// Insert a snapshot with an explicit timestamp. Out-of-order writes are
    /// accepted; "latest" is always decided by `fetched_at`.
    async fn append_at(
        &self,
        source: &str,
        payload: Value,
        fetched_at: DateTime<Utc>,
    ) -> Result<Snapshot>;

    /// Delete all but the `keep` most recent rows for `source`. Returns the
    /// number of rows deleted.
    async fn trim_to_latest(&self, source: &str, keep: usize) -> Result<usize>;

    /// Delete rows for `source` strictly older than `now - window`. Returns
    /// the number of rows deleted.
    async fn trim_older_than(&self, source: &str, window: Duration) -> Result<usize>;

    /// Delete every row for `source`.
    async fn invalidate(&self, source: &str) -> Result<usize>;
}

/// Time-series table of orbital positions.
#[async_trait]
pub trait PositionStore: Send + Sync {
    async fn append_position(
        &self,
        position: Position,
        timestamp: DateTime<Utc>,
    ) -> Result<PositionRecord>;

    async fn latest_position(&self) -> Result<Option<PositionRecord>>;

    /// Records with `timestamp >= since`, newest first, at most `limit`.
    async fn range(&self, since: DateTime<Utc>, limit: usize) -> Result<Vec<PositionRecord>>;

    /// Delete records strictly older than `now - window`.
    async fn trim_positions_older_than(&self, window: Duration) -> Result<usize>;
}

/// Keyed table of catalog entities.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Insert on first sight of `external_id`, otherwise replace the mutable
    /// fields of the existing row (its `id` and `inserted_at` are kept).
    async fn upsert(&self, external_id: &str, fields: CatalogFields) -> Result<CatalogItem>;

    async fn get(&self, external_id: &str) -> Result<Option<CatalogItem>>;

    /// Most-recently-updated first, rows without `updated_at` last.
    async fn paged_list(&self, limit: usize, offset: usize) -> Result<Vec<CatalogItem>>;

    async fn count(&self) -> Result<usize>;
}

/// `now - window`, or `None` when the window reaches past the representable
/// range (in which case nothing is old enough to trim).
pub(crate) fn cutoff(now: DateTime<Utc>, window: Duration) -> Option<DateTime<Utc>> {
    chrono::Duration::from_std(window)
        .ok()
        .and_then(|w| now.checked_sub_signed(w))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cutoff_subtracts_window() {
        let now = Utc::now();
        let c = cutoff(now, Duration::from_secs(3600)).unwrap();
        assert_eq!(now - c, chrono::Duration::hours(1));
    }

    #[test]
    fn huge_window_has_no_cutoff() {
        assert!(cutoff(Utc::now(), Duration::MAX).is_none());
    }
}
