//! Collectors: one unit of work per source that fetches upstream data and
//! writes it into a store.
//!
//! A collector exposes two entry points:
//!
//! - [`Collector::collect()`] does the work and returns what happened, so the
//!   refresh path and the manual trigger can report the failure message.
//! - [`Collector::run()`] is the fire-and-forget wrapper used by the
//!   scheduler: it logs and counts the outcome and always returns normally.
//!   A failed collection degrades freshness, never availability.

mod catalog;
mod position;
mod snapshot;

use async_trait::async_trait;
use tracing::{error, info};

use crate::Result;
use crate::telemetry;

pub use catalog::{CatalogCollector, DEFAULT_CATALOG_LIMIT};
pub use position::PositionCollector;
pub use snapshot::{SnapshotCollector, SourceEndpoint};

/// Outcome of one successful collection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CollectReport {
    /// Rows appended or upserted.
    pub written: usize,
    /// Rows removed by retention trimming afterwards.
    pub trimmed: usize,
    /// Items skipped because they could not be shaped or stored.
    pub failed: usize,
}

/// Fetches one source's data and writes it into the store.
#[async_trait]
pub trait Collector: Send + Sync {
    /// Source / job name used in logs, metrics and the refresh status map.
    fn name(&self) -> &str;

    /// Fetch, shape, write, trim. Errors are returned, not logged.
    async fn collect(&self) -> Result<CollectReport>;

    /// Run [`collect()`](Self::collect) and absorb any failure.
    async fn run(&self) {
        let source = self.name().to_owned();
        match self.collect().await {
            Ok(report) => {
                metrics::counter!(telemetry::COLLECTIONS_TOTAL,
                    "source" => source.clone(),
                    "status" => "ok",
                )
                .increment(1);
                info!(
                    source = %source,
                    written = report.written,
                    trimmed = report.trimmed,
                    failed = report.failed,
                    "collection complete"
                );
            }
            Err(e) => {
                metrics::counter!(telemetry::COLLECTIONS_TOTAL,
                    "source" => source.clone(),
                    "status" => "error",
                )
                .increment(1);
                error!(source = %source, error = %e, "collection failed");
            }
        }
    }
}

/// Count rows removed by retention trimming.
pub(crate) fn record_trimmed(source: &str, removed: usize) {
    if removed > 0 {
        metrics::counter!(telemetry::TRIMMED_ROWS_TOTAL, "source" => source.to_owned())
            .increment(removed as u64);
    }
}
