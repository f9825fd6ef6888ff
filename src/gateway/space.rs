//! SpaceGateway - the refresh-and-freshness read path

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use futures_util::future::join_all;
use tracing::{debug, warn};

use crate::collect::Collector;
use crate::config::ScheduleConfig;
use crate::scheduler::Job;
use crate::source::Source;
use crate::store::{CatalogItem, CatalogStore, PositionRecord, PositionStore, SnapshotStore};
use crate::telemetry;
use crate::{
    CatalogPage, HeimdallError, LatestSnapshot, RefreshStatus, Result, SpaceDataGateway, Trend,
};

pub(crate) const MAX_TREND_HOURS: u32 = 168;
pub(crate) const MAX_PAGE_LIMIT: usize = 1000;

const SECS_PER_HOUR: u64 = 3600;

/// Gateway over the local store, refreshing cache-style sources on a miss.
pub struct SpaceGateway {
    snapshots: Arc<dyn SnapshotStore>,
    positions: Arc<dyn PositionStore>,
    catalog: Arc<dyn CatalogStore>,
    collectors: HashMap<Source, Arc<dyn Collector>>,
    position_collector: Option<Arc<dyn Collector>>,
    catalog_collector: Option<Arc<dyn Collector>>,
    ttls: HashMap<Source, Duration>,
    position_freshness: Duration,
    schedule: ScheduleConfig,
}

impl SpaceGateway {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        snapshots: Arc<dyn SnapshotStore>,
        positions: Arc<dyn PositionStore>,
        catalog: Arc<dyn CatalogStore>,
        collectors: HashMap<Source, Arc<dyn Collector>>,
        position_collector: Option<Arc<dyn Collector>>,
        catalog_collector: Option<Arc<dyn Collector>>,
        ttls: HashMap<Source, Duration>,
        position_freshness: Duration,
        schedule: ScheduleConfig,
    ) -> Self {
        Self {
            snapshots,
            positions,
            catalog,
            collectors,
            position_collector,
            catalog_collector,
            ttls,
            position_freshness,
            schedule,
        }
    }

    /// TTL applied to `source`.
    pub fn ttl(&self, source: Source) -> Duration {
        self.ttls.get(&source).copied().unwrap_or(Duration::ZERO)
    }

    /// TTL in whole hours, rounded up so a sub-hour TTL never reports 0.
    pub fn ttl_hours(&self, source: Source) -> u64 {
        self.ttl(source).as_secs().div_ceil(SECS_PER_HOUR)
    }

    /// Delete every cached snapshot of `source`. Returns the rows removed.
    pub async fn invalidate(&self, source: &str) -> Result<usize> {
        let source: Source = source.parse()?;
        self.snapshots.invalidate(source.as_str()).await
    }

    /// Scheduler jobs for every registered collector: telemetry, catalog,
    /// then the cache-style sources in warm-up order.
    pub fn jobs(&self) -> Vec<Job> {
        let mut jobs = Vec::new();
        if let Some(c) = &self.position_collector {
            jobs.push(Job::new(self.schedule.iss_interval(), c.clone()));
        }
        if let Some(c) = &self.catalog_collector {
            jobs.push(Job::new(self.schedule.osdr_interval(), c.clone()));
        }
        for source in Source::ALL {
            if let Some(c) = self.collectors.get(&source) {
                jobs.push(Job::new(self.schedule.source_interval(source), c.clone()));
            }
        }
        jobs
    }

    /// Every registered collector, in job order.
    fn all_collectors(&self) -> Vec<Arc<dyn Collector>> {
        self.jobs().into_iter().map(|job| job.collector).collect()
    }

    /// Run the source's collector once. Returns the failure, if any.
    async fn refresh_source(&self, source: Source) -> Option<HeimdallError> {
        let Some(collector) = self.collectors.get(&source) else {
            return Some(HeimdallError::Internal(format!(
                "No collector for source {source}"
            )));
        };
        match collector.collect().await {
            Ok(report) => {
                debug!(source = %source, written = report.written, "on-demand refresh");
                None
            }
            Err(e) => {
                warn!(source = %source, error = %e, "failed to refresh cache");
                Some(e)
            }
        }
    }
}

fn record_read(source: Source, outcome: &'static str) {
    metrics::counter!(telemetry::READS_TOTAL,
        "source" => source.as_str(),
        "outcome" => outcome,
    )
    .increment(1);
}

#[async_trait]
impl SpaceDataGateway for SpaceGateway {
    async fn get_latest(&self, name: &str) -> Result<LatestSnapshot> {
        let source: Source = name.parse()?;
        let ttl = self.ttl(source);
        let ttl_hours = self.ttl_hours(source);

        if let Some(snapshot) = self.snapshots.freshest_within(source.as_str(), ttl).await? {
            record_read(source, "fresh");
            return Ok(LatestSnapshot::new(name, snapshot, ttl_hours, false));
        }

        // A failed refresh may still have written a row, and a scheduled run
        // may have landed meanwhile, so re-query either way.
        let refresh_error = self.refresh_source(source).await;
        if let Some(snapshot) = self.snapshots.freshest_within(source.as_str(), ttl).await? {
            record_read(source, "refreshed");
            return Ok(LatestSnapshot::new(name, snapshot, ttl_hours, false));
        }

        match self.snapshots.latest(source.as_str()).await? {
            Some(snapshot) => {
                record_read(source, "stale");
                Ok(LatestSnapshot::new(name, snapshot, ttl_hours, true))
            }
            None => {
                record_read(source, "no_data");
                let mut message = format!("No fresh data for source '{name}'");
                if let Some(e) = refresh_error {
                    message.push_str(&format!(". Error: {e}"));
                }
                Err(HeimdallError::NoData(message))
            }
        }
    }

    async fn latest_any(&self, name: &str) -> Result<LatestSnapshot> {
        let source: Source = name.parse()?;
        let snapshot = self
            .snapshots
            .latest(source.as_str())
            .await?
            .ok_or_else(|| HeimdallError::NoData(format!("No data for source '{name}'")))?;
        let is_stale = snapshot.age(Utc::now()).to_std().unwrap_or_default() > self.ttl(source);
        Ok(LatestSnapshot::new(
            name,
            snapshot,
            self.ttl_hours(source),
            is_stale,
        ))
    }

    async fn latest_position(&self) -> Result<PositionRecord> {
        let latest = self
            .positions
            .latest_position()
            .await?
            .ok_or_else(|| HeimdallError::NoData("No ISS position data available".to_string()))?;

        let age = (Utc::now() - latest.timestamp).to_std().unwrap_or_default();
        if age > self.position_freshness {
            return Err(HeimdallError::NoData(format!(
                "ISS data is stale (last update: {}). Data must be fresher than {} minutes.",
                latest.timestamp.to_rfc3339(),
                self.position_freshness.as_secs() / 60
            )));
        }
        Ok(latest)
    }

    async fn trend(&self, hours: u32, limit: usize) -> Result<Trend> {
        if !(1..=MAX_TREND_HOURS).contains(&hours) {
            return Err(HeimdallError::Validation(format!(
                "hours must be between 1 and {MAX_TREND_HOURS}, got {hours}"
            )));
        }
        if !(1..=MAX_PAGE_LIMIT).contains(&limit) {
            return Err(HeimdallError::Validation(format!(
                "limit must be between 1 and {MAX_PAGE_LIMIT}, got {limit}"
            )));
        }
        let since = Utc::now() - chrono::Duration::hours(i64::from(hours));
        let positions = self.positions.range(since, limit).await?;
        Ok(Trend {
            count: positions.len(),
            positions,
            hours,
        })
    }

    async fn list_catalog(&self, limit: usize, offset: usize) -> Result<CatalogPage> {
        if !(1..=MAX_PAGE_LIMIT).contains(&limit) {
            return Err(HeimdallError::Validation(format!(
                "limit must be between 1 and {MAX_PAGE_LIMIT}, got {limit}"
            )));
        }
        let items = self.catalog.paged_list(limit, offset).await?;
        let total = self.catalog.count().await?;
        Ok(CatalogPage {
            count: items.len(),
            items,
            total,
            limit,
            offset,
        })
    }

    async fn get_catalog_item(&self, id: &str) -> Result<CatalogItem> {
        self.catalog
            .get(id)
            .await?
            .ok_or_else(|| HeimdallError::NotFound(format!("Dataset '{id}' not found")))
    }

    async fn refresh_all(&self) -> BTreeMap<String, RefreshStatus> {
        let collectors = self.all_collectors();
        let outcomes = join_all(collectors.iter().map(|c| async move {
            let status = match c.collect().await {
                Ok(_) => RefreshStatus::Success,
                Err(e) => {
                    warn!(source = %c.name(), error = %e, "manual refresh failed");
                    RefreshStatus::Error(e.to_string())
                }
            };
            (c.name().to_owned(), status)
        }))
        .await;
        outcomes.into_iter().collect()
    }

    fn valid_sources(&self) -> Vec<&'static str> {
        Source::valid_names()
    }
}
