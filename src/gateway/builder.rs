//! Builder for configuring gateway instances

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use super::SpaceGateway;
use crate::collect::{CatalogCollector, Collector, PositionCollector, SnapshotCollector};
use crate::config::Config;
use crate::fetch::UpstreamFetcher;
use crate::source::Source;
use crate::store::{CatalogStore, MemoryStore, PositionStore, SnapshotStore};
use crate::Result;

/// Main entry point for creating gateway instances.
pub struct Heimdall;

impl Heimdall {
    /// Create a new builder for configuring the gateway.
    pub fn builder() -> HeimdallBuilder {
        HeimdallBuilder::new()
    }
}

/// Builder for configuring gateway instances.
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use heimdall::{Config, Heimdall, MemoryStore};
///
/// # fn main() -> heimdall::Result<()> {
/// let store = Arc::new(MemoryStore::new());
/// let gateway = Heimdall::builder()
///     .config(Config::default())
///     .store(store)
///     .default_collectors()
///     .build()?;
/// # Ok(())
/// # }
/// ```
pub struct HeimdallBuilder {
    config: Config,
    snapshots: Option<Arc<dyn SnapshotStore>>,
    positions: Option<Arc<dyn PositionStore>>,
    catalog: Option<Arc<dyn CatalogStore>>,
    collectors: HashMap<Source, Arc<dyn Collector>>,
    position_collector: Option<Arc<dyn Collector>>,
    catalog_collector: Option<Arc<dyn Collector>>,
    ttl_overrides: HashMap<Source, Duration>,
    position_freshness: Option<Duration>,
    default_collectors: bool,
}

impl Default for HeimdallBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl HeimdallBuilder {
    pub fn new() -> Self {
        Self {
            config: Config::default(),
            snapshots: None,
            positions: None,
            catalog: None,
            collectors: HashMap::new(),
            position_collector: None,
            catalog_collector: None,
            ttl_overrides: HashMap::new(),
            position_freshness: None,
            default_collectors: false,
        }
    }

    /// Use `config` for TTLs, intervals, endpoints and HTTP behaviour.
    pub fn config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    /// Back all three tables with one store (default: a fresh [`MemoryStore`]).
    pub fn store<S>(mut self, store: Arc<S>) -> Self
    where
        S: SnapshotStore + PositionStore + CatalogStore + 'static,
    {
        let snapshots: Arc<dyn SnapshotStore> = store.clone();
        let positions: Arc<dyn PositionStore> = store.clone();
        let catalog: Arc<dyn CatalogStore> = store;
        self.snapshots = Some(snapshots);
        self.positions = Some(positions);
        self.catalog = Some(catalog);
        self
    }

    /// Register the collector used to refresh `source`.
    pub fn collector(mut self, source: Source, collector: Arc<dyn Collector>) -> Self {
        self.collectors.insert(source, collector);
        self
    }

    /// Register the orbital-telemetry collector.
    pub fn position_collector(mut self, collector: Arc<dyn Collector>) -> Self {
        self.position_collector = Some(collector);
        self
    }

    /// Register the dataset-catalog collector.
    pub fn catalog_collector(mut self, collector: Arc<dyn Collector>) -> Self {
        self.catalog_collector = Some(collector);
        self
    }

    /// Override the TTL of one source.
    pub fn ttl(mut self, source: Source, ttl: Duration) -> Self {
        self.ttl_overrides.insert(source, ttl);
        self
    }

    /// Override how old the newest position may be before it reads as no data.
    pub fn position_freshness(mut self, freshness: Duration) -> Self {
        self.position_freshness = Some(freshness);
        self
    }

    /// Build HTTP collectors from the configured endpoints for every slot
    /// that has no explicitly registered collector.
    pub fn default_collectors(mut self) -> Self {
        self.default_collectors = true;
        self
    }

    /// Build the gateway.
    pub fn build(self) -> Result<SpaceGateway> {
        let Self {
            config,
            snapshots,
            positions,
            catalog,
            mut collectors,
            mut position_collector,
            mut catalog_collector,
            ttl_overrides,
            position_freshness,
            default_collectors,
        } = self;

        let (snapshots, positions, catalog) = match (snapshots, positions, catalog) {
            (Some(s), Some(p), Some(c)) => (s, p, c),
            _ => {
                let store = Arc::new(MemoryStore::new());
                let s: Arc<dyn SnapshotStore> = store.clone();
                let p: Arc<dyn PositionStore> = store.clone();
                let c: Arc<dyn CatalogStore> = store;
                (s, p, c)
            }
        };

        if default_collectors {
            let fetcher = Arc::new(UpstreamFetcher::new(
                config.http.timeout(),
                config.http.retry_config(),
            )?);
            for source in Source::ALL {
                collectors.entry(source).or_insert_with(|| {
                    Arc::new(SnapshotCollector::new(
                        source,
                        config.upstream.endpoint(source),
                        fetcher.clone(),
                        snapshots.clone(),
                        config.cache.keep_latest,
                    )) as Arc<dyn Collector>
                });
            }
            position_collector.get_or_insert_with(|| {
                Arc::new(
                    PositionCollector::new(
                        config.upstream.iss_url.clone(),
                        fetcher.clone(),
                        positions.clone(),
                    )
                    .with_retention(config.position.retention()),
                ) as Arc<dyn Collector>
            });
            catalog_collector.get_or_insert_with(|| {
                Arc::new(CatalogCollector::new(
                    config.upstream.osdr_url.clone(),
                    fetcher.clone(),
                    catalog.clone(),
                )) as Arc<dyn Collector>
            });
        }

        let ttls = Source::ALL
            .into_iter()
            .map(|source| {
                let ttl = ttl_overrides
                    .get(&source)
                    .copied()
                    .unwrap_or_else(|| config.cache.ttl(source));
                (source, ttl)
            })
            .collect();

        Ok(SpaceGateway::new(
            snapshots,
            positions,
            catalog,
            collectors,
            position_collector,
            catalog_collector,
            ttls,
            position_freshness.unwrap_or_else(|| config.position.freshness()),
            config.schedule,
        ))
    }
}
