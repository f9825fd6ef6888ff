//! Heimdall - freshness-aware cache for rate-limited space data feeds
//!
//! This crate keeps a local snapshot of several unreliable upstream APIs
//! (astronomy picture of the day, near-earth objects, solar events, launch
//! schedules, orbital telemetry, a dataset catalog) "fresh enough", so that
//! consumers always get a quick answer without waiting on an upstream call.
//!
//! - [`collect`] fetches one source and writes it into a [`store`].
//! - [`Scheduler`] runs every collector on its own interval.
//! - [`SpaceGateway`] is the read path: fresh data if cached, otherwise an
//!   on-demand refresh, otherwise the newest stale snapshot.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use heimdall::{Config, Heimdall, MemoryStore, Scheduler, SpaceDataGateway};
//!
//! #[tokio::main]
//! async fn main() -> heimdall::Result<()> {
//!     let config = Config::load(None)?;
//!     let gateway = Heimdall::builder()
//!         .config(config)
//!         .store(Arc::new(MemoryStore::new()))
//!         .default_collectors()
//!         .build()?;
//!
//!     let mut scheduler = Scheduler::new(gateway.jobs());
//!     scheduler.start().await?;
//!
//!     let neo = gateway.get_latest("neo").await?;
//!     println!("{} (stale: {})", neo.fetched_at, neo.is_stale);
//!
//!     scheduler.shutdown();
//!     Ok(())
//! }
//! ```

pub mod collect;
pub mod config;
pub mod error;
pub mod fetch;
pub mod gateway;
pub mod scheduler;
pub mod source;
pub mod store;
pub mod telemetry;
pub mod traits;
pub mod types;

// Re-export main types at crate root
pub use config::Config;
pub use error::{ErrorKind, HeimdallError, Result};
pub use gateway::{Heimdall, HeimdallBuilder, SpaceGateway};
pub use scheduler::{Job, Scheduler};
pub use source::Source;
pub use traits::SpaceDataGateway;

pub use collect::{
    CatalogCollector, CollectReport, Collector, PositionCollector, SnapshotCollector,
    SourceEndpoint,
};
pub use fetch::{FetchTarget, RetryConfig, UpstreamFetcher};
pub use store::{
    CatalogFields, CatalogItem, CatalogStore, MemoryStore, Position, PositionRecord,
    PositionStore, Snapshot, SnapshotStore,
};
pub use types::{CatalogPage, LatestSnapshot, RefreshStatus, Trend};
