//! Core SpaceDataGateway trait

use std::collections::BTreeMap;

use async_trait::async_trait;

use crate::store::{CatalogItem, PositionRecord};
use crate::{CatalogPage, LatestSnapshot, RefreshStatus, Result, Trend};

/// The read contract consumed by an API layer.
///
/// Every read answers from the local store. Only [`get_latest`] may call an
/// upstream, and only when nothing fresh is cached; business conditions come
/// back as typed errors (`NoData`, `NotFound`, `Validation`), never panics.
///
/// [`get_latest`]: SpaceDataGateway::get_latest
#[async_trait]
pub trait SpaceDataGateway: Send + Sync {
    /// Fresh data for `source`, refreshing on a miss and falling back to the
    /// newest stale snapshot (marked `is_stale`) when the refresh fails.
    async fn get_latest(&self, source: &str) -> Result<LatestSnapshot>;

    /// Newest snapshot regardless of TTL. Never refreshes.
    async fn latest_any(&self, source: &str) -> Result<LatestSnapshot>;

    /// Newest orbital position, if it is within the freshness window.
    async fn latest_position(&self) -> Result<PositionRecord>;

    /// Positions from the last `hours` hours, newest first, at most `limit`.
    async fn trend(&self, hours: u32, limit: usize) -> Result<Trend>;

    async fn list_catalog(&self, limit: usize, offset: usize) -> Result<CatalogPage>;

    async fn get_catalog_item(&self, id: &str) -> Result<CatalogItem>;

    /// Run every collector once, concurrently, and report each outcome.
    async fn refresh_all(&self) -> BTreeMap<String, RefreshStatus>;

    /// Names accepted by [`get_latest`](Self::get_latest), sorted.
    fn valid_sources(&self) -> Vec<&'static str>;
}
