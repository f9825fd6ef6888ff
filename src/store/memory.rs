//! In-process store backing all three tables.

use std::cmp::Reverse;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;

use super::persist::StoreDump;
use super::{
    CatalogFields, CatalogItem, CatalogStore, Position, PositionRecord, PositionStore, Snapshot,
    SnapshotStore, cutoff,
};
use crate::{HeimdallError, Result};

/// Thread-safe in-memory store.
///
/// Each table sits behind its own `RwLock`, so a write is visible to every
/// read that starts after it returns. Row ids come from one shared counter.
pub struct MemoryStore {
    snapshots: RwLock<HashMap<String, Vec<Snapshot>>>,
    positions: RwLock<Vec<PositionRecord>>,
    catalog: RwLock<HashMap<String, CatalogItem>>,
    next_id: AtomicU64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            snapshots: RwLock::new(HashMap::new()),
            positions: RwLock::new(Vec::new()),
            catalog: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    fn next_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Copy every table into a serializable dump.
    pub fn dump(&self) -> Result<StoreDump> {
        let mut snapshots: Vec<Snapshot> = read(&self.snapshots)?
            .values()
            .flatten()
            .cloned()
            .collect();
        snapshots.sort_by_key(|s| s.id);
        let positions = read(&self.positions)?.clone();
        let mut catalog: Vec<CatalogItem> = read(&self.catalog)?.values().cloned().collect();
        catalog.sort_by_key(|c| c.id);
        Ok(StoreDump::new(snapshots, positions, catalog))
    }

    /// Replace every table with the contents of `dump`.
    pub fn restore(&self, dump: StoreDump) -> Result<()> {
        let max_id = dump
            .snapshots
            .iter()
            .map(|s| s.id)
            .chain(dump.positions.iter().map(|p| p.id))
            .chain(dump.catalog.iter().map(|c| c.id))
            .max()
            .unwrap_or(0);

        let mut by_source: HashMap<String, Vec<Snapshot>> = HashMap::new();
        for snapshot in dump.snapshots {
            by_source
                .entry(snapshot.source.clone())
                .or_default()
                .push(snapshot);
        }
        let catalog = dump
            .catalog
            .into_iter()
            .map(|item| (item.external_id.clone(), item))
            .collect();

        *write(&self.snapshots)? = by_source;
        *write(&self.positions)? = dump.positions;
        *write(&self.catalog)? = catalog;
        self.next_id.fetch_max(max_id + 1, Ordering::Relaxed);
        Ok(())
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn read<T>(lock: &RwLock<T>) -> Result<RwLockReadGuard<'_, T>> {
    lock.read()
        .map_err(|_| HeimdallError::Storage("store lock poisoned".into()))
}

fn write<T>(lock: &RwLock<T>) -> Result<RwLockWriteGuard<'_, T>> {
    lock.write()
        .map_err(|_| HeimdallError::Storage("store lock poisoned".into()))
}

/// Ordering key for "latest": timestamp first, row id as tie-breaker.
fn recency(s: &Snapshot) -> (DateTime<Utc>, u64) {
    (s.fetched_at, s.id)
}

#[async_trait]
impl SnapshotStore for MemoryStore {
    async fn latest(&self, source: &str) -> Result<Option<Snapshot>> {
        let table = read(&self.snapshots)?;
        Ok(table
            .get(source)
            .and_then(|rows| rows.iter().max_by_key(|s| recency(s)))
            .cloned())
    }

    async fn freshest_within(&self, source: &str, ttl: Duration) -> Result<Option<Snapshot>> {
        let oldest_allowed = cutoff(Utc::now(), ttl);
        let table = read(&self.snapshots)?;
        Ok(table
            .get(source)
            .and_then(|rows| {
                rows.iter()
                    .filter(|s| oldest_allowed.is_none_or(|c| s.fetched_at >= c))
                    .max_by_key(|s| recency(s))
            })
            .cloned())
    }

    async fn append_at(
        &self,
        source: &str,
        payload: Value,
        fetched_at: DateTime<Utc>,
    ) -> Result<Snapshot> {
        let snapshot = Snapshot {
            id: self.next_id(),
            source: source.to_string(),
            fetched_at,
            payload,
        };
        write(&self.snapshots)?
            .entry(source.to_string())
            .or_default()
            .push(snapshot.clone());
        Ok(snapshot)
    }

    async fn trim_to_latest(&self, source: &str, keep: usize) -> Result<usize> {
        let mut table = write(&self.snapshots)?;
        let Some(rows) = table.get_mut(source) else {
            return Ok(0);
        };
        if rows.len() <= keep {
            return Ok(0);
        }
        rows.sort_by_key(|s| Reverse(recency(s)));
        let removed = rows.len() - keep;
        rows.truncate(keep);
        Ok(removed)
    }

    async fn trim_older_than(&self, source: &str, window: Duration) -> Result<usize> {
        let Some(oldest_kept) = cutoff(Utc::now(), window) else {
            return Ok(0);
        };
        let mut table = write(&self.snapshots)?;
        let Some(rows) = table.get_mut(source) else {
            return Ok(0);
        };
        let before = rows.len();
        rows.retain(|s| s.fetched_at >= oldest_kept);
        Ok(before - rows.len())
    }

    async fn invalidate(&self, source: &str) -> Result<usize> {
        Ok(write(&self.snapshots)?
            .remove(source)
            .map_or(0, |rows| rows.len()))
    }
}

#[async_trait]
impl PositionStore for MemoryStore {
    async fn append_position(
        &self,
        position: Position,
        timestamp: DateTime<Utc>,
    ) -> Result<PositionRecord> {
        let record = PositionRecord {
            id: self.next_id(),
            timestamp,
            position,
        };
        write(&self.positions)?.push(record.clone());
        Ok(record)
    }

    async fn latest_position(&self) -> Result<Option<PositionRecord>> {
        Ok(read(&self.positions)?
            .iter()
            .max_by_key(|r| (r.timestamp, r.id))
            .cloned())
    }

    async fn range(&self, since: DateTime<Utc>, limit: usize) -> Result<Vec<PositionRecord>> {
        let mut rows: Vec<PositionRecord> = read(&self.positions)?
            .iter()
            .filter(|r| r.timestamp >= since)
            .cloned()
            .collect();
        rows.sort_by_key(|r| Reverse((r.timestamp, r.id)));
        rows.truncate(limit);
        Ok(rows)
    }

    async fn trim_positions_older_than(&self, window: Duration) -> Result<usize> {
        let Some(oldest_kept) = cutoff(Utc::now(), window) else {
            return Ok(0);
        };
        let mut rows = write(&self.positions)?;
        let before = rows.len();
        rows.retain(|r| r.timestamp >= oldest_kept);
        Ok(before - rows.len())
    }
}

#[async_trait]
impl CatalogStore for MemoryStore {
    async fn upsert(&self, external_id: &str, fields: CatalogFields) -> Result<CatalogItem> {
        let mut table = write(&self.catalog)?;
        if let Some(existing) = table.get_mut(external_id) {
            existing.fields = fields;
            return Ok(existing.clone());
        }
        let item = CatalogItem {
            id: self.next_id(),
            external_id: external_id.to_string(),
            fields,
            inserted_at: Utc::now(),
        };
        table.insert(external_id.to_string(), item.clone());
        Ok(item)
    }

    async fn get(&self, external_id: &str) -> Result<Option<CatalogItem>> {
        Ok(read(&self.catalog)?.get(external_id).cloned())
    }

    async fn paged_list(&self, limit: usize, offset: usize) -> Result<Vec<CatalogItem>> {
        let mut items: Vec<CatalogItem> = read(&self.catalog)?.values().cloned().collect();
        // None sorts below Some, so Reverse puts undated rows last.
        items.sort_by(|a, b| {
            Reverse(a.fields.updated_at)
                .cmp(&Reverse(b.fields.updated_at))
                .then_with(|| a.external_id.cmp(&b.external_id))
        });
        Ok(items.into_iter().skip(offset).take(limit).collect())
    }

    async fn count(&self) -> Result<usize> {
        Ok(read(&self.catalog)?.len())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    const HOUR: Duration = Duration::from_secs(3600);

    fn hours_ago(h: i64) -> DateTime<Utc> {
        Utc::now() - chrono::Duration::hours(h)
    }

    fn days_ago(d: i64) -> DateTime<Utc> {
        Utc::now() - chrono::Duration::days(d)
    }

    fn position(lat: f64) -> Position {
        Position {
            latitude: lat,
            longitude: 0.0,
            altitude_km: 420.0,
            velocity_kmh: 27_600.0,
            source_url: "https://example.test/iss".into(),
            raw: json!({}),
        }
    }

    #[tokio::test]
    async fn latest_on_empty_source_is_none() {
        let store = MemoryStore::new();
        assert!(store.latest("neo").await.unwrap().is_none());
        assert!(store.freshest_within("neo", HOUR).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn latest_follows_fetched_at_not_insert_order() {
        let store = MemoryStore::new();
        store.append_at("neo", json!(1), hours_ago(1)).await.unwrap();
        store.append_at("neo", json!(2), hours_ago(3)).await.unwrap();

        let latest = store.latest("neo").await.unwrap().unwrap();
        assert_eq!(latest.payload, json!(1));
    }

    #[tokio::test]
    async fn freshest_within_ignores_rows_past_ttl() {
        let store = MemoryStore::new();
        store.append_at("spacex", json!("old"), hours_ago(10)).await.unwrap();

        assert!(
            store
                .freshest_within("spacex", 6 * HOUR)
                .await
                .unwrap()
                .is_none()
        );
        assert!(store.latest("spacex").await.unwrap().is_some());

        store.append("spacex", json!("new")).await.unwrap();
        let fresh = store.freshest_within("spacex", 6 * HOUR).await.unwrap().unwrap();
        assert_eq!(fresh.payload, json!("new"));
    }

    #[tokio::test]
    async fn sources_are_independent() {
        let store = MemoryStore::new();
        store.append("apod", json!({"title": "x"})).await.unwrap();
        assert!(store.latest("neo").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn trim_to_latest_keeps_newest_five_of_seven() {
        let store = MemoryStore::new();
        for h in (0..7).rev() {
            store.append_at("cme", json!(h), hours_ago(h)).await.unwrap();
        }

        let removed = store.trim_to_latest("cme", 5).await.unwrap();
        assert_eq!(removed, 2);

        let dump = store.dump().unwrap();
        let mut kept: Vec<i64> = dump
            .snapshots
            .iter()
            .map(|s| s.payload.as_i64().unwrap())
            .collect();
        kept.sort_unstable();
        assert_eq!(kept, vec![0, 1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn trim_to_latest_under_limit_is_noop() {
        let store = MemoryStore::new();
        store.append("flr", json!(1)).await.unwrap();
        assert_eq!(store.trim_to_latest("flr", 5).await.unwrap(), 0);
        assert_eq!(store.trim_to_latest("unknown", 5).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn trim_older_than_drops_only_rows_past_window() {
        let store = MemoryStore::new();
        store.append_at("neo", json!("15d"), days_ago(15)).await.unwrap();
        store.append_at("neo", json!("20d"), days_ago(20)).await.unwrap();
        store.append_at("neo", json!("13d"), days_ago(13)).await.unwrap();
        store.append("neo", json!("now")).await.unwrap();

        let removed = store
            .trim_older_than("neo", Duration::from_secs(14 * 86_400))
            .await
            .unwrap();
        assert_eq!(removed, 2);
        assert_eq!(store.latest("neo").await.unwrap().unwrap().payload, json!("now"));
        assert_eq!(store.dump().unwrap().snapshots.len(), 2);
    }

    #[tokio::test]
    async fn invalidate_removes_all_rows() {
        let store = MemoryStore::new();
        store.append("apod", json!(1)).await.unwrap();
        store.append("apod", json!(2)).await.unwrap();
        assert_eq!(store.invalidate("apod").await.unwrap(), 2);
        assert!(store.latest("apod").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn position_range_is_newest_first_and_bounded() {
        let store = MemoryStore::new();
        store.append_position(position(1.0), hours_ago(30)).await.unwrap();
        store.append_position(position(2.0), hours_ago(3)).await.unwrap();
        store.append_position(position(3.0), hours_ago(2)).await.unwrap();
        store.append_position(position(4.0), hours_ago(1)).await.unwrap();

        let rows = store.range(hours_ago(24), 2).await.unwrap();
        let lats: Vec<f64> = rows.iter().map(|r| r.position.latitude).collect();
        assert_eq!(lats, vec![4.0, 3.0]);

        let all = store.range(hours_ago(24), 100).await.unwrap();
        assert_eq!(all.len(), 3);
    }

    #[tokio::test]
    async fn positions_trimmed_by_age() {
        let store = MemoryStore::new();
        store.append_position(position(1.0), days_ago(15)).await.unwrap();
        store.append_position(position(2.0), Utc::now()).await.unwrap();

        let removed = store
            .trim_positions_older_than(Duration::from_secs(14 * 86_400))
            .await
            .unwrap();
        assert_eq!(removed, 1);
        let latest = store.latest_position().await.unwrap().unwrap();
        assert_eq!(latest.position.latitude, 2.0);
    }

    #[tokio::test]
    async fn upsert_same_id_twice_leaves_one_row_with_latest_values() {
        let store = MemoryStore::new();
        let first = store
            .upsert(
                "OSD-1",
                CatalogFields {
                    title: Some("first".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        let second = store
            .upsert(
                "OSD-1",
                CatalogFields {
                    title: Some("second".into()),
                    status: Some("published".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(store.count().await.unwrap(), 1);
        assert_eq!(first.id, second.id);
        assert_eq!(first.inserted_at, second.inserted_at);
        let stored = store.get("OSD-1").await.unwrap().unwrap();
        assert_eq!(stored.fields.title.as_deref(), Some("second"));
        assert_eq!(stored.fields.status.as_deref(), Some("published"));
    }

    #[tokio::test]
    async fn paged_list_orders_by_update_time_nulls_last() {
        let store = MemoryStore::new();
        let dated = |h: i64| CatalogFields {
            updated_at: Some(hours_ago(h)),
            ..Default::default()
        };
        store.upsert("OSD-A", CatalogFields::default()).await.unwrap();
        store.upsert("OSD-B", dated(5)).await.unwrap();
        store.upsert("OSD-C", dated(1)).await.unwrap();

        let ids: Vec<String> = store
            .paged_list(10, 0)
            .await
            .unwrap()
            .into_iter()
            .map(|i| i.external_id)
            .collect();
        assert_eq!(ids, vec!["OSD-C", "OSD-B", "OSD-A"]);

        let page = store.paged_list(1, 1).await.unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].external_id, "OSD-B");
    }

    #[tokio::test]
    async fn dump_and_restore_keeps_rows_and_ids_advance() {
        let store = MemoryStore::new();
        store.append("neo", json!({"element_count": 3})).await.unwrap();
        store.append_position(position(5.0), Utc::now()).await.unwrap();
        store.upsert("OSD-9", CatalogFields::default()).await.unwrap();
        let dump = store.dump().unwrap();

        let restored = MemoryStore::new();
        restored.restore(dump).unwrap();
        assert_eq!(
            restored.latest("neo").await.unwrap().unwrap().payload["element_count"],
            3
        );
        assert!(restored.latest_position().await.unwrap().is_some());
        assert!(restored.get("OSD-9").await.unwrap().is_some());

        let next = restored.append("neo", json!(null)).await.unwrap();
        assert!(next.id > 3);
    }
}
