//! Record types owned by the stores.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One immutable capture of a cache-style source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Store-assigned row id; breaks ties between equal `fetched_at` values.
    pub id: u64,
    pub source: String,
    pub fetched_at: DateTime<Utc>,
    /// Opaque payload; the store never looks inside.
    pub payload: Value,
}

impl Snapshot {
    /// Age relative to `now` (negative ages clamp to zero).
    pub fn age(&self, now: DateTime<Utc>) -> chrono::Duration {
        (now - self.fetched_at).max(chrono::Duration::zero())
    }
}

/// A single orbital position as observed upstream, before it is stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub latitude: f64,
    pub longitude: f64,
    pub altitude_km: f64,
    pub velocity_kmh: f64,
    pub source_url: String,
    /// Full upstream response, including any enrichment.
    pub raw: Value,
}

/// A stored orbital position, keyed by its timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionRecord {
    pub id: u64,
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub position: Position,
}

impl PositionRecord {
    /// `raw.visibility`, if the upstream reported one.
    pub fn visibility(&self) -> Option<&str> {
        self.position.raw.get("visibility").and_then(Value::as_str)
    }

    /// `raw.location_info.<key>` as a string, if present.
    pub fn location_field(&self, key: &str) -> Option<&str> {
        self.position
            .raw
            .get("location_info")
            .and_then(|info| info.get(key))
            .and_then(Value::as_str)
    }
}

/// Mutable fields of a catalog entity, replaced wholesale on upsert.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CatalogFields {
    pub title: Option<String>,
    pub status: Option<String>,
    /// Update time as reported by the source.
    pub updated_at: Option<DateTime<Utc>>,
    pub details: Value,
}

/// A catalog entity keyed by its stable external identifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogItem {
    pub id: u64,
    pub external_id: String,
    #[serde(flatten)]
    pub fields: CatalogFields,
    /// When this row was first seen; never changed by later upserts.
    pub inserted_at: DateTime<Utc>,
}
