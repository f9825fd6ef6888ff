//! Read-path results

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use serde_json::Value;

use crate::store::{CatalogItem, PositionRecord, Snapshot};

/// Cached data for one source, as handed to a consumer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LatestSnapshot {
    /// The name the caller asked for (an alias stays an alias).
    pub source: String,
    pub fetched_at: DateTime<Utc>,
    pub ttl_hours: u64,
    pub data: Value,
    /// Set when the data is older than the TTL and was returned as a last
    /// resort. Omitted from serialized output when false.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub is_stale: bool,
}

impl LatestSnapshot {
    pub(crate) fn new(requested: &str, snapshot: Snapshot, ttl_hours: u64, is_stale: bool) -> Self {
        Self {
            source: requested.to_owned(),
            fetched_at: snapshot.fetched_at,
            ttl_hours,
            data: snapshot.payload,
            is_stale,
        }
    }
}

/// Position history over a look-back window, newest first.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Trend {
    pub positions: Vec<PositionRecord>,
    pub count: usize,
    pub hours: u32,
}

/// One page of the dataset catalog.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CatalogPage {
    pub items: Vec<CatalogItem>,
    /// Items on this page.
    pub count: usize,
    /// Items in the whole catalog.
    pub total: usize,
    pub limit: usize,
    pub offset: usize,
}

/// Outcome of one collector in a manual refresh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshStatus {
    Success,
    Error(String),
}

impl RefreshStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, RefreshStatus::Success)
    }
}

impl std::fmt::Display for RefreshStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RefreshStatus::Success => f.write_str("success"),
            RefreshStatus::Error(message) => write!(f, "error: {message}"),
        }
    }
}

impl Serialize for RefreshStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
