//! Cache-style collectors: one upstream call, one appended snapshot.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use serde_json::{Value, json};
use tracing::info;

use super::{CollectReport, Collector, record_trimmed};
use crate::fetch::{FetchTarget, UpstreamFetcher};
use crate::source::Source;
use crate::store::SnapshotStore;
use crate::{HeimdallError, Result};

/// How many days of DONKI events to request.
const DONKI_LOOKBACK_DAYS: i64 = 30;

/// Where a source lives upstream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceEndpoint {
    pub url: String,
    /// NASA API key, sent as `api_key` when present.
    pub api_key: Option<String>,
}

impl SourceEndpoint {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            api_key: None,
        }
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Build the request for `source` as of `today` (UTC).
    pub fn target(&self, source: Source, today: NaiveDate) -> FetchTarget {
        let mut target = FetchTarget::new(&self.url);
        if let Some(key) = &self.api_key {
            target = target.query("api_key", key);
        }
        match source {
            Source::Neo => {
                let day = today.format("%Y-%m-%d").to_string();
                target.query("start_date", day.clone()).query("end_date", day)
            }
            Source::Flr | Source::Cme => {
                let start = today - chrono::Duration::days(DONKI_LOOKBACK_DAYS);
                target.query("startDate", start.format("%Y-%m-%d").to_string())
            }
            Source::Apod | Source::Spacex => target,
        }
    }
}

/// Wrap an upstream response in the shape stored for `source`.
///
/// DONKI feeds are lists (an empty body decodes as `null`) and are wrapped
/// in an object; the others must already be objects.
fn shape(source: Source, data: Value) -> Result<Value> {
    match (source, data) {
        (Source::Flr, Value::Null) => Ok(json!({ "flares": [] })),
        (Source::Cme, Value::Null) => Ok(json!({ "events": [] })),
        (Source::Flr, list @ Value::Array(_)) => Ok(json!({ "flares": list })),
        (Source::Cme, list @ Value::Array(_)) => Ok(json!({ "events": list })),
        (Source::Apod | Source::Neo | Source::Spacex, obj @ Value::Object(_)) => Ok(obj),
        (source, other) => Err(HeimdallError::Shape(format!(
            "{source}: expected {}, got {}",
            if matches!(source, Source::Flr | Source::Cme) {
                "an array"
            } else {
                "an object"
            },
            type_name(&other)
        ))),
    }
}

fn type_name(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// One-line description of a stored payload for the collection log.
fn summary(source: Source, payload: &Value) -> String {
    let count = |key: &str| payload[key].as_array().map_or(0, Vec::len);
    match source {
        Source::Apod => format!("APOD: {}", payload["title"].as_str().unwrap_or("Unknown")),
        Source::Neo => format!("NEO: {} objects", payload["element_count"].as_u64().unwrap_or(0)),
        Source::Flr => format!("DONKI FLR: {} flares", count("flares")),
        Source::Cme => format!("DONKI CME: {} events", count("events")),
        Source::Spacex => format!(
            "SpaceX: {}",
            payload["name"].as_str().unwrap_or("Unknown launch")
        ),
    }
}

/// Collector for a cache-style [`Source`].
///
/// Appends exactly one snapshot per successful run and then trims the
/// source down to its `keep_latest` newest rows.
pub struct SnapshotCollector {
    source: Source,
    endpoint: SourceEndpoint,
    fetcher: Arc<UpstreamFetcher>,
    store: Arc<dyn SnapshotStore>,
    keep_latest: usize,
}

impl SnapshotCollector {
    pub fn new(
        source: Source,
        endpoint: SourceEndpoint,
        fetcher: Arc<UpstreamFetcher>,
        store: Arc<dyn SnapshotStore>,
        keep_latest: usize,
    ) -> Self {
        Self {
            source,
            endpoint,
            fetcher,
            store,
            keep_latest,
        }
    }

    pub fn source(&self) -> Source {
        self.source
    }
}

#[async_trait]
impl Collector for SnapshotCollector {
    fn name(&self) -> &str {
        self.source.as_str()
    }

    async fn collect(&self) -> Result<CollectReport> {
        let target = self.endpoint.target(self.source, Utc::now().date_naive());
        let data = self.fetcher.fetch(&target).await?;
        let payload = shape(self.source, data)?;
        let line = summary(self.source, &payload);

        self.store.append(self.source.as_str(), payload).await?;
        let trimmed = self
            .store
            .trim_to_latest(self.source.as_str(), self.keep_latest)
            .await?;
        record_trimmed(self.source.as_str(), trimmed);

        info!(source = %self.source, "{line} cached");
        Ok(CollectReport {
            written: 1,
            trimmed,
            failed: 0,
        })
    }
}
