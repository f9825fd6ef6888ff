//! Orbital-telemetry collector (ISS).

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{Map, Value};
use tracing::{debug, info};

use super::{CollectReport, Collector, record_trimmed};
use crate::fetch::{FetchTarget, UpstreamFetcher};
use crate::store::{Position, PositionStore};
use crate::{HeimdallError, Result};

/// Default retention window for position records.
pub const DEFAULT_RETENTION: Duration = Duration::from_secs(14 * 24 * 3600);

const NAME: &str = "iss";

/// Appends one position per run, enriched with a best-effort location
/// lookup, then purges records older than the retention window.
pub struct PositionCollector {
    url: String,
    fetcher: Arc<UpstreamFetcher>,
    store: Arc<dyn PositionStore>,
    retention: Duration,
}

impl PositionCollector {
    pub fn new(
        url: impl Into<String>,
        fetcher: Arc<UpstreamFetcher>,
        store: Arc<dyn PositionStore>,
    ) -> Self {
        Self {
            url: url.into(),
            fetcher,
            store,
            retention: DEFAULT_RETENTION,
        }
    }

    pub fn with_retention(mut self, retention: Duration) -> Self {
        self.retention = retention;
        self
    }

    /// Country / timezone lookup on the same host. Any failure yields `{}`.
    async fn location_info(&self, target: &FetchTarget, lat: f64, lon: f64) -> Value {
        let lookup = FetchTarget::new(format!("{}/v1/coordinates/{lat},{lon}", target.origin()));
        match self.fetcher.fetch(&lookup).await {
            Ok(info @ Value::Object(_)) => info,
            Ok(_) => Value::Object(Map::new()),
            Err(e) => {
                debug!(error = %e, "location lookup failed, continuing without it");
                Value::Object(Map::new())
            }
        }
    }
}

fn number(fields: &Map<String, Value>, key: &str) -> Result<f64> {
    fields
        .get(key)
        .and_then(Value::as_f64)
        .ok_or_else(|| HeimdallError::Shape(format!("{NAME}: missing numeric field '{key}'")))
}

#[async_trait]
impl Collector for PositionCollector {
    fn name(&self) -> &str {
        NAME
    }

    async fn collect(&self) -> Result<CollectReport> {
        let target = FetchTarget::new(&self.url);
        let data = self.fetcher.fetch(&target).await?;
        let Value::Object(mut fields) = data else {
            return Err(HeimdallError::Shape(format!(
                "{NAME}: expected an object from {}",
                self.url
            )));
        };

        let latitude = number(&fields, "latitude")?;
        let longitude = number(&fields, "longitude")?;
        let altitude_km = number(&fields, "altitude")?;
        let velocity_kmh = number(&fields, "velocity")?;

        let info = self.location_info(&target, latitude, longitude).await;
        fields.insert("location_info".to_owned(), info);

        let position = Position {
            latitude,
            longitude,
            altitude_km,
            velocity_kmh,
            source_url: self.url.clone(),
            raw: Value::Object(fields),
        };
        self.store.append_position(position, Utc::now()).await?;
        info!(
            lat = latitude,
            lon = longitude,
            alt_km = altitude_km,
            velocity_kmh,
            "position stored"
        );

        let trimmed = self.store.trim_positions_older_than(self.retention).await?;
        record_trimmed(NAME, trimmed);

        Ok(CollectReport {
            written: 1,
            trimmed,
            failed: 0,
        })
    }
}
