//! Dataset-catalog collector (OSDR).
//!
//! The listing endpoint returns one object keyed by dataset id. Only keys
//! prefixed with `OSD-` are datasets; everything else is bookkeeping and is
//! skipped. Each dataset is upserted on its own, so one bad entry costs one
//! row, not the batch.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Value, json};
use tracing::{info, warn};

use super::{CollectReport, Collector};
use crate::fetch::{FetchTarget, UpstreamFetcher};
use crate::store::{CatalogFields, CatalogStore};
use crate::{HeimdallError, Result};

/// Datasets requested per listing call.
pub const DEFAULT_CATALOG_LIMIT: usize = 100;

const NAME: &str = "osdr";
const DATASET_PREFIX: &str = "OSD-";

pub struct CatalogCollector {
    url: String,
    limit: usize,
    fetcher: Arc<UpstreamFetcher>,
    store: Arc<dyn CatalogStore>,
}

impl CatalogCollector {
    pub fn new(
        url: impl Into<String>,
        fetcher: Arc<UpstreamFetcher>,
        store: Arc<dyn CatalogStore>,
    ) -> Self {
        Self {
            url: url.into(),
            limit: DEFAULT_CATALOG_LIMIT,
            fetcher,
            store,
        }
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }
}

/// Fields stored for one listing entry.
fn dataset_fields(id: &str, entry: &Value) -> Result<CatalogFields> {
    let Value::Object(entry) = entry else {
        return Err(HeimdallError::Shape(format!(
            "{NAME}: dataset {id} is not an object"
        )));
    };
    let rest_url = entry.get("REST_URL").and_then(Value::as_str).unwrap_or("");
    Ok(CatalogFields {
        title: Some(id.to_owned()),
        status: Some("published".to_owned()),
        updated_at: None,
        details: json!({ "rest_url": rest_url }),
    })
}

#[async_trait]
impl Collector for CatalogCollector {
    fn name(&self) -> &str {
        NAME
    }

    async fn collect(&self) -> Result<CollectReport> {
        let target = FetchTarget::new(&self.url)
            .query("format", "json")
            .query("limit", self.limit.to_string());
        let Value::Object(listing) = self.fetcher.fetch(&target).await? else {
            return Err(HeimdallError::Shape(format!(
                "{NAME}: expected an object keyed by dataset id"
            )));
        };

        let datasets: Vec<_> = listing
            .iter()
            .filter(|(id, _)| id.starts_with(DATASET_PREFIX))
            .collect();
        info!(count = datasets.len(), "fetched OSDR datasets");

        let mut report = CollectReport::default();
        for (id, entry) in datasets {
            let outcome = match dataset_fields(id, entry) {
                Ok(fields) => self.store.upsert(id, fields).await.map(|_| ()),
                Err(e) => Err(e),
            };
            match outcome {
                Ok(()) => report.written += 1,
                Err(e) => {
                    warn!(dataset = %id, error = %e, "failed to upsert dataset");
                    report.failed += 1;
                }
            }
        }
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use wiremock::matchers::{method, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::fetch::RetryConfig;
    use crate::store::MemoryStore;

    fn fetcher() -> Arc<UpstreamFetcher> {
        Arc::new(UpstreamFetcher::new(Duration::from_secs(5), RetryConfig::disabled()).unwrap())
    }

    #[test]
    fn fields_take_rest_url() {
        let fields = dataset_fields("OSD-1", &json!({"REST_URL": "https://x/OSD-1"})).unwrap();
        assert_eq!(fields.title.as_deref(), Some("OSD-1"));
        assert_eq!(fields.status.as_deref(), Some("published"));
        assert!(fields.updated_at.is_none());
        assert_eq!(fields.details, json!({"rest_url": "https://x/OSD-1"}));
    }

    #[test]
    fn missing_rest_url_is_empty() {
        let fields = dataset_fields("OSD-2", &json!({})).unwrap();
        assert_eq!(fields.details["rest_url"], "");
    }

    #[tokio::test]
    async fn upserts_prefixed_keys_and_skips_bad_entries() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param("format", "json"))
            .and(query_param("limit", "100"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "OSD-1": {"REST_URL": "https://osdr/OSD-1"},
                "OSD-2": {"REST_URL": "https://osdr/OSD-2"},
                "OSD-3": "broken",
                "meta": {"REST_URL": "ignored"}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let store = Arc::new(MemoryStore::new());
        let collector = CatalogCollector::new(server.uri(), fetcher(), store.clone());

        let report = collector.collect().await.unwrap();
        assert_eq!(report.written, 2);
        assert_eq!(report.failed, 1);
        assert_eq!(store.count().await.unwrap(), 2);
        assert!(store.get("meta").await.unwrap().is_none());
        assert!(store.get("OSD-3").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn repeated_collection_does_not_duplicate() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"OSD-7": {"REST_URL": "https://osdr/OSD-7"}})),
            )
            .mount(&server)
            .await;

        let store = Arc::new(MemoryStore::new());
        let collector = CatalogCollector::new(server.uri(), fetcher(), store.clone());

        collector.collect().await.unwrap();
        let first = store.get("OSD-7").await.unwrap().unwrap();
        collector.collect().await.unwrap();
        let second = store.get("OSD-7").await.unwrap().unwrap();

        assert_eq!(store.count().await.unwrap(), 1);
        assert_eq!(first.id, second.id);
        assert_eq!(first.inserted_at, second.inserted_at);
    }

    #[tokio::test]
    async fn non_object_listing_is_a_shape_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!(["OSD-1"])))
            .mount(&server)
            .await;

        let store = Arc::new(MemoryStore::new());
        let collector = CatalogCollector::new(server.uri(), fetcher(), store.clone());
        let err = collector.collect().await.unwrap_err();
        assert!(matches!(err, HeimdallError::Shape(_)));
    }
}
