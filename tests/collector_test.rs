//! End-to-end tests: config-built collectors against a wiremock upstream,
//! read back through the gateway.

use std::sync::Arc;

use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use heimdall::config::Config;
use heimdall::{
    ErrorKind, Heimdall, MemoryStore, RefreshStatus, Scheduler, SpaceDataGateway, SpaceGateway,
};

/// Config whose every upstream lives on `server`, with fast retries.
fn config_for(server: &MockServer) -> Config {
    let base = server.uri();
    let mut config = Config::default();
    config.http.max_retries = 1;
    config.http.backoff_jitter_ms = 0;
    config.upstream.nasa_api_key = "test-key".into();
    config.upstream.iss_url = format!("{base}/v1/satellites/25544");
    config.upstream.osdr_url = format!("{base}/osdr/datasets/");
    config.upstream.apod_url = format!("{base}/planetary/apod");
    config.upstream.neo_url = format!("{base}/neo/rest/v1/feed");
    config.upstream.donki_flr_url = format!("{base}/DONKI/FLR");
    config.upstream.donki_cme_url = format!("{base}/DONKI/CME");
    config.upstream.spacex_url = format!("{base}/v4/launches/next");
    config
}

fn gateway(server: &MockServer, store: &Arc<MemoryStore>) -> SpaceGateway {
    Heimdall::builder()
        .config(config_for(server))
        .store(store.clone())
        .default_collectors()
        .build()
        .unwrap()
}

async fn mount_all(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/planetary/apod"))
        .and(query_param("api_key", "test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"title": "Orion"})))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/neo/rest/v1/feed"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"element_count": 12})))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/DONKI/FLR"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"classType": "X1.0"}])))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/DONKI/CME"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v4/launches/next"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"name": "Transporter-12"})))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/satellites/25544"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "latitude": -12.5,
            "longitude": 130.8,
            "altitude": 418.0,
            "velocity": 27_580.0,
            "visibility": "daylight"
        })))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/osdr/datasets/"))
        .and(query_param("format", "json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "OSD-100": {"REST_URL": "https://osdr/OSD-100"},
            "OSD-101": {"REST_URL": "https://osdr/OSD-101"}
        })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn read_on_empty_store_refreshes_from_upstream() {
    let server = MockServer::start().await;
    mount_all(&server).await;
    let store = Arc::new(MemoryStore::new());
    let gateway = gateway(&server, &store);

    let flares = gateway.get_latest("donki_flr").await.unwrap();
    assert_eq!(flares.data["flares"][0]["classType"], "X1.0");
    assert!(!flares.is_stale);

    let neo = gateway.get_latest("neo").await.unwrap();
    assert_eq!(neo.data["element_count"], 12);
}

#[tokio::test]
async fn refresh_all_fills_every_table() {
    let server = MockServer::start().await;
    mount_all(&server).await;
    let store = Arc::new(MemoryStore::new());
    let gateway = gateway(&server, &store);

    let statuses = gateway.refresh_all().await;
    assert_eq!(statuses.len(), 7);
    assert!(statuses.values().all(RefreshStatus::is_success), "{statuses:?}");

    assert_eq!(gateway.latest_any("spacex").await.unwrap().data["name"], "Transporter-12");
    assert_eq!(gateway.latest_position().await.unwrap().position.altitude_km, 418.0);

    let page = gateway.list_catalog(10, 0).await.unwrap();
    assert_eq!(page.total, 2);
    let item = gateway.get_catalog_item("OSD-101").await.unwrap();
    assert_eq!(item.fields.details["rest_url"], "https://osdr/OSD-101");
}

#[tokio::test]
async fn upstream_outage_after_warm_up_serves_cached_data() {
    let server = MockServer::start().await;
    mount_all(&server).await;
    let store = Arc::new(MemoryStore::new());
    let gateway = gateway(&server, &store);

    let mut scheduler = Scheduler::new(gateway.jobs());
    scheduler.start().await.unwrap();
    scheduler.shutdown();

    // Upstream goes away entirely; reads still answer from the store.
    server.reset().await;
    let apod = gateway.get_latest("apod").await.unwrap();
    assert_eq!(apod.data["title"], "Orion");
    assert!(!apod.is_stale);
}

#[tokio::test]
async fn outage_with_nothing_cached_is_no_data() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    let store = Arc::new(MemoryStore::new());
    let gateway = gateway(&server, &store);

    let err = gateway.get_latest("cme").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NoData);
    assert!(err.to_string().contains("Upstream API error: 500"));

    let statuses = gateway.refresh_all().await;
    assert!(statuses.values().all(|s| !s.is_success()));
}
