//! End-to-end resolution scenarios through the public HTTP surface.
//!
//! Each test drives the full router with an in-memory volatile store and
//! a scripted fetcher, asserting on the `cached` provenance tag the API
//! returns for every degradation stage.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use tower::util::ServiceExt;

use vitibrasil_api::api::{build_router, AppState};
use vitibrasil_api::cache::{build_key, StoreUnavailable, VolatileStore, FALLBACK_PREFIX};
use vitibrasil_api::config::AppConfig;
use vitibrasil_api::endpoint::{normalize_params, Endpoint, Params};
use vitibrasil_api::record::{BodyGroup, CachedPayload, TableRecord};
use vitibrasil_api::scrape::{FetchError, LiveFetcher};

/// In-memory volatile store with an outage switch.
#[derive(Default)]
struct MemoryStore {
    entries: Mutex<HashMap<String, Vec<u8>>>,
    down: std::sync::atomic::AtomicBool,
}

impl MemoryStore {
    fn put_record(&self, key: &str, record: &TableRecord) {
        let payload = CachedPayload::new(record.clone());
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_string(), serde_json::to_vec(&payload).unwrap());
    }

    fn set_down(&self) {
        self.down.store(true, Ordering::Relaxed);
    }
}

#[async_trait]
impl VolatileStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreUnavailable> {
        if self.down.load(Ordering::Relaxed) {
            return Err(StoreUnavailable);
        }
        Ok(self.entries.lock().unwrap().get(key).cloned())
    }

    async fn set(&self, key: &str, value: &[u8], _ttl: Duration) -> bool {
        if self.down.load(Ordering::Relaxed) {
            return false;
        }
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_vec());
        true
    }

    async fn is_available(&self) -> bool {
        !self.down.load(Ordering::Relaxed)
    }
}

/// Fetcher that replays a scripted sequence of outcomes and counts calls.
struct ScriptedFetcher {
    outcomes: Mutex<VecDeque<Result<TableRecord, FetchError>>>,
    calls: AtomicUsize,
}

impl ScriptedFetcher {
    fn new(outcomes: Vec<Result<TableRecord, FetchError>>) -> Self {
        Self {
            outcomes: Mutex::new(outcomes.into()),
            calls: AtomicUsize::new(0),
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl LiveFetcher for ScriptedFetcher {
    async fn fetch(
        &self,
        _endpoint: Endpoint,
        _params: &Params,
    ) -> Result<TableRecord, FetchError> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        self.outcomes
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Err(FetchError::Timeout))
    }
}

fn scraped_record() -> TableRecord {
    TableRecord {
        header: vec![vec!["Produto".into(), "Quantidade (L.)".into()]],
        body: vec![BodyGroup {
            item_data: vec!["VINHO DE MESA".into(), "169.762.429".into()],
            sub_items: vec![vec!["Tinto".into(), "139.320.884".into()]],
        }],
        footer: vec![vec!["Total".into(), "457.792.870".into()]],
    }
}

fn older_record() -> TableRecord {
    TableRecord {
        header: vec![vec!["Produto".into(), "Quantidade (L.)".into()]],
        body: vec![BodyGroup {
            item_data: vec!["VINHO DE MESA".into(), "111.111.111".into()],
            sub_items: vec![],
        }],
        footer: vec![],
    }
}

struct TestApp {
    app: Router,
    store: Arc<MemoryStore>,
    fetcher: Arc<ScriptedFetcher>,
    _csv_dir: Option<tempfile::TempDir>,
}

fn test_app(outcomes: Vec<Result<TableRecord, FetchError>>, with_csv: bool) -> TestApp {
    let store = Arc::new(MemoryStore::default());
    let fetcher = Arc::new(ScriptedFetcher::new(outcomes));
    let (csv_dir, csv_path) = if with_csv {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("Producao.csv"),
            "Produto;Quantidade (L.)\nVINHO DE MESA;99\nTotal;99\n",
        )
        .unwrap();
        let path = dir.path().to_path_buf();
        (Some(dir), path)
    } else {
        (None, "/nonexistent".into())
    };
    let config = AppConfig {
        csv_dir: csv_path,
        ..AppConfig::default()
    };
    let app = build_router(AppState::new(config, store.clone(), fetcher.clone()));
    TestApp {
        app,
        store,
        fetcher,
        _csv_dir: csv_dir,
    }
}

fn authed(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header(
            header::AUTHORIZATION,
            format!("Basic {}", STANDARD.encode("user1:password1")),
        )
        .body(Body::empty())
        .unwrap()
}

async fn get_json(app: &Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let resp = app.clone().oneshot(authed(uri)).await.unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn fresh_then_short_term_without_second_fetch() {
    let tx = test_app(vec![Ok(scraped_record())], false);

    let (status, body) = get_json(&tx.app, "/producao?year=2023").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["cached"], false);
    assert_eq!(body["data"]["body"][0]["item_data"][0], "VINHO DE MESA");
    assert_eq!(tx.fetcher.calls(), 1);

    // Identical request within the freshness window: short-term tier
    // answers, the fetcher is not consulted again.
    let (status, body) = get_json(&tx.app, "/producao?year=2023").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["cached"], "short_term");
    assert_eq!(body["data"]["body"][0]["item_data"][0], "VINHO DE MESA");
    assert_eq!(tx.fetcher.calls(), 1);
}

#[tokio::test]
async fn fetch_failure_serves_long_term_tier() {
    let tx = test_app(vec![Err(FetchError::Timeout)], false);

    // Pre-populate the long-TTL tier the way a past successful fetch
    // would have.
    let params = normalize_params([("year", "2023")]);
    let key = build_key(Endpoint::Producao, &params);
    tx.store
        .put_record(&format!("{FALLBACK_PREFIX}{key}"), &older_record());

    let (status, body) = get_json(&tx.app, "/producao?year=2023").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["cached"], "fallback");
    assert_eq!(body["data"]["body"][0]["item_data"][1], "111.111.111");
}

#[tokio::test]
async fn store_outage_and_fetch_failure_serve_csv_fallback() {
    let tx = test_app(vec![Err(FetchError::Connect("refused".into()))], true);
    tx.store.set_down();

    let (status, body) = get_json(&tx.app, "/producao?year=2023").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["cached"], "csv_fallback");
    assert_eq!(body["data"]["body"][0]["item_data"][0], "VINHO DE MESA");
    assert_eq!(body["data"]["footer"][0][0], "Total");
}

#[tokio::test]
async fn total_exhaustion_is_503_with_tier_trace() {
    let tx = test_app(vec![Err(FetchError::Status(500))], false);
    tx.store.set_down();

    let (status, body) = get_json(&tx.app, "/producao?year=2023").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["status"], "data_unavailable");
    let tiers = body["tiers_tried"].as_array().unwrap();
    assert_eq!(tiers.len(), 4);
    assert_eq!(tiers[0]["tier"], "short_term");
    assert_eq!(tiers[1]["tier"], "live_fetch");
    assert_eq!(tiers[2]["tier"], "long_term");
    assert_eq!(tiers[3]["tier"], "static_fallback");
}

#[tokio::test]
async fn provenance_never_leaks_across_endpoints() {
    // A fresh producao fetch must not satisfy a comercializacao request:
    // the keys are namespaced per endpoint.
    let tx = test_app(
        vec![Ok(scraped_record()), Err(FetchError::Timeout)],
        false,
    );

    let (_, body) = get_json(&tx.app, "/producao?year=2023").await;
    assert_eq!(body["cached"], false);

    let (status, body) = get_json(&tx.app, "/comercializacao?year=2023").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["status"], "data_unavailable");
    assert_eq!(tx.fetcher.calls(), 2);
}

#[tokio::test]
async fn parameter_order_does_not_fragment_the_cache() {
    let tx = test_app(vec![Ok(scraped_record())], false);

    let (_, body) = get_json(&tx.app, "/producao?year=2023&sub_option=DERIVADOS").await;
    assert_eq!(body["cached"], false);

    // Same logical request, reversed parameter order: short-term hit.
    let (_, body) = get_json(&tx.app, "/producao?sub_option=DERIVADOS&year=2023").await;
    assert_eq!(body["cached"], "short_term");
    assert_eq!(tx.fetcher.calls(), 1);
}
