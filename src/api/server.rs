//! Axum API server: shared state, router assembly, startup.

use axum::middleware as axum_mw;
use axum::routing::get;
use axum::Router;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::cache::{CacheMetrics, TieredCache, VolatileStore};
use crate::config::AppConfig;
use crate::error::{Result, VitiError};
use crate::fallback::StaticFallbackStore;
use crate::scrape::LiveFetcher;

/// Shared state for all API handlers.
pub struct AppState {
    pub config: Arc<AppConfig>,
    /// Volatile store handle, shared with the coordinator; the routes
    /// use it only for availability probes.
    pub store: Arc<dyn VolatileStore>,
    pub fallback: Arc<StaticFallbackStore>,
    pub fetcher: Arc<dyn LiveFetcher>,
    pub metrics: Arc<CacheMetrics>,
    pub cache: Arc<TieredCache>,
}

impl AppState {
    /// Wire the coordinator and its collaborators from configuration.
    pub fn new(
        config: AppConfig,
        store: Arc<dyn VolatileStore>,
        fetcher: Arc<dyn LiveFetcher>,
    ) -> Self {
        let fallback = Arc::new(StaticFallbackStore::new(
            &config.csv_dir,
            config.csv_cache_max,
            config.csv_cache_ttl,
        ));
        let metrics = Arc::new(CacheMetrics::new());
        let cache = Arc::new(TieredCache::new(
            store.clone(),
            fallback.clone(),
            metrics.clone(),
            config.short_cache_ttl,
            config.fallback_cache_ttl,
        ));
        Self {
            config: Arc::new(config),
            store,
            fallback,
            fetcher,
            metrics,
            cache,
        }
    }
}

/// Build the axum router with all API routes.
pub fn build_router(state: AppState) -> Router {
    // Wrap state in Arc once so the auth middleware and the handlers
    // share it without a double-Arc.
    let shared_state = Arc::new(state);

    Router::new()
        // Public liveness probe
        .route("/heartbeat", get(super::routes::heartbeat::heartbeat))
        // Data endpoints (Basic auth)
        .route("/producao", get(super::routes::data::producao))
        .route("/processamento", get(super::routes::data::processamento))
        .route("/comercializacao", get(super::routes::data::comercializacao))
        .route("/importacao", get(super::routes::data::importacao))
        .route("/exportacao", get(super::routes::data::exportacao))
        // Operational surface (Basic auth)
        .route("/cache/stats", get(super::routes::stats::cache_stats))
        .layer(TraceLayer::new_for_http())
        .layer(axum_mw::from_fn_with_state(
            shared_state.clone(),
            super::middleware::auth_middleware,
        ))
        .with_state(shared_state)
}

/// Start the API server.
pub async fn start_server(state: AppState) -> Result<()> {
    let addr = format!("{}:{}", state.config.bind, state.config.port);
    let app = build_router(state);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| VitiError::Server(format!("Failed to bind {addr}: {e}")))?;
    tracing::info!("API server listening on {addr}");
    axum::serve(listener, app)
        .await
        .map_err(|e| VitiError::Server(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::StoreUnavailable;
    use crate::endpoint::{Endpoint, Params};
    use crate::record::{BodyGroup, TableRecord};
    use crate::scrape::FetchError;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::time::Duration;
    use tower::util::ServiceExt;

    /// In-memory volatile store; no outage behavior needed here.
    #[derive(Default)]
    struct MemoryStore {
        entries: Mutex<HashMap<String, Vec<u8>>>,
    }

    #[async_trait]
    impl VolatileStore for MemoryStore {
        async fn get(
            &self,
            key: &str,
        ) -> std::result::Result<Option<Vec<u8>>, StoreUnavailable> {
            Ok(self.entries.lock().unwrap().get(key).cloned())
        }

        async fn set(&self, key: &str, value: &[u8], _ttl: Duration) -> bool {
            self.entries
                .lock()
                .unwrap()
                .insert(key.to_string(), value.to_vec());
            true
        }

        async fn is_available(&self) -> bool {
            true
        }
    }

    /// A store that is always unreachable.
    struct DownStore;

    #[async_trait]
    impl VolatileStore for DownStore {
        async fn get(
            &self,
            _key: &str,
        ) -> std::result::Result<Option<Vec<u8>>, StoreUnavailable> {
            Err(StoreUnavailable)
        }

        async fn set(&self, _key: &str, _value: &[u8], _ttl: Duration) -> bool {
            false
        }

        async fn is_available(&self) -> bool {
            false
        }
    }

    /// Fetcher with a fixed outcome.
    struct FixedFetcher(std::result::Result<TableRecord, FetchError>);

    #[async_trait]
    impl LiveFetcher for FixedFetcher {
        async fn fetch(
            &self,
            _endpoint: Endpoint,
            _params: &Params,
        ) -> std::result::Result<TableRecord, FetchError> {
            self.0.clone()
        }
    }

    fn record() -> TableRecord {
        TableRecord {
            header: vec![vec!["Produto".into()]],
            body: vec![BodyGroup {
                item_data: vec!["VINHO".into()],
                sub_items: vec![],
            }],
            footer: vec![],
        }
    }

    fn test_config() -> AppConfig {
        AppConfig {
            csv_dir: "/nonexistent".into(),
            ..AppConfig::default()
        }
    }

    fn make_app(store: Arc<dyn VolatileStore>, fetcher: Arc<dyn LiveFetcher>) -> Router {
        build_router(AppState::new(test_config(), store, fetcher))
    }

    fn basic_auth() -> String {
        format!("Basic {}", STANDARD.encode("user1:password1"))
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_heartbeat_skips_auth() {
        let app = make_app(
            Arc::new(DownStore),
            Arc::new(FixedFetcher(Ok(record()))),
        );
        let req = Request::builder()
            .uri("/heartbeat")
            .body(Body::empty())
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body = body_json(resp).await;
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["redis"], "disconnected");
    }

    #[tokio::test]
    async fn test_data_route_requires_auth() {
        let app = make_app(
            Arc::new(MemoryStore::default()),
            Arc::new(FixedFetcher(Ok(record()))),
        );
        let req = Request::builder()
            .uri("/producao")
            .body(Body::empty())
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        assert!(resp.headers().contains_key(header::WWW_AUTHENTICATE));
    }

    #[tokio::test]
    async fn test_data_route_serves_fresh_record() {
        let app = make_app(
            Arc::new(MemoryStore::default()),
            Arc::new(FixedFetcher(Ok(record()))),
        );
        let req = Request::builder()
            .uri("/producao?year=2023")
            .header(header::AUTHORIZATION, basic_auth())
            .body(Body::empty())
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body = body_json(resp).await;
        assert_eq!(body["cached"], false);
        assert_eq!(body["year"], "2023");
        assert_eq!(body["data"]["body"][0]["item_data"][0], "VINHO");
    }

    #[tokio::test]
    async fn test_invalid_year_is_400() {
        let app = make_app(
            Arc::new(MemoryStore::default()),
            Arc::new(FixedFetcher(Ok(record()))),
        );
        let req = Request::builder()
            .uri("/producao?year=1800")
            .header(header::AUTHORIZATION, basic_auth())
            .body(Body::empty())
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body = body_json(resp).await;
        assert_eq!(body["status"], "parameter_error");
    }

    #[tokio::test]
    async fn test_exhaustion_is_503_not_500() {
        let app = make_app(
            Arc::new(DownStore),
            Arc::new(FixedFetcher(Err(FetchError::Timeout))),
        );
        let req = Request::builder()
            .uri("/exportacao")
            .header(header::AUTHORIZATION, basic_auth())
            .body(Body::empty())
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
        let body = body_json(resp).await;
        assert_eq!(body["status"], "data_unavailable");
        assert_eq!(body["tiers_tried"].as_array().unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_stats_route_protected_and_reports() {
        let app = make_app(
            Arc::new(MemoryStore::default()),
            Arc::new(FixedFetcher(Ok(record()))),
        );
        let unauthorized = Request::builder()
            .uri("/cache/stats")
            .body(Body::empty())
            .unwrap();
        let resp = app.clone().oneshot(unauthorized).await.unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

        let authorized = Request::builder()
            .uri("/cache/stats")
            .header(header::AUTHORIZATION, basic_auth())
            .body(Body::empty())
            .unwrap();
        let resp = app.oneshot(authorized).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body = body_json(resp).await;
        assert_eq!(body["redis_available"], true);
        assert_eq!(body["ttl_seconds"]["short_cache"], 300);
        assert!(body["csv_inventory"]["entries"].is_array());
    }
}
