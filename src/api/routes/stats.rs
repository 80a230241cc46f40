//! Operational statistics endpoint.
//!
//! Read-only snapshot of the resolution counters, the CSV result cache,
//! and the static inventory. Reads advisory state only — it can never
//! block or fail a data request.

use axum::extract::State;
use axum::Json;
use chrono::Utc;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::api::server::AppState;

/// GET /cache/stats — Basic-auth protected.
pub async fn cache_stats(State(state): State<Arc<AppState>>) -> Json<Value> {
    let redis = state.store.is_available().await;
    Json(json!({
        "redis_available": redis,
        "ttl_seconds": {
            "short_cache": state.config.short_cache_ttl.as_secs(),
            "fallback_cache": state.config.fallback_cache_ttl.as_secs(),
        },
        "resolution": state.metrics.snapshot(),
        "csv_result_cache": state.fallback.cache_stats(),
        "csv_inventory": state.fallback.validate_inventory(),
        "timestamp": Utc::now().to_rfc3339(),
    }))
}
