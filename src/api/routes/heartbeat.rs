//! Public liveness endpoint.

use axum::extract::State;
use axum::Json;
use chrono::Utc;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::api::server::AppState;

/// GET /heartbeat — service liveness plus the availability of each
/// degradation layer. Never requires credentials.
pub async fn heartbeat(State(state): State<Arc<AppState>>) -> Json<Value> {
    let redis = state.store.is_available().await;
    let csv = state.fallback.is_available();
    Json(json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": Utc::now().to_rfc3339(),
        "redis": if redis { "connected" } else { "disconnected" },
        "csv_fallback": if csv { "available" } else { "unavailable" },
    }))
}
