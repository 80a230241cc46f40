//! The five data endpoints.
//!
//! Each route validates its parameters, hands the request to the tier
//! coordinator, and formats the outcome. One shared handler; the route
//! functions only pin the endpoint.

use axum::extract::{Query, State};
use axum::response::{IntoResponse, Response};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

use crate::api::{response, server::AppState};
use crate::endpoint::{normalize_params, validate_params, Endpoint};

pub async fn producao(
    state: State<Arc<AppState>>,
    query: Query<HashMap<String, String>>,
) -> Response {
    handle(Endpoint::Producao, state, query).await
}

pub async fn processamento(
    state: State<Arc<AppState>>,
    query: Query<HashMap<String, String>>,
) -> Response {
    handle(Endpoint::Processamento, state, query).await
}

pub async fn comercializacao(
    state: State<Arc<AppState>>,
    query: Query<HashMap<String, String>>,
) -> Response {
    handle(Endpoint::Comercializacao, state, query).await
}

pub async fn importacao(
    state: State<Arc<AppState>>,
    query: Query<HashMap<String, String>>,
) -> Response {
    handle(Endpoint::Importacao, state, query).await
}

pub async fn exportacao(
    state: State<Arc<AppState>>,
    query: Query<HashMap<String, String>>,
) -> Response {
    handle(Endpoint::Exportacao, state, query).await
}

async fn handle(
    endpoint: Endpoint,
    State(state): State<Arc<AppState>>,
    Query(raw): Query<HashMap<String, String>>,
) -> Response {
    let params = normalize_params(raw);
    info!(%endpoint, ?params, "Processing data request");

    if let Err(message) = validate_params(endpoint, &params) {
        return response::parameter_error(endpoint, &message, &params).into_response();
    }

    match state
        .cache
        .resolve(endpoint, &params, state.fetcher.as_ref())
        .await
    {
        Ok(entry) => response::success(endpoint, &entry, &params, &state.config).into_response(),
        Err(exhausted) => {
            let redis_available = state.store.is_available().await;
            let csv_available = state.fallback.is_available();
            response::unavailable(endpoint, &exhausted, &params, redis_available, csv_available)
                .into_response()
        }
    }
}
