//! API authentication middleware.
//!
//! Checks `Authorization: Basic <credentials>` on every request, skipping
//! the heartbeat (liveness probes carry no credentials). Comparison is
//! constant-time on both username and password.

use axum::{
    extract::State,
    http::{header, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde_json::json;
use std::sync::Arc;
use subtle::ConstantTimeEq;

use super::server::AppState;

/// Middleware enforcing Basic auth on all protected routes.
///
/// Skips auth for:
/// - `GET /heartbeat` — liveness probe, no auth required
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    request: Request<axum::body::Body>,
    next: Next,
) -> Response {
    if request.uri().path() == "/heartbeat" {
        return next.run(request).await;
    }

    let authorized = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(|header| verify_basic(header, &state.config.username, &state.config.password))
        .unwrap_or(false);

    if authorized {
        next.run(request).await
    } else {
        unauthorized()
    }
}

/// Validate a `Basic <base64(user:pass)>` header value.
fn verify_basic(header: &str, username: &str, password: &str) -> bool {
    let Some(encoded) = header.strip_prefix("Basic ") else {
        return false;
    };
    let Ok(decoded) = STANDARD.decode(encoded.trim()) else {
        return false;
    };
    let Ok(text) = String::from_utf8(decoded) else {
        return false;
    };
    let Some((user, pass)) = text.split_once(':') else {
        return false;
    };
    let user_ok = user.as_bytes().ct_eq(username.as_bytes());
    let pass_ok = pass.as_bytes().ct_eq(password.as_bytes());
    bool::from(user_ok & pass_ok)
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        [(header::WWW_AUTHENTICATE, "Basic realm=\"vitibrasil-api\"")],
        Json(json!({
            "error": "Unauthorized",
            "status": "authentication_error",
        })),
    )
        .into_response()
}
