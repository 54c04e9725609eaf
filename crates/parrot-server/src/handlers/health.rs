//! Liveness and root endpoints.

use axum::Json;
use axum::response::IntoResponse;
use serde_json::json;

/// `GET /health` — readiness/liveness probe.
pub async fn health() -> impl IntoResponse {
    Json(json!({ "ok": true }))
}

/// `GET /` — service banner, handy when probing the server from a browser.
pub async fn root() -> impl IntoResponse {
    Json(json!({ "status": "ok", "service": "parrot" }))
}
