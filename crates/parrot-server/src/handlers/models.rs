//! Model-listing endpoint.
//!
//! `GET /v1/models` (and the legacy `/models` alias) — a static list; the
//! simulator accepts any model id and echoes it back, these entries exist so
//! clients that enumerate models before chatting find something to pick.

use axum::Json;
use axum::response::IntoResponse;
use serde_json::json;

/// `GET /v1/models`
pub async fn list_models() -> impl IntoResponse {
    Json(json!({
        "object": "list",
        "data": [
            { "id": "gpt-sim-1", "object": "model", "owned_by": "parrot" },
            { "id": "gpt-4o", "object": "model", "owned_by": "parrot" },
            { "id": "gpt-3.5-turbo", "object": "model", "owned_by": "parrot" },
        ],
    }))
}
