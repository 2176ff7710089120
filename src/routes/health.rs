use axum::{Json, http::StatusCode, response::IntoResponse};

/// Liveness probe; no auth, no database.
#[axum::debug_handler]
pub async fn health() -> impl IntoResponse {
    (StatusCode::OK, Json(serde_json::json!({ "status": "ok" })))
}
