/*
 * Responsibility
 * - GET /health (liveness)
 * - Mounted outside the identity middleware: never touches the token authority
 */
use axum::{Json, http::StatusCode, response::IntoResponse};
use serde_json::json;

pub async fn health() -> impl IntoResponse {
    (StatusCode::OK, Json(json!({"status": "ok"})))
}
