use axum::{http::StatusCode, Json};
use serde_json::{json, Value};

/// Liveness check; does not touch the store or upstream services.
pub async fn health_check() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "ok" })))
}
