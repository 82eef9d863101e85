//! Health check endpoint.

use axum::Json;
use serde_json::{json, Value};

/// Liveness probe. Returns 200 whenever the server is accepting requests,
/// which by startup sequencing also means the backfill has finished.
pub async fn health_check() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
