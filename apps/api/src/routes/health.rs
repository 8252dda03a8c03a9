use axum::Json;
use serde_json::{json, Value};

/// GET /health
/// Liveness probe. No auth, no dependency checks.
pub async fn health_handler() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "service": "wardrobe-api"
    }))
}
