//! Request handlers.

pub mod download;
pub mod fetch;
pub mod jobs;
pub mod process;
pub mod upload;

use axum::Json;
use serde_json::{json, Value};

/// Health check.
pub async fn health() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "service": "clipsmith",
    }))
}
