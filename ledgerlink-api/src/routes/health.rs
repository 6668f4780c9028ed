//! Liveness endpoints

use axum::{extract::State, Json};
use serde_json::{json, Value as JsonValue};

use crate::state::AppState;

/// Root banner
pub async fn root() -> Json<JsonValue> {
    Json(json!({ "message": "API is running" }))
}

/// Health check
pub async fn health_check(State(state): State<AppState>) -> Json<JsonValue> {
    Json(json!({ "status": "ok", "version": state.version }))
}
