//! Health check endpoint

use axum::{extract::State, http::StatusCode, Json};
use serde_json::{json, Value};
use tracing::{debug, warn};

use super::AppState;

/// Reports `UP` when the backend answers its health check, `DOWN` with a
/// 503 otherwise.
pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    debug!("Health check requested");
    let backend = state.backend.name();

    match state.backend.health_check().await {
        Ok(true) => (StatusCode::OK, Json(json!({ "status": "UP", "backend": backend }))),
        Ok(false) => {
            warn!(backend, "Backend reported unhealthy");
            down(backend, None)
        }
        Err(e) => {
            warn!(backend, "Backend health check failed: {}", e);
            down(backend, Some(e.to_string()))
        }
    }
}

fn down(backend: &str, error: Option<String>) -> (StatusCode, Json<Value>) {
    (
        StatusCode::SERVICE_UNAVAILABLE,
        Json(json!({ "status": "DOWN", "backend": backend, "error": error })),
    )
}
