//! Liveness and readiness probes.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use serde_json::{Value, json};

use crate::registry::SessionRegistry;

pub(crate) fn routes(registry: Arc<SessionRegistry>) -> Router {
    Router::new()
        .route("/health/live", get(live))
        .route("/health/ready", get(ready))
        .with_state(registry)
}

async fn live() -> Json<Value> {
    Json(json!({
        "status": "alive",
        "timestamp": Utc::now().to_rfc3339(),
    }))
}

/// Ready once backend initialization has finished, whatever its outcome.
async fn ready(State(registry): State<Arc<SessionRegistry>>) -> (StatusCode, Json<Value>) {
    let timestamp = Utc::now().to_rfc3339();
    if !registry.is_initialized() {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "status": "not ready", "timestamp": timestamp })),
        );
    }

    let snapshot = registry.snapshot();
    let healthy = snapshot.iter().filter(|backend| backend.state.is_healthy()).count();
    (
        StatusCode::OK,
        Json(json!({
            "status": "ready",
            "timestamp": timestamp,
            "backendCount": snapshot.len(),
            "healthyCount": healthy,
        })),
    )
}
