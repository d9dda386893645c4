//! Health check endpoints.

use axum::Json;
use axum::extract::State;
use serde_json::{Value, json};

use crate::state::AppState;

/// GET /api/health — liveness probe.
pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// GET /api/health/detailed — liveness plus engine counters.
pub async fn health_detailed(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "connections": state.engine.connections.connection_count(),
        "users_online": state.engine.connections.user_count(),
        "metrics": state.engine.metrics.snapshot(),
    }))
}
