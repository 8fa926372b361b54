//! Service health and index endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use serde_json::{Value, json};

use crate::state::AppState;

/// `GET /health`.
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "service": "callbridge-gateway",
        "version": env!("CARGO_PKG_VERSION"),
        "active_sessions": state.sessions.count(),
        "transcode_mode": state.config.transcode_mode.as_str(),
    }))
}

/// `GET /`.
pub async fn index() -> Json<Value> {
    Json(json!({
        "service": "callbridge-gateway",
        "message": "Telephony to voice agent relay is running",
    }))
}
