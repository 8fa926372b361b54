//! Active session introspection endpoint.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use serde::Serialize;

use crate::session::SessionInfo;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct SessionsResponse {
    pub active_sessions: usize,
    pub sessions: Vec<SessionInfo>,
}

/// `GET /api/sessions`.
pub async fn list_sessions(State(state): State<Arc<AppState>>) -> Json<SessionsResponse> {
    Json(SessionsResponse {
        active_sessions: state.sessions.count(),
        sessions: state.sessions.snapshot(),
    })
}
