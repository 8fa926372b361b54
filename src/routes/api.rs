use axum::{
    Router,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

use crate::handlers::{api, calls, events, sessions, voice};
use crate::state::AppState;
use std::sync::Arc;

/// Create the REST and SSE router.
pub fn create_api_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(api::index))
        .route("/health", get(api::health_check))
        .route("/twilio-voice", post(voice::voice_webhook))
        .route("/api/start-call", post(calls::start_call))
        .route("/api/call-events", get(events::call_events))
        .route("/api/sessions", get(sessions::list_sessions))
        .layer(TraceLayer::new_for_http())
}
