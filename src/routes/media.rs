//! Telephony media WebSocket route configuration
//!
//! `GET /twilio-media` - WebSocket upgrade for the bidirectional media
//! stream. The telephony provider connects here after receiving the TwiML
//! returned by `POST /twilio-voice`. An optional `prospect_name` query
//! parameter personalizes the agent session.

use axum::{Router, routing::get};
use tower_http::trace::TraceLayer;

use crate::config::MEDIA_STREAM_PATH;
use crate::handlers::media_stream_handler;
use crate::state::AppState;
use std::sync::Arc;

/// Create the media stream router.
pub fn create_media_router() -> Router<Arc<AppState>> {
    Router::new()
        .route(MEDIA_STREAM_PATH, get(media_stream_handler))
        .layer(TraceLayer::new_for_http())
}
