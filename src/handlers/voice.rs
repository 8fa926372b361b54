//! Telephony voice webhook: answers a call with TwiML that connects the
//! call's media stream to our WebSocket endpoint.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use tracing::info;

use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct VoiceQuery {
    #[serde(default)]
    pub prospect_name: Option<String>,
}

/// `POST /twilio-voice`. The provider fetches this when a call is answered;
/// the returned document tells it to open a bidirectional media stream.
pub async fn voice_webhook(
    Query(query): Query<VoiceQuery>,
    State(state): State<Arc<AppState>>,
) -> Response {
    let stream_url = state
        .config
        .media_stream_url(query.prospect_name.as_deref());
    info!(prospect = ?query.prospect_name, "Answering call with media stream TwiML");

    let twiml = format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\
         <Response><Connect><Stream url=\"{}\" /></Connect></Response>",
        xml_escape(&stream_url)
    );

    ([(header::CONTENT_TYPE, "application/xml")], twiml).into_response()
}

fn xml_escape(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
