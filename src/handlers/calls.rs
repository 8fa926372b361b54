//! Outbound call initiation endpoint.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::info;

use crate::core::telephony::{OutboundError, place_call};
use crate::errors::app_error::AppResult;
use crate::state::AppState;

/// Body for `POST /api/start-call`. Field names are accepted in both
/// snake_case and camelCase since different dialer frontends disagree.
#[derive(Debug, Deserialize)]
pub struct StartCallRequest {
    #[serde(alias = "phoneNumber", default)]
    pub phone_number: Option<String>,
    #[serde(alias = "prospectName", default)]
    pub prospect_name: Option<String>,
}

/// Place an outbound call. The voice webhook URL carries the prospect name
/// so personalization survives the provider round trip.
pub async fn start_call(
    State(state): State<Arc<AppState>>,
    Json(request): Json<StartCallRequest>,
) -> AppResult<Json<Value>> {
    let twilio = state
        .config
        .twilio
        .as_ref()
        .ok_or(OutboundError::NotConfigured)?;

    let phone_number = request.phone_number.unwrap_or_default();
    let callback_url = state
        .config
        .voice_callback_url(request.prospect_name.as_deref());

    let call_sid = place_call(&state.http, twilio, &phone_number, &callback_url).await?;
    info!(%call_sid, "Outbound call placed");

    Ok(Json(json!({
        "success": true,
        "call_sid": call_sid,
    })))
}
