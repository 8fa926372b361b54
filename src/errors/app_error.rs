//! Application-level error type for HTTP handlers.
//!
//! Relay-internal faults (per-chunk transcode failures, per-message decode
//! failures, peer disconnects) never surface here: they are absorbed or
//! handled inside the media session. `AppError` covers only the
//! request/response surfaces.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

use crate::core::telephony::OutboundError;

/// Errors returned from REST handlers.
#[derive(Debug, Error)]
pub enum AppError {
    /// Client supplied an invalid request
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// A required capability is not configured on this deployment
    #[error("Not configured: {0}")]
    NotConfigured(String),

    /// An upstream provider rejected or failed a request
    #[error("Upstream failure: {0}")]
    Upstream(String),
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotConfigured(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Upstream(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = Json(json!({
            "success": false,
            "message": self.to_string(),
        }));
        (status, body).into_response()
    }
}

impl From<OutboundError> for AppError {
    fn from(err: OutboundError) -> Self {
        match err {
            OutboundError::NotConfigured => {
                AppError::NotConfigured("outbound calling".to_string())
            }
            OutboundError::InvalidNumber(n) => {
                AppError::BadRequest(format!("Missing or invalid phone number: {n}"))
            }
            OutboundError::Transport(e) => AppError::Upstream(e.to_string()),
            OutboundError::Rejected { status } => {
                AppError::Upstream(format!("call rejected with status {status}"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bad_request_maps_to_400() {
        assert_eq!(
            AppError::BadRequest("nope".to_string()).status(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn outbound_errors_convert() {
        let err: AppError = OutboundError::NotConfigured.into();
        assert_eq!(err.status(), StatusCode::SERVICE_UNAVAILABLE);

        let err: AppError = OutboundError::InvalidNumber("x".to_string()).into();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }
}
