//! Outbound call initiation against the telephony provider.
//!
//! A single REST call asks the provider to dial a number and point the
//! resulting call at our TwiML callback URL; everything after that flows
//! through the media WebSocket. No retries here: a failed dial is reported
//! to the API caller, who decides what to do with it.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use thiserror::Error;

/// Default telephony REST API base.
pub const DEFAULT_TWILIO_API_BASE: &str = "https://api.twilio.com";

/// E.164: leading `+` followed by 10-15 digits.
static E164_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\+\d{10,15}$").expect("valid regex"));

/// Validate a phone number in E.164 form.
pub fn is_valid_e164(number: &str) -> bool {
    E164_RE.is_match(number)
}

/// Errors raised while placing an outbound call.
#[derive(Debug, Error)]
pub enum OutboundError {
    /// Telephony credentials are not configured on this deployment
    #[error("Outbound calling is not configured")]
    NotConfigured,

    /// Number failed E.164 validation before any request was made
    #[error("Invalid phone number: {0}")]
    InvalidNumber(String),

    /// Provider unreachable or request failed in transit
    #[error("Call request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// Provider rejected the call
    #[error("Provider rejected call: status {status}")]
    Rejected { status: http::StatusCode },
}

pub type OutboundResult<T> = Result<T, OutboundError>;

/// Credentials and origin number for the telephony REST API.
#[derive(Debug, Clone)]
pub struct TwilioConfig {
    pub account_sid: String,
    pub auth_token: String,
    pub from_number: String,
    /// Overridable for tests.
    pub api_base: String,
}

#[derive(Debug, Deserialize)]
struct CallResponse {
    sid: String,
}

/// Place one outbound call, returning the provider's call SID.
///
/// `callback_url` is the TwiML endpoint the provider will fetch when the
/// callee answers; personalization travels on it as a query parameter.
pub async fn place_call(
    http: &reqwest::Client,
    config: &TwilioConfig,
    to_number: &str,
    callback_url: &str,
) -> OutboundResult<String> {
    if !is_valid_e164(to_number) {
        return Err(OutboundError::InvalidNumber(to_number.to_string()));
    }

    let url = format!(
        "{}/2010-04-01/Accounts/{}/Calls.json",
        config.api_base.trim_end_matches('/'),
        config.account_sid
    );

    let response = http
        .post(&url)
        .basic_auth(&config.account_sid, Some(&config.auth_token))
        .form(&[
            ("To", to_number),
            ("From", config.from_number.as_str()),
            ("Url", callback_url),
        ])
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        return Err(OutboundError::Rejected { status });
    }

    let body: CallResponse = response.json().await?;
    tracing::info!(sid = %body.sid, to = %to_number, "Outbound call started");
    Ok(body.sid)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_valid_e164_numbers() {
        assert!(is_valid_e164("+14155552671"));
        assert!(is_valid_e164("+442071838750"));
    }

    #[test]
    fn rejects_invalid_numbers() {
        assert!(!is_valid_e164("14155552671")); // no plus
        assert!(!is_valid_e164("+1415555")); // too short
        assert!(!is_valid_e164("+1415555267123456")); // too long
        assert!(!is_valid_e164("+1 415 555 2671")); // spaces
        assert!(!is_valid_e164(""));
    }

    #[tokio::test]
    async fn invalid_number_fails_before_any_request() {
        let http = reqwest::Client::new();
        let config = TwilioConfig {
            account_sid: "AC123".to_string(),
            auth_token: "token".to_string(),
            from_number: "+15550000000".to_string(),
            // Unroutable base proves no request is attempted.
            api_base: "http://127.0.0.1:1".to_string(),
        };
        let err = place_call(&http, &config, "not-a-number", "http://cb")
            .await
            .unwrap_err();
        assert!(matches!(err, OutboundError::InvalidNumber(_)));
    }

    #[tokio::test]
    async fn provider_rejection_surfaces_status() {
        use wiremock::matchers::{method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/2010-04-01/Accounts/AC123/Calls.json"))
            .respond_with(ResponseTemplate::new(400))
            .mount(&server)
            .await;

        let http = reqwest::Client::new();
        let config = TwilioConfig {
            account_sid: "AC123".to_string(),
            auth_token: "token".to_string(),
            from_number: "+15550000000".to_string(),
            api_base: server.uri(),
        };
        let err = place_call(&http, &config, "+14155552671", "http://cb")
            .await
            .unwrap_err();
        assert!(matches!(err, OutboundError::Rejected { status } if status.as_u16() == 400));
    }

    #[tokio::test]
    async fn successful_call_returns_sid() {
        use wiremock::matchers::{body_string_contains, method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/2010-04-01/Accounts/AC123/Calls.json"))
            .and(body_string_contains("To=%2B14155552671"))
            .respond_with(
                ResponseTemplate::new(201)
                    .set_body_json(serde_json::json!({"sid": "CA0011", "status": "queued"})),
            )
            .mount(&server)
            .await;

        let http = reqwest::Client::new();
        let config = TwilioConfig {
            account_sid: "AC123".to_string(),
            auth_token: "token".to_string(),
            from_number: "+15550000000".to_string(),
            api_base: server.uri(),
        };
        let sid = place_call(&http, &config, "+14155552671", "http://cb")
            .await
            .unwrap();
        assert_eq!(sid, "CA0011");
    }
}
