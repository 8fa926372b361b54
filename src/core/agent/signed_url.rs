//! Session establishment against the agent provider.
//!
//! Before the agent WebSocket can be opened, the gateway performs a one-time
//! signed-URL handshake: one HTTP call that exchanges the agent identifier
//! (and optional per-call personalization variables) for a short-lived
//! connection URL. A failed handshake means the session never starts; the
//! caller closes the telephony socket without touching the agent side.

use std::time::Duration;

use serde::Deserialize;
use serde_json::json;
use thiserror::Error;

/// Path of the signed-URL endpoint, relative to the provider API base.
pub const SIGNED_URL_PATH: &str = "/v1/convai/conversation/get-signed-url";

/// Default provider API base.
pub const DEFAULT_API_BASE: &str = "https://api.elevenlabs.io";

/// Errors raised while establishing an agent session.
#[derive(Debug, Error)]
pub enum EstablishError {
    /// Provider unreachable, TLS failure, or request timeout
    #[error("Signed URL request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// Provider answered with a non-success status
    #[error("Provider returned status {0}")]
    BadStatus(http::StatusCode),

    /// Success response without the connection descriptor
    #[error("Provider response missing signed_url")]
    MissingDescriptor,
}

pub type EstablishResult<T> = Result<T, EstablishError>;

/// Caller-specific variables injected into the establishment request so the
/// agent can tailor its opening behaviour.
#[derive(Debug, Clone)]
pub struct Personalization {
    pub prospect_name: String,
}

impl Personalization {
    /// Structured variables attached to the establishment request body.
    /// Never string-concatenated into the URL.
    pub fn dynamic_variables(&self) -> serde_json::Value {
        json!({
            "prospect_name": self.prospect_name,
            "system_prompt": format!(
                "You are a friendly assistant calling {}. Be warm and professional. \
                 Use their name naturally in conversation when appropriate.",
                self.prospect_name
            ),
        })
    }

    /// Opening line for the priming message.
    pub fn greeting(&self) -> String {
        format!("Hello {}, how can I help you?", self.prospect_name)
    }
}

/// Greeting used when no personalization context is available.
pub const DEFAULT_GREETING: &str = "Hello, how can I help you?";

#[derive(Debug, Deserialize)]
struct SignedUrlResponse {
    signed_url: Option<String>,
}

/// Fetch a one-time signed WebSocket URL for the given agent.
///
/// Personalization, when present, is sent as a `dynamic_variables` object in
/// a POST body; without it the call is a plain GET. The request is bounded
/// by `timeout` so a hung provider cannot hold the telephony socket open.
pub async fn fetch_signed_url(
    http: &reqwest::Client,
    api_base: &str,
    api_key: &str,
    agent_id: &str,
    personalization: Option<&Personalization>,
    timeout: Duration,
) -> EstablishResult<String> {
    let url = format!(
        "{}{}?agent_id={}",
        api_base.trim_end_matches('/'),
        SIGNED_URL_PATH,
        agent_id
    );

    let request = match personalization {
        Some(p) => http
            .post(&url)
            .json(&json!({ "dynamic_variables": p.dynamic_variables() })),
        None => http.get(&url),
    };

    let response = request
        .header("xi-api-key", api_key)
        .timeout(timeout)
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        return Err(EstablishError::BadStatus(status));
    }

    let body: SignedUrlResponse = response.json().await?;
    body.signed_url.ok_or(EstablishError::MissingDescriptor)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dynamic_variables_carry_name_and_prompt() {
        let p = Personalization {
            prospect_name: "Jordan".to_string(),
        };
        let vars = p.dynamic_variables();
        assert_eq!(vars["prospect_name"], "Jordan");
        assert!(vars["system_prompt"].as_str().unwrap().contains("Jordan"));
    }

    #[test]
    fn greeting_is_personalized() {
        let p = Personalization {
            prospect_name: "Jordan".to_string(),
        };
        assert_eq!(p.greeting(), "Hello Jordan, how can I help you?");
        assert_ne!(p.greeting(), DEFAULT_GREETING);
    }

    #[tokio::test]
    async fn missing_descriptor_is_an_establish_error() {
        let server = wiremock_stub(serde_json::json!({"ok": true})).await;
        let http = reqwest::Client::new();
        let err = fetch_signed_url(
            &http,
            &server.uri(),
            "key",
            "agent",
            None,
            Duration::from_secs(2),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, EstablishError::MissingDescriptor));
    }

    #[tokio::test]
    async fn non_success_status_is_an_establish_error() {
        use wiremock::matchers::{method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(SIGNED_URL_PATH))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let http = reqwest::Client::new();
        let err = fetch_signed_url(
            &http,
            &server.uri(),
            "bad-key",
            "agent",
            None,
            Duration::from_secs(2),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, EstablishError::BadStatus(s) if s.as_u16() == 401));
    }

    #[tokio::test]
    async fn personalization_switches_to_post_with_variables() {
        use wiremock::matchers::{body_partial_json, method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(SIGNED_URL_PATH))
            .and(body_partial_json(
                serde_json::json!({"dynamic_variables": {"prospect_name": "Sam"}}),
            ))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"signed_url": "wss://example/ws"})),
            )
            .mount(&server)
            .await;

        let http = reqwest::Client::new();
        let p = Personalization {
            prospect_name: "Sam".to_string(),
        };
        let url = fetch_signed_url(
            &http,
            &server.uri(),
            "key",
            "agent",
            Some(&p),
            Duration::from_secs(2),
        )
        .await
        .unwrap();
        assert_eq!(url, "wss://example/ws");
    }

    async fn wiremock_stub(body: serde_json::Value) -> wiremock::MockServer {
        use wiremock::matchers::{method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(SIGNED_URL_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&server)
            .await;
        server
    }
}
