//! Configuration module for the Callbridge gateway.
//!
//! Configuration is loaded once at startup from environment variables (with
//! `.env` support via dotenvy in `main`) and is immutable afterwards. In
//! particular the transcoding mode is fixed for the process lifetime: a
//! session never switches modes mid-stream.
//!
//! # Environment variables
//!
//! | Variable | Default | Purpose |
//! |---|---|---|
//! | `HOST` | `0.0.0.0` | Bind address |
//! | `PORT` | `8080` | Bind port |
//! | `PUBLIC_HOST` | *required* | Externally reachable host for the media callback URL |
//! | `ELEVENLABS_API_KEY` | *required* | Agent provider credential |
//! | `ELEVENLABS_AGENT_ID` | *required* | Agent identifier |
//! | `ELEVENLABS_API_BASE` | provider default | Override for tests/self-hosting |
//! | `SEND_RAW_ULAW` | `1` | `1` = passthrough μ-law, `0` = wideband transcode |
//! | `SIGNED_URL_TIMEOUT_SECS` | `10` | Establishment request timeout |
//! | `SHUTDOWN_GRACE_SECS` | `3` | Pump teardown grace period |
//! | `TWILIO_ACCOUNT_SID` / `TWILIO_AUTH_TOKEN` / `TWILIO_PHONE_NUMBER` | unset | Outbound calling (optional) |
//! | `TWILIO_API_BASE` | provider default | Override for tests |

use std::env;
use std::time::Duration;

use thiserror::Error;

use crate::core::agent::DEFAULT_API_BASE;
use crate::core::audio::TranscodeMode;
use crate::core::telephony::{DEFAULT_TWILIO_API_BASE, TwilioConfig};

/// Path of the telephony media WebSocket endpoint.
pub const MEDIA_STREAM_PATH: &str = "/twilio-media";

/// Configuration errors raised at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(&'static str),

    #[error("Invalid value for {name}: {value}")]
    InvalidValue { name: &'static str, value: String },
}

/// Server configuration, read-only after startup.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    // Server settings
    pub host: String,
    pub port: u16,
    /// Externally reachable host name, used to build `wss://{public_host}/twilio-media`.
    pub public_host: String,

    // Agent provider settings
    pub agent_api_key: String,
    pub agent_id: String,
    pub agent_api_base: String,

    // Relay settings
    pub transcode_mode: TranscodeMode,
    pub signed_url_timeout: Duration,
    pub shutdown_grace: Duration,

    // Outbound calling (optional)
    pub twilio: Option<TwilioConfig>,
}

impl ServerConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let host = env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = parse_var("PORT", 8080)?;
        let public_host = required("PUBLIC_HOST")?;

        let agent_api_key = required("ELEVENLABS_API_KEY")?;
        let agent_id = required("ELEVENLABS_AGENT_ID")?;
        let agent_api_base =
            env::var("ELEVENLABS_API_BASE").unwrap_or_else(|_| DEFAULT_API_BASE.to_string());

        // Matches the agent-side audio configuration: when the agent runs
        // μ-law 8 kHz on both input and output, raw passthrough is correct
        // and cheapest.
        let transcode_mode = match env::var("SEND_RAW_ULAW").as_deref() {
            Ok("0") => TranscodeMode::Wideband,
            _ => TranscodeMode::Passthrough,
        };

        let signed_url_timeout = Duration::from_secs(parse_var("SIGNED_URL_TIMEOUT_SECS", 10)?);
        let shutdown_grace = Duration::from_secs(parse_var("SHUTDOWN_GRACE_SECS", 3)?);

        let twilio = match (
            env::var("TWILIO_ACCOUNT_SID"),
            env::var("TWILIO_AUTH_TOKEN"),
            env::var("TWILIO_PHONE_NUMBER"),
        ) {
            (Ok(account_sid), Ok(auth_token), Ok(from_number)) => Some(TwilioConfig {
                account_sid,
                auth_token,
                from_number,
                api_base: env::var("TWILIO_API_BASE")
                    .unwrap_or_else(|_| DEFAULT_TWILIO_API_BASE.to_string()),
            }),
            _ => None,
        };

        let config = Self {
            host,
            port,
            public_host,
            agent_api_key,
            agent_id,
            agent_api_base,
            transcode_mode,
            signed_url_timeout,
            shutdown_grace,
            twilio,
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.public_host.contains("://") || self.public_host.contains('/') {
            return Err(ConfigError::InvalidValue {
                name: "PUBLIC_HOST",
                value: self.public_host.clone(),
            });
        }
        Ok(())
    }

    /// Socket address string for the listener.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// WebSocket URL handed to the telephony provider via TwiML,
    /// propagating an optional personalization name.
    pub fn media_stream_url(&self, prospect_name: Option<&str>) -> String {
        let mut url = format!("wss://{}{}", self.public_host, MEDIA_STREAM_PATH);
        if let Some(name) = prospect_name {
            url.push_str("?prospect_name=");
            url.push_str(&urlencode(name));
        }
        url
    }

    /// TwiML callback URL used when placing outbound calls.
    pub fn voice_callback_url(&self, prospect_name: Option<&str>) -> String {
        let mut url = format!("https://{}/twilio-voice", self.public_host);
        if let Some(name) = prospect_name {
            url.push_str("?prospect_name=");
            url.push_str(&urlencode(name));
        }
        url
    }
}

fn urlencode(value: &str) -> String {
    url::form_urlencoded::byte_serialize(value.as_bytes()).collect()
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    env::var(name)
        .ok()
        .filter(|v| !v.is_empty())
        .ok_or(ConfigError::MissingVar(name))
}

fn parse_var<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(value) => value.parse().map_err(|_| ConfigError::InvalidValue {
            name,
            value,
        }),
        Err(_) => Ok(default),
    }
}
