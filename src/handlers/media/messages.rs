//! Telephony media stream envelopes.
//!
//! The telephony provider wraps every WebSocket message in a small JSON
//! envelope tagged by an `event` field. Only `media` carries audio; `start`,
//! `stop` and `mark` are control events. Unrecognized event kinds, like
//! unrecognized extra fields on known kinds, must never fail decoding:
//! providers add schema over time and the relay just skips what it does not
//! understand.

use base64::prelude::*;
use serde::{Deserialize, Serialize};

/// Audio payload of a `media` event, base64 μ-law 8 kHz mono.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaPayload {
    pub payload: String,
}

/// Metadata delivered once at stream start.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StartMetadata {
    #[serde(default, rename = "streamSid")]
    pub stream_sid: Option<String>,
    #[serde(default, rename = "callSid")]
    pub call_sid: Option<String>,
}

/// Recognized telephony envelope kinds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "lowercase")]
pub enum TelephonyEvent {
    /// Audio frame in either direction.
    Media { media: MediaPayload },
    /// Stream started; carries call metadata.
    Start {
        #[serde(default)]
        start: StartMetadata,
    },
    /// Stream ended by the provider.
    Stop,
    /// Playback checkpoint acknowledgement.
    Mark,
}

/// One decoded telephony frame: a recognized event or an opaque JSON value
/// preserved as-is for forward compatibility.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum TelephonyMessage {
    Event(TelephonyEvent),
    Opaque(serde_json::Value),
}

impl TelephonyMessage {
    /// Parse one text frame. Fails only on malformed JSON syntax.
    pub fn decode(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Decode the μ-law audio payload if this is a media event.
    pub fn media_bytes(&self) -> Option<Vec<u8>> {
        match self {
            TelephonyMessage::Event(TelephonyEvent::Media { media }) => {
                BASE64_STANDARD.decode(&media.payload).ok()
            }
            _ => None,
        }
    }
}

impl TelephonyEvent {
    /// Build an outbound media frame from raw μ-law audio.
    pub fn media_frame(audio: &[u8]) -> Self {
        TelephonyEvent::Media {
            media: MediaPayload {
                payload: BASE64_STANDARD.encode(audio),
            },
        }
    }

    /// Serialize for the wire.
    pub fn encode(&self) -> String {
        // Serialization of these variants cannot fail.
        serde_json::to_string(self).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn media_event_round_trips_payload() {
        let audio = vec![0x7Fu8, 0xFF, 0x00, 0x80];
        let encoded = TelephonyEvent::media_frame(&audio).encode();

        let decoded = TelephonyMessage::decode(&encoded).unwrap();
        assert_eq!(decoded.media_bytes().unwrap(), audio);
    }

    #[test]
    fn start_event_decodes_with_metadata() {
        let msg = TelephonyMessage::decode(
            r#"{"event": "start", "start": {"streamSid": "MZ123", "callSid": "CA456"}}"#,
        )
        .unwrap();
        match msg {
            TelephonyMessage::Event(TelephonyEvent::Start { start }) => {
                assert_eq!(start.stream_sid.as_deref(), Some("MZ123"));
                assert_eq!(start.call_sid.as_deref(), Some("CA456"));
            }
            other => panic!("expected start event, got {other:?}"),
        }
    }

    #[test]
    fn stop_and_mark_decode() {
        assert!(matches!(
            TelephonyMessage::decode(r#"{"event": "stop"}"#).unwrap(),
            TelephonyMessage::Event(TelephonyEvent::Stop)
        ));
        assert!(matches!(
            TelephonyMessage::decode(r#"{"event": "mark", "mark": {"name": "x"}}"#).unwrap(),
            TelephonyMessage::Event(TelephonyEvent::Mark)
        ));
    }

    #[test]
    fn unknown_event_kind_is_preserved_as_opaque() {
        let msg = TelephonyMessage::decode(r#"{"event": "dtmf", "dtmf": {"digit": "5"}}"#).unwrap();
        match msg {
            TelephonyMessage::Opaque(value) => assert_eq!(value["event"], "dtmf"),
            other => panic!("expected opaque, got {other:?}"),
        }
    }

    #[test]
    fn extra_fields_on_media_are_ignored() {
        let msg = TelephonyMessage::decode(
            r#"{"event": "media", "sequenceNumber": "3", "media": {"payload": "AAAA", "chunk": "2"}}"#,
        )
        .unwrap();
        assert!(msg.media_bytes().is_some());
    }

    #[test]
    fn malformed_syntax_is_a_decode_error() {
        assert!(TelephonyMessage::decode("{\"event\": ").is_err());
        assert!(TelephonyMessage::decode("").is_err());
    }

    #[test]
    fn invalid_base64_payload_yields_no_audio() {
        let msg =
            TelephonyMessage::decode(r#"{"event": "media", "media": {"payload": "!!!"}}"#).unwrap();
        assert!(msg.media_bytes().is_none());
    }
}
