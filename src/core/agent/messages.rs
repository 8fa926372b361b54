//! Wire messages for the conversational agent WebSocket.
//!
//! The agent protocol is JSON over WebSocket text frames. Outbound audio is
//! wrapped in `user_audio_chunk` messages; the one-shot priming message sent
//! on connect is a bare `{"text": ..., "flush": true}` object. Inbound
//! messages are matched structurally: anything carrying `audio_base_64` is
//! audio, transcript fields are surfaced for post-call processing, and every
//! unrecognized message is preserved as [`AgentEvent::Opaque`] so schema
//! additions on the provider side never break the relay.

use base64::prelude::*;
use serde::{Deserialize, Serialize};

/// One-shot message sent right after the agent socket opens to trigger the
/// initial spoken greeting.
#[derive(Debug, Clone, Serialize)]
pub struct PrimingMessage {
    pub text: String,
    pub flush: bool,
}

impl PrimingMessage {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            flush: true,
        }
    }
}

/// Outbound audio chunk, base64 payload in the format the agent was
/// configured for (μ-law 8 kHz or PCM16 16 kHz depending on mode).
#[derive(Debug, Clone, Serialize)]
pub struct UserAudioChunk {
    #[serde(rename = "type")]
    msg_type: &'static str,
    user_audio_chunk: String,
}

impl UserAudioChunk {
    pub fn from_audio(audio: &[u8]) -> Self {
        Self {
            msg_type: "user_audio_chunk",
            user_audio_chunk: BASE64_STANDARD.encode(audio),
        }
    }
}

/// Tag type that only deserializes from the literal `"conversation_end"`.
#[derive(Debug, Clone, Copy, Deserialize)]
pub enum ConversationEndTag {
    #[serde(rename = "conversation_end")]
    ConversationEnd,
}

/// Explicit end-of-conversation signal from the agent.
#[derive(Debug, Clone, Deserialize)]
pub struct ConversationEnd {
    #[serde(rename = "type")]
    #[allow(dead_code)]
    tag: ConversationEndTag,
}

/// Inbound agent messages, matched structurally in declaration order.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum AgentEvent {
    /// Synthesized audio in the mirrored format of the outbound chunks.
    Audio { audio_base_64: String },
    /// Final transcript of an agent utterance.
    AgentResponse { agent_response: String },
    /// Final transcript of a caller utterance.
    UserTranscript { user_transcript: String },
    /// The agent decided the conversation is over; treated as disconnect.
    End(ConversationEnd),
    /// Anything else: keep-alives, metadata, future message kinds.
    Opaque(serde_json::Value),
}

impl AgentEvent {
    /// Parse one text frame. Fails only on malformed JSON syntax; every
    /// syntactically valid object lands in some variant.
    pub fn decode(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Decode the audio payload if this is an audio event.
    pub fn audio_bytes(&self) -> Option<Vec<u8>> {
        match self {
            AgentEvent::Audio { audio_base_64 } => BASE64_STANDARD.decode(audio_base_64).ok(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn audio_event_decodes() {
        let event = AgentEvent::decode(r#"{"audio_base_64": "AAAA"}"#).unwrap();
        assert!(matches!(event, AgentEvent::Audio { .. }));
        assert_eq!(event.audio_bytes().unwrap(), vec![0, 0, 0]);
    }

    #[test]
    fn audio_event_with_extra_fields_still_decodes() {
        let event =
            AgentEvent::decode(r#"{"audio_base_64": "AAAA", "event_id": 7, "is_final": true}"#)
                .unwrap();
        assert!(matches!(event, AgentEvent::Audio { .. }));
    }

    #[test]
    fn conversation_end_decodes() {
        let event = AgentEvent::decode(r#"{"type": "conversation_end"}"#).unwrap();
        assert!(matches!(event, AgentEvent::End(_)));
    }

    #[test]
    fn transcript_events_decode() {
        let event = AgentEvent::decode(r#"{"agent_response": "Hello there"}"#).unwrap();
        assert!(matches!(event, AgentEvent::AgentResponse { .. }));

        let event = AgentEvent::decode(r#"{"user_transcript": "Hi"}"#).unwrap();
        assert!(matches!(event, AgentEvent::UserTranscript { .. }));
    }

    #[test]
    fn unknown_message_becomes_opaque() {
        let event = AgentEvent::decode(r#"{"type": "ping", "event_id": 3}"#).unwrap();
        assert!(matches!(event, AgentEvent::Opaque(_)));
    }

    #[test]
    fn malformed_json_is_an_error() {
        assert!(AgentEvent::decode("{not json").is_err());
    }

    #[test]
    fn user_audio_chunk_serializes_with_type_tag() {
        let msg = UserAudioChunk::from_audio(&[1, 2, 3]);
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "user_audio_chunk");
        assert_eq!(json["user_audio_chunk"], BASE64_STANDARD.encode([1, 2, 3]));
    }

    #[test]
    fn priming_message_serializes_flat() {
        let msg = PrimingMessage::new("Hello");
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["text"], "Hello");
        assert_eq!(json["flush"], true);
    }
}
