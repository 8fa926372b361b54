//! Telephony media WebSocket handler: the bidirectional relay session.
//!
//! One session per accepted telephony connection. The session establishes
//! the agent side (signed-URL handshake, then WebSocket connect), primes the
//! agent with an opening line, and runs two pumps concurrently:
//!
//! - uplink: telephony → agent, μ-law payloads re-enveloped as
//!   `user_audio_chunk` messages, transcoded to wideband PCM when the mode
//!   flag requires it;
//! - downlink: agent → telephony, the mirror image, also folding transcript
//!   events into a per-call buffer for post-call lead extraction.
//!
//! Each pump owns the *counterpart's* sink: when either pump exits it closes
//! that sink and cancels the shared token, so the other pump unblocks
//! promptly instead of waiting on a dead peer. The session waits for both
//! pumps with a bounded grace period, then aborts whatever is left.
//!
//! Per-message faults (bad JSON, bad base64, failed transcode) are logged
//! and skipped; only socket-level failures end a session, and no failure in
//! one session can touch another.

use std::sync::Arc;

use axum::extract::ws::{Message as ClientMessage, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::Response;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::net::TcpStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use tokio_tungstenite::tungstenite::Message as AgentMessage;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

use super::messages::{TelephonyEvent, TelephonyMessage};
use crate::core::agent::{
    DEFAULT_GREETING, Personalization, PrimingMessage, UserAudioChunk, fetch_signed_url,
    messages::AgentEvent,
};
use crate::core::audio::{TranscodeDirection, TranscodeMode, transcode_blocking};
use crate::core::leads::extract_lead;
use crate::events::{CallEvent, now_ms};
use crate::session::SessionState;
use crate::state::AppState;

type AgentSocket = WebSocketStream<MaybeTlsStream<TcpStream>>;
type AgentSink = SplitSink<AgentSocket, AgentMessage>;
type AgentStream = SplitStream<AgentSocket>;
type TelephonySink = SplitSink<WebSocket, ClientMessage>;
type TelephonyStream = SplitStream<WebSocket>;

/// Why a pump loop ended. Per-message faults never appear here; they are
/// absorbed inside the loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PumpExit {
    /// Peer closed the stream
    Disconnect,
    /// Unrecoverable socket error
    SocketError,
    /// Agent sent an explicit end-of-conversation signal
    ConversationEnd,
    /// The counterpart pump exited first
    Cancelled,
}

#[derive(Debug, Deserialize)]
pub struct MediaQuery {
    #[serde(default)]
    pub prospect_name: Option<String>,
}

/// Upgrade handler for `GET /twilio-media`.
pub async fn media_stream_handler(
    ws: WebSocketUpgrade,
    Query(query): Query<MediaQuery>,
    State(state): State<Arc<AppState>>,
) -> Response {
    info!(prospect = ?query.prospect_name, "Telephony media WebSocket upgrade requested");
    ws.on_upgrade(move |socket| run_session(socket, state, query.prospect_name))
}

/// Drive one relay session from accept to teardown.
async fn run_session(mut telephony: WebSocket, state: Arc<AppState>, prospect_name: Option<String>) {
    let handle = state.sessions.register(prospect_name.clone());
    let session_id = handle.id();
    info!(%session_id, "Relay session connecting");

    let personalization = prospect_name.clone().map(|prospect_name| Personalization {
        prospect_name,
    });

    // Establish the agent side. Any failure here means the session never
    // streams: close the telephony socket and stop.
    let config = &state.config;
    let signed_url = match fetch_signed_url(
        &state.http,
        &config.agent_api_base,
        &config.agent_api_key,
        &config.agent_id,
        personalization.as_ref(),
        config.signed_url_timeout,
    )
    .await
    {
        Ok(url) => url,
        Err(e) => {
            error!(%session_id, "Session establishment failed: {}", e);
            let _ = telephony.send(ClientMessage::Close(None)).await;
            handle.set_state(SessionState::Closed);
            return;
        }
    };

    let agent = match tokio::time::timeout(config.signed_url_timeout, connect_async(&signed_url))
        .await
    {
        Ok(Ok((stream, _response))) => stream,
        Ok(Err(e)) => {
            error!(%session_id, "Agent WebSocket connect failed: {}", e);
            let _ = telephony.send(ClientMessage::Close(None)).await;
            handle.set_state(SessionState::Closed);
            return;
        }
        Err(_) => {
            error!(%session_id, "Agent WebSocket connect timed out");
            let _ = telephony.send(ClientMessage::Close(None)).await;
            handle.set_state(SessionState::Closed);
            return;
        }
    };

    let (mut agent_tx, agent_rx) = agent.split();
    let (telephony_tx, telephony_rx) = telephony.split();

    // Prime the agent so it speaks first.
    let priming = PrimingMessage::new(priming_text(personalization.as_ref()));
    match serde_json::to_string(&priming) {
        Ok(json) => {
            if let Err(e) = agent_tx.send(AgentMessage::Text(json.into())).await {
                error!(%session_id, "Failed to send priming message: {}", e);
                handle.set_state(SessionState::Closed);
                return;
            }
        }
        Err(e) => error!(%session_id, "Failed to serialize priming message: {}", e),
    }

    handle.set_state(SessionState::Streaming);
    info!(%session_id, mode = config.transcode_mode.as_str(), "Relay session streaming");

    let cancel = CancellationToken::new();
    let mode = config.transcode_mode;

    let uplink = tokio::spawn(pump_uplink(telephony_rx, agent_tx, mode, cancel.clone()));
    let downlink = tokio::spawn(pump_downlink(agent_rx, telephony_tx, mode, cancel.clone()));
    let uplink_abort = uplink.abort_handle();
    let downlink_abort = downlink.abort_handle();

    // First pump exit cancels the token; from there both sides are tearing
    // down and get a bounded grace period to finish.
    cancel.cancelled().await;
    handle.set_state(SessionState::Closing);

    let pumps = futures::future::join(uplink, downlink);
    let transcript = match tokio::time::timeout(config.shutdown_grace, pumps).await {
        Ok((uplink_res, downlink_res)) => {
            if let Ok(exit) = uplink_res {
                debug!(%session_id, ?exit, "Uplink pump finished");
            }
            match downlink_res {
                Ok((exit, transcript)) => {
                    debug!(%session_id, ?exit, "Downlink pump finished");
                    transcript
                }
                Err(e) => {
                    error!(%session_id, "Downlink pump panicked: {}", e);
                    String::new()
                }
            }
        }
        Err(_) => {
            warn!(%session_id, "Pump teardown exceeded grace period, aborting");
            uplink_abort.abort();
            downlink_abort.abort();
            String::new()
        }
    };

    handle.set_state(SessionState::Closed);
    let duration_secs = handle.elapsed_secs();
    info!(%session_id, duration_secs, "Relay session closed");

    // Deregister before notifying so subscribers observe a consistent
    // registry. One event per completed session; never blocks.
    drop(handle);
    state.events.publish(CallEvent::CallEnded {
        session_id: session_id.to_string(),
        timestamp_ms: now_ms(),
        duration_secs,
        prospect_name,
        lead: extract_lead(&transcript),
    });
}

fn priming_text(personalization: Option<&Personalization>) -> String {
    match personalization {
        Some(p) => p.greeting(),
        None => DEFAULT_GREETING.to_string(),
    }
}

/// Telephony → agent pump. Owns the agent sink and closes it on exit.
async fn pump_uplink(
    mut telephony_rx: TelephonyStream,
    mut agent_tx: AgentSink,
    mode: TranscodeMode,
    cancel: CancellationToken,
) -> PumpExit {
    let exit = loop {
        tokio::select! {
            _ = cancel.cancelled() => break PumpExit::Cancelled,
            msg = telephony_rx.next() => match msg {
                None => break PumpExit::Disconnect,
                Some(Err(e)) => {
                    warn!("Telephony socket error: {}", e);
                    break PumpExit::SocketError;
                }
                Some(Ok(ClientMessage::Close(_))) => break PumpExit::Disconnect,
                Some(Ok(ClientMessage::Text(text))) => {
                    if let Some(chunk) = uplink_audio(text.as_str(), mode).await
                        && let Err(e) = send_user_chunk(&mut agent_tx, &chunk).await
                    {
                        warn!("Agent socket send failed: {}", e);
                        break PumpExit::SocketError;
                    }
                }
                // Binary, ping and pong frames carry nothing for us.
                Some(Ok(_)) => {}
            }
        }
    };

    let _ = agent_tx.send(AgentMessage::Close(None)).await;
    cancel.cancel();
    exit
}

/// Decode one telephony frame and produce the agent-side audio chunk, or
/// `None` when there is nothing to forward. Every fault in here is
/// per-message: log and skip.
async fn uplink_audio(text: &str, mode: TranscodeMode) -> Option<bytes::Bytes> {
    let message = match TelephonyMessage::decode(text) {
        Ok(message) => message,
        Err(e) => {
            warn!("Skipping malformed telephony frame: {}", e);
            return None;
        }
    };

    if let TelephonyMessage::Event(TelephonyEvent::Start { start }) = &message {
        info!(
            stream_sid = ?start.stream_sid,
            call_sid = ?start.call_sid,
            "Telephony stream started"
        );
        return None;
    }

    let audio = message.media_bytes()?;
    let chunk = match mode {
        TranscodeMode::Passthrough => bytes::Bytes::from(audio),
        TranscodeMode::Wideband => {
            transcode_blocking(TranscodeDirection::ToWideband, audio.into()).await
        }
    };

    if chunk.is_empty() {
        debug!("Transcode produced no audio, skipping chunk");
        return None;
    }
    Some(chunk)
}

async fn send_user_chunk(
    agent_tx: &mut AgentSink,
    chunk: &[u8],
) -> Result<(), tokio_tungstenite::tungstenite::Error> {
    let message = UserAudioChunk::from_audio(chunk);
    match serde_json::to_string(&message) {
        Ok(json) => agent_tx.send(AgentMessage::Text(json.into())).await,
        Err(e) => {
            error!("Failed to serialize audio chunk: {}", e);
            Ok(())
        }
    }
}

/// Agent → telephony pump. Owns the telephony sink and closes it on exit.
/// Returns the accumulated transcript alongside the exit reason.
async fn pump_downlink(
    mut agent_rx: AgentStream,
    mut telephony_tx: TelephonySink,
    mode: TranscodeMode,
    cancel: CancellationToken,
) -> (PumpExit, String) {
    let mut transcript = String::new();

    let exit = loop {
        tokio::select! {
            _ = cancel.cancelled() => break PumpExit::Cancelled,
            msg = agent_rx.next() => match msg {
                None => break PumpExit::Disconnect,
                Some(Err(e)) => {
                    warn!("Agent socket error: {}", e);
                    break PumpExit::SocketError;
                }
                Some(Ok(AgentMessage::Close(_))) => break PumpExit::Disconnect,
                Some(Ok(AgentMessage::Text(text))) => {
                    match handle_agent_frame(text.as_str(), mode, &mut transcript).await {
                        AgentFrame::Audio(frame) => {
                            if let Err(e) = telephony_tx
                                .send(ClientMessage::Text(frame.into()))
                                .await
                            {
                                warn!("Telephony socket send failed: {}", e);
                                break PumpExit::SocketError;
                            }
                        }
                        AgentFrame::End => break PumpExit::ConversationEnd,
                        AgentFrame::Nothing => {}
                    }
                }
                Some(Ok(_)) => {}
            }
        }
    };

    let _ = telephony_tx.send(ClientMessage::Close(None)).await;
    cancel.cancel();
    (exit, transcript)
}

enum AgentFrame {
    /// Encoded telephony media envelope ready to send.
    Audio(String),
    /// Explicit end-of-conversation.
    End,
    Nothing,
}

async fn handle_agent_frame(text: &str, mode: TranscodeMode, transcript: &mut String) -> AgentFrame {
    let event = match AgentEvent::decode(text) {
        Ok(event) => event,
        Err(e) => {
            warn!("Skipping malformed agent frame: {}", e);
            return AgentFrame::Nothing;
        }
    };

    match event {
        AgentEvent::Audio { .. } => {
            let Some(audio) = event.audio_bytes() else {
                warn!("Skipping agent audio with invalid base64 payload");
                return AgentFrame::Nothing;
            };
            let narrow = match mode {
                TranscodeMode::Passthrough => bytes::Bytes::from(audio),
                TranscodeMode::Wideband => {
                    transcode_blocking(TranscodeDirection::ToNarrowband, audio.into()).await
                }
            };
            if narrow.is_empty() {
                debug!("Transcode produced no audio, skipping chunk");
                return AgentFrame::Nothing;
            }
            AgentFrame::Audio(TelephonyEvent::media_frame(&narrow).encode())
        }
        AgentEvent::AgentResponse { agent_response } => {
            transcript.push_str("agent: ");
            transcript.push_str(&agent_response);
            transcript.push('\n');
            AgentFrame::Nothing
        }
        AgentEvent::UserTranscript { user_transcript } => {
            transcript.push_str("user: ");
            transcript.push_str(&user_transcript);
            transcript.push('\n');
            AgentFrame::Nothing
        }
        AgentEvent::End(_) => {
            info!("Agent signalled end of conversation");
            AgentFrame::End
        }
        AgentEvent::Opaque(value) => {
            debug!(kind = ?value.get("type"), "Ignoring unrecognized agent message");
            AgentFrame::Nothing
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::prelude::*;

    #[test]
    fn priming_text_defaults_without_personalization() {
        assert_eq!(priming_text(None), DEFAULT_GREETING);
    }

    #[test]
    fn priming_text_uses_personalized_greeting() {
        let p = Personalization {
            prospect_name: "Sam".to_string(),
        };
        assert!(priming_text(Some(&p)).contains("Sam"));
    }

    #[tokio::test]
    async fn uplink_audio_passthrough_preserves_bytes() {
        let audio = vec![0x11u8; 160];
        let frame = TelephonyEvent::media_frame(&audio).encode();
        let chunk = uplink_audio(&frame, TranscodeMode::Passthrough).await.unwrap();
        assert_eq!(&chunk[..], &audio[..]);
    }

    #[tokio::test]
    async fn uplink_audio_wideband_changes_length() {
        let audio = vec![0x11u8; 160];
        let frame = TelephonyEvent::media_frame(&audio).encode();
        let chunk = uplink_audio(&frame, TranscodeMode::Wideband).await.unwrap();
        assert_eq!(chunk.len(), 640);
    }

    #[tokio::test]
    async fn uplink_audio_skips_malformed_and_non_media() {
        assert!(uplink_audio("{bad", TranscodeMode::Passthrough).await.is_none());
        assert!(
            uplink_audio(r#"{"event": "mark"}"#, TranscodeMode::Passthrough)
                .await
                .is_none()
        );
    }

    #[tokio::test]
    async fn agent_audio_is_re_enveloped_for_telephony() {
        let audio = vec![0x22u8; 160];
        let inbound = format!(
            r#"{{"audio_base_64": "{}"}}"#,
            BASE64_STANDARD.encode(&audio)
        );
        let mut transcript = String::new();

        match handle_agent_frame(&inbound, TranscodeMode::Passthrough, &mut transcript).await {
            AgentFrame::Audio(frame) => {
                let decoded = TelephonyMessage::decode(&frame).unwrap();
                assert_eq!(decoded.media_bytes().unwrap(), audio);
            }
            _ => panic!("expected audio frame"),
        }
    }

    #[tokio::test]
    async fn transcripts_accumulate_and_end_signal_surfaces() {
        let mut transcript = String::new();

        let frame = handle_agent_frame(
            r#"{"agent_response": "Hello!"}"#,
            TranscodeMode::Passthrough,
            &mut transcript,
        )
        .await;
        assert!(matches!(frame, AgentFrame::Nothing));

        let frame = handle_agent_frame(
            r#"{"user_transcript": "Hi there"}"#,
            TranscodeMode::Passthrough,
            &mut transcript,
        )
        .await;
        assert!(matches!(frame, AgentFrame::Nothing));
        assert_eq!(transcript, "agent: Hello!\nuser: Hi there\n");

        let frame = handle_agent_frame(
            r#"{"type": "conversation_end"}"#,
            TranscodeMode::Passthrough,
            &mut transcript,
        )
        .await;
        assert!(matches!(frame, AgentFrame::End));
    }
}
