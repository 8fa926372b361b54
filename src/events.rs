//! Process-wide call event fan-out.
//!
//! Relay sessions publish exactly one `call_ended` event at teardown; SSE
//! subscribers consume them. The hub is a `tokio::sync::broadcast` channel:
//! publishing never blocks and never applies backpressure to a relay pump.
//! A slow subscriber lags and skips events at the fan-out layer, which is
//! acceptable there and only there.

use serde::Serialize;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::sync::broadcast;

use crate::core::leads::LeadRecord;

/// Capacity of the broadcast channel; events beyond this are dropped for
/// lagging subscribers.
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Events published to notification subscribers.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CallEvent {
    CallEnded {
        session_id: String,
        timestamp_ms: u64,
        duration_secs: u64,
        #[serde(skip_serializing_if = "Option::is_none")]
        prospect_name: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        lead: Option<LeadRecord>,
    },
}

/// Milliseconds since the Unix epoch.
pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// Fan-out hub for call events.
#[derive(Debug, Clone)]
pub struct EventHub {
    tx: broadcast::Sender<CallEvent>,
}

impl EventHub {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self { tx }
    }

    /// Publish an event to all current subscribers. Non-blocking; with no
    /// subscribers the event is simply dropped.
    pub fn publish(&self, event: CallEvent) {
        match self.tx.send(event) {
            Ok(n) => tracing::debug!("Call event delivered to {} subscriber(s)", n),
            Err(_) => tracing::debug!("Call event dropped: no active subscribers"),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CallEvent> {
        self.tx.subscribe()
    }

    /// Number of active subscribers, for observability.
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EventHub {
    fn default() -> Self {
        Self::new()
    }
}
