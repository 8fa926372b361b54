//! Server-sent events stream for call lifecycle notifications.

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::Stream;
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};

use crate::state::AppState;

const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

/// `GET /api/call-events`. Subscribers get one `call_ended` event per
/// completed relay session. A slow consumer that falls behind the broadcast
/// buffer skips the missed events and keeps receiving; it never slows down
/// the relay itself.
pub async fn call_events(
    State(state): State<Arc<AppState>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let mut receiver = state.events.subscribe();
    info!(
        subscribers = state.events.subscriber_count(),
        "Call events subscriber connected"
    );

    let stream = async_stream::stream! {
        yield Ok(Event::default()
            .data(r#"{"type": "connected"}"#));

        loop {
            match receiver.recv().await {
                Ok(event) => match serde_json::to_string(&event) {
                    Ok(json) => yield Ok(Event::default().data(json)),
                    Err(e) => warn!("Failed to serialize call event: {}", e),
                },
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Call events subscriber lagged, skipping missed events");
                }
                Err(RecvError::Closed) => break,
            }
        }
    };

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(HEARTBEAT_INTERVAL)
            .text("heartbeat"),
    )
}
