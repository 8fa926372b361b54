//! HTTP and WebSocket request handlers
//!
//! - `api` - Health check and index endpoints
//! - `calls` - Outbound call initiation
//! - `events` - Server-sent call lifecycle events
//! - `media` - Telephony media stream relay (WebSocket)
//! - `sessions` - Active session introspection
//! - `voice` - Telephony voice webhook (TwiML)

pub mod api;
pub mod calls;
pub mod events;
pub mod media;
pub mod sessions;
pub mod voice;

pub use media::media_stream_handler;
