//! Telephony media stream relay: WebSocket handler plus wire schema.

pub mod handler;
pub mod messages;

pub use handler::media_stream_handler;
pub use messages::{TelephonyEvent, TelephonyMessage};
