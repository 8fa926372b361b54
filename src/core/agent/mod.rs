//! Conversational agent integration: session establishment and wire schema.

pub mod messages;
pub mod signed_url;

pub use messages::{AgentEvent, PrimingMessage, UserAudioChunk};
pub use signed_url::{
    DEFAULT_API_BASE, DEFAULT_GREETING, EstablishError, EstablishResult, Personalization,
    SIGNED_URL_PATH, fetch_signed_url,
};
