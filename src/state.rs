//! Shared application state.

use crate::config::ServerConfig;
use crate::events::EventHub;
use crate::session::SessionManager;

/// State shared by all handlers.
///
/// Nothing here is per-session: each relay session owns its sockets
/// exclusively. The only cross-session resources are the event hub (non-
/// blocking fan-out) and the session registry (observability).
#[derive(Debug, Clone)]
pub struct AppState {
    pub config: ServerConfig,
    /// Shared HTTP client for establishment and outbound call requests.
    pub http: reqwest::Client,
    pub sessions: SessionManager,
    pub events: EventHub,
}

impl AppState {
    pub fn new(config: ServerConfig) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
            sessions: SessionManager::new(),
            events: EventHub::new(),
        }
    }
}
