//! Session registry.
//!
//! Each accepted telephony connection registers itself and receives an
//! ownership handle; dropping the handle deregisters the session, so the
//! registry can never leak entries past their owning task. The manager is
//! observational only: it enumerates and counts live sessions but owns no
//! session resources and takes no part in relay data flow.

use std::sync::Arc;
use std::time::Instant;

use dashmap::DashMap;
use serde::Serialize;
use uuid::Uuid;

/// Relay session lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// Telephony socket accepted, agent side being established
    Connecting,
    /// Both sockets open, pumps running
    Streaming,
    /// One side ended, the other being torn down
    Closing,
    /// Terminal; resources released
    Closed,
}

#[derive(Debug)]
struct SessionEntry {
    state: SessionState,
    started: Instant,
    prospect_name: Option<String>,
}

/// Point-in-time view of one live session.
#[derive(Debug, Clone, Serialize)]
pub struct SessionInfo {
    pub id: String,
    pub state: SessionState,
    pub age_secs: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prospect_name: Option<String>,
}

/// Registry of live relay sessions.
#[derive(Debug, Clone, Default)]
pub struct SessionManager {
    sessions: Arc<DashMap<Uuid, SessionEntry>>,
}

impl SessionManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new session in `Connecting` state and return its
    /// ownership handle.
    pub fn register(&self, prospect_name: Option<String>) -> SessionHandle {
        let id = Uuid::new_v4();
        self.sessions.insert(
            id,
            SessionEntry {
                state: SessionState::Connecting,
                started: Instant::now(),
                prospect_name,
            },
        );
        SessionHandle {
            id,
            sessions: self.sessions.clone(),
        }
    }

    pub fn count(&self) -> usize {
        self.sessions.len()
    }

    pub fn snapshot(&self) -> Vec<SessionInfo> {
        self.sessions
            .iter()
            .map(|entry| SessionInfo {
                id: entry.key().to_string(),
                state: entry.state,
                age_secs: entry.started.elapsed().as_secs(),
                prospect_name: entry.prospect_name.clone(),
            })
            .collect()
    }
}

/// Ownership handle for one registered session.
///
/// Held exclusively by the task running the session; dropping it removes the
/// registry entry.
#[derive(Debug)]
pub struct SessionHandle {
    id: Uuid,
    sessions: Arc<DashMap<Uuid, SessionEntry>>,
}

impl SessionHandle {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn set_state(&self, state: SessionState) {
        if let Some(mut entry) = self.sessions.get_mut(&self.id) {
            tracing::debug!(session_id = %self.id, ?state, "Session state transition");
            entry.state = state;
        }
    }

    pub fn elapsed_secs(&self) -> u64 {
        self.sessions
            .get(&self.id)
            .map(|e| e.started.elapsed().as_secs())
            .unwrap_or(0)
    }
}

impl Drop for SessionHandle {
    fn drop(&mut self) {
        self.sessions.remove(&self.id);
    }
}
