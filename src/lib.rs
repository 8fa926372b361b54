pub mod config;
pub mod core;
pub mod errors;
pub mod events;
pub mod handlers;
pub mod routes;
pub mod session;
pub mod state;

// Re-export commonly used items for convenience
pub use config::ServerConfig;
pub use core::*;
pub use errors::app_error::{AppError, AppResult};
pub use events::{CallEvent, EventHub};
pub use session::{SessionManager, SessionState};
pub use state::AppState;
