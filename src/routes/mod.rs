//! Route configuration

pub mod api;
pub mod media;

use axum::Router;
use std::sync::Arc;

use crate::state::AppState;

/// Merge every route group into the full application router. The caller
/// supplies state and any outermost layers (CORS etc.).
pub fn build_router() -> Router<Arc<AppState>> {
    api::create_api_router().merge(media::create_media_router())
}
