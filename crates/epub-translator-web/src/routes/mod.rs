//! HTTP route handlers for the EPUB translator API.
//!
//! All routes return JSON. Errors are `{"detail": "..."}` with a matching
//! status code.

mod chunks;
mod meta;

pub use chunks::{process_chunk, total_chunk};
pub use meta::{health, index, languages};

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::state::AppState;

/// Largest accepted upload
pub const MAX_UPLOAD_BYTES: usize = 100 * 1024 * 1024;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/languages", get(languages))
        .route("/health", get(health))
        .route("/total-chunk", post(total_chunk))
        .route("/process-chunk", post(process_chunk))
        // Middleware
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
