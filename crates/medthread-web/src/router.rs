//! Axum router — maps all URL paths to handlers.

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::{
    compression::CompressionLayer,
    trace::TraceLayer,
};

use crate::handlers::{
    api::api_thread,
    home::{health, home},
    search::search_submit,
};
use crate::state::{AppState, SharedState};

/// Build and return the full Axum router.
pub fn build_router(state: AppState) -> Router {
    let shared: SharedState = Arc::new(state);

    Router::new()
        // Pages
        .route("/",       get(home))
        .route("/search", post(search_submit))

        // API endpoints
        .route("/api/thread", post(api_thread))
        .route("/health",     get(health))

        // Middleware
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(shared)
}
