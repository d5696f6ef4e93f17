use axum::{routing::get, Router};
use tower_http::{catch_panic::CatchPanicLayer, trace::TraceLayer};

use crate::api::{admin_routes, missing_name, not_found, read_message, write_message};

use super::middleware::handle_panic;
use super::AppState;

/// Main listener: every path names a queue.
pub fn create_app(state: AppState) -> Router {
    Router::new()
        .route(
            "/",
            get(missing_name)
                .put(missing_name)
                .head(not_found)
                .fallback(not_found),
        )
        .route(
            "/{*name}",
            get(read_message)
                .put(write_message)
                // `get` would otherwise answer HEAD by running a pop
                .head(not_found)
                .fallback(not_found),
        )
        .fallback(not_found)
        // Add middleware
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(TraceLayer::new_for_http())
        // Add state
        .with_state(state)
}

/// Side listener for health, stats and metrics.
pub fn create_admin_app(state: AppState) -> Router {
    admin_routes()
        .fallback(not_found)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
