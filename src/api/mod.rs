// API module - HTTP endpoints

pub mod health;
pub mod resolve;
pub mod scan;
pub mod state;

use axum::{extract::DefaultBodyLimit, routing::get, Router};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub use state::AppState;

/// Builds the full router; `main` only binds it to a socket.
pub fn router(state: AppState) -> Router {
    let body_limit = state.config.max_body_bytes;

    Router::new()
        .route("/health", get(|| async { "OK" }))
        .merge(health::router())
        .merge(scan::router())
        .merge(resolve::router())
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(CorsLayer::very_permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
