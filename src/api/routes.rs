//! API route table.

use axum::routing::get;
use axum::Router;

use super::handlers::{self, WatchState};

/// Build the v1 API router.
pub fn api_routes(state: WatchState) -> Router {
    Router::new()
        .route("/space-weather", get(handlers::get_space_weather))
        .route("/clouds", get(handlers::get_clouds))
        .route("/ovation", get(handlers::get_ovation))
        .route("/decision", get(handlers::get_decision))
        .with_state(state)
}

/// Root-level liveness route.
pub fn health_routes(state: WatchState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .with_state(state)
}
