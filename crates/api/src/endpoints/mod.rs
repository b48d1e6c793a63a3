//! API endpoints.

mod artifacts;
mod metrics;
mod polls;
mod rooms;
mod sessions;

use axum::Router;

use crate::middleware::AppState;

/// Create the API router.
pub fn router() -> Router<AppState> {
    Router::new()
        .nest("/sessions", sessions::router())
        .nest("/rooms", rooms::router())
        .nest("/polls", polls::router())
        .nest("/artifacts", artifacts::router())
        .nest("/metrics", metrics::router())
}
