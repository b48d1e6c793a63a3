//! HTTP API layer for liveclass.
//!
//! A thin adapter over `liveclass-core`:
//!
//! - **Endpoints**: POST JSON verbs for sessions, rooms, polls and artifacts
//! - **Extractors**: the calling user, as asserted by the upstream gateway
//! - **Middleware**: shared state and caller propagation
//!
//! Built on Axum 0.8.

pub mod endpoints;
pub mod extractors;
pub mod middleware;
pub mod response;

pub use endpoints::router;
pub use middleware::{AppState, CALLER_HEADER, caller_middleware};
