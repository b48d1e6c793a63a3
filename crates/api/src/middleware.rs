//! API middleware.

#![allow(missing_docs)]

use std::sync::Arc;

use axum::{body::Body, http::Request, middleware::Next, response::Response};
use liveclass_common::SessionPolicyConfig;
use liveclass_core::{
    AdmissionService, ArtifactService, AttendanceService, LiveSessionService, RoomLocks,
    SharedClock,
};
use liveclass_db::repositories::{
    LiveSessionRepository, PollResponseRepository, SessionIntervalRepository,
    SessionPollRepository,
};
use sea_orm::DatabaseConnection;

/// Header carrying the authenticated caller id, set by the gateway in front
/// of this service.
pub const CALLER_HEADER: &str = "x-caller-id";

/// Caller id placed in request extensions by [`caller_middleware`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerId(pub String);

/// Application state.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub session_service: LiveSessionService,
    pub admission_service: AdmissionService,
    pub artifact_service: ArtifactService,
    pub attendance_service: AttendanceService,
}

impl AppState {
    /// Wire every service over one connection pool and one room lock registry.
    #[must_use]
    pub fn new(db: Arc<DatabaseConnection>, clock: SharedClock, policy: SessionPolicyConfig) -> Self {
        let locks = RoomLocks::new();

        let session_repo = LiveSessionRepository::new(Arc::clone(&db));
        let interval_repo = SessionIntervalRepository::new(Arc::clone(&db));
        let poll_repo = SessionPollRepository::new(Arc::clone(&db));
        let response_repo = PollResponseRepository::new(Arc::clone(&db));

        let session_service = LiveSessionService::new(
            session_repo.clone(),
            interval_repo.clone(),
            poll_repo.clone(),
            locks.clone(),
            Arc::clone(&clock),
            policy.clone(),
        );
        let admission_service = AdmissionService::new(
            session_repo.clone(),
            interval_repo.clone(),
            locks.clone(),
            Arc::clone(&clock),
        );
        let artifact_service = ArtifactService::new(
            session_repo.clone(),
            poll_repo,
            response_repo,
            locks,
            clock,
            policy,
        );
        let attendance_service = AttendanceService::new(session_repo, interval_repo);

        Self {
            db,
            session_service,
            admission_service,
            artifact_service,
            attendance_service,
        }
    }
}

/// Copy the caller id header into request extensions.
pub async fn caller_middleware(mut req: Request<Body>, next: Next) -> Response {
    if let Some(value) = req.headers().get(CALLER_HEADER)
        && let Ok(caller) = value.to_str()
    {
        let caller = caller.trim();
        if !caller.is_empty() {
            let caller = CallerId(caller.to_string());
            req.extensions_mut().insert(caller);
        }
    }

    next.run(req).await
}
