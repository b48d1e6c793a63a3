//! Shared fixtures for service integration tests.

#![allow(dead_code, clippy::unwrap_used)]

use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use liveclass_common::SessionPolicyConfig;
use liveclass_core::{
    AdmissionService, ArtifactService, AttendanceService, CreateSessionInput, DeviceCapabilities,
    LiveSessionService, ManualClock, RoomLocks,
};
use liveclass_db::{
    entities::live_session,
    repositories::{
        LiveSessionRepository, PollResponseRepository, SessionIntervalRepository,
        SessionPollRepository,
    },
    test_utils::TestDatabase,
};

pub const ORGANIZER: &str = "tutor1";

pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap()
}

pub struct Harness {
    pub db: TestDatabase,
    pub clock: Arc<ManualClock>,
    pub sessions: LiveSessionService,
    pub admission: AdmissionService,
    pub artifacts: ArtifactService,
    pub attendance: AttendanceService,
    pub intervals: SessionIntervalRepository,
    pub locks: RoomLocks,
}

impl Harness {
    pub async fn new() -> Self {
        let db = TestDatabase::in_memory().await.unwrap();
        let conn = db.shared();
        let clock = Arc::new(ManualClock::new(t0()));
        let locks = RoomLocks::new();
        let policy = SessionPolicyConfig::default();

        let session_repo = LiveSessionRepository::new(Arc::clone(&conn));
        let interval_repo = SessionIntervalRepository::new(Arc::clone(&conn));
        let poll_repo = SessionPollRepository::new(Arc::clone(&conn));
        let response_repo = PollResponseRepository::new(Arc::clone(&conn));

        Self {
            sessions: LiveSessionService::new(
                session_repo.clone(),
                interval_repo.clone(),
                poll_repo.clone(),
                locks.clone(),
                clock.clone(),
                policy.clone(),
            ),
            admission: AdmissionService::new(
                session_repo.clone(),
                interval_repo.clone(),
                locks.clone(),
                clock.clone(),
            ),
            artifacts: ArtifactService::new(
                session_repo.clone(),
                poll_repo,
                response_repo,
                locks.clone(),
                clock.clone(),
                policy,
            ),
            attendance: AttendanceService::new(session_repo, interval_repo.clone()),
            intervals: interval_repo,
            locks,
            clock,
            db,
        }
    }

    pub fn advance_minutes(&self, minutes: i64) {
        self.clock.advance(Duration::minutes(minutes));
    }

    /// A scheduled one-hour session starting at `t0`.
    pub async fn scheduled(&self, max_participants: i32) -> live_session::Model {
        self.sessions
            .create(ORGANIZER, input(max_participants))
            .await
            .unwrap()
    }

    /// A session already started by the organizer.
    pub async fn live(&self, max_participants: i32) -> live_session::Model {
        let session = self.scheduled(max_participants).await;
        self.sessions.start(ORGANIZER, &session.id).await.unwrap()
    }

    pub async fn join(&self, session_id: &str, participant_id: &str) {
        self.admission
            .join(session_id, participant_id, all_devices())
            .await
            .unwrap();
    }
}

pub fn input(max_participants: i32) -> CreateSessionInput {
    CreateSessionInput {
        title: "Algebra I".to_string(),
        description: Some("Linear equations".to_string()),
        course_id: Some("course_math_101".to_string()),
        scheduled_start: t0(),
        scheduled_end: t0() + Duration::hours(1),
        max_participants,
        camera_required: false,
        microphone_required: false,
        allow_late_join: true,
        attendance_threshold_percent: 50,
    }
}

pub const fn all_devices() -> DeviceCapabilities {
    DeviceCapabilities {
        camera: true,
        microphone: true,
    }
}
