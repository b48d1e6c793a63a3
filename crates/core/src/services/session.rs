//! Live session service: record store and lifecycle.

use chrono::{DateTime, Duration, Utc};
use liveclass_common::{AppError, AppResult, IdGenerator, Metrics, SessionPolicyConfig, get_metrics};
use liveclass_db::{
    entities::{live_session, live_session::SessionStatus},
    repositories::{LiveSessionRepository, SessionIntervalRepository, SessionPollRepository},
};
use sea_orm::Set;
use serde::{Deserialize, Deserializer};
use validator::Validate;

use super::{
    attendance::{cross_check, summarize},
    clock::SharedClock,
    commit,
    lifecycle::{LifecycleAction, ensure_organizer, next_status},
    room_lock::RoomLocks,
};

/// Default page size for session listings.
const DEFAULT_LIST_LIMIT: u64 = 20;
/// Largest page a caller may request.
const MAX_LIST_LIMIT: u64 = 100;

/// Input for scheduling a session.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionInput {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(length(max = 5000))]
    pub description: Option<String>,
    #[validate(length(min = 1, max = 64))]
    pub course_id: Option<String>,
    pub scheduled_start: DateTime<Utc>,
    pub scheduled_end: DateTime<Utc>,
    #[validate(range(min = 1, max = 500))]
    pub max_participants: i32,
    #[serde(default)]
    pub camera_required: bool,
    #[serde(default)]
    pub microphone_required: bool,
    #[serde(default = "default_true")]
    pub allow_late_join: bool,
    #[validate(range(min = 0, max = 100))]
    pub attendance_threshold_percent: i32,
}

const fn default_true() -> bool {
    true
}

/// Patch for a session that has not reached a terminal state.
///
/// `room_id` is accepted only so that a patch echoing the current value
/// passes; any other value is rejected.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSessionInput {
    pub room_id: Option<String>,
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,
    /// `null` clears the field; absence leaves it unchanged.
    #[serde(default, deserialize_with = "present")]
    #[validate(length(max = 5000))]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    #[validate(length(min = 1, max = 64))]
    pub course_id: Option<Option<String>>,
    pub scheduled_start: Option<DateTime<Utc>>,
    pub scheduled_end: Option<DateTime<Utc>>,
    #[validate(range(min = 1, max = 500))]
    pub max_participants: Option<i32>,
    pub camera_required: Option<bool>,
    pub microphone_required: Option<bool>,
    pub allow_late_join: Option<bool>,
    #[validate(range(min = 0, max = 100))]
    pub attendance_threshold_percent: Option<i32>,
}

/// Distinguish an explicit `null` from an absent field.
fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

fn ensure_schedule(start: DateTime<Utc>, end: DateTime<Utc>) -> AppResult<()> {
    if end > start {
        Ok(())
    } else {
        Err(AppError::Validation(
            "scheduledEnd must be after scheduledStart".to_string(),
        ))
    }
}

/// Session record store and lifecycle state machine.
#[derive(Clone)]
pub struct LiveSessionService {
    session_repo: LiveSessionRepository,
    interval_repo: SessionIntervalRepository,
    poll_repo: SessionPollRepository,
    locks: RoomLocks,
    clock: SharedClock,
    policy: SessionPolicyConfig,
    id_gen: IdGenerator,
}

impl LiveSessionService {
    /// Create a new live session service.
    #[must_use]
    pub const fn new(
        session_repo: LiveSessionRepository,
        interval_repo: SessionIntervalRepository,
        poll_repo: SessionPollRepository,
        locks: RoomLocks,
        clock: SharedClock,
        policy: SessionPolicyConfig,
    ) -> Self {
        Self {
            session_repo,
            interval_repo,
            poll_repo,
            locks,
            clock,
            policy,
            id_gen: IdGenerator::new(),
        }
    }

    // ==================== Record store ====================

    /// Schedule a new session owned by `organizer_id`.
    pub async fn create(
        &self,
        organizer_id: &str,
        input: CreateSessionInput,
    ) -> AppResult<live_session::Model> {
        input
            .validate()
            .map_err(|e| AppError::Validation(e.to_string()))?;
        ensure_schedule(input.scheduled_start, input.scheduled_end)?;

        let now = self.clock.now();
        let model = live_session::ActiveModel {
            id: Set(self.id_gen.generate()),
            room_id: Set(self.id_gen.generate_room_id()),
            organizer_id: Set(organizer_id.to_string()),
            course_id: Set(input.course_id),
            title: Set(input.title),
            description: Set(input.description),
            status: Set(SessionStatus::Scheduled),
            scheduled_start: Set(input.scheduled_start.into()),
            scheduled_end: Set(input.scheduled_end.into()),
            actual_start: Set(None),
            actual_end: Set(None),
            max_participants: Set(input.max_participants),
            camera_required: Set(input.camera_required),
            microphone_required: Set(input.microphone_required),
            allow_late_join: Set(input.allow_late_join),
            attendance_threshold_percent: Set(input.attendance_threshold_percent),
            total_participants: Set(0),
            peak_concurrent_users: Set(0),
            average_attendance_ms: Set(None),
            attended_count: Set(None),
            total_messages: Set(0),
            polls_created: Set(0),
            whiteboard_snapshot: Set(None),
            whiteboard_updated_at: Set(None),
            created_at: Set(now.into()),
            updated_at: Set(None),
        };

        let session = self.session_repo.create(model).await?;
        Metrics::incr(&get_metrics().sessions_created);
        tracing::info!(
            session_id = %session.id,
            room_id = %session.room_id,
            organizer_id = %session.organizer_id,
            "Session scheduled"
        );
        Ok(session)
    }

    /// Get a session by ID.
    pub async fn get(&self, id: &str) -> AppResult<live_session::Model> {
        self.session_repo.get_by_id(id).await
    }

    /// List sessions owned by an organizer, soonest first.
    pub async fn list_by_organizer(
        &self,
        organizer_id: &str,
        limit: Option<u64>,
        offset: Option<u64>,
    ) -> AppResult<Vec<live_session::Model>> {
        let limit = limit.unwrap_or(DEFAULT_LIST_LIMIT).clamp(1, MAX_LIST_LIMIT);
        self.session_repo
            .find_by_organizer(organizer_id, limit, offset.unwrap_or(0))
            .await
    }

    /// Apply a patch to a scheduled or live session.
    pub async fn update(
        &self,
        caller_id: &str,
        id: &str,
        input: UpdateSessionInput,
    ) -> AppResult<live_session::Model> {
        input
            .validate()
            .map_err(|e| AppError::Validation(e.to_string()))?;

        let located = self.session_repo.get_by_id(id).await?;
        if let Some(room_id) = &input.room_id
            && *room_id != located.room_id
        {
            return Err(AppError::Validation("roomId cannot be changed".to_string()));
        }

        let _guard = self.locks.acquire(&located.room_id).await;
        let txn = self.session_repo.begin().await?;
        let session = self.session_repo.get_by_id_in(&txn, id).await?;
        ensure_organizer(&session, caller_id)?;
        if session.status.is_terminal() {
            return Err(AppError::Conflict(format!(
                "session {id} is {} and can no longer be edited",
                session.status
            )));
        }

        let start = input
            .scheduled_start
            .unwrap_or_else(|| session.scheduled_start.with_timezone(&Utc));
        let end = input
            .scheduled_end
            .unwrap_or_else(|| session.scheduled_end.with_timezone(&Utc));
        ensure_schedule(start, end)?;

        let mut active: live_session::ActiveModel = session.into();
        if let Some(title) = input.title {
            active.title = Set(title);
        }
        if let Some(description) = input.description {
            active.description = Set(description);
        }
        if let Some(course_id) = input.course_id {
            active.course_id = Set(course_id);
        }
        if input.scheduled_start.is_some() {
            active.scheduled_start = Set(start.into());
        }
        if input.scheduled_end.is_some() {
            active.scheduled_end = Set(end.into());
        }
        if let Some(max) = input.max_participants {
            active.max_participants = Set(max);
        }
        if let Some(camera) = input.camera_required {
            active.camera_required = Set(camera);
        }
        if let Some(microphone) = input.microphone_required {
            active.microphone_required = Set(microphone);
        }
        if let Some(late) = input.allow_late_join {
            active.allow_late_join = Set(late);
        }
        if let Some(threshold) = input.attendance_threshold_percent {
            active.attendance_threshold_percent = Set(threshold);
        }
        active.updated_at = Set(Some(self.clock.now().into()));

        let updated = self.session_repo.update_in(&txn, active).await?;
        commit(txn).await?;
        Ok(updated)
    }

    // ==================== Lifecycle ====================

    /// `scheduled → live`.
    pub async fn start(&self, caller_id: &str, id: &str) -> AppResult<live_session::Model> {
        let located = self.session_repo.get_by_id(id).await?;
        let _guard = self.locks.acquire(&located.room_id).await;
        let txn = self.session_repo.begin().await?;
        let session = self.session_repo.get_by_id_in(&txn, id).await?;
        ensure_organizer(&session, caller_id)?;
        let to = next_status(session.status, LifecycleAction::Start)?;

        let now = self.clock.now();
        self.warn_if_off_schedule(&session, now);

        let changes = live_session::ActiveModel {
            status: Set(to),
            actual_start: Set(Some(now.into())),
            updated_at: Set(Some(now.into())),
            ..Default::default()
        };
        self.apply_transition(&txn, &session, changes).await?;
        let started = self.session_repo.get_by_id_in(&txn, id).await?;
        commit(txn).await?;

        Metrics::incr(&get_metrics().sessions_started);
        tracing::info!(session_id = %id, room_id = %started.room_id, "Session started");
        Ok(started)
    }

    /// `live → completed`, computing attendance in the same transaction.
    pub async fn end(&self, caller_id: &str, id: &str) -> AppResult<live_session::Model> {
        let located = self.session_repo.get_by_id(id).await?;
        let _guard = self.locks.acquire(&located.room_id).await;
        let txn = self.session_repo.begin().await?;
        let session = self.session_repo.get_by_id_in(&txn, id).await?;
        ensure_organizer(&session, caller_id)?;
        let to = next_status(session.status, LifecycleAction::End)?;

        let actual_start = session
            .actual_start
            .map(|t| t.with_timezone(&Utc))
            .ok_or_else(|| AppError::Internal(format!("live session {id} has no actual start")))?;
        let now = self.clock.now();
        // actual_end must stay strictly after actual_start
        let actual_end = if now > actual_start {
            now
        } else {
            actual_start + Duration::milliseconds(1)
        };

        let closed = self.interval_repo.close_all_in(&txn, id, actual_end).await?;
        self.poll_repo.close_all_in(&txn, id, actual_end).await?;

        let intervals = self.interval_repo.find_by_session_in(&txn, id).await?;
        let summary = summarize(
            &intervals,
            actual_start,
            actual_end,
            session.attendance_threshold_percent,
        );
        cross_check(&session, &summary);

        let changes = live_session::ActiveModel {
            status: Set(to),
            actual_end: Set(Some(actual_end.into())),
            average_attendance_ms: Set(summary.average_attendance_ms),
            attended_count: Set(Some(summary.attended_count)),
            updated_at: Set(Some(now.into())),
            ..Default::default()
        };
        self.apply_transition(&txn, &session, changes).await?;
        let completed = self.session_repo.get_by_id_in(&txn, id).await?;
        commit(txn).await?;

        Metrics::incr(&get_metrics().sessions_completed);
        tracing::info!(
            session_id = %id,
            room_id = %completed.room_id,
            closed_intervals = closed,
            participants = summary.distinct_participants,
            attended = summary.attended_count,
            "Session completed"
        );
        Ok(completed)
    }

    /// `scheduled | live → cancelled`. No attendance is computed.
    pub async fn cancel(&self, caller_id: &str, id: &str) -> AppResult<live_session::Model> {
        let located = self.session_repo.get_by_id(id).await?;
        let _guard = self.locks.acquire(&located.room_id).await;
        let txn = self.session_repo.begin().await?;
        let session = self.session_repo.get_by_id_in(&txn, id).await?;
        ensure_organizer(&session, caller_id)?;
        let to = next_status(session.status, LifecycleAction::Cancel)?;

        let now = self.clock.now();
        let closed = self.interval_repo.close_all_in(&txn, id, now).await?;
        self.poll_repo.close_all_in(&txn, id, now).await?;

        let changes = live_session::ActiveModel {
            status: Set(to),
            updated_at: Set(Some(now.into())),
            ..Default::default()
        };
        self.apply_transition(&txn, &session, changes).await?;
        let cancelled = self.session_repo.get_by_id_in(&txn, id).await?;
        commit(txn).await?;

        Metrics::incr(&get_metrics().sessions_cancelled);
        tracing::info!(
            session_id = %id,
            room_id = %cancelled.room_id,
            from = %session.status,
            closed_intervals = closed,
            "Session cancelled"
        );
        Ok(cancelled)
    }

    async fn apply_transition<C: sea_orm::ConnectionTrait>(
        &self,
        conn: &C,
        session: &live_session::Model,
        changes: live_session::ActiveModel,
    ) -> AppResult<()> {
        let applied = self
            .session_repo
            .transition_in(conn, &session.id, session.status, changes)
            .await?;
        if applied {
            Ok(())
        } else {
            Err(AppError::InvalidTransition(format!(
                "session {} is no longer {}",
                session.id, session.status
            )))
        }
    }

    fn warn_if_off_schedule(&self, session: &live_session::Model, now: DateTime<Utc>) {
        let window = Duration::minutes(self.policy.start_warning_window_minutes);
        let drift = now - session.scheduled_start.with_timezone(&Utc);
        if drift > window || drift < -window {
            tracing::warn!(
                session_id = %session.id,
                drift_minutes = drift.num_minutes(),
                "Session started outside its scheduled window"
            );
        }
    }
}
