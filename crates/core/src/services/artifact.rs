//! In-session artifacts: polls, message counter, whiteboard.

use chrono::{DateTime, Utc};
use liveclass_common::{AppError, AppResult, IdGenerator, Metrics, SessionPolicyConfig, get_metrics};
use liveclass_db::{
    entities::{live_session, poll_response, session_poll},
    repositories::{LiveSessionRepository, PollResponseRepository, SessionPollRepository},
};
use sea_orm::Set;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use super::{
    clock::SharedClock,
    commit,
    lifecycle::{ensure_live, ensure_organizer},
    room_lock::RoomLocks,
};

/// Input for creating a poll.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePollInput {
    pub question: String,
    pub options: Vec<String>,
}

/// Tally of a poll's current responses.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PollResults {
    pub poll_id: String,
    pub session_id: String,
    pub question: String,
    pub options: Vec<String>,
    /// `counts[i]` is the number of participants whose latest answer is option `i`.
    pub counts: Vec<u64>,
    pub total_responses: u64,
    pub is_active: bool,
}

/// Latest whiteboard state of a session.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WhiteboardSnapshot {
    pub session_id: String,
    pub snapshot: Option<Value>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<live_session::Model> for WhiteboardSnapshot {
    fn from(session: live_session::Model) -> Self {
        Self {
            session_id: session.id,
            snapshot: session.whiteboard_snapshot,
            updated_at: session.whiteboard_updated_at.map(|t| t.with_timezone(&Utc)),
        }
    }
}

/// Count responses per option. Out-of-range indexes are ignored.
#[must_use]
pub fn tally(option_count: usize, responses: &[poll_response::Model]) -> Vec<u64> {
    let mut counts = vec![0_u64; option_count];
    for response in responses {
        if let Some(count) = usize::try_from(response.option_index)
            .ok()
            .and_then(|i| counts.get_mut(i))
        {
            *count += 1;
        }
    }
    counts
}

fn poll_options(poll: &session_poll::Model) -> AppResult<Vec<String>> {
    serde_json::from_value(poll.options.clone())
        .map_err(|e| AppError::Internal(format!("Invalid poll options: {e}")))
}

/// Ephemeral artifact manager.
#[derive(Clone)]
pub struct ArtifactService {
    session_repo: LiveSessionRepository,
    poll_repo: SessionPollRepository,
    response_repo: PollResponseRepository,
    locks: RoomLocks,
    clock: SharedClock,
    policy: SessionPolicyConfig,
    id_gen: IdGenerator,
}

impl ArtifactService {
    /// Create a new artifact service.
    #[must_use]
    pub const fn new(
        session_repo: LiveSessionRepository,
        poll_repo: SessionPollRepository,
        response_repo: PollResponseRepository,
        locks: RoomLocks,
        clock: SharedClock,
        policy: SessionPolicyConfig,
    ) -> Self {
        Self {
            session_repo,
            poll_repo,
            response_repo,
            locks,
            clock,
            policy,
            id_gen: IdGenerator::new(),
        }
    }

    fn validate_poll(&self, input: &CreatePollInput) -> AppResult<()> {
        let question = input.question.trim();
        if question.is_empty() {
            return Err(AppError::Validation("Poll question cannot be empty".to_string()));
        }
        if question.chars().count() > self.policy.max_poll_question_length {
            return Err(AppError::Validation(format!(
                "Poll question is too long (max {} chars)",
                self.policy.max_poll_question_length
            )));
        }
        if input.options.len() < 2 {
            return Err(AppError::Validation(
                "Poll must have at least 2 options".to_string(),
            ));
        }
        if input.options.len() > self.policy.max_poll_options {
            return Err(AppError::Validation(format!(
                "Poll cannot have more than {} options",
                self.policy.max_poll_options
            )));
        }
        for option in &input.options {
            if option.trim().is_empty() {
                return Err(AppError::Validation("Poll options cannot be empty".to_string()));
            }
            if option.chars().count() > self.policy.max_poll_option_length {
                return Err(AppError::Validation(format!(
                    "Poll option is too long (max {} chars)",
                    self.policy.max_poll_option_length
                )));
            }
        }
        Ok(())
    }

    // ==================== Polls ====================

    /// Open a new poll. Any other active poll in the session is closed.
    pub async fn create_poll(
        &self,
        caller_id: &str,
        session_id: &str,
        input: CreatePollInput,
    ) -> AppResult<session_poll::Model> {
        self.validate_poll(&input)?;

        let located = self.session_repo.get_by_id(session_id).await?;
        let _guard = self.locks.acquire(&located.room_id).await;
        let txn = self.session_repo.begin().await?;
        let session = self.session_repo.get_by_id_in(&txn, session_id).await?;
        ensure_organizer(&session, caller_id)?;
        ensure_live(&session)?;

        let now = self.clock.now();
        let superseded = self.poll_repo.close_all_in(&txn, session_id, now).await?;

        let options: Vec<String> = input.options.iter().map(|o| o.trim().to_string()).collect();
        let poll = self
            .poll_repo
            .create_in(
                &txn,
                session_poll::ActiveModel {
                    id: Set(self.id_gen.generate()),
                    session_id: Set(session_id.to_string()),
                    position: Set(session.polls_created as i32),
                    question: Set(input.question.trim().to_string()),
                    options: Set(json!(options)),
                    is_active: Set(true),
                    created_at: Set(now.into()),
                    closed_at: Set(None),
                },
            )
            .await?;

        let polls_created = session.polls_created + 1;
        let mut active: live_session::ActiveModel = session.into();
        active.polls_created = Set(polls_created);
        active.updated_at = Set(Some(now.into()));
        self.session_repo.update_in(&txn, active).await?;
        commit(txn).await?;

        Metrics::incr(&get_metrics().polls_created);
        tracing::info!(session_id, poll_id = %poll.id, superseded, "Poll opened");
        Ok(poll)
    }

    /// Record a participant's answer. A later answer replaces an earlier one.
    pub async fn respond(
        &self,
        session_id: &str,
        poll_id: &str,
        participant_id: &str,
        option_index: i32,
    ) -> AppResult<poll_response::Model> {
        let located = self.session_repo.get_by_id(session_id).await?;
        let _guard = self.locks.acquire(&located.room_id).await;
        let txn = self.session_repo.begin().await?;

        let poll = self
            .poll_repo
            .find_by_id_in(&txn, poll_id)
            .await?
            .filter(|poll| poll.session_id == session_id)
            .ok_or_else(|| {
                AppError::NotFound(format!("Poll not found in session {session_id}: {poll_id}"))
            })?;
        if !poll.is_active {
            return Err(AppError::PollNotActive(format!("Poll {poll_id} is closed")));
        }

        let options = poll_options(&poll)?;
        if usize::try_from(option_index).map_or(true, |i| i >= options.len()) {
            return Err(AppError::InvalidOption(format!(
                "Option {option_index} is out of range (poll has {} options)",
                options.len()
            )));
        }

        let now = self.clock.now();
        let existing = self
            .response_repo
            .find_by_poll_and_participant_in(&txn, poll_id, participant_id)
            .await?;
        let replaced = existing.is_some();
        let response = match existing {
            Some(previous) => {
                let mut active: poll_response::ActiveModel = previous.into();
                active.option_index = Set(option_index);
                active.responded_at = Set(now.into());
                self.response_repo.update_in(&txn, active).await?
            }
            None => {
                self.response_repo
                    .create_in(
                        &txn,
                        poll_response::ActiveModel {
                            id: Set(self.id_gen.generate()),
                            poll_id: Set(poll_id.to_string()),
                            session_id: Set(session_id.to_string()),
                            participant_id: Set(participant_id.to_string()),
                            option_index: Set(option_index),
                            responded_at: Set(now.into()),
                        },
                    )
                    .await?
            }
        };
        commit(txn).await?;

        Metrics::incr(&get_metrics().poll_responses);
        tracing::debug!(session_id, poll_id, participant_id, option_index, replaced, "Poll response recorded");
        Ok(response)
    }

    /// Stop accepting responses. Closing a closed poll is a no-op.
    pub async fn close_poll(
        &self,
        caller_id: &str,
        session_id: &str,
        poll_id: &str,
    ) -> AppResult<session_poll::Model> {
        let located = self.session_repo.get_by_id(session_id).await?;
        let _guard = self.locks.acquire(&located.room_id).await;
        let txn = self.session_repo.begin().await?;
        let session = self.session_repo.get_by_id_in(&txn, session_id).await?;
        ensure_organizer(&session, caller_id)?;

        let poll = self
            .poll_repo
            .find_by_id_in(&txn, poll_id)
            .await?
            .filter(|poll| poll.session_id == session_id)
            .ok_or_else(|| {
                AppError::NotFound(format!("Poll not found in session {session_id}: {poll_id}"))
            })?;

        let closed = self
            .poll_repo
            .close_in(&txn, poll_id, self.clock.now())
            .await?;
        let poll = if closed {
            self.poll_repo
                .find_by_id_in(&txn, poll_id)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("Poll not found: {poll_id}")))?
        } else {
            poll
        };
        commit(txn).await?;

        if closed {
            tracing::info!(session_id, poll_id, "Poll closed");
        }
        Ok(poll)
    }

    /// Current tally of a poll.
    pub async fn results(&self, poll_id: &str) -> AppResult<PollResults> {
        let poll = self.poll_repo.get_by_id(poll_id).await?;
        let options = poll_options(&poll)?;
        let responses = self.response_repo.find_by_poll(poll_id).await?;
        let counts = tally(options.len(), &responses);

        Ok(PollResults {
            poll_id: poll.id,
            session_id: poll.session_id,
            question: poll.question,
            total_responses: counts.iter().sum(),
            counts,
            options,
            is_active: poll.is_active,
        })
    }

    /// Polls of a session in creation order.
    pub async fn list_polls(&self, session_id: &str) -> AppResult<Vec<session_poll::Model>> {
        self.session_repo.get_by_id(session_id).await?;
        self.poll_repo.find_by_session(session_id).await
    }

    // ==================== Messages ====================

    /// Count one chat message.
    pub async fn record_message(&self, session_id: &str) -> AppResult<()> {
        if self.session_repo.increment_messages(session_id).await? {
            Metrics::incr(&get_metrics().messages_recorded);
            return Ok(());
        }

        // Nothing was updated: find out why.
        let session = self.session_repo.get_by_id(session_id).await?;
        ensure_live(&session)?;
        Err(AppError::Conflict(format!(
            "session {session_id} changed while recording a message"
        )))
    }

    // ==================== Whiteboard ====================

    /// Replace the session's whiteboard snapshot.
    pub async fn save_whiteboard(
        &self,
        session_id: &str,
        snapshot: Value,
    ) -> AppResult<WhiteboardSnapshot> {
        let size = serde_json::to_vec(&snapshot)
            .map_err(|e| AppError::Internal(e.to_string()))?
            .len();
        if size > self.policy.max_whiteboard_bytes {
            return Err(AppError::Validation(format!(
                "Whiteboard snapshot is {size} bytes (max {})",
                self.policy.max_whiteboard_bytes
            )));
        }

        let located = self.session_repo.get_by_id(session_id).await?;
        let _guard = self.locks.acquire(&located.room_id).await;
        let txn = self.session_repo.begin().await?;
        let session = self.session_repo.get_by_id_in(&txn, session_id).await?;
        ensure_live(&session)?;

        let now = self.clock.now();
        let mut active: live_session::ActiveModel = session.into();
        active.whiteboard_snapshot = Set(Some(snapshot));
        active.whiteboard_updated_at = Set(Some(now.into()));
        let updated = self.session_repo.update_in(&txn, active).await?;
        commit(txn).await?;

        Metrics::incr(&get_metrics().whiteboard_saves);
        tracing::debug!(session_id, size, "Whiteboard saved");
        Ok(updated.into())
    }

    /// Latest whiteboard snapshot, if any.
    pub async fn get_whiteboard(&self, session_id: &str) -> AppResult<WhiteboardSnapshot> {
        Ok(self.session_repo.get_by_id(session_id).await?.into())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::services::clock::ManualClock;
    use sea_orm::{DatabaseBackend, MockDatabase};
    use std::sync::Arc;

    fn response(participant_id: &str, option_index: i32) -> poll_response::Model {
        poll_response::Model {
            id: format!("r_{participant_id}"),
            poll_id: "p1".to_string(),
            session_id: "s1".to_string(),
            participant_id: participant_id.to_string(),
            option_index,
            responded_at: Utc::now().into(),
        }
    }

    fn service() -> ArtifactService {
        let db = Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());
        ArtifactService::new(
            LiveSessionRepository::new(Arc::clone(&db)),
            SessionPollRepository::new(Arc::clone(&db)),
            PollResponseRepository::new(Arc::clone(&db)),
            RoomLocks::new(),
            Arc::new(ManualClock::new(Utc::now())),
            SessionPolicyConfig::default(),
        )
    }

    fn poll_input(options: &[&str]) -> CreatePollInput {
        CreatePollInput {
            question: "Which topic next?".to_string(),
            options: options.iter().map(ToString::to_string).collect(),
        }
    }

    #[test]
    fn test_tally_is_order_independent() {
        let forward = vec![response("a", 0), response("b", 1), response("c", 1)];
        let reversed: Vec<_> = forward.iter().rev().cloned().collect();

        assert_eq!(tally(3, &forward), vec![1, 2, 0]);
        assert_eq!(tally(3, &forward), tally(3, &reversed));
    }

    #[test]
    fn test_tally_ignores_out_of_range() {
        let responses = vec![response("a", -1), response("b", 5), response("c", 0)];
        assert_eq!(tally(2, &responses), vec![1, 0]);
    }

    #[test]
    fn test_tally_empty_poll() {
        assert_eq!(tally(2, &[]), vec![0, 0]);
    }

    #[test]
    fn test_poll_validation() {
        let service = service();

        assert!(matches!(
            service.validate_poll(&poll_input(&["only"])),
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            service.validate_poll(&poll_input(&["yes", " "])),
            Err(AppError::Validation(_))
        ));
        let eleven: Vec<&str> = std::iter::repeat_n("x", 11).collect();
        assert!(service.validate_poll(&poll_input(&eleven)).is_err());
        let long = "x".repeat(101);
        assert!(service.validate_poll(&poll_input(&["ok", &long])).is_err());
        assert!(service.validate_poll(&poll_input(&["yes", "no"])).is_ok());

        let mut blank = poll_input(&["yes", "no"]);
        blank.question = "   ".to_string();
        assert!(service.validate_poll(&blank).is_err());
    }

    #[tokio::test]
    async fn test_single_option_poll_fails_before_touching_storage() {
        // The mock has no queued results; any query would error with Database.
        let result = service()
            .create_poll("tutor1", "s1", poll_input(&["only"]))
            .await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_oversized_whiteboard_rejected() {
        let mut service = service();
        service.policy.max_whiteboard_bytes = 16;
        let result = service
            .save_whiteboard("s1", json!({"strokes": "x".repeat(64)}))
            .await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }
}
