//! Room admission: join and leave.
//!
//! A join runs as one unit under the room lock: read occupancy, compare to
//! capacity, open the interval, bump the rollup counters. Two joins racing
//! for the last slot therefore cannot both succeed.

use liveclass_common::{AppError, AppResult, IdGenerator, JoinRejection, Metrics, get_metrics};
use liveclass_db::{
    entities::{live_session, live_session::SessionStatus, session_interval},
    repositories::{LiveSessionRepository, SessionIntervalRepository},
};
use sea_orm::Set;
use serde::{Deserialize, Serialize};

use super::{clock::SharedClock, commit, room_lock::RoomLocks};

/// Devices the joining client reports as available.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceCapabilities {
    #[serde(default)]
    pub camera: bool,
    #[serde(default)]
    pub microphone: bool,
}

/// Outcome of an accepted join.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Admission {
    pub session_id: String,
    pub room_id: String,
    pub interval: session_interval::Model,
    /// Participants present after this join.
    pub occupancy: i64,
    /// First interval this participant ever opened in the session.
    pub first_join: bool,
    /// A still-open interval was closed to make room for this one.
    pub reconnected: bool,
}

/// Who is in the room right now.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Occupancy {
    pub session_id: String,
    pub room_id: String,
    pub status: SessionStatus,
    pub max_participants: i32,
    pub count: usize,
    pub participant_ids: Vec<String>,
}

fn missing_devices(session: &live_session::Model, devices: DeviceCapabilities) -> Vec<&'static str> {
    let mut missing = Vec::new();
    if session.camera_required && !devices.camera {
        missing.push("camera");
    }
    if session.microphone_required && !devices.microphone {
        missing.push("microphone");
    }
    missing
}

/// Room admission controller.
#[derive(Clone)]
pub struct AdmissionService {
    session_repo: LiveSessionRepository,
    interval_repo: SessionIntervalRepository,
    locks: RoomLocks,
    clock: SharedClock,
    id_gen: IdGenerator,
}

impl AdmissionService {
    /// Create a new admission service.
    #[must_use]
    pub const fn new(
        session_repo: LiveSessionRepository,
        interval_repo: SessionIntervalRepository,
        locks: RoomLocks,
        clock: SharedClock,
    ) -> Self {
        Self {
            session_repo,
            interval_repo,
            locks,
            clock,
            id_gen: IdGenerator::new(),
        }
    }

    /// Admit a participant into the session's room.
    ///
    /// Checks run in order and the first failure wins: the session must be
    /// live, the room must have a free slot, and required devices must be
    /// present. A participant who already holds an open interval is treated
    /// as reconnecting: their old interval is closed and does not count
    /// against capacity.
    pub async fn join(
        &self,
        session_id: &str,
        participant_id: &str,
        devices: DeviceCapabilities,
    ) -> AppResult<Admission> {
        let located = self.session_repo.get_by_id(session_id).await?;
        let _guard = self.locks.acquire(&located.room_id).await;
        let txn = self.session_repo.begin().await?;
        let session = self.session_repo.get_by_id_in(&txn, session_id).await?;

        if session.status != SessionStatus::Live {
            get_metrics().record_join_rejected(JoinRejection::NotJoinable);
            tracing::debug!(session_id, participant_id, status = %session.status, "Join rejected: not live");
            return Err(AppError::SessionNotJoinable(format!(
                "session {session_id} is {}",
                session.status
            )));
        }

        let open = self.interval_repo.count_open_in(&txn, session_id).await?;
        let own_open = self
            .interval_repo
            .count_open_for_participant_in(&txn, session_id, participant_id)
            .await?;
        let max = u64::try_from(session.max_participants).unwrap_or(0);
        if open.saturating_sub(own_open) >= max {
            get_metrics().record_join_rejected(JoinRejection::Capacity);
            tracing::debug!(session_id, participant_id, open, max, "Join rejected: room full");
            return Err(AppError::CapacityExceeded(format!(
                "session {session_id} is full ({max} participants)"
            )));
        }

        let missing = missing_devices(&session, devices);
        if !missing.is_empty() {
            get_metrics().record_join_rejected(JoinRejection::Device);
            tracing::debug!(session_id, participant_id, ?missing, "Join rejected: devices");
            return Err(AppError::DeviceRequirement(format!(
                "session requires {}",
                missing.join(" and ")
            )));
        }

        let now = self.clock.now();
        let first_join = !self
            .interval_repo
            .has_joined_in(&txn, session_id, participant_id)
            .await?;
        let reconnected = own_open > 0;
        if reconnected {
            self.interval_repo
                .close_for_participant_in(&txn, session_id, participant_id, now)
                .await?;
        }

        let interval = self
            .interval_repo
            .create_in(
                &txn,
                session_interval::ActiveModel {
                    id: Set(self.id_gen.generate()),
                    session_id: Set(session_id.to_string()),
                    participant_id: Set(participant_id.to_string()),
                    joined_at: Set(now.into()),
                    left_at: Set(None),
                },
            )
            .await?;

        let occupancy = self.interval_repo.count_open_in(&txn, session_id).await? as i64;
        let total_participants = session.total_participants + i64::from(first_join);
        let peak = session.peak_concurrent_users.max(occupancy);
        let room_id = session.room_id.clone();

        let mut active: live_session::ActiveModel = session.into();
        active.total_participants = Set(total_participants);
        active.peak_concurrent_users = Set(peak);
        active.updated_at = Set(Some(now.into()));
        self.session_repo.update_in(&txn, active).await?;
        commit(txn).await?;

        get_metrics().record_join(reconnected);
        tracing::info!(
            session_id,
            room_id = %room_id,
            participant_id,
            occupancy,
            reconnected,
            "Participant joined"
        );

        Ok(Admission {
            session_id: session_id.to_string(),
            room_id,
            interval,
            occupancy,
            first_join,
            reconnected,
        })
    }

    /// Close the participant's open interval.
    ///
    /// Returns `false` when there was nothing to close; repeated leave
    /// signals are harmless.
    pub async fn leave(&self, session_id: &str, participant_id: &str) -> AppResult<bool> {
        let located = self.session_repo.get_by_id(session_id).await?;
        let _guard = self.locks.acquire(&located.room_id).await;
        let txn = self.session_repo.begin().await?;

        let now = self.clock.now();
        let closed = self
            .interval_repo
            .close_for_participant_in(&txn, session_id, participant_id, now)
            .await?;
        commit(txn).await?;

        if closed > 0 {
            Metrics::incr(&get_metrics().leaves_total);
            tracing::info!(session_id, participant_id, "Participant left");
        } else {
            tracing::debug!(session_id, participant_id, "Leave without open interval ignored");
        }
        Ok(closed > 0)
    }

    /// Current occupancy of the session's room.
    pub async fn get_occupancy(&self, session_id: &str) -> AppResult<Occupancy> {
        let session = self.session_repo.get_by_id(session_id).await?;
        let open = self.interval_repo.find_open(session_id).await?;
        let mut participant_ids: Vec<String> =
            open.into_iter().map(|interval| interval.participant_id).collect();
        participant_ids.sort();

        Ok(Occupancy {
            session_id: session.id,
            room_id: session.room_id,
            status: session.status,
            max_participants: session.max_participants,
            count: participant_ids.len(),
            participant_ids,
        })
    }
}
