//! Session lifecycle rules.
//!
//! ```text
//! scheduled ──start──▶ live ──end──▶ completed
//!     │                  │
//!     └──────cancel──────┴──▶ cancelled
//! ```

use liveclass_common::{AppError, AppResult};
use liveclass_db::entities::{live_session, live_session::SessionStatus};

/// A lifecycle verb requested by the organizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleAction {
    /// `scheduled → live`
    Start,
    /// `live → completed`
    End,
    /// `scheduled | live → cancelled`
    Cancel,
}

impl LifecycleAction {
    /// Status the session ends up in.
    #[must_use]
    pub const fn target(self) -> SessionStatus {
        match self {
            Self::Start => SessionStatus::Live,
            Self::End => SessionStatus::Completed,
            Self::Cancel => SessionStatus::Cancelled,
        }
    }
}

/// Whether `from → to` is a legal move.
#[must_use]
pub const fn can_transition(from: SessionStatus, to: SessionStatus) -> bool {
    matches!(
        (from, to),
        (SessionStatus::Scheduled, SessionStatus::Live)
            | (SessionStatus::Live, SessionStatus::Completed)
            | (SessionStatus::Scheduled | SessionStatus::Live, SessionStatus::Cancelled)
    )
}

/// Resolve `action` against the current status.
pub fn next_status(from: SessionStatus, action: LifecycleAction) -> AppResult<SessionStatus> {
    let to = action.target();
    if can_transition(from, to) {
        Ok(to)
    } else {
        Err(AppError::InvalidTransition(format!(
            "cannot move session from {from} to {to}"
        )))
    }
}

/// Only the organizer may drive the lifecycle or manage polls.
pub fn ensure_organizer(session: &live_session::Model, caller_id: &str) -> AppResult<()> {
    if session.organizer_id == caller_id {
        Ok(())
    } else {
        Err(AppError::Forbidden(format!(
            "only the organizer can manage session {}",
            session.id
        )))
    }
}

/// In-session interactions need a live session.
pub fn ensure_live(session: &live_session::Model) -> AppResult<()> {
    if session.status == SessionStatus::Live {
        Ok(())
    } else {
        Err(AppError::Conflict(format!(
            "session {} is {}, not live",
            session.id, session.status
        )))
    }
}
