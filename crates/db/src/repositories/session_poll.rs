//! Session poll repository.

use std::sync::Arc;

use crate::entities::{PollResponse, SessionPoll, poll_response, session_poll};
use chrono::{DateTime, Utc};
use liveclass_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, sea_query::Expr,
};

/// Poll repository for database operations.
#[derive(Clone)]
pub struct SessionPollRepository {
    db: Arc<DatabaseConnection>,
}

impl SessionPollRepository {
    /// Create a new poll repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a poll by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<session_poll::Model>> {
        self.find_by_id_in(self.db.as_ref(), id).await
    }

    /// Find a poll by ID on the given connection.
    pub async fn find_by_id_in<C: ConnectionTrait>(
        &self,
        conn: &C,
        id: &str,
    ) -> AppResult<Option<session_poll::Model>> {
        SessionPoll::find_by_id(id)
            .one(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get a poll by ID, returning error if not found.
    pub async fn get_by_id(&self, id: &str) -> AppResult<session_poll::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Poll not found: {id}")))
    }

    /// Polls of a session in creation order.
    pub async fn find_by_session(&self, session_id: &str) -> AppResult<Vec<session_poll::Model>> {
        SessionPoll::find()
            .filter(session_poll::Column::SessionId.eq(session_id))
            .order_by_asc(session_poll::Column::Position)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create a new poll.
    pub async fn create_in<C: ConnectionTrait>(
        &self,
        conn: &C,
        model: session_poll::ActiveModel,
    ) -> AppResult<session_poll::Model> {
        model
            .insert(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Deactivate every active poll of a session. Returns how many were closed.
    pub async fn close_all_in<C: ConnectionTrait>(
        &self,
        conn: &C,
        session_id: &str,
        at: DateTime<Utc>,
    ) -> AppResult<u64> {
        let at: sea_orm::prelude::DateTimeWithTimeZone = at.into();
        let result = SessionPoll::update_many()
            .col_expr(session_poll::Column::IsActive, Expr::value(false))
            .col_expr(session_poll::Column::ClosedAt, Expr::value(Some(at)))
            .filter(session_poll::Column::SessionId.eq(session_id))
            .filter(session_poll::Column::IsActive.eq(true))
            .exec(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(result.rows_affected)
    }

    /// Deactivate one poll if it is still active.
    pub async fn close_in<C: ConnectionTrait>(
        &self,
        conn: &C,
        poll_id: &str,
        at: DateTime<Utc>,
    ) -> AppResult<bool> {
        let at: sea_orm::prelude::DateTimeWithTimeZone = at.into();
        let result = SessionPoll::update_many()
            .col_expr(session_poll::Column::IsActive, Expr::value(false))
            .col_expr(session_poll::Column::ClosedAt, Expr::value(Some(at)))
            .filter(session_poll::Column::Id.eq(poll_id))
            .filter(session_poll::Column::IsActive.eq(true))
            .exec(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(result.rows_affected == 1)
    }
}

/// Poll response repository for database operations.
#[derive(Clone)]
pub struct PollResponseRepository {
    db: Arc<DatabaseConnection>,
}

impl PollResponseRepository {
    /// Create a new poll response repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a participant's response to a poll.
    pub async fn find_by_poll_and_participant_in<C: ConnectionTrait>(
        &self,
        conn: &C,
        poll_id: &str,
        participant_id: &str,
    ) -> AppResult<Option<poll_response::Model>> {
        PollResponse::find()
            .filter(poll_response::Column::PollId.eq(poll_id))
            .filter(poll_response::Column::ParticipantId.eq(participant_id))
            .one(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Current responses to a poll.
    pub async fn find_by_poll(&self, poll_id: &str) -> AppResult<Vec<poll_response::Model>> {
        PollResponse::find()
            .filter(poll_response::Column::PollId.eq(poll_id))
            .order_by_asc(poll_response::Column::ParticipantId)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create a response.
    pub async fn create_in<C: ConnectionTrait>(
        &self,
        conn: &C,
        model: poll_response::ActiveModel,
    ) -> AppResult<poll_response::Model> {
        model
            .insert(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Overwrite an existing response.
    pub async fn update_in<C: ConnectionTrait>(
        &self,
        conn: &C,
        model: poll_response::ActiveModel,
    ) -> AppResult<poll_response::Model> {
        model
            .update(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}
