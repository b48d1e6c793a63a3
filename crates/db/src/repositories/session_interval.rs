//! Session interval repository (join/leave log).

use std::sync::Arc;

use crate::entities::{SessionInterval, session_interval};
use chrono::{DateTime, Utc};
use liveclass_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, sea_query::Expr,
};

/// Interval repository for database operations.
#[derive(Clone)]
pub struct SessionIntervalRepository {
    db: Arc<DatabaseConnection>,
}

impl SessionIntervalRepository {
    /// Create a new interval repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// All intervals of a session in join order.
    pub async fn find_by_session(&self, session_id: &str) -> AppResult<Vec<session_interval::Model>> {
        self.find_by_session_in(self.db.as_ref(), session_id).await
    }

    /// All intervals of a session in join order, on the given connection.
    pub async fn find_by_session_in<C: ConnectionTrait>(
        &self,
        conn: &C,
        session_id: &str,
    ) -> AppResult<Vec<session_interval::Model>> {
        SessionInterval::find()
            .filter(session_interval::Column::SessionId.eq(session_id))
            .order_by_asc(session_interval::Column::JoinedAt)
            .order_by_asc(session_interval::Column::Id)
            .all(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Intervals still open in a session.
    pub async fn find_open(&self, session_id: &str) -> AppResult<Vec<session_interval::Model>> {
        SessionInterval::find()
            .filter(session_interval::Column::SessionId.eq(session_id))
            .filter(session_interval::Column::LeftAt.is_null())
            .order_by_asc(session_interval::Column::JoinedAt)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Current occupancy: number of open intervals in a session.
    pub async fn count_open_in<C: ConnectionTrait>(
        &self,
        conn: &C,
        session_id: &str,
    ) -> AppResult<u64> {
        SessionInterval::find()
            .filter(session_interval::Column::SessionId.eq(session_id))
            .filter(session_interval::Column::LeftAt.is_null())
            .count(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Open intervals held by one participant.
    pub async fn count_open_for_participant_in<C: ConnectionTrait>(
        &self,
        conn: &C,
        session_id: &str,
        participant_id: &str,
    ) -> AppResult<u64> {
        SessionInterval::find()
            .filter(session_interval::Column::SessionId.eq(session_id))
            .filter(session_interval::Column::ParticipantId.eq(participant_id))
            .filter(session_interval::Column::LeftAt.is_null())
            .count(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Whether the participant has any interval in the session.
    pub async fn has_joined_in<C: ConnectionTrait>(
        &self,
        conn: &C,
        session_id: &str,
        participant_id: &str,
    ) -> AppResult<bool> {
        let count = SessionInterval::find()
            .filter(session_interval::Column::SessionId.eq(session_id))
            .filter(session_interval::Column::ParticipantId.eq(participant_id))
            .count(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(count > 0)
    }

    /// Open a new interval.
    pub async fn create_in<C: ConnectionTrait>(
        &self,
        conn: &C,
        model: session_interval::ActiveModel,
    ) -> AppResult<session_interval::Model> {
        model
            .insert(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Close the participant's open intervals at `at`. Returns how many were closed.
    pub async fn close_for_participant_in<C: ConnectionTrait>(
        &self,
        conn: &C,
        session_id: &str,
        participant_id: &str,
        at: DateTime<Utc>,
    ) -> AppResult<u64> {
        let at: sea_orm::prelude::DateTimeWithTimeZone = at.into();
        let result = SessionInterval::update_many()
            .col_expr(session_interval::Column::LeftAt, Expr::value(Some(at)))
            .filter(session_interval::Column::SessionId.eq(session_id))
            .filter(session_interval::Column::ParticipantId.eq(participant_id))
            .filter(session_interval::Column::LeftAt.is_null())
            .exec(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(result.rows_affected)
    }

    /// Close every open interval of the session at `at`.
    pub async fn close_all_in<C: ConnectionTrait>(
        &self,
        conn: &C,
        session_id: &str,
        at: DateTime<Utc>,
    ) -> AppResult<u64> {
        let at: sea_orm::prelude::DateTimeWithTimeZone = at.into();
        let result = SessionInterval::update_many()
            .col_expr(session_interval::Column::LeftAt, Expr::value(Some(at)))
            .filter(session_interval::Column::SessionId.eq(session_id))
            .filter(session_interval::Column::LeftAt.is_null())
            .exec(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(result.rows_affected)
    }
}
