//! Live session repository.

use std::sync::Arc;

use crate::entities::{LiveSession, live_session, live_session::SessionStatus};
use liveclass_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DatabaseTransaction,
    EntityTrait, QueryFilter, QueryOrder, QuerySelect, TransactionTrait,
};

/// Live session repository for database operations.
#[derive(Clone)]
pub struct LiveSessionRepository {
    db: Arc<DatabaseConnection>,
}

impl LiveSessionRepository {
    /// Create a new live session repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Get the underlying connection.
    #[must_use]
    pub fn db(&self) -> &DatabaseConnection {
        self.db.as_ref()
    }

    /// Begin a transaction on the pooled connection.
    pub async fn begin(&self) -> AppResult<DatabaseTransaction> {
        self.db
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a session by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<live_session::Model>> {
        self.find_by_id_in(self.db.as_ref(), id).await
    }

    /// Find a session by ID on the given connection or transaction.
    pub async fn find_by_id_in<C: ConnectionTrait>(
        &self,
        conn: &C,
        id: &str,
    ) -> AppResult<Option<live_session::Model>> {
        LiveSession::find_by_id(id)
            .one(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get a session by ID, returning error if not found.
    pub async fn get_by_id(&self, id: &str) -> AppResult<live_session::Model> {
        self.get_by_id_in(self.db.as_ref(), id).await
    }

    /// Get a session by ID on the given connection, returning error if not found.
    pub async fn get_by_id_in<C: ConnectionTrait>(
        &self,
        conn: &C,
        id: &str,
    ) -> AppResult<live_session::Model> {
        self.find_by_id_in(conn, id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Session not found: {id}")))
    }

    /// List sessions owned by an organizer, soonest first.
    pub async fn find_by_organizer(
        &self,
        organizer_id: &str,
        limit: u64,
        offset: u64,
    ) -> AppResult<Vec<live_session::Model>> {
        LiveSession::find()
            .filter(live_session::Column::OrganizerId.eq(organizer_id))
            .order_by_asc(live_session::Column::ScheduledStart)
            .order_by_asc(live_session::Column::Id)
            .limit(limit)
            .offset(offset)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create a new session.
    pub async fn create(&self, model: live_session::ActiveModel) -> AppResult<live_session::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Update a session on the given connection or transaction.
    pub async fn update_in<C: ConnectionTrait>(
        &self,
        conn: &C,
        model: live_session::ActiveModel,
    ) -> AppResult<live_session::Model> {
        model
            .update(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Apply `changes` only if the session is still in status `from`.
    ///
    /// Returns `false` when another writer moved the session first.
    pub async fn transition_in<C: ConnectionTrait>(
        &self,
        conn: &C,
        id: &str,
        from: SessionStatus,
        changes: live_session::ActiveModel,
    ) -> AppResult<bool> {
        let result = LiveSession::update_many()
            .set(changes)
            .filter(live_session::Column::Id.eq(id))
            .filter(live_session::Column::Status.eq(from))
            .exec(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(result.rows_affected == 1)
    }

    /// Increment the message counter atomically while the session is live.
    ///
    /// Returns `false` if the session is missing or not live.
    pub async fn increment_messages(&self, id: &str) -> AppResult<bool> {
        use sea_orm::sea_query::Expr;

        let result = LiveSession::update_many()
            .col_expr(
                live_session::Column::TotalMessages,
                Expr::col(live_session::Column::TotalMessages).add(1),
            )
            .filter(live_session::Column::Id.eq(id))
            .filter(live_session::Column::Status.eq(SessionStatus::Live))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(result.rows_affected == 1)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::test_utils::{TestDatabase, scheduled_session_fixture};
    use chrono::{TimeZone, Utc};
    use sea_orm::Set;

    async fn setup() -> (TestDatabase, LiveSessionRepository) {
        let db = TestDatabase::in_memory().await.unwrap();
        let repo = LiveSessionRepository::new(db.shared());
        let start = Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap();
        repo.create(scheduled_session_fixture("s1", "room_a", start))
            .await
            .unwrap();
        (db, repo)
    }

    fn to_live() -> live_session::ActiveModel {
        live_session::ActiveModel {
            status: Set(SessionStatus::Live),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_room_id_is_unique() {
        let (_db, repo) = setup().await;

        let clash = repo
            .create(scheduled_session_fixture("s2", "room_a", Utc::now()))
            .await;
        assert!(matches!(clash, Err(AppError::Database(_))));
        assert!(repo.find_by_id("s2").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_get_by_id_not_found() {
        let (_db, repo) = setup().await;
        let result = repo.get_by_id("missing").await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_transition_only_applies_from_expected_status() {
        let (_db, repo) = setup().await;

        let moved = repo
            .transition_in(repo.db(), "s1", SessionStatus::Scheduled, to_live())
            .await
            .unwrap();
        assert!(moved);

        // Stale expectation does nothing
        let moved_again = repo
            .transition_in(repo.db(), "s1", SessionStatus::Scheduled, to_live())
            .await
            .unwrap();
        assert!(!moved_again);

        assert_eq!(repo.get_by_id("s1").await.unwrap().status, SessionStatus::Live);
    }

    #[tokio::test]
    async fn test_increment_messages_requires_live() {
        let (_db, repo) = setup().await;

        assert!(!repo.increment_messages("s1").await.unwrap());

        repo.transition_in(repo.db(), "s1", SessionStatus::Scheduled, to_live())
            .await
            .unwrap();

        assert!(repo.increment_messages("s1").await.unwrap());
        assert!(repo.increment_messages("s1").await.unwrap());
        assert_eq!(repo.get_by_id("s1").await.unwrap().total_messages, 2);
    }

    #[tokio::test]
    async fn test_find_by_organizer() {
        let (_db, repo) = setup().await;
        let later = Utc.with_ymd_and_hms(2026, 3, 9, 9, 0, 0).unwrap();
        repo.create(scheduled_session_fixture("s2", "room_b", later))
            .await
            .unwrap();

        let sessions = repo.find_by_organizer("tutor1", 10, 0).await.unwrap();
        assert_eq!(sessions.len(), 2);
        assert_eq!(sessions[0].id, "s1");

        let page = repo.find_by_organizer("tutor1", 1, 1).await.unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].id, "s2");

        assert!(repo.find_by_organizer("other", 10, 0).await.unwrap().is_empty());
    }
}
