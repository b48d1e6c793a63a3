//! Test utilities for database operations.
//!
//! In-memory databases and row fixtures for tests.

use std::sync::Arc;

use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr};
use sea_orm_migration::MigratorTrait;

/// A migrated in-memory `SQLite` database.
///
/// The pool is pinned to a single connection so every query sees the same
/// in-memory database. Callers must not issue pooled queries while a
/// transaction is open.
pub struct TestDatabase {
    conn: Arc<DatabaseConnection>,
}

impl TestDatabase {
    /// Create a fresh database with all migrations applied.
    pub async fn in_memory() -> Result<Self, DbErr> {
        let mut opt = ConnectOptions::new("sqlite::memory:");
        opt.max_connections(1)
            .min_connections(1)
            .sqlx_logging(false);

        let conn = Database::connect(opt).await?;
        crate::migrations::Migrator::up(&conn, None).await?;

        Ok(Self {
            conn: Arc::new(conn),
        })
    }

    /// Borrow the connection.
    #[must_use]
    pub fn connection(&self) -> &DatabaseConnection {
        &self.conn
    }

    /// Shared handle for repositories and services.
    #[must_use]
    pub fn shared(&self) -> Arc<DatabaseConnection> {
        Arc::clone(&self.conn)
    }
}

/// A `scheduled` one-hour session row owned by `tutor1`, for repository tests.
#[must_use]
pub fn scheduled_session_fixture(
    id: &str,
    room_id: &str,
    start: chrono::DateTime<chrono::Utc>,
) -> crate::entities::live_session::ActiveModel {
    use crate::entities::live_session::{ActiveModel, SessionStatus};
    use sea_orm::Set;

    ActiveModel {
        id: Set(id.to_string()),
        room_id: Set(room_id.to_string()),
        organizer_id: Set("tutor1".to_string()),
        course_id: Set(None),
        title: Set("Algebra I".to_string()),
        description: Set(None),
        status: Set(SessionStatus::Scheduled),
        scheduled_start: Set(start.into()),
        scheduled_end: Set((start + chrono::Duration::hours(1)).into()),
        actual_start: Set(None),
        actual_end: Set(None),
        max_participants: Set(10),
        camera_required: Set(false),
        microphone_required: Set(false),
        allow_late_join: Set(true),
        attendance_threshold_percent: Set(50),
        total_participants: Set(0),
        peak_concurrent_users: Set(0),
        average_attendance_ms: Set(None),
        attended_count: Set(None),
        total_messages: Set(0),
        polls_created: Set(0),
        whiteboard_snapshot: Set(None),
        whiteboard_updated_at: Set(None),
        created_at: Set(start.into()),
        updated_at: Set(None),
    }
}
