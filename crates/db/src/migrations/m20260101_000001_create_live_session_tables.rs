//! Create `live_session` and `session_interval` tables.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(LiveSession::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(LiveSession::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(LiveSession::RoomId)
                            .string_len(64)
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(LiveSession::OrganizerId).string_len(64).not_null())
                    .col(ColumnDef::new(LiveSession::CourseId).string_len(64))
                    .col(ColumnDef::new(LiveSession::Title).string_len(200).not_null())
                    .col(ColumnDef::new(LiveSession::Description).text())
                    .col(
                        ColumnDef::new(LiveSession::Status)
                            .string_len(16)
                            .not_null()
                            .default("scheduled"),
                    )
                    .col(
                        ColumnDef::new(LiveSession::ScheduledStart)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(LiveSession::ScheduledEnd)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(LiveSession::ActualStart).timestamp_with_time_zone())
                    .col(ColumnDef::new(LiveSession::ActualEnd).timestamp_with_time_zone())
                    .col(ColumnDef::new(LiveSession::MaxParticipants).integer().not_null())
                    .col(
                        ColumnDef::new(LiveSession::CameraRequired)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(LiveSession::MicrophoneRequired)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(LiveSession::AllowLateJoin)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(LiveSession::AttendanceThresholdPercent)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(LiveSession::TotalParticipants)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(LiveSession::PeakConcurrentUsers)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(LiveSession::AverageAttendanceMs).big_integer())
                    .col(ColumnDef::new(LiveSession::AttendedCount).big_integer())
                    .col(
                        ColumnDef::new(LiveSession::TotalMessages)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(LiveSession::PollsCreated)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(LiveSession::WhiteboardSnapshot).json_binary())
                    .col(ColumnDef::new(LiveSession::WhiteboardUpdatedAt).timestamp_with_time_zone())
                    .col(
                        ColumnDef::new(LiveSession::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(ColumnDef::new(LiveSession::UpdatedAt).timestamp_with_time_zone())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_live_session_organizer_id")
                    .table(LiveSession::Table)
                    .col(LiveSession::OrganizerId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_live_session_status")
                    .table(LiveSession::Table)
                    .col(LiveSession::Status)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(SessionInterval::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(SessionInterval::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(SessionInterval::SessionId).string_len(32).not_null())
                    .col(
                        ColumnDef::new(SessionInterval::ParticipantId)
                            .string_len(64)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SessionInterval::JoinedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(SessionInterval::LeftAt).timestamp_with_time_zone())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_session_interval_session")
                            .from(SessionInterval::Table, SessionInterval::SessionId)
                            .to(LiveSession::Table, LiveSession::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Occupancy and per-participant lookups both filter on session first
        manager
            .create_index(
                Index::create()
                    .name("idx_session_interval_session_participant")
                    .table(SessionInterval::Table)
                    .col(SessionInterval::SessionId)
                    .col(SessionInterval::ParticipantId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_session_interval_session_left_at")
                    .table(SessionInterval::Table)
                    .col(SessionInterval::SessionId)
                    .col(SessionInterval::LeftAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(SessionInterval::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(LiveSession::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum LiveSession {
    Table,
    Id,
    RoomId,
    OrganizerId,
    CourseId,
    Title,
    Description,
    Status,
    ScheduledStart,
    ScheduledEnd,
    ActualStart,
    ActualEnd,
    MaxParticipants,
    CameraRequired,
    MicrophoneRequired,
    AllowLateJoin,
    AttendanceThresholdPercent,
    TotalParticipants,
    PeakConcurrentUsers,
    AverageAttendanceMs,
    AttendedCount,
    TotalMessages,
    PollsCreated,
    WhiteboardSnapshot,
    WhiteboardUpdatedAt,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum SessionInterval {
    Table,
    Id,
    SessionId,
    ParticipantId,
    JoinedAt,
    LeftAt,
}
