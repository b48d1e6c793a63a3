//! Create `session_poll` and `poll_response` tables.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(SessionPoll::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(SessionPoll::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(SessionPoll::SessionId).string_len(32).not_null())
                    .col(ColumnDef::new(SessionPoll::Position).integer().not_null())
                    .col(ColumnDef::new(SessionPoll::Question).text().not_null())
                    .col(ColumnDef::new(SessionPoll::Options).json().not_null())
                    .col(
                        ColumnDef::new(SessionPoll::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(SessionPoll::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(ColumnDef::new(SessionPoll::ClosedAt).timestamp_with_time_zone())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_session_poll_session")
                            .from(SessionPoll::Table, SessionPoll::SessionId)
                            .to(LiveSession::Table, LiveSession::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_session_poll_session_position")
                    .table(SessionPoll::Table)
                    .col(SessionPoll::SessionId)
                    .col(SessionPoll::Position)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(PollResponse::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PollResponse::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(PollResponse::PollId).string_len(32).not_null())
                    .col(ColumnDef::new(PollResponse::SessionId).string_len(32).not_null())
                    .col(
                        ColumnDef::new(PollResponse::ParticipantId)
                            .string_len(64)
                            .not_null(),
                    )
                    .col(ColumnDef::new(PollResponse::OptionIndex).integer().not_null())
                    .col(
                        ColumnDef::new(PollResponse::RespondedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_poll_response_poll")
                            .from(PollResponse::Table, PollResponse::PollId)
                            .to(SessionPoll::Table, SessionPoll::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Last response wins: one row per participant per poll
        manager
            .create_index(
                Index::create()
                    .name("idx_poll_response_poll_participant")
                    .table(PollResponse::Table)
                    .col(PollResponse::PollId)
                    .col(PollResponse::ParticipantId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_poll_response_session_id")
                    .table(PollResponse::Table)
                    .col(PollResponse::SessionId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(PollResponse::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(SessionPoll::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum SessionPoll {
    Table,
    Id,
    SessionId,
    Position,
    Question,
    Options,
    IsActive,
    CreatedAt,
    ClosedAt,
}

#[derive(Iden)]
enum PollResponse {
    Table,
    Id,
    PollId,
    SessionId,
    ParticipantId,
    OptionIndex,
    RespondedAt,
}

#[derive(Iden)]
enum LiveSession {
    Table,
    Id,
}
