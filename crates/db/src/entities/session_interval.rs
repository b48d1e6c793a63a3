//! Session interval entity: one continuous presence of a participant.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "session_interval")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    #[sea_orm(indexed)]
    pub session_id: String,

    #[sea_orm(indexed)]
    pub participant_id: String,

    pub joined_at: DateTimeWithTimeZone,

    /// Null while the participant is still in the room.
    #[sea_orm(nullable)]
    pub left_at: Option<DateTimeWithTimeZone>,
}

impl Model {
    /// Whether the participant is still present.
    #[must_use]
    pub const fn is_open(&self) -> bool {
        self.left_at.is_none()
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::live_session::Entity",
        from = "Column::SessionId",
        to = "super::live_session::Column::Id",
        on_delete = "Cascade"
    )]
    Session,
}

impl Related<super::live_session::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Session.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
