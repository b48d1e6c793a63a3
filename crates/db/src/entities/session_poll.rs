//! Session poll entity for in-class polls.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "session_poll")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    #[sea_orm(indexed)]
    pub session_id: String,

    /// Creation order within the session (0-based)
    pub position: i32,

    #[sea_orm(column_type = "Text")]
    pub question: String,

    /// Poll options (JSON array of strings)
    #[sea_orm(column_type = "Json")]
    pub options: JsonValue,

    /// Whether new responses are accepted
    pub is_active: bool,

    pub created_at: DateTimeWithTimeZone,

    #[sea_orm(nullable)]
    pub closed_at: Option<DateTimeWithTimeZone>,
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

    #[sea_orm(has_many = "super::poll_response::Entity")]
    Responses,
}

impl Related<super::live_session::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Session.def()
    }
}

impl Related<super::poll_response::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Responses.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
