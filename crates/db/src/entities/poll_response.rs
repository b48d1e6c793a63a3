//! Poll response entity. One row per participant per poll; resubmission
//! overwrites it.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "poll_response")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    /// Poll being answered
    #[sea_orm(indexed)]
    pub poll_id: String,

    #[sea_orm(indexed)]
    pub session_id: String,

    /// Participant who answered
    pub participant_id: String,

    /// Option index (0-based)
    pub option_index: i32,

    pub responded_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::session_poll::Entity",
        from = "Column::PollId",
        to = "super::session_poll::Column::Id",
        on_delete = "Cascade"
    )]
    Poll,
}

impl Related<super::session_poll::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Poll.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
