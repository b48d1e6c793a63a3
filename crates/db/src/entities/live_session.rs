//! Live session entity: one scheduled class instance and its rollups.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Lifecycle status of a live session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    /// Created, waiting for the organizer to start it.
    #[sea_orm(string_value = "scheduled")]
    Scheduled,
    /// In progress; joins and interactions are accepted.
    #[sea_orm(string_value = "live")]
    Live,
    /// Ended normally; attendance has been computed.
    #[sea_orm(string_value = "completed")]
    Completed,
    /// Called off before or during the class.
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
}

impl SessionStatus {
    /// Whether no further lifecycle transition is possible.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }

    /// Lowercase name as stored and serialized.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Scheduled => "scheduled",
            Self::Live => "live",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Live session entity.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "live_session")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    /// Room key for all live state; never changes.
    #[sea_orm(unique)]
    pub room_id: String,

    /// Tutor who owns the session.
    #[sea_orm(indexed)]
    pub organizer_id: String,

    /// Catalog course this class belongs to (optional).
    #[sea_orm(nullable)]
    pub course_id: Option<String>,

    pub title: String,

    #[sea_orm(column_type = "Text", nullable)]
    pub description: Option<String>,

    pub status: SessionStatus,

    pub scheduled_start: DateTimeWithTimeZone,
    pub scheduled_end: DateTimeWithTimeZone,

    #[sea_orm(nullable)]
    pub actual_start: Option<DateTimeWithTimeZone>,
    #[sea_orm(nullable)]
    pub actual_end: Option<DateTimeWithTimeZone>,

    pub max_participants: i32,
    pub camera_required: bool,
    pub microphone_required: bool,
    pub allow_late_join: bool,
    pub attendance_threshold_percent: i32,

    /// Distinct participants that ever joined.
    #[sea_orm(default_value = 0)]
    pub total_participants: i64,

    /// Highest simultaneous occupancy seen.
    #[sea_orm(default_value = 0)]
    pub peak_concurrent_users: i64,

    /// Mean attended duration in milliseconds, set at completion.
    #[sea_orm(nullable)]
    pub average_attendance_ms: Option<i64>,

    /// Participants meeting the attendance threshold, set at completion.
    #[sea_orm(nullable)]
    pub attended_count: Option<i64>,

    #[sea_orm(default_value = 0)]
    pub total_messages: i64,

    #[sea_orm(default_value = 0)]
    pub polls_created: i64,

    /// Latest whiteboard state (opaque JSON).
    #[sea_orm(column_type = "JsonBinary", nullable)]
    pub whiteboard_snapshot: Option<Json>,

    #[sea_orm(nullable)]
    pub whiteboard_updated_at: Option<DateTimeWithTimeZone>,

    pub created_at: DateTimeWithTimeZone,

    #[sea_orm(nullable)]
    pub updated_at: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::session_interval::Entity")]
    Intervals,
    #[sea_orm(has_many = "super::session_poll::Entity")]
    Polls,
}

impl Related<super::session_interval::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Intervals.def()
    }
}

impl Related<super::session_poll::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Polls.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
