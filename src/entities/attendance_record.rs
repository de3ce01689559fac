//! Attendance record entity - The rollcall mark of one member for one session.
//!
//! `credits_charged` is what the mark currently costs on the class card, so a
//! re-mark only moves the difference.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Attendance record database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "attendance_records")]
pub struct Model {
    /// Unique identifier for the record
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Session this mark belongs to
    pub session_id: i64,
    /// Profile id of the member
    pub user_id: String,
    /// `"present"`, `"absent"`, `"leave"` or `"makeup"`
    pub status: String,
    /// Credits currently charged for this mark
    pub credits_charged: i64,
    /// Profile id of the teacher or admin who marked
    pub marked_by: String,
    /// When the mark was last written
    pub marked_at: DateTimeUtc,
}

/// Defines relationships between `AttendanceRecord` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each record belongs to one session
    #[sea_orm(
        belongs_to = "super::course_session::Entity",
        from = "Column::SessionId",
        to = "super::course_session::Column::Id"
    )]
    Session,
}

impl Related<super::course_session::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Session.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
