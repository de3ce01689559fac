//! Course session entity - One dated occurrence of a course.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Course session database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "course_sessions")]
pub struct Model {
    /// Unique identifier for the session
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Course this session belongs to
    pub course_id: i64,
    /// Start of the session
    pub starts_at: DateTimeUtc,
    /// `"scheduled"`, `"cancelled"` or `"completed"`
    pub status: String,
    /// Optional note for members (e.g., room change)
    pub notes: Option<String>,
    /// When the session was created
    pub created_at: DateTimeUtc,
}

/// Defines relationships between `CourseSession` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each session belongs to one course
    #[sea_orm(
        belongs_to = "super::course::Entity",
        from = "Column::CourseId",
        to = "super::course::Column::Id"
    )]
    Course,
    /// One session has many attendance records
    #[sea_orm(has_many = "super::attendance_record::Entity")]
    AttendanceRecords,
}

impl Related<super::course::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Course.def()
    }
}

impl Related<super::attendance_record::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::AttendanceRecords.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
