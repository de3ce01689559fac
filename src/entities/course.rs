//! Course entity - A weekly class with a fixed capacity.
//!
//! `weekday` and `start_time` describe the regular slot used when sessions are
//! generated. `credits_per_session` is what one attended session costs on the
//! class card, and the two quotas cap makeup and transfer requests per member.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Course database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "courses")]
pub struct Model {
    /// Unique identifier for the course
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Catalog group, if any
    pub group_id: Option<i64>,
    /// Course name (e.g., "Salsa Beginners")
    pub name: String,
    /// Optional longer description
    pub description: Option<String>,
    /// Free-form level label (e.g., "beginner")
    pub level: Option<String>,
    /// Profile id of the teaching member
    pub teacher_id: Option<String>,
    /// Maximum number of enrolled members
    pub capacity: i32,
    /// Day of week, 0 = Monday .. 6 = Sunday
    pub weekday: i32,
    /// Start time as `HH:MM` (UTC)
    pub start_time: String,
    /// Length of one session
    pub duration_minutes: i32,
    /// Class-card credits consumed per attended session
    pub credits_per_session: i64,
    /// Makeup requests allowed per member
    pub makeup_quota: i64,
    /// Transfer requests allowed per member
    pub transfer_quota: i64,
    /// Inactive courses accept no new enrollments
    pub is_active: bool,
    /// When the course was created
    pub created_at: DateTimeUtc,
    /// When the course was last modified
    pub updated_at: DateTimeUtc,
}

/// Defines relationships between Course and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each course optionally belongs to one group
    #[sea_orm(
        belongs_to = "super::course_group::Entity",
        from = "Column::GroupId",
        to = "super::course_group::Column::Id"
    )]
    CourseGroup,
    /// One course has many sessions
    #[sea_orm(has_many = "super::course_session::Entity")]
    Sessions,
    /// One course has many enrollments
    #[sea_orm(has_many = "super::enrollment::Entity")]
    Enrollments,
}

impl Related<super::course_group::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CourseGroup.def()
    }
}

impl Related<super::course_session::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Sessions.def()
    }
}

impl Related<super::enrollment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Enrollments.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
