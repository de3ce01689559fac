//! Course group entity - Catalog sections such as "Latin" or "Kids".

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Course group database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "course_groups")]
pub struct Model {
    /// Unique identifier for the group
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Group name shown in the catalog
    pub name: String,
    /// Optional longer description
    pub description: Option<String>,
    /// Position in the catalog, ascending
    pub sort_order: i32,
    /// When the group was created
    pub created_at: DateTimeUtc,
}

/// Defines relationships between `CourseGroup` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One group has many courses
    #[sea_orm(has_many = "super::course::Entity")]
    Courses,
}

impl Related<super::course::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Courses.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
