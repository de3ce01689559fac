//! Leave request entity - A member announcing absence from one session.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Leave request database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "leave_requests")]
pub struct Model {
    /// Unique identifier for the request
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Session the member will miss
    pub session_id: i64,
    /// Profile id of the member
    pub user_id: String,
    /// Optional reason given by the member
    pub reason: Option<String>,
    /// `"pending"`, `"approved"`, `"rejected"` or `"withdrawn"`
    pub status: String,
    /// Profile id of the reviewer
    pub reviewed_by: Option<String>,
    /// When the request was reviewed
    pub reviewed_at: Option<DateTimeUtc>,
    /// When the request was made
    pub created_at: DateTimeUtc,
}

/// Defines relationships between `LeaveRequest` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each request belongs to one session
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
