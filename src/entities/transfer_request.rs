//! Transfer request entity - Move one upcoming session to another session.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Transfer request database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "transfer_requests")]
pub struct Model {
    /// Unique identifier for the request
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Profile id of the member
    pub user_id: String,
    /// Course of the session being moved
    pub course_id: i64,
    /// The session the member gives up
    pub from_session_id: i64,
    /// The session the member attends instead
    pub to_session_id: i64,
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

/// `TransferRequest` references sessions by id only
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
