//! Profile entity - One row per club member, teacher, or administrator.
//!
//! The id is the external identity string handed over by the authenticating
//! proxy. `card_balance` caches the sum of the member's class-card ledger and
//! is only ever changed together with a `card_transactions` insert.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Profile database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "profiles")]
pub struct Model {
    /// External identity of the member
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    /// Display name
    pub full_name: String,
    /// Contact email
    pub email: Option<String>,
    /// Contact phone number
    pub phone: Option<String>,
    /// `"admin"`, `"teacher"` or `"student"`
    pub role: String,
    /// Remaining class-card credits
    pub card_balance: i64,
    /// When the profile was created
    pub created_at: DateTimeUtc,
    /// When the profile was last modified
    pub updated_at: DateTimeUtc,
}

/// Defines relationships between Profile and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One profile has many enrollments
    #[sea_orm(has_many = "super::enrollment::Entity")]
    Enrollments,
    /// One profile has many ledger rows
    #[sea_orm(has_many = "super::card_transaction::Entity")]
    CardTransactions,
}

impl Related<super::enrollment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Enrollments.def()
    }
}

impl Related<super::card_transaction::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CardTransactions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
