//! Card transaction entity - One row of the class-card credit ledger.
//!
//! `delta` is signed: positive for `purchase`/`refund`, negative for
//! `consume`, either for `adjust`. `reference_id` points at the card order or
//! attendance record that caused the movement.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Card transaction database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "card_transactions")]
pub struct Model {
    /// Unique identifier for the ledger row
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Profile id of the card holder
    pub user_id: String,
    /// Signed credit movement
    pub delta: i64,
    /// `"purchase"`, `"consume"`, `"refund"` or `"adjust"`
    pub kind: String,
    /// Card order or attendance record id
    pub reference_id: Option<i64>,
    /// Human-readable description
    pub description: String,
    /// Profile id of whoever caused the movement
    pub created_by: String,
    /// When the movement happened
    pub created_at: DateTimeUtc,
}

/// Defines relationships between `CardTransaction` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each ledger row belongs to one profile
    #[sea_orm(
        belongs_to = "super::profile::Entity",
        from = "Column::UserId",
        to = "super::profile::Column::Id"
    )]
    Profile,
}

impl Related<super::profile::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Profile.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
