//! Card order entity - A member buying a class-card package.
//!
//! Credits and price are copied from the configured package when the order is
//! created, so later package changes do not alter open orders.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Card order database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "card_orders")]
pub struct Model {
    /// Unique identifier for the order
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Profile id of the buyer
    pub user_id: String,
    /// Name of the purchased package
    pub package_name: String,
    /// Credits granted when the order is paid
    pub credits: i64,
    /// Price of the package
    pub price: f64,
    /// `"pending"`, `"paid"` or `"cancelled"`
    pub status: String,
    /// Profile id of the admin who confirmed payment
    pub confirmed_by: Option<String>,
    /// When payment was confirmed
    pub paid_at: Option<DateTimeUtc>,
    /// When the order was placed
    pub created_at: DateTimeUtc,
}

/// Defines relationships between `CardOrder` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each order belongs to one profile
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
