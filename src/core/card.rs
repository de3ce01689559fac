//! Class-card business logic - Orders and the credit ledger.
//!
//! Every credit movement goes through [`apply_ledger_entry`], which writes a
//! `card_transactions` row and atomically moves `profiles.card_balance` by the
//! same delta, so the cached balance always equals the ledger sum. Orders are
//! created by members and confirmed by an admin once payment is received;
//! confirmation is what grants the credits.

use crate::{
    config::settings::{self, CardPackage},
    core::{
        profile,
        status::{LedgerKind, OrderStatus, Role},
        system_config,
    },
    entities::{
        CardOrder, CardTransaction, Profile, card_order, card_transaction,
        profile as profile_entity,
    },
    errors::{Error, Result},
};
use chrono::Utc;
use sea_orm::{QueryOrder, QuerySelect, Set, TransactionTrait, prelude::*, sea_query::Expr};
use serde::Deserialize;
use tracing::{info, warn};

/// One credit movement to record.
#[derive(Debug, Clone)]
pub struct LedgerEntry<'a> {
    /// Card holder
    pub user_id: &'a str,
    /// Signed credit movement, never zero
    pub delta: i64,
    /// Why the credits moved
    pub kind: LedgerKind,
    /// Card order or attendance record id
    pub reference_id: Option<i64>,
    /// Human-readable description
    pub description: String,
    /// Profile id of whoever caused the movement
    pub created_by: &'a str,
}

/// Filter for [`list_orders`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OrderFilter {
    /// Only orders of this member
    pub user_id: Option<String>,
    /// Only orders in this status
    pub status: Option<OrderStatus>,
}

/// Writes a ledger row and moves the cached balance by the same delta.
///
/// Negative deltas are refused when they would take the balance below zero,
/// unless `allow_negative_balance` is set. Run this inside the caller's
/// transaction when it is part of a larger change.
pub async fn apply_ledger_entry<C>(
    db: &C,
    entry: LedgerEntry<'_>,
) -> Result<card_transaction::Model>
where
    C: ConnectionTrait,
{
    if entry.delta == 0 {
        return Err(Error::InvalidCredits { credits: 0 });
    }

    let holder = profile::require_profile(db, entry.user_id).await?;
    let new_balance = holder
        .card_balance
        .checked_add(entry.delta)
        .ok_or(Error::InvalidCredits {
            credits: entry.delta,
        })?;
    if entry.delta < 0 && new_balance < 0 {
        let policy = system_config::load_policy(db).await?;
        if !policy.allow_negative_balance {
            warn!(
                user_id = entry.user_id,
                balance = holder.card_balance,
                delta = entry.delta,
                "Ledger entry refused: insufficient credits"
            );
            return Err(Error::InsufficientCredits {
                balance: holder.card_balance,
                required: entry.delta.checked_neg().ok_or(Error::InvalidCredits {
                    credits: entry.delta,
                })?,
            });
        }
    }

    let row = card_transaction::ActiveModel {
        user_id: Set(entry.user_id.to_string()),
        delta: Set(entry.delta),
        kind: Set(entry.kind.as_str().to_string()),
        reference_id: Set(entry.reference_id),
        description: Set(entry.description),
        created_by: Set(entry.created_by.to_string()),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await?;

    // Atomic update: card_balance = card_balance + delta
    Profile::update_many()
        .col_expr(
            profile_entity::Column::CardBalance,
            Expr::col(profile_entity::Column::CardBalance).add(entry.delta),
        )
        .filter(profile_entity::Column::Id.eq(entry.user_id))
        .exec(db)
        .await?;

    info!(
        user_id = entry.user_id,
        delta = entry.delta,
        kind = %entry.kind,
        reference_id = ?entry.reference_id,
        "Ledger entry applied"
    );
    Ok(row)
}

/// Current class-card balance of a member.
pub async fn get_balance<C>(db: &C, user_id: &str) -> Result<i64>
where
    C: ConnectionTrait,
{
    Ok(profile::require_profile(db, user_id).await?.card_balance)
}

/// Sum of all ledger deltas of a member; equals the cached balance.
pub async fn ledger_total<C>(db: &C, user_id: &str) -> Result<i64>
where
    C: ConnectionTrait,
{
    Ok(CardTransaction::find()
        .filter(card_transaction::Column::UserId.eq(user_id))
        .all(db)
        .await?
        .iter()
        .map(|t| t.delta)
        .sum())
}

/// Ledger rows of a member, newest first.
pub async fn list_transactions<C>(
    db: &C,
    user_id: &str,
    limit: Option<u64>,
) -> Result<Vec<card_transaction::Model>>
where
    C: ConnectionTrait,
{
    CardTransaction::find()
        .filter(card_transaction::Column::UserId.eq(user_id))
        .order_by_desc(card_transaction::Column::CreatedAt)
        .order_by_desc(card_transaction::Column::Id)
        .limit(limit)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Places a pending order for a configured package.
pub async fn create_order(
    db: &DatabaseConnection,
    packages: &[CardPackage],
    user_id: &str,
    package_name: &str,
) -> Result<card_order::Model> {
    let package =
        settings::find_package(packages, package_name).ok_or_else(|| Error::PackageNotFound {
            name: package_name.to_string(),
        })?;
    profile::require_profile(db, user_id).await?;

    let order = card_order::ActiveModel {
        user_id: Set(user_id.to_string()),
        package_name: Set(package.name.clone()),
        credits: Set(package.credits),
        price: Set(package.price),
        status: Set(OrderStatus::Pending.as_str().to_string()),
        confirmed_by: Set(None),
        paid_at: Set(None),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await?;

    info!(order_id = order.id, user_id, package = %order.package_name, "Card order placed");
    Ok(order)
}

async fn require_order<C>(db: &C, order_id: i64) -> Result<card_order::Model>
where
    C: ConnectionTrait,
{
    CardOrder::find_by_id(order_id)
        .one(db)
        .await?
        .ok_or(Error::OrderNotFound { id: order_id })
}

fn ensure_pending(order: &card_order::Model) -> Result<()> {
    if order.status != OrderStatus::Pending.as_str() {
        return Err(Error::InvalidState {
            expected: OrderStatus::Pending.to_string(),
            actual: order.status.clone(),
        });
    }
    Ok(())
}

/// Confirms payment of a pending order and credits the card.
pub async fn confirm_order(
    db: &DatabaseConnection,
    order_id: i64,
    admin_id: &str,
) -> Result<card_order::Model> {
    let txn = db.begin().await?;
    profile::require_role(&txn, admin_id, &[Role::Admin]).await?;

    let order = require_order(&txn, order_id).await?;
    ensure_pending(&order)?;

    let now = Utc::now();
    let user_id = order.user_id.clone();
    let credits = order.credits;
    let package_name = order.package_name.clone();

    let mut active_model: card_order::ActiveModel = order.into();
    active_model.status = Set(OrderStatus::Paid.as_str().to_string());
    active_model.confirmed_by = Set(Some(admin_id.to_string()));
    active_model.paid_at = Set(Some(now));
    let paid = active_model.update(&txn).await?;

    apply_ledger_entry(
        &txn,
        LedgerEntry {
            user_id: &user_id,
            delta: credits,
            kind: LedgerKind::Purchase,
            reference_id: Some(order_id),
            description: format!("Purchased {package_name}"),
            created_by: admin_id,
        },
    )
    .await?;

    txn.commit().await?;
    info!(order_id, admin_id, credits, "Card order confirmed");
    Ok(paid)
}

/// Cancels a pending order. Owners may cancel their own orders; admins any.
pub async fn cancel_order(
    db: &DatabaseConnection,
    order_id: i64,
    actor_id: &str,
) -> Result<card_order::Model> {
    let txn = db.begin().await?;
    let order = require_order(&txn, order_id).await?;
    if order.user_id != actor_id {
        profile::require_role(&txn, actor_id, &[Role::Admin]).await?;
    }
    ensure_pending(&order)?;

    let mut active_model: card_order::ActiveModel = order.into();
    active_model.status = Set(OrderStatus::Cancelled.as_str().to_string());
    let cancelled = active_model.update(&txn).await?;

    txn.commit().await?;
    info!(order_id, actor_id, "Card order cancelled");
    Ok(cancelled)
}

/// Manual balance correction by an admin.
pub async fn adjust_balance(
    db: &DatabaseConnection,
    user_id: &str,
    delta: i64,
    description: String,
    admin_id: &str,
) -> Result<card_transaction::Model> {
    if delta == 0 {
        return Err(Error::InvalidCredits { credits: delta });
    }

    let txn = db.begin().await?;
    profile::require_role(&txn, admin_id, &[Role::Admin]).await?;
    let row = apply_ledger_entry(
        &txn,
        LedgerEntry {
            user_id,
            delta,
            kind: LedgerKind::Adjust,
            reference_id: None,
            description,
            created_by: admin_id,
        },
    )
    .await?;
    txn.commit().await?;
    Ok(row)
}

/// Lists orders newest first.
pub async fn list_orders(
    db: &DatabaseConnection,
    filter: OrderFilter,
) -> Result<Vec<card_order::Model>> {
    let mut query = CardOrder::find();
    if let Some(user_id) = filter.user_id {
        query = query.filter(card_order::Column::UserId.eq(user_id));
    }
    if let Some(status) = filter.status {
        query = query.filter(card_order::Column::Status.eq(status.as_str()));
    }
    query
        .order_by_desc(card_order::Column::CreatedAt)
        .order_by_desc(card_order::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::test_utils::*;

    fn packages() -> Vec<CardPackage> {
        vec![CardPackage {
            name: "10 classes".to_string(),
            credits: 10,
            price: 150.0,
        }]
    }

    #[tokio::test]
    async fn test_zero_delta_is_rejected_before_touching_db() -> Result<()> {
        let db = setup_test_db().await?;
        let result = apply_ledger_entry(
            &db,
            LedgerEntry {
                user_id: "a",
                delta: 0,
                kind: LedgerKind::Adjust,
                reference_id: None,
                description: "nothing".to_string(),
                created_by: "admin",
            },
        )
        .await;
        assert!(matches!(
            result.unwrap_err(),
            Error::InvalidCredits { credits: 0 }
        ));

        let result = adjust_balance(&db, "a", 0, "nothing".to_string(), "admin").await;
        assert!(matches!(result.unwrap_err(), Error::InvalidCredits { .. }));
        Ok(())
    }

    #[tokio::test]
    async fn test_unknown_package() -> Result<()> {
        let db = setup_test_db().await?;
        let result = create_order(&db, &packages(), "a", "unlimited").await;
        assert!(matches!(
            result.unwrap_err(),
            Error::PackageNotFound { name } if name == "unlimited"
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_order_lifecycle_credits_card() -> Result<()> {
        let db = setup_test_db().await?;
        create_test_profile(&db, "admin", Role::Admin).await?;
        create_test_profile(&db, "a", Role::Student).await?;

        let order = create_order(&db, &packages(), "a", "10 classes").await?;
        assert_eq!(order.status, "pending");
        assert_eq!(order.credits, 10);
        assert_eq!(order.price, 150.0);
        assert_eq!(get_balance(&db, "a").await?, 0);

        // Members cannot confirm their own orders
        assert!(matches!(
            confirm_order(&db, order.id, "a").await.unwrap_err(),
            Error::Forbidden { .. }
        ));

        let paid = confirm_order(&db, order.id, "admin").await?;
        assert_eq!(paid.status, "paid");
        assert_eq!(paid.confirmed_by.as_deref(), Some("admin"));
        assert!(paid.paid_at.is_some());
        assert_eq!(get_balance(&db, "a").await?, 10);

        let ledger = list_transactions(&db, "a", None).await?;
        assert_eq!(ledger.len(), 1);
        assert_eq!(ledger[0].kind, "purchase");
        assert_eq!(ledger[0].reference_id, Some(order.id));

        // A paid order cannot be confirmed or cancelled again
        assert!(matches!(
            confirm_order(&db, order.id, "admin").await.unwrap_err(),
            Error::InvalidState { .. }
        ));
        assert!(matches!(
            cancel_order(&db, order.id, "a").await.unwrap_err(),
            Error::InvalidState { .. }
        ));
        assert_eq!(get_balance(&db, "a").await?, 10);
        Ok(())
    }

    #[tokio::test]
    async fn test_cancel_order_permissions() -> Result<()> {
        let db = setup_test_db().await?;
        create_test_profile(&db, "admin", Role::Admin).await?;
        create_test_profile(&db, "a", Role::Student).await?;
        create_test_profile(&db, "b", Role::Student).await?;

        let first = create_order(&db, &packages(), "a", "10 classes").await?;
        let second = create_order(&db, &packages(), "a", "10 classes").await?;

        assert!(matches!(
            cancel_order(&db, first.id, "b").await.unwrap_err(),
            Error::Forbidden { .. }
        ));
        assert_eq!(cancel_order(&db, first.id, "a").await?.status, "cancelled");
        assert_eq!(
            cancel_order(&db, second.id, "admin").await?.status,
            "cancelled"
        );

        let cancelled = list_orders(
            &db,
            OrderFilter {
                user_id: Some("a".to_string()),
                status: Some(OrderStatus::Cancelled),
            },
        )
        .await?;
        assert_eq!(cancelled.len(), 2);
        assert!(matches!(
            cancel_order(&db, 999, "admin").await.unwrap_err(),
            Error::OrderNotFound { id: 999 }
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_negative_balance_rule() -> Result<()> {
        let db = setup_test_db().await?;
        create_test_profile(&db, "admin", Role::Admin).await?;
        create_test_profile(&db, "a", Role::Student).await?;

        adjust_balance(&db, "a", 3, "welcome".to_string(), "admin").await?;
        assert!(matches!(
            adjust_balance(&db, "a", -5, "too much".to_string(), "admin")
                .await
                .unwrap_err(),
            Error::InsufficientCredits {
                balance: 3,
                required: 5
            }
        ));
        assert_eq!(get_balance(&db, "a").await?, 3);

        system_config::set_value(&db, system_config::ALLOW_NEGATIVE_BALANCE, "true").await?;
        adjust_balance(&db, "a", -5, "overdraft".to_string(), "admin").await?;
        assert_eq!(get_balance(&db, "a").await?, -2);
        assert_eq!(ledger_total(&db, "a").await?, -2);

        let ledger = list_transactions(&db, "a", Some(1)).await?;
        assert_eq!(ledger.len(), 1);
        assert_eq!(ledger[0].delta, -5);
        Ok(())
    }

    #[tokio::test]
    async fn test_extreme_deltas_are_invalid_credits() -> Result<()> {
        let db = setup_test_db().await?;
        create_test_profile(&db, "admin", Role::Admin).await?;
        create_test_profile(&db, "a", Role::Student).await?;

        assert!(matches!(
            adjust_balance(&db, "a", i64::MIN, "drain".to_string(), "admin")
                .await
                .unwrap_err(),
            Error::InvalidCredits { credits: i64::MIN }
        ));
        assert_eq!(get_balance(&db, "a").await?, 0);

        adjust_balance(&db, "a", i64::MAX, "fill".to_string(), "admin").await?;
        assert!(matches!(
            adjust_balance(&db, "a", 1, "one more".to_string(), "admin")
                .await
                .unwrap_err(),
            Error::InvalidCredits { credits: 1 }
        ));
        assert_eq!(get_balance(&db, "a").await?, i64::MAX);
        assert_eq!(list_transactions(&db, "a", None).await?.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_adjust_requires_admin() -> Result<()> {
        let db = setup_test_db().await?;
        create_test_profile(&db, "t", Role::Teacher).await?;
        create_test_profile(&db, "a", Role::Student).await?;

        assert!(matches!(
            adjust_balance(&db, "a", 5, "gift".to_string(), "t")
                .await
                .unwrap_err(),
            Error::Forbidden { .. }
        ));
        assert_eq!(get_balance(&db, "a").await?, 0);
        assert!(list_transactions(&db, "a", None).await?.is_empty());
        Ok(())
    }
}
