//! Class-card packages, balance, ledger, and orders.

use super::require_admin;
use crate::{
    config::settings::CardPackage,
    core::{
        card::{self, OrderFilter},
        profile,
        status::Role,
    },
    entities::{card_order, card_transaction},
    web::{
        extract::{ApiJson, ApiPath, ApiQuery},
        middleware::Caller,
        response::{ApiResult, ok},
        state::AppState,
    },
};
use axum::{Extension, extract::State};
use serde::{Deserialize, Serialize};

/// Balance of the caller's class card.
#[derive(Debug, Serialize)]
pub struct BalanceView {
    /// Profile id
    pub user_id: String,
    /// Credits left
    pub balance: i64,
}

/// Query of [`list_transactions`].
#[derive(Debug, Deserialize)]
pub struct TransactionQuery {
    /// Maximum rows returned
    pub limit: Option<u64>,
}

/// Body of [`create_order`].
#[derive(Debug, Deserialize)]
pub struct CreateOrderRequest {
    /// Name of a configured package
    pub package_name: String,
}

/// Body of [`adjust_balance`].
#[derive(Debug, Deserialize)]
pub struct AdjustmentRequest {
    /// Member whose card changes
    pub user_id: String,
    /// Credits added (positive) or removed (negative)
    pub delta: i64,
    /// Shown in the ledger
    pub description: String,
}

/// GET /api/card/packages
pub async fn list_packages(State(state): State<AppState>) -> ApiResult<Vec<CardPackage>> {
    ok(state.config.card_packages.clone())
}

/// GET /api/card/balance
pub async fn get_balance(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
) -> ApiResult<BalanceView> {
    let balance = card::get_balance(&state.db, &caller.user_id).await?;
    ok(BalanceView {
        user_id: caller.user_id,
        balance,
    })
}

/// GET /api/card/transactions
pub async fn list_transactions(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    ApiQuery(query): ApiQuery<TransactionQuery>,
) -> ApiResult<Vec<card_transaction::Model>> {
    ok(card::list_transactions(&state.db, &caller.user_id, query.limit).await?)
}

/// GET /api/card/orders
///
/// Admins see every order; everybody else only their own.
pub async fn list_orders(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    ApiQuery(mut filter): ApiQuery<OrderFilter>,
) -> ApiResult<Vec<card_order::Model>> {
    let is_admin = match profile::get_profile(&state.db, &caller.user_id).await? {
        Some(p) => profile::role_of(&p)? == Role::Admin,
        None => false,
    };
    if !is_admin {
        filter.user_id = Some(caller.user_id);
    }
    ok(card::list_orders(&state.db, filter).await?)
}

/// POST /api/card/orders
pub async fn create_order(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    ApiJson(req): ApiJson<CreateOrderRequest>,
) -> ApiResult<card_order::Model> {
    ok(card::create_order(
        &state.db,
        &state.config.card_packages,
        &caller.user_id,
        &req.package_name,
    )
    .await?)
}

/// POST /api/card/orders/{id}/confirm
pub async fn confirm_order(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<card_order::Model> {
    ok(card::confirm_order(&state.db, id, &caller.user_id).await?)
}

/// POST /api/card/orders/{id}/cancel
pub async fn cancel_order(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<card_order::Model> {
    ok(card::cancel_order(&state.db, id, &caller.user_id).await?)
}

/// POST /api/card/adjustments
pub async fn adjust_balance(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    ApiJson(req): ApiJson<AdjustmentRequest>,
) -> ApiResult<card_transaction::Model> {
    require_admin(&state.db, &caller.user_id).await?;
    ok(card::adjust_balance(&state.db, &req.user_id, req.delta, req.description, &caller.user_id)
        .await?)
}
