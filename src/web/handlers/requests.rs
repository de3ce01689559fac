//! Leave, makeup, and transfer requests.
//!
//! The three resources share their shape: members list their own requests
//! and file new ones, staff list everything and review, owners withdraw.

use super::is_staff;
use crate::{
    core::{
        leave, makeup,
        requests::{RequestFilter, ReviewDecision},
        transfer,
    },
    entities::{leave_request, makeup_request, transfer_request},
    errors::Result,
    web::{
        extract::{ApiJson, ApiPath, ApiQuery},
        middleware::Caller,
        response::{ApiResult, ok},
        state::AppState,
    },
};
use axum::{Extension, extract::State};
use chrono::Utc;
use sea_orm::DatabaseConnection;
use serde::Deserialize;

/// Body of [`create_leave`].
#[derive(Debug, Deserialize)]
pub struct LeaveRequestBody {
    /// Session the member will miss
    pub session_id: i64,
    /// Optional reason
    pub reason: Option<String>,
}

/// Body of [`create_makeup`].
#[derive(Debug, Deserialize)]
pub struct MakeupRequestBody {
    /// The missed session
    pub original_session_id: i64,
    /// The session to attend instead
    pub target_session_id: i64,
    /// Optional reason
    pub reason: Option<String>,
}

/// Body of [`create_transfer`].
#[derive(Debug, Deserialize)]
pub struct TransferRequestBody {
    /// Session given up
    pub from_session_id: i64,
    /// Session attended instead
    pub to_session_id: i64,
    /// Optional reason
    pub reason: Option<String>,
}

/// Body of the review endpoints.
#[derive(Debug, Deserialize)]
pub struct ReviewBody {
    /// `"approve"` or `"reject"`
    pub decision: ReviewDecision,
}

/// Members only ever see their own requests.
async fn scoped_filter(
    db: &DatabaseConnection,
    caller: &Caller,
    mut filter: RequestFilter,
) -> Result<RequestFilter> {
    if !is_staff(db, &caller.user_id).await? {
        filter.user_id = Some(caller.user_id.clone());
    }
    Ok(filter)
}

/// GET /api/leave-requests
pub async fn list_leave(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    ApiQuery(filter): ApiQuery<RequestFilter>,
) -> ApiResult<Vec<leave_request::Model>> {
    let filter = scoped_filter(&state.db, &caller, filter).await?;
    ok(leave::list_leave_requests(&state.db, filter).await?)
}

/// POST /api/leave-requests
pub async fn create_leave(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    ApiJson(body): ApiJson<LeaveRequestBody>,
) -> ApiResult<leave_request::Model> {
    ok(leave::request_leave(
        &state.db,
        &caller.user_id,
        body.session_id,
        body.reason,
        Utc::now(),
    )
    .await?)
}

/// POST /api/leave-requests/{id}/review
pub async fn review_leave(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(body): ApiJson<ReviewBody>,
) -> ApiResult<leave_request::Model> {
    ok(leave::review_leave(&state.db, id, &caller.user_id, body.decision).await?)
}

/// POST /api/leave-requests/{id}/withdraw
pub async fn withdraw_leave(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<leave_request::Model> {
    ok(leave::withdraw_leave(&state.db, id, &caller.user_id).await?)
}

/// GET /api/makeup-requests
pub async fn list_makeup(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    ApiQuery(filter): ApiQuery<RequestFilter>,
) -> ApiResult<Vec<makeup_request::Model>> {
    let filter = scoped_filter(&state.db, &caller, filter).await?;
    ok(makeup::list_makeup_requests(&state.db, filter).await?)
}

/// POST /api/makeup-requests
pub async fn create_makeup(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    ApiJson(body): ApiJson<MakeupRequestBody>,
) -> ApiResult<makeup_request::Model> {
    ok(makeup::request_makeup(
        &state.db,
        &caller.user_id,
        body.original_session_id,
        body.target_session_id,
        body.reason,
        Utc::now(),
    )
    .await?)
}

/// POST /api/makeup-requests/{id}/review
pub async fn review_makeup(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(body): ApiJson<ReviewBody>,
) -> ApiResult<makeup_request::Model> {
    ok(makeup::review_makeup(&state.db, id, &caller.user_id, body.decision).await?)
}

/// POST /api/makeup-requests/{id}/withdraw
pub async fn withdraw_makeup(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<makeup_request::Model> {
    ok(makeup::withdraw_makeup(&state.db, id, &caller.user_id).await?)
}

/// GET /api/transfer-requests
pub async fn list_transfer(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    ApiQuery(filter): ApiQuery<RequestFilter>,
) -> ApiResult<Vec<transfer_request::Model>> {
    let filter = scoped_filter(&state.db, &caller, filter).await?;
    ok(transfer::list_transfer_requests(&state.db, filter).await?)
}

/// POST /api/transfer-requests
pub async fn create_transfer(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    ApiJson(body): ApiJson<TransferRequestBody>,
) -> ApiResult<transfer_request::Model> {
    ok(transfer::request_transfer(
        &state.db,
        &caller.user_id,
        body.from_session_id,
        body.to_session_id,
        body.reason,
        Utc::now(),
    )
    .await?)
}

/// POST /api/transfer-requests/{id}/review
pub async fn review_transfer(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(body): ApiJson<ReviewBody>,
) -> ApiResult<transfer_request::Model> {
    ok(transfer::review_transfer(&state.db, id, &caller.user_id, body.decision).await?)
}

/// POST /api/transfer-requests/{id}/withdraw
pub async fn withdraw_transfer(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<transfer_request::Model> {
    ok(transfer::withdraw_transfer(&state.db, id, &caller.user_id).await?)
}
