//! Session cancellation and rollcall.

use super::require_staff;
use crate::{
    core::{
        attendance::{self, RollcallMark, RollcallSummary, RosterEntry},
        session,
    },
    entities::course_session,
    web::{
        extract::{ApiJson, ApiPath},
        middleware::Caller,
        response::{ApiResult, ok},
        state::AppState,
    },
};
use axum::{Extension, extract::State};
use serde::Deserialize;

/// Body of [`take_rollcall`].
#[derive(Debug, Deserialize)]
pub struct RollcallRequest {
    /// One mark per member
    pub marks: Vec<RollcallMark>,
}

/// POST /api/sessions/{id}/cancel
pub async fn cancel_session(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<course_session::Model> {
    require_staff(&state.db, &caller.user_id).await?;
    ok(session::cancel_session(&state.db, id).await?)
}

/// GET /api/sessions/{id}/rollcall
pub async fn get_roster(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<Vec<RosterEntry>> {
    require_staff(&state.db, &caller.user_id).await?;
    ok(attendance::roster_for_session(&state.db, id).await?)
}

/// POST /api/sessions/{id}/rollcall
pub async fn take_rollcall(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(req): ApiJson<RollcallRequest>,
) -> ApiResult<RollcallSummary> {
    ok(attendance::take_rollcall(&state.db, id, req.marks, &caller.user_id).await?)
}
