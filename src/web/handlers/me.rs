//! The caller's own profile and summaries.

use crate::{
    core::{
        profile::{self, ProfileInput},
        report::{self, MemberSummary},
        session,
    },
    entities::{course_session, profile as profile_entity},
    errors::Result,
    web::{
        extract::{ApiJson, ApiQuery},
        middleware::Caller,
        response::{ApiResult, ok},
        state::AppState,
    },
};
use axum::{Extension, extract::State};
use chrono::Utc;
use serde::Deserialize;

const DEFAULT_UPCOMING_LIMIT: u64 = 10;

/// Query of [`upcoming_sessions`].
#[derive(Debug, Deserialize)]
pub struct UpcomingQuery {
    /// Maximum sessions returned
    pub limit: Option<u64>,
}

/// GET /api/me
pub async fn get_me(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
) -> ApiResult<profile_entity::Model> {
    ok(profile::require_profile(&state.db, &caller.user_id).await?)
}

/// PUT /api/me
pub async fn update_me(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    ApiJson(input): ApiJson<ProfileInput>,
) -> ApiResult<profile_entity::Model> {
    ok(profile::upsert_profile(&state.db, &caller.user_id, input).await?)
}

/// GET /api/me/summary
pub async fn get_summary(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
) -> ApiResult<MemberSummary> {
    ok(report::member_summary(&state.db, &caller.user_id).await?)
}

/// GET /api/me/summary.txt
pub async fn get_summary_text(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
) -> Result<String> {
    let summary = report::member_summary(&state.db, &caller.user_id).await?;
    Ok(report::format_member_summary(&summary))
}

/// GET /api/me/sessions
pub async fn upcoming_sessions(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    ApiQuery(query): ApiQuery<UpcomingQuery>,
) -> ApiResult<Vec<course_session::Model>> {
    let limit = query.limit.unwrap_or(DEFAULT_UPCOMING_LIMIT);
    ok(session::upcoming_sessions_for_user(&state.db, &caller.user_id, Utc::now(), limit).await?)
}
