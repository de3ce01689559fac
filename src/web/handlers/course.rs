//! Course catalog, per-course sessions, and enrollment.

use super::{require_admin, require_staff};
use crate::{
    core::{
        course::{self, CourseFilter, CourseOverview, CourseUpdate, NewCourse},
        enrollment::{self, CancelOutcome, EnrollOutcome},
        report::{self, CourseSummary},
        session,
        status::EnrollmentStatus,
    },
    entities::{
        course as course_entity, course_group, course_session, enrollment as enrollment_entity,
    },
    web::{
        extract::{ApiJson, ApiPath, ApiQuery},
        middleware::Caller,
        response::{ApiResult, ok},
        state::AppState,
    },
};
use axum::{Extension, extract::State};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;

/// Body of [`create_group`].
#[derive(Debug, Deserialize)]
pub struct CreateGroupRequest {
    /// Group name
    pub name: String,
    /// Optional description
    pub description: Option<String>,
    /// Position in the catalog
    #[serde(default)]
    pub sort_order: i32,
}

/// Body of [`create_session`].
#[derive(Debug, Deserialize)]
pub struct CreateSessionRequest {
    /// Start of the session
    pub starts_at: DateTime<Utc>,
    /// Optional notes
    pub notes: Option<String>,
}

/// Body of [`generate_sessions`].
#[derive(Debug, Deserialize)]
pub struct GenerateSessionsRequest {
    /// First day considered, defaults to today
    pub from: Option<NaiveDate>,
    /// Number of weekly sessions
    pub weeks: u32,
}

/// Query of [`list_enrollments`].
#[derive(Debug, Deserialize)]
pub struct EnrollmentQuery {
    /// Only enrollments in this status
    pub status: Option<EnrollmentStatus>,
}

/// GET /api/course-groups
pub async fn list_groups(State(state): State<AppState>) -> ApiResult<Vec<course_group::Model>> {
    ok(course::list_course_groups(&state.db).await?)
}

/// POST /api/course-groups
pub async fn create_group(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    ApiJson(req): ApiJson<CreateGroupRequest>,
) -> ApiResult<course_group::Model> {
    require_admin(&state.db, &caller.user_id).await?;
    ok(course::create_course_group(&state.db, req.name, req.description, req.sort_order).await?)
}

/// DELETE /api/course-groups/{id}
pub async fn delete_group(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<()> {
    require_admin(&state.db, &caller.user_id).await?;
    ok(course::delete_course_group(&state.db, id).await?)
}

/// GET /api/courses
pub async fn list_courses(
    State(state): State<AppState>,
    ApiQuery(filter): ApiQuery<CourseFilter>,
) -> ApiResult<Vec<course_entity::Model>> {
    ok(course::list_courses(&state.db, filter).await?)
}

/// POST /api/courses
pub async fn create_course(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    ApiJson(input): ApiJson<NewCourse>,
) -> ApiResult<course_entity::Model> {
    require_admin(&state.db, &caller.user_id).await?;
    ok(course::create_course(&state.db, input).await?)
}

/// GET /api/courses/{id}
pub async fn get_course(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<CourseOverview> {
    ok(course::get_course_overview(&state.db, id).await?)
}

/// PUT /api/courses/{id}
pub async fn update_course(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(update): ApiJson<CourseUpdate>,
) -> ApiResult<course_entity::Model> {
    require_admin(&state.db, &caller.user_id).await?;
    ok(course::update_course(&state.db, id, update).await?)
}

/// DELETE /api/courses/{id}
pub async fn deactivate_course(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<course_entity::Model> {
    require_admin(&state.db, &caller.user_id).await?;
    ok(course::deactivate_course(&state.db, id).await?)
}

/// GET /api/courses/{id}/sessions
pub async fn list_sessions(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<Vec<course_session::Model>> {
    course::require_course(&state.db, id).await?;
    ok(session::list_sessions_for_course(&state.db, id).await?)
}

/// POST /api/courses/{id}/sessions
pub async fn create_session(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(req): ApiJson<CreateSessionRequest>,
) -> ApiResult<course_session::Model> {
    require_staff(&state.db, &caller.user_id).await?;
    ok(session::create_session(&state.db, id, req.starts_at, req.notes).await?)
}

/// POST /api/courses/{id}/sessions/generate
pub async fn generate_sessions(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(req): ApiJson<GenerateSessionsRequest>,
) -> ApiResult<Vec<course_session::Model>> {
    require_staff(&state.db, &caller.user_id).await?;
    let from = req.from.unwrap_or_else(|| Utc::now().date_naive());
    ok(session::generate_sessions(&state.db, id, from, req.weeks).await?)
}

/// GET /api/courses/{id}/enrollments
pub async fn list_enrollments(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    ApiPath(id): ApiPath<i64>,
    ApiQuery(query): ApiQuery<EnrollmentQuery>,
) -> ApiResult<Vec<enrollment_entity::Model>> {
    require_staff(&state.db, &caller.user_id).await?;
    course::require_course(&state.db, id).await?;
    ok(enrollment::list_enrollments_for_course(&state.db, id, query.status).await?)
}

/// POST /api/courses/{id}/enrollment
pub async fn enroll(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<EnrollOutcome> {
    ok(enrollment::enroll(&state.db, id, &caller.user_id).await?)
}

/// DELETE /api/courses/{id}/enrollment
pub async fn cancel_enrollment(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<CancelOutcome> {
    ok(enrollment::cancel_enrollment(&state.db, id, &caller.user_id).await?)
}

/// GET /api/courses/{id}/summary
pub async fn course_summary(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<CourseSummary> {
    require_staff(&state.db, &caller.user_id).await?;
    ok(report::course_summary(&state.db, id).await?)
}
