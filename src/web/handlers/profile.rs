//! Profile administration.

use super::require_admin;
use crate::{
    core::{profile, status::Role},
    entities::profile as profile_entity,
    web::{
        extract::{ApiJson, ApiPath, ApiQuery},
        middleware::Caller,
        response::{ApiResult, ok},
        state::AppState,
    },
};
use axum::{Extension, extract::State};
use serde::Deserialize;

/// Query of [`list_profiles`].
#[derive(Debug, Deserialize)]
pub struct ProfileQuery {
    /// Only profiles with this role
    pub role: Option<Role>,
}

/// Body of [`set_role`].
#[derive(Debug, Deserialize)]
pub struct SetRoleRequest {
    /// New role
    pub role: Role,
}

/// GET /api/profiles
pub async fn list_profiles(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    ApiQuery(query): ApiQuery<ProfileQuery>,
) -> ApiResult<Vec<profile_entity::Model>> {
    require_admin(&state.db, &caller.user_id).await?;
    ok(profile::list_profiles(&state.db, query.role).await?)
}

/// PUT /api/profiles/{id}/role
pub async fn set_role(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    ApiPath(id): ApiPath<String>,
    ApiJson(req): ApiJson<SetRoleRequest>,
) -> ApiResult<profile_entity::Model> {
    ok(profile::set_role(&state.db, &caller.user_id, &id, req.role).await?)
}
