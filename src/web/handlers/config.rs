//! Runtime settings stored in `system_config`.

use super::require_admin;
use crate::{
    core::system_config,
    entities::system_config as system_config_entity,
    web::{
        extract::{ApiJson, ApiPath},
        middleware::Caller,
        response::{ApiResult, ok},
        state::AppState,
    },
};
use axum::{Extension, extract::State};
use serde::{Deserialize, Serialize};

/// One setting; `value` is `null` when the key was never written.
#[derive(Debug, Serialize)]
pub struct ConfigEntry {
    /// Setting name
    pub key: String,
    /// Stored value
    pub value: Option<String>,
}

/// Body of [`set_value`].
#[derive(Debug, Deserialize)]
pub struct SetValueRequest {
    /// New value
    pub value: String,
}

/// GET /api/config
pub async fn list_values(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
) -> ApiResult<Vec<system_config_entity::Model>> {
    require_admin(&state.db, &caller.user_id).await?;
    ok(system_config::list_values(&state.db).await?)
}

/// GET /api/config/{key}
pub async fn get_value(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    ApiPath(key): ApiPath<String>,
) -> ApiResult<ConfigEntry> {
    require_admin(&state.db, &caller.user_id).await?;
    let value = system_config::get_value(&state.db, &key).await?;
    ok(ConfigEntry { key, value })
}

/// PUT /api/config/{key}
pub async fn set_value(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    ApiPath(key): ApiPath<String>,
    ApiJson(req): ApiJson<SetValueRequest>,
) -> ApiResult<system_config_entity::Model> {
    require_admin(&state.db, &caller.user_id).await?;
    ok(system_config::set_value(&state.db, &key, &req.value).await?)
}
