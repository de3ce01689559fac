//! Profile business logic - Members, teachers, and administrators.
//!
//! Profiles are keyed by the identity string of the authenticating proxy. A
//! profile is created on first contact with role `student`; only an admin can
//! change roles. `require_role` is the single gate every privileged handler
//! goes through.

use crate::{
    core::status::Role,
    entities::{Profile, profile},
    errors::{Error, Result},
};
use chrono::Utc;
use sea_orm::{QueryOrder, Set, prelude::*};
use serde::Deserialize;
use tracing::{info, warn};

/// Contact details supplied when creating or updating a profile.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileInput {
    /// Display name
    pub full_name: String,
    /// Contact email
    pub email: Option<String>,
    /// Contact phone number
    pub phone: Option<String>,
}

/// Finds a profile by id.
pub async fn get_profile<C>(db: &C, id: &str) -> Result<Option<profile::Model>>
where
    C: ConnectionTrait,
{
    Profile::find_by_id(id.to_string())
        .one(db)
        .await
        .map_err(Into::into)
}

/// Finds a profile by id, failing with [`Error::ProfileNotFound`].
pub async fn require_profile<C>(db: &C, id: &str) -> Result<profile::Model>
where
    C: ConnectionTrait,
{
    get_profile(db, id)
        .await?
        .ok_or_else(|| Error::ProfileNotFound { id: id.to_string() })
}

/// Creates the profile with role `student` and an empty card, or updates the
/// contact fields of an existing one. Role and balance are never touched here.
pub async fn upsert_profile(
    db: &DatabaseConnection,
    id: &str,
    input: ProfileInput,
) -> Result<profile::Model> {
    if id.trim().is_empty() {
        return Err(Error::validation("Profile id cannot be empty"));
    }
    if input.full_name.trim().is_empty() {
        return Err(Error::validation("Full name cannot be empty"));
    }

    let now = Utc::now();
    let full_name = input.full_name.trim().to_string();

    if let Some(existing) = get_profile(db, id).await? {
        let mut active_model: profile::ActiveModel = existing.into();
        active_model.full_name = Set(full_name);
        active_model.email = Set(input.email);
        active_model.phone = Set(input.phone);
        active_model.updated_at = Set(now);
        return active_model.update(db).await.map_err(Into::into);
    }

    let model = profile::ActiveModel {
        id: Set(id.to_string()),
        full_name: Set(full_name),
        email: Set(input.email),
        phone: Set(input.phone),
        role: Set(Role::Student.as_str().to_string()),
        card_balance: Set(0),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(db)
    .await?;

    info!(user_id = %model.id, "Profile created");
    Ok(model)
}

/// Lists profiles ordered by name, optionally restricted to one role.
pub async fn list_profiles(
    db: &DatabaseConnection,
    role: Option<Role>,
) -> Result<Vec<profile::Model>> {
    let mut query = Profile::find();
    if let Some(role) = role {
        query = query.filter(profile::Column::Role.eq(role.as_str()));
    }
    query
        .order_by_asc(profile::Column::FullName)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Parses the stored role of a profile.
pub fn role_of(profile: &profile::Model) -> Result<Role> {
    profile.role.parse()
}

/// Returns the caller's profile if their role is in `allowed`. Admins always pass.
pub async fn require_role<C>(db: &C, user_id: &str, allowed: &[Role]) -> Result<profile::Model>
where
    C: ConnectionTrait,
{
    let profile = require_profile(db, user_id).await?;
    let role = role_of(&profile)?;
    if role == Role::Admin || allowed.contains(&role) {
        return Ok(profile);
    }

    warn!(user_id, role = %role, "Role check refused");
    Err(Error::forbidden(format!(
        "role '{role}' cannot perform this action"
    )))
}

/// Changes the role of `target`. Only admins may do this, and an admin cannot
/// demote themselves so the club never locks itself out.
pub async fn set_role(
    db: &DatabaseConnection,
    actor_id: &str,
    target_id: &str,
    role: Role,
) -> Result<profile::Model> {
    require_role(db, actor_id, &[Role::Admin]).await?;
    if actor_id == target_id && role != Role::Admin {
        return Err(Error::forbidden("admins cannot demote themselves"));
    }

    let target = require_profile(db, target_id).await?;
    let mut active_model: profile::ActiveModel = target.into();
    active_model.role = Set(role.as_str().to_string());
    active_model.updated_at = Set(Utc::now());
    let updated = active_model.update(db).await?;

    info!(actor = actor_id, target = target_id, role = %role, "Role changed");
    Ok(updated)
}
