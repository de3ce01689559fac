//! Request handlers, one module per resource.

pub mod card;
pub mod config;
pub mod course;
pub mod health;
pub mod me;
pub mod profile;
pub mod requests;
pub mod session;

use crate::{
    core::{profile as profile_core, status::Role},
    errors::Result,
};
use sea_orm::DatabaseConnection;

/// Whether the caller is a teacher or an admin. Unknown callers are not.
pub(crate) async fn is_staff(db: &DatabaseConnection, user_id: &str) -> Result<bool> {
    Ok(match profile_core::get_profile(db, user_id).await? {
        Some(profile) => matches!(
            profile_core::role_of(&profile)?,
            Role::Admin | Role::Teacher
        ),
        None => false,
    })
}

/// Fails unless the caller is a teacher or an admin.
pub(crate) async fn require_staff(db: &DatabaseConnection, user_id: &str) -> Result<()> {
    profile_core::require_role(db, user_id, &[Role::Teacher]).await?;
    Ok(())
}

/// Fails unless the caller is an admin.
pub(crate) async fn require_admin(db: &DatabaseConnection, user_id: &str) -> Result<()> {
    profile_core::require_role(db, user_id, &[Role::Admin]).await?;
    Ok(())
}
