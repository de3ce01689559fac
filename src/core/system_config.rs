//! System config business logic
//!
//! Club-wide settings live in the `system_config` key-value table so admins can
//! change them at runtime. Typed accessors fall back to a default when a key
//! is missing or unparsable; `seed_defaults` writes the configured defaults
//! for missing keys on startup. Values for the known keys are checked before
//! they are stored.

use crate::{
    config::settings::SystemDefaults,
    entities::{SystemConfig, system_config},
    errors::{Error, Result},
};
use chrono::Utc;
use sea_orm::{Set, prelude::*};
use tracing::{info, warn};

/// Makeup requests allowed per member and course when a course sets none
pub const DEFAULT_MAKEUP_QUOTA: &str = "default_makeup_quota";
/// Transfer requests allowed per member and course when a course sets none
pub const DEFAULT_TRANSFER_QUOTA: &str = "default_transfer_quota";
/// Hours of notice required for a leave request
pub const LEAVE_DEADLINE_HOURS: &str = "leave_deadline_hours";
/// Whether an `absent` mark consumes credits
pub const CHARGE_ABSENT: &str = "charge_absent";
/// Whether a class card may go below zero
pub const ALLOW_NEGATIVE_BALANCE: &str = "allow_negative_balance";

/// Largest per-course quota a default may grant
pub const MAX_QUOTA: i64 = 1000;
/// Longest leave notice that may be required, one year
pub const MAX_LEAVE_DEADLINE_HOURS: i64 = 24 * 365;

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Some(true),
        "false" | "0" | "no" => Some(false),
        _ => None,
    }
}

/// Rejects values the typed accessors could not use. Unknown keys pass.
fn validate_value(key: &str, value: &str) -> Result<()> {
    let max = match key {
        DEFAULT_MAKEUP_QUOTA | DEFAULT_TRANSFER_QUOTA => MAX_QUOTA,
        LEAVE_DEADLINE_HOURS => MAX_LEAVE_DEADLINE_HOURS,
        CHARGE_ABSENT | ALLOW_NEGATIVE_BALANCE => {
            return parse_bool(value).map(|_| ()).ok_or_else(|| {
                Error::validation(format!("{key} must be true or false, got '{value}'"))
            });
        }
        _ => return Ok(()),
    };

    match value.trim().parse::<i64>() {
        Ok(n) if (0..=max).contains(&n) => Ok(()),
        _ => Err(Error::validation(format!(
            "{key} must be an integer between 0 and {max}, got '{value}'"
        ))),
    }
}

/// Retrieves the raw value stored under `key`.
pub async fn get_value<C>(db: &C, key: &str) -> Result<Option<String>>
where
    C: ConnectionTrait,
{
    let state = SystemConfig::find()
        .filter(system_config::Column::Key.eq(key))
        .one(db)
        .await?;
    Ok(state.map(|s| s.value))
}

/// Sets or updates the value stored under `key`.
pub async fn set_value<C>(db: &C, key: &str, value: &str) -> Result<system_config::Model>
where
    C: ConnectionTrait,
{
    validate_value(key, value)?;
    let now = Utc::now();

    let existing = SystemConfig::find()
        .filter(system_config::Column::Key.eq(key))
        .one(db)
        .await?;

    let model = if let Some(state) = existing {
        let mut active_model: system_config::ActiveModel = state.into();
        active_model.value = Set(value.to_string());
        active_model.updated_at = Set(now);
        active_model.update(db).await?
    } else {
        let new_state = system_config::ActiveModel {
            key: Set(key.to_string()),
            value: Set(value.to_string()),
            updated_at: Set(now),
            ..Default::default()
        };
        new_state.insert(db).await?
    };

    info!(key, value, "System config updated");
    Ok(model)
}

/// Reads an integer setting, falling back to `default`.
pub async fn get_i64<C>(db: &C, key: &str, default: i64) -> Result<i64>
where
    C: ConnectionTrait,
{
    Ok(match get_value(db, key).await? {
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!(key, value = %raw, "Unparsable integer setting, using default");
            default
        }),
        None => default,
    })
}

/// Reads a boolean setting, falling back to `default`.
pub async fn get_bool<C>(db: &C, key: &str, default: bool) -> Result<bool>
where
    C: ConnectionTrait,
{
    Ok(match get_value(db, key).await? {
        Some(raw) => parse_bool(&raw).unwrap_or_else(|| {
            warn!(key, value = %raw, "Unparsable boolean setting, using default");
            default
        }),
        None => default,
    })
}

/// Lists every stored setting, ordered by key.
pub async fn list_values(db: &DatabaseConnection) -> Result<Vec<system_config::Model>> {
    use sea_orm::QueryOrder;
    SystemConfig::find()
        .order_by_asc(system_config::Column::Key)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Writes the configured defaults for every key that is not stored yet.
///
/// Returns the number of keys written.
pub async fn seed_defaults(db: &DatabaseConnection, defaults: &SystemDefaults) -> Result<usize> {
    let entries = [
        (DEFAULT_MAKEUP_QUOTA, defaults.default_makeup_quota.to_string()),
        (
            DEFAULT_TRANSFER_QUOTA,
            defaults.default_transfer_quota.to_string(),
        ),
        (LEAVE_DEADLINE_HOURS, defaults.leave_deadline_hours.to_string()),
        (CHARGE_ABSENT, defaults.charge_absent.to_string()),
        (
            ALLOW_NEGATIVE_BALANCE,
            defaults.allow_negative_balance.to_string(),
        ),
    ];

    let mut written = 0;
    for (key, value) in entries {
        if get_value(db, key).await?.is_none() {
            set_value(db, key, &value).await?;
            written += 1;
        }
    }
    Ok(written)
}

/// Quota and ledger settings read together by the request and rollcall flows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Policy {
    /// Hours of notice required for a leave request
    pub leave_deadline_hours: i64,
    /// Whether an `absent` mark consumes credits
    pub charge_absent: bool,
    /// Whether a class card may go below zero
    pub allow_negative_balance: bool,
}

/// Loads the current [`Policy`], with built-in defaults for missing keys.
pub async fn load_policy<C>(db: &C) -> Result<Policy>
where
    C: ConnectionTrait,
{
    let defaults = SystemDefaults::default();
    Ok(Policy {
        leave_deadline_hours: get_i64(db, LEAVE_DEADLINE_HOURS, defaults.leave_deadline_hours)
            .await?,
        charge_absent: get_bool(db, CHARGE_ABSENT, defaults.charge_absent).await?,
        allow_negative_balance: get_bool(
            db,
            ALLOW_NEGATIVE_BALANCE,
            defaults.allow_negative_balance,
        )
        .await?,
    })
}
