//! Shared test utilities for `StudioBuddy`.
//!
//! Helpers for setting up test databases and creating members, courses, and
//! sessions with sensible defaults.

use crate::{
    core::{
        card,
        course::{self, NewCourse},
        enrollment,
        profile::{self, ProfileInput},
        session,
        status::Role,
    },
    entities,
    errors::Result,
};
use chrono::{DateTime, Duration, Utc};
use sea_orm::{ActiveModelTrait, DatabaseConnection, Set};

/// Creates an in-memory `SQLite` database with all tables initialized.
/// This is the standard setup for all integration tests.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// Creates a profile named "User <id>" and gives it `role`.
pub async fn create_test_profile(
    db: &DatabaseConnection,
    id: &str,
    role: Role,
) -> Result<entities::profile::Model> {
    let created = profile::upsert_profile(
        db,
        id,
        ProfileInput {
            full_name: format!("User {id}"),
            ..Default::default()
        },
    )
    .await?;
    if role == Role::Student {
        return Ok(created);
    }

    let mut active_model: entities::profile::ActiveModel = created.into();
    active_model.role = Set(role.as_str().to_string());
    Ok(active_model.update(db).await?)
}

/// Course input with sensible defaults.
///
/// # Defaults
/// * Wednesday at 19:00, 60 minutes
/// * 1 credit per session
/// * makeup and transfer quota of 2
/// * no group and no teacher
#[must_use]
pub fn test_course_input(name: &str, capacity: i32) -> NewCourse {
    NewCourse {
        group_id: None,
        name: name.to_string(),
        description: None,
        level: None,
        teacher_id: None,
        capacity,
        weekday: 2,
        start_time: "19:00".to_string(),
        duration_minutes: 60,
        credits_per_session: 1,
        makeup_quota: Some(2),
        transfer_quota: Some(2),
    }
}

/// Creates a course from [`test_course_input`].
pub async fn create_test_course(
    db: &DatabaseConnection,
    name: &str,
    capacity: i32,
) -> Result<entities::course::Model> {
    course::create_course(db, test_course_input(name, capacity)).await
}

/// Creates a scheduled session without notes.
pub async fn create_test_session(
    db: &DatabaseConnection,
    course_id: i64,
    starts_at: DateTime<Utc>,
) -> Result<entities::course_session::Model> {
    session::create_session(db, course_id, starts_at, None).await
}

/// The current time shifted by whole hours.
#[must_use]
pub fn hours_from_now(hours: i64) -> DateTime<Utc> {
    Utc::now() + Duration::hours(hours)
}

/// Creates an "admin" and a "teacher" profile, a "Salsa" course with ten
/// seats, enrolls `users` (creating them as students) with `credits` on each
/// card, and adds a session two days from now.
pub async fn setup_course_with_members(
    db: &DatabaseConnection,
    users: &[&str],
    credits: i64,
) -> Result<(entities::course::Model, entities::course_session::Model)> {
    create_test_profile(db, "admin", Role::Admin).await?;
    create_test_profile(db, "teacher", Role::Teacher).await?;
    let course = create_test_course(db, "Salsa", 10).await?;

    for user in users {
        create_test_profile(db, user, Role::Student).await?;
        enrollment::enroll(db, course.id, user).await?;
        if credits > 0 {
            card::adjust_balance(db, user, credits, "Starting credits".to_string(), "admin")
                .await?;
        }
    }

    let session = create_test_session(db, course.id, hours_from_now(48)).await?;
    Ok((course, session))
}
