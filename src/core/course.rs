//! Course catalog business logic - Course groups and courses.
//!
//! Courses carry their own capacity, schedule slot, class-card price, and
//! request quotas. Quotas left unset on creation are taken from
//! `system_config`. Raising capacity promotes waitlisted members straight
//! away.

use crate::{
    config::settings::CourseGroupSeed,
    core::{enrollment, status::EnrollmentStatus, system_config},
    entities::{
        Course, CourseGroup, Enrollment, course, course_group, enrollment as enrollment_entity,
    },
    errors::{Error, Result},
};
use chrono::{NaiveTime, Utc};
use sea_orm::{PaginatorTrait, QueryOrder, Set, TransactionTrait, prelude::*, sea_query::Expr};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Fields for a new course.
#[derive(Debug, Clone, Deserialize)]
pub struct NewCourse {
    /// Catalog group
    pub group_id: Option<i64>,
    /// Course name
    pub name: String,
    /// Optional description
    pub description: Option<String>,
    /// Optional level label
    pub level: Option<String>,
    /// Profile id of the teacher
    pub teacher_id: Option<String>,
    /// Maximum enrolled members
    pub capacity: i32,
    /// Day of week, 0 = Monday
    pub weekday: i32,
    /// Start time `HH:MM`
    pub start_time: String,
    /// Session length in minutes
    pub duration_minutes: i32,
    /// Credits per attended session
    pub credits_per_session: i64,
    /// Makeup requests per member, default from `system_config`
    pub makeup_quota: Option<i64>,
    /// Transfer requests per member, default from `system_config`
    pub transfer_quota: Option<i64>,
}

/// Partial update of a course; `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CourseUpdate {
    /// New catalog group
    pub group_id: Option<i64>,
    /// New name
    pub name: Option<String>,
    /// New description
    pub description: Option<String>,
    /// New level label
    pub level: Option<String>,
    /// New teacher
    pub teacher_id: Option<String>,
    /// New capacity
    pub capacity: Option<i32>,
    /// New weekday
    pub weekday: Option<i32>,
    /// New start time
    pub start_time: Option<String>,
    /// New session length
    pub duration_minutes: Option<i32>,
    /// New credits per session
    pub credits_per_session: Option<i64>,
    /// New makeup quota
    pub makeup_quota: Option<i64>,
    /// New transfer quota
    pub transfer_quota: Option<i64>,
    /// Reactivate or deactivate
    pub is_active: Option<bool>,
}

/// Filter for [`list_courses`].
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct CourseFilter {
    /// Only courses in this group
    pub group_id: Option<i64>,
    /// Include deactivated courses
    #[serde(default)]
    pub include_inactive: bool,
}

/// A course together with its seat counts.
#[derive(Debug, Clone, Serialize)]
pub struct CourseOverview {
    /// The course
    pub course: course::Model,
    /// Members holding a seat
    pub enrolled_count: u64,
    /// Members on the waitlist
    pub waitlist_count: u64,
    /// Free seats
    pub seats_left: u64,
}

/// Parses a `HH:MM` start time.
pub fn parse_start_time(value: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(value.trim(), "%H:%M")
        .map_err(|_| Error::validation(format!("start time '{value}' must be HH:MM")))
}

fn validate_schedule(capacity: i32, weekday: i32, start_time: &str, duration: i32) -> Result<()> {
    if capacity < 1 {
        return Err(Error::validation("Capacity must be at least 1"));
    }
    if !(0..=6).contains(&weekday) {
        return Err(Error::validation("Weekday must be between 0 (Monday) and 6 (Sunday)"));
    }
    parse_start_time(start_time)?;
    if duration <= 0 {
        return Err(Error::validation("Duration must be positive"));
    }
    Ok(())
}

fn validate_non_negative(field: &str, value: i64) -> Result<()> {
    if value < 0 {
        return Err(Error::validation(format!("{field} cannot be negative")));
    }
    Ok(())
}

/// Creates a catalog group.
pub async fn create_course_group(
    db: &DatabaseConnection,
    name: String,
    description: Option<String>,
    sort_order: i32,
) -> Result<course_group::Model> {
    if name.trim().is_empty() {
        return Err(Error::validation("Course group name cannot be empty"));
    }

    let group = course_group::ActiveModel {
        name: Set(name.trim().to_string()),
        description: Set(description),
        sort_order: Set(sort_order),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await?;

    info!(group_id = group.id, name = %group.name, "Course group created");
    Ok(group)
}

/// Creates the configured groups that do not exist yet, matched by name.
/// Returns how many were created.
pub async fn seed_course_groups(
    db: &DatabaseConnection,
    seeds: &[CourseGroupSeed],
) -> Result<usize> {
    let mut created = 0;
    for seed in seeds {
        let exists = CourseGroup::find()
            .filter(course_group::Column::Name.eq(seed.name.trim()))
            .one(db)
            .await?
            .is_some();
        if exists {
            continue;
        }
        create_course_group(db, seed.name.clone(), seed.description.clone(), seed.sort_order)
            .await?;
        created += 1;
    }
    if created > 0 {
        info!(created, "Seeded course groups from configuration");
    }
    Ok(created)
}

/// Lists all groups in catalog order.
pub async fn list_course_groups(db: &DatabaseConnection) -> Result<Vec<course_group::Model>> {
    CourseGroup::find()
        .order_by_asc(course_group::Column::SortOrder)
        .order_by_asc(course_group::Column::Name)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Deletes a group that no active course references.
pub async fn delete_course_group(db: &DatabaseConnection, group_id: i64) -> Result<()> {
    let txn = db.begin().await?;
    let group = CourseGroup::find_by_id(group_id)
        .one(&txn)
        .await?
        .ok_or(Error::CourseGroupNotFound { id: group_id })?;

    let active_courses = Course::find()
        .filter(course::Column::GroupId.eq(group_id))
        .filter(course::Column::IsActive.eq(true))
        .count(&txn)
        .await?;
    if active_courses > 0 {
        return Err(Error::InvalidState {
            expected: "group without active courses".to_string(),
            actual: format!("{active_courses} active courses"),
        });
    }

    // Detach inactive courses before removing the group
    Course::update_many()
        .col_expr(course::Column::GroupId, Expr::value(Option::<i64>::None))
        .filter(course::Column::GroupId.eq(group_id))
        .exec(&txn)
        .await?;
    group.delete(&txn).await?;
    txn.commit().await?;

    info!(group_id, "Course group deleted");
    Ok(())
}

/// Creates a course after validating its schedule and prices.
pub async fn create_course(db: &DatabaseConnection, input: NewCourse) -> Result<course::Model> {
    if input.name.trim().is_empty() {
        return Err(Error::validation("Course name cannot be empty"));
    }
    validate_schedule(
        input.capacity,
        input.weekday,
        &input.start_time,
        input.duration_minutes,
    )?;
    validate_non_negative("Credits per session", input.credits_per_session)?;

    let makeup_quota = match input.makeup_quota {
        Some(quota) => quota,
        None => system_config::get_i64(db, system_config::DEFAULT_MAKEUP_QUOTA, 2).await?,
    };
    let transfer_quota = match input.transfer_quota {
        Some(quota) => quota,
        None => system_config::get_i64(db, system_config::DEFAULT_TRANSFER_QUOTA, 2).await?,
    };
    validate_non_negative("Makeup quota", makeup_quota)?;
    validate_non_negative("Transfer quota", transfer_quota)?;

    if let Some(group_id) = input.group_id {
        CourseGroup::find_by_id(group_id)
            .one(db)
            .await?
            .ok_or(Error::CourseGroupNotFound { id: group_id })?;
    }

    let now = Utc::now();
    let course = course::ActiveModel {
        group_id: Set(input.group_id),
        name: Set(input.name.trim().to_string()),
        description: Set(input.description),
        level: Set(input.level),
        teacher_id: Set(input.teacher_id),
        capacity: Set(input.capacity),
        weekday: Set(input.weekday),
        start_time: Set(input.start_time.trim().to_string()),
        duration_minutes: Set(input.duration_minutes),
        credits_per_session: Set(input.credits_per_session),
        makeup_quota: Set(makeup_quota),
        transfer_quota: Set(transfer_quota),
        is_active: Set(true),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await?;

    info!(course_id = course.id, name = %course.name, capacity = course.capacity, "Course created");
    Ok(course)
}

/// Finds a course by id.
pub async fn get_course<C>(db: &C, course_id: i64) -> Result<Option<course::Model>>
where
    C: ConnectionTrait,
{
    Course::find_by_id(course_id)
        .one(db)
        .await
        .map_err(Into::into)
}

/// Finds a course by id, failing with [`Error::CourseNotFound`].
pub async fn require_course<C>(db: &C, course_id: i64) -> Result<course::Model>
where
    C: ConnectionTrait,
{
    get_course(db, course_id)
        .await?
        .ok_or(Error::CourseNotFound { id: course_id })
}

/// Applies a partial update. A capacity increase promotes waitlisted members
/// in the same transaction.
pub async fn update_course(
    db: &DatabaseConnection,
    course_id: i64,
    update: CourseUpdate,
) -> Result<course::Model> {
    let txn = db.begin().await?;
    let existing = require_course(&txn, course_id).await?;

    let capacity = update.capacity.unwrap_or(existing.capacity);
    let weekday = update.weekday.unwrap_or(existing.weekday);
    let start_time = update
        .start_time
        .clone()
        .unwrap_or_else(|| existing.start_time.clone());
    let duration = update.duration_minutes.unwrap_or(existing.duration_minutes);
    validate_schedule(capacity, weekday, &start_time, duration)?;
    if let Some(name) = &update.name {
        if name.trim().is_empty() {
            return Err(Error::validation("Course name cannot be empty"));
        }
    }
    for (field, value) in [
        ("Credits per session", update.credits_per_session),
        ("Makeup quota", update.makeup_quota),
        ("Transfer quota", update.transfer_quota),
    ] {
        if let Some(value) = value {
            validate_non_negative(field, value)?;
        }
    }

    let capacity_raised = capacity > existing.capacity;
    let mut active_model: course::ActiveModel = existing.into();
    if update.group_id.is_some() {
        active_model.group_id = Set(update.group_id);
    }
    if let Some(name) = update.name {
        active_model.name = Set(name.trim().to_string());
    }
    if update.description.is_some() {
        active_model.description = Set(update.description);
    }
    if update.level.is_some() {
        active_model.level = Set(update.level);
    }
    if update.teacher_id.is_some() {
        active_model.teacher_id = Set(update.teacher_id);
    }
    active_model.capacity = Set(capacity);
    active_model.weekday = Set(weekday);
    active_model.start_time = Set(start_time.trim().to_string());
    active_model.duration_minutes = Set(duration);
    if let Some(credits) = update.credits_per_session {
        active_model.credits_per_session = Set(credits);
    }
    if let Some(quota) = update.makeup_quota {
        active_model.makeup_quota = Set(quota);
    }
    if let Some(quota) = update.transfer_quota {
        active_model.transfer_quota = Set(quota);
    }
    if let Some(is_active) = update.is_active {
        active_model.is_active = Set(is_active);
    }
    active_model.updated_at = Set(Utc::now());
    let updated = active_model.update(&txn).await?;

    if capacity_raised {
        let promoted = enrollment::promote_waitlist(&txn, course_id).await?;
        if !promoted.is_empty() {
            info!(course_id, promoted = promoted.len(), "Waitlist promoted after capacity change");
        }
    }

    txn.commit().await?;
    info!(course_id, "Course updated");
    Ok(updated)
}

/// Deactivates a course; existing enrollments stay, new ones are refused.
pub async fn deactivate_course(db: &DatabaseConnection, course_id: i64) -> Result<course::Model> {
    let existing = require_course(db, course_id).await?;
    let mut active_model: course::ActiveModel = existing.into();
    active_model.is_active = Set(false);
    active_model.updated_at = Set(Utc::now());
    let updated = active_model.update(db).await?;
    info!(course_id, "Course deactivated");
    Ok(updated)
}

/// Lists courses by name; active only unless the filter says otherwise.
pub async fn list_courses(
    db: &DatabaseConnection,
    filter: CourseFilter,
) -> Result<Vec<course::Model>> {
    let mut query = Course::find();
    if !filter.include_inactive {
        query = query.filter(course::Column::IsActive.eq(true));
    }
    if let Some(group_id) = filter.group_id {
        query = query.filter(course::Column::GroupId.eq(group_id));
    }
    query
        .order_by_asc(course::Column::Name)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Counts enrollment rows of a course in the given status.
pub async fn count_enrollments<C>(db: &C, course_id: i64, status: EnrollmentStatus) -> Result<u64>
where
    C: ConnectionTrait,
{
    Enrollment::find()
        .filter(enrollment_entity::Column::CourseId.eq(course_id))
        .filter(enrollment_entity::Column::Status.eq(status.as_str()))
        .count(db)
        .await
        .map_err(Into::into)
}

/// Returns the course with its seat counts.
pub async fn get_course_overview<C>(db: &C, course_id: i64) -> Result<CourseOverview>
where
    C: ConnectionTrait,
{
    let course = require_course(db, course_id).await?;
    let enrolled_count = count_enrollments(db, course_id, EnrollmentStatus::Enrolled).await?;
    let waitlist_count = count_enrollments(db, course_id, EnrollmentStatus::Waitlist).await?;
    let capacity = u64::try_from(course.capacity.max(0))?;

    Ok(CourseOverview {
        seats_left: capacity.saturating_sub(enrolled_count),
        course,
        enrolled_count,
        waitlist_count,
    })
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::core::status::Role;
    use crate::test_utils::*;

    #[tokio::test]
    async fn test_create_course_validation() -> Result<()> {
        let db = setup_test_db().await?;

        let mut input = test_course_input("Salsa", 10);
        input.name = "  ".to_string();
        assert!(matches!(
            create_course(&db, input).await.unwrap_err(),
            Error::Validation { .. }
        ));

        let input = test_course_input("Salsa", 0);
        assert!(matches!(
            create_course(&db, input).await.unwrap_err(),
            Error::Validation { .. }
        ));

        let mut input = test_course_input("Salsa", 10);
        input.weekday = 7;
        assert!(matches!(
            create_course(&db, input).await.unwrap_err(),
            Error::Validation { .. }
        ));

        let mut input = test_course_input("Salsa", 10);
        input.start_time = "25:99".to_string();
        assert!(matches!(
            create_course(&db, input).await.unwrap_err(),
            Error::Validation { .. }
        ));

        let mut input = test_course_input("Salsa", 10);
        input.credits_per_session = -1;
        assert!(matches!(
            create_course(&db, input).await.unwrap_err(),
            Error::Validation { .. }
        ));

        Ok(())
    }

    #[tokio::test]
    async fn test_create_course_uses_configured_quotas() -> Result<()> {
        let db = setup_test_db().await?;
        system_config::set_value(&db, system_config::DEFAULT_MAKEUP_QUOTA, "5").await?;

        let mut input = test_course_input("Tango", 8);
        input.makeup_quota = None;
        input.transfer_quota = None;
        let course = create_course(&db, input).await?;

        assert_eq!(course.makeup_quota, 5);
        assert_eq!(course.transfer_quota, 2);
        assert!(course.is_active);
        Ok(())
    }

    #[tokio::test]
    async fn test_groups_and_listing() -> Result<()> {
        let db = setup_test_db().await?;
        let latin = create_course_group(&db, "Latin".to_string(), None, 2).await?;
        let ballroom = create_course_group(&db, "Ballroom".to_string(), None, 1).await?;

        let groups = list_course_groups(&db).await?;
        assert_eq!(groups, vec![ballroom.clone(), latin.clone()]);

        let mut salsa = test_course_input("Salsa", 10);
        salsa.group_id = Some(latin.id);
        let salsa = create_course(&db, salsa).await?;
        let waltz = create_test_course(&db, "Waltz", 10).await?;
        deactivate_course(&db, waltz.id).await?;

        let active = list_courses(&db, CourseFilter::default()).await?;
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, salsa.id);

        let all = list_courses(
            &db,
            CourseFilter {
                group_id: None,
                include_inactive: true,
            },
        )
        .await?;
        assert_eq!(all.len(), 2);

        let in_ballroom = list_courses(
            &db,
            CourseFilter {
                group_id: Some(ballroom.id),
                include_inactive: false,
            },
        )
        .await?;
        assert!(in_ballroom.is_empty());

        assert!(matches!(
            delete_course_group(&db, latin.id).await.unwrap_err(),
            Error::InvalidState { .. }
        ));
        delete_course_group(&db, ballroom.id).await?;
        assert_eq!(list_course_groups(&db).await?.len(), 1);

        Ok(())
    }

    #[tokio::test]
    async fn test_delete_group_detaches_inactive_courses() -> Result<()> {
        let db = setup_test_db().await?;
        let swing = create_course_group(&db, "Swing".to_string(), None, 1).await?;

        let mut lindy = test_course_input("Lindy Hop", 10);
        lindy.group_id = Some(swing.id);
        let lindy = create_course(&db, lindy).await?;
        deactivate_course(&db, lindy.id).await?;

        delete_course_group(&db, swing.id).await?;
        assert!(list_course_groups(&db).await?.is_empty());
        assert_eq!(require_course(&db, lindy.id).await?.group_id, None);

        assert!(matches!(
            delete_course_group(&db, swing.id).await.unwrap_err(),
            Error::CourseGroupNotFound { id } if id == swing.id
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_capacity_raise_promotes_waitlist() -> Result<()> {
        let db = setup_test_db().await?;
        let course = create_test_course(&db, "Bachata", 1).await?;
        for user in ["a", "b", "c"] {
            create_test_profile(&db, user, Role::Student).await?;
            enrollment::enroll(&db, course.id, user).await?;
        }

        let overview = get_course_overview(&db, course.id).await?;
        assert_eq!(overview.enrolled_count, 1);
        assert_eq!(overview.waitlist_count, 2);
        assert_eq!(overview.seats_left, 0);

        let updated = update_course(
            &db,
            course.id,
            CourseUpdate {
                capacity: Some(2),
                ..Default::default()
            },
        )
        .await?;
        assert_eq!(updated.capacity, 2);

        let overview = get_course_overview(&db, course.id).await?;
        assert_eq!(overview.enrolled_count, 2);
        assert_eq!(overview.waitlist_count, 1);
        assert_eq!(
            enrollment::waitlist_position(&db, course.id, "c").await?,
            Some(1)
        );

        Ok(())
    }

    #[tokio::test]
    async fn test_update_missing_course() -> Result<()> {
        let db = setup_test_db().await?;
        assert!(matches!(
            update_course(&db, 42, CourseUpdate::default()).await.unwrap_err(),
            Error::CourseNotFound { id: 42 }
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_seed_course_groups_is_idempotent() -> Result<()> {
        let db = setup_test_db().await?;
        let seeds = vec![
            CourseGroupSeed {
                name: "Latin".to_string(),
                description: None,
                sort_order: 1,
            },
            CourseGroupSeed {
                name: "Ballroom".to_string(),
                description: Some("Standard dances".to_string()),
                sort_order: 2,
            },
        ];

        assert_eq!(seed_course_groups(&db, &seeds).await?, 2);
        assert_eq!(seed_course_groups(&db, &seeds).await?, 0);

        let groups = list_course_groups(&db).await?;
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].name, "Latin");
        Ok(())
    }
}
