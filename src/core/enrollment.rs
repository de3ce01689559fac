//! Enrollment business logic - Seats, waitlist, and promotion.
//!
//! A member holds at most one non-cancelled enrollment per course. When the
//! course is full the member joins the waitlist; whenever a seat frees up the
//! oldest waitlisted member (by `created_at`, then id) is promoted. Every
//! check-then-write sequence here runs in one database transaction.

use crate::{
    core::{course, profile, status::EnrollmentStatus},
    entities::{Enrollment, enrollment},
    errors::{Error, Result},
};
use chrono::Utc;
use sea_orm::{
    Condition, PaginatorTrait, QueryOrder, QuerySelect, Set, TransactionTrait, prelude::*,
};
use serde::Serialize;
use tracing::info;

/// Result of [`enroll`].
#[derive(Debug, Clone, Serialize)]
pub struct EnrollOutcome {
    /// The enrollment row as written
    pub enrollment: enrollment::Model,
    /// 1-based waitlist position, `None` when a seat was granted
    pub waitlist_position: Option<u64>,
}

/// Result of [`cancel_enrollment`].
#[derive(Debug, Clone, Serialize)]
pub struct CancelOutcome {
    /// The cancelled row
    pub cancelled: enrollment::Model,
    /// The waitlisted member who took the freed seat, if any
    pub promoted: Option<enrollment::Model>,
}

fn active_statuses() -> [&'static str; 2] {
    [
        EnrollmentStatus::Enrolled.as_str(),
        EnrollmentStatus::Waitlist.as_str(),
    ]
}

/// Finds the member's enrolled or waitlisted row for a course.
pub async fn find_active_enrollment<C>(
    db: &C,
    course_id: i64,
    user_id: &str,
) -> Result<Option<enrollment::Model>>
where
    C: ConnectionTrait,
{
    Enrollment::find()
        .filter(enrollment::Column::CourseId.eq(course_id))
        .filter(enrollment::Column::UserId.eq(user_id))
        .filter(enrollment::Column::Status.is_in(active_statuses()))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Whether the member currently holds a seat in the course.
pub async fn is_enrolled<C>(db: &C, course_id: i64, user_id: &str) -> Result<bool>
where
    C: ConnectionTrait,
{
    Ok(find_active_enrollment(db, course_id, user_id)
        .await?
        .is_some_and(|e| e.status == EnrollmentStatus::Enrolled.as_str()))
}

/// Enrolls a member, or puts them on the waitlist when the course is full.
///
/// A previously cancelled row is reused and its `created_at` reset, so a
/// member who comes back queues at the end of the waitlist.
pub async fn enroll(
    db: &DatabaseConnection,
    course_id: i64,
    user_id: &str,
) -> Result<EnrollOutcome> {
    let txn = db.begin().await?;

    let course = course::require_course(&txn, course_id).await?;
    if !course.is_active {
        return Err(Error::CourseInactive { id: course_id });
    }
    profile::require_profile(&txn, user_id).await?;

    if find_active_enrollment(&txn, course_id, user_id).await?.is_some() {
        return Err(Error::AlreadyEnrolled { course_id });
    }

    let enrolled = course::count_enrollments(&txn, course_id, EnrollmentStatus::Enrolled).await?;
    let capacity = u64::try_from(course.capacity.max(0))?;
    let status = if enrolled < capacity {
        EnrollmentStatus::Enrolled
    } else {
        EnrollmentStatus::Waitlist
    };

    let previous = Enrollment::find()
        .filter(enrollment::Column::CourseId.eq(course_id))
        .filter(enrollment::Column::UserId.eq(user_id))
        .filter(enrollment::Column::Status.eq(EnrollmentStatus::Cancelled.as_str()))
        .order_by_desc(enrollment::Column::Id)
        .one(&txn)
        .await?;

    let now = Utc::now();
    let model = if let Some(previous) = previous {
        let mut active_model: enrollment::ActiveModel = previous.into();
        active_model.status = Set(status.as_str().to_string());
        active_model.created_at = Set(now);
        active_model.updated_at = Set(now);
        active_model.update(&txn).await?
    } else {
        enrollment::ActiveModel {
            course_id: Set(course_id),
            user_id: Set(user_id.to_string()),
            status: Set(status.as_str().to_string()),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await?
    };

    let waitlist_position = match status {
        EnrollmentStatus::Waitlist => waitlist_position(&txn, course_id, user_id).await?,
        _ => None,
    };

    txn.commit().await?;

    info!(
        course_id,
        user_id,
        status = %status,
        position = ?waitlist_position,
        "Enrollment recorded"
    );
    Ok(EnrollOutcome {
        enrollment: model,
        waitlist_position,
    })
}

/// Cancels the member's enrollment or waitlist spot. A freed seat goes to the
/// oldest waitlisted member.
pub async fn cancel_enrollment(
    db: &DatabaseConnection,
    course_id: i64,
    user_id: &str,
) -> Result<CancelOutcome> {
    let txn = db.begin().await?;

    let existing = find_active_enrollment(&txn, course_id, user_id)
        .await?
        .ok_or(Error::EnrollmentNotFound { course_id })?;
    let held_seat = existing.status == EnrollmentStatus::Enrolled.as_str();

    let mut active_model: enrollment::ActiveModel = existing.into();
    active_model.status = Set(EnrollmentStatus::Cancelled.as_str().to_string());
    active_model.updated_at = Set(Utc::now());
    let cancelled = active_model.update(&txn).await?;

    let promoted = if held_seat {
        promote_waitlist(&txn, course_id).await?.into_iter().next()
    } else {
        None
    };

    txn.commit().await?;

    info!(
        course_id,
        user_id,
        promoted = promoted.as_ref().map(|p| p.user_id.as_str()),
        "Enrollment cancelled"
    );
    Ok(CancelOutcome {
        cancelled,
        promoted,
    })
}

/// Moves waitlisted members into every free seat, oldest first.
///
/// Callers run this inside their own transaction.
pub async fn promote_waitlist<C>(db: &C, course_id: i64) -> Result<Vec<enrollment::Model>>
where
    C: ConnectionTrait,
{
    let course = course::require_course(db, course_id).await?;
    let enrolled = course::count_enrollments(db, course_id, EnrollmentStatus::Enrolled).await?;
    let capacity = u64::try_from(course.capacity.max(0))?;
    let free = capacity.saturating_sub(enrolled);
    if free == 0 {
        return Ok(Vec::new());
    }

    let candidates = Enrollment::find()
        .filter(enrollment::Column::CourseId.eq(course_id))
        .filter(enrollment::Column::Status.eq(EnrollmentStatus::Waitlist.as_str()))
        .order_by_asc(enrollment::Column::CreatedAt)
        .order_by_asc(enrollment::Column::Id)
        .limit(free)
        .all(db)
        .await?;

    let now = Utc::now();
    let mut promoted = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        let mut active_model: enrollment::ActiveModel = candidate.into();
        active_model.status = Set(EnrollmentStatus::Enrolled.as_str().to_string());
        active_model.updated_at = Set(now);
        let row = active_model.update(db).await?;
        info!(course_id, user_id = %row.user_id, "Promoted from waitlist");
        promoted.push(row);
    }
    Ok(promoted)
}

/// 1-based position of the member on the course waitlist.
pub async fn waitlist_position<C>(db: &C, course_id: i64, user_id: &str) -> Result<Option<u64>>
where
    C: ConnectionTrait,
{
    let Some(row) = Enrollment::find()
        .filter(enrollment::Column::CourseId.eq(course_id))
        .filter(enrollment::Column::UserId.eq(user_id))
        .filter(enrollment::Column::Status.eq(EnrollmentStatus::Waitlist.as_str()))
        .one(db)
        .await?
    else {
        return Ok(None);
    };

    let ahead = Enrollment::find()
        .filter(enrollment::Column::CourseId.eq(course_id))
        .filter(enrollment::Column::Status.eq(EnrollmentStatus::Waitlist.as_str()))
        .filter(
            Condition::any()
                .add(enrollment::Column::CreatedAt.lt(row.created_at))
                .add(
                    Condition::all()
                        .add(enrollment::Column::CreatedAt.eq(row.created_at))
                        .add(enrollment::Column::Id.lt(row.id)),
                ),
        )
        .count(db)
        .await?;

    Ok(Some(ahead + 1))
}

/// Lists the enrollments of a course in waitlist order, optionally by status.
pub async fn list_enrollments_for_course(
    db: &DatabaseConnection,
    course_id: i64,
    status: Option<EnrollmentStatus>,
) -> Result<Vec<enrollment::Model>> {
    let mut query = Enrollment::find().filter(enrollment::Column::CourseId.eq(course_id));
    if let Some(status) = status {
        query = query.filter(enrollment::Column::Status.eq(status.as_str()));
    }
    query
        .order_by_asc(enrollment::Column::CreatedAt)
        .order_by_asc(enrollment::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Lists a member's enrolled and waitlisted rows, newest first.
pub async fn list_enrollments_for_user<C>(db: &C, user_id: &str) -> Result<Vec<enrollment::Model>>
where
    C: ConnectionTrait,
{
    Enrollment::find()
        .filter(enrollment::Column::UserId.eq(user_id))
        .filter(enrollment::Column::Status.is_in(active_statuses()))
        .order_by_desc(enrollment::Column::CreatedAt)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Profile ids of the members holding a seat in the course.
pub async fn enrolled_user_ids<C>(db: &C, course_id: i64) -> Result<Vec<String>>
where
    C: ConnectionTrait,
{
    Ok(Enrollment::find()
        .filter(enrollment::Column::CourseId.eq(course_id))
        .filter(enrollment::Column::Status.eq(EnrollmentStatus::Enrolled.as_str()))
        .order_by_asc(enrollment::Column::CreatedAt)
        .order_by_asc(enrollment::Column::Id)
        .all(db)
        .await?
        .into_iter()
        .map(|e| e.user_id)
        .collect())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::core::status::Role;
    use crate::test_utils::*;

    async fn setup_members(db: &DatabaseConnection, users: &[&str]) -> Result<()> {
        for user in users {
            create_test_profile(db, user, Role::Student).await?;
        }
        Ok(())
    }

    #[tokio::test]
    async fn test_enroll_until_full_then_waitlist() -> Result<()> {
        let db = setup_test_db().await?;
        let course = create_test_course(&db, "Salsa", 2).await?;
        setup_members(&db, &["a", "b", "c", "d"]).await?;

        let a = enroll(&db, course.id, "a").await?;
        let b = enroll(&db, course.id, "b").await?;
        let c = enroll(&db, course.id, "c").await?;
        let d = enroll(&db, course.id, "d").await?;

        assert_eq!(a.enrollment.status, "enrolled");
        assert_eq!(a.waitlist_position, None);
        assert_eq!(b.enrollment.status, "enrolled");
        assert_eq!(c.enrollment.status, "waitlist");
        assert_eq!(c.waitlist_position, Some(1));
        assert_eq!(d.waitlist_position, Some(2));

        assert!(is_enrolled(&db, course.id, "a").await?);
        assert!(!is_enrolled(&db, course.id, "c").await?);
        assert_eq!(enrolled_user_ids(&db, course.id).await?, vec!["a", "b"]);

        Ok(())
    }

    #[tokio::test]
    async fn test_enroll_twice_is_rejected() -> Result<()> {
        let db = setup_test_db().await?;
        let course = create_test_course(&db, "Salsa", 1).await?;
        setup_members(&db, &["a", "b"]).await?;

        enroll(&db, course.id, "a").await?;
        assert!(matches!(
            enroll(&db, course.id, "a").await.unwrap_err(),
            Error::AlreadyEnrolled { .. }
        ));

        // Waitlisted members are refused too
        enroll(&db, course.id, "b").await?;
        assert!(matches!(
            enroll(&db, course.id, "b").await.unwrap_err(),
            Error::AlreadyEnrolled { .. }
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_enroll_requires_active_course_and_profile() -> Result<()> {
        let db = setup_test_db().await?;
        let course = create_test_course(&db, "Salsa", 1).await?;

        assert!(matches!(
            enroll(&db, course.id, "ghost").await.unwrap_err(),
            Error::ProfileNotFound { .. }
        ));
        assert!(matches!(
            enroll(&db, 999, "ghost").await.unwrap_err(),
            Error::CourseNotFound { id: 999 }
        ));

        setup_members(&db, &["a"]).await?;
        course::deactivate_course(&db, course.id).await?;
        assert!(matches!(
            enroll(&db, course.id, "a").await.unwrap_err(),
            Error::CourseInactive { .. }
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_cancel_promotes_oldest_waitlisted() -> Result<()> {
        let db = setup_test_db().await?;
        let course = create_test_course(&db, "Salsa", 1).await?;
        setup_members(&db, &["a", "b", "c"]).await?;

        enroll(&db, course.id, "a").await?;
        enroll(&db, course.id, "b").await?;
        enroll(&db, course.id, "c").await?;

        let outcome = cancel_enrollment(&db, course.id, "a").await?;
        assert_eq!(outcome.cancelled.status, "cancelled");
        let promoted = outcome.promoted.unwrap();
        assert_eq!(promoted.user_id, "b");
        assert_eq!(promoted.status, "enrolled");
        assert_eq!(waitlist_position(&db, course.id, "c").await?, Some(1));

        Ok(())
    }

    #[tokio::test]
    async fn test_cancel_waitlist_spot_promotes_nobody() -> Result<()> {
        let db = setup_test_db().await?;
        let course = create_test_course(&db, "Salsa", 1).await?;
        setup_members(&db, &["a", "b", "c"]).await?;

        enroll(&db, course.id, "a").await?;
        enroll(&db, course.id, "b").await?;
        enroll(&db, course.id, "c").await?;

        let outcome = cancel_enrollment(&db, course.id, "b").await?;
        assert!(outcome.promoted.is_none());
        assert_eq!(waitlist_position(&db, course.id, "c").await?, Some(1));
        assert!(is_enrolled(&db, course.id, "a").await?);

        assert!(matches!(
            cancel_enrollment(&db, course.id, "b").await.unwrap_err(),
            Error::EnrollmentNotFound { .. }
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_reenroll_reuses_row_and_queues_at_back() -> Result<()> {
        let db = setup_test_db().await?;
        let course = create_test_course(&db, "Salsa", 1).await?;
        setup_members(&db, &["a", "b", "c"]).await?;

        enroll(&db, course.id, "a").await?;
        let first = enroll(&db, course.id, "b").await?;
        enroll(&db, course.id, "c").await?;

        cancel_enrollment(&db, course.id, "b").await?;
        let again = enroll(&db, course.id, "b").await?;

        assert_eq!(again.enrollment.id, first.enrollment.id);
        assert_eq!(again.waitlist_position, Some(2));
        assert_eq!(
            list_enrollments_for_course(&db, course.id, None).await?.len(),
            3
        );
        assert_eq!(
            list_enrollments_for_course(&db, course.id, Some(EnrollmentStatus::Waitlist))
                .await?
                .len(),
            2
        );
        assert_eq!(list_enrollments_for_user(&db, "b").await?.len(), 1);
        Ok(())
    }
}
