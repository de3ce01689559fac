//! Session business logic - Dated occurrences of a course.
//!
//! Sessions are either created one by one or generated weekly from the
//! course's weekday and start time. Cancelled sessions keep their rows so
//! requests and attendance referring to them stay readable.

use crate::{
    core::{
        course, enrollment,
        status::{EnrollmentStatus, SessionStatus},
    },
    entities::{CourseSession, course_session},
    errors::{Error, Result},
};
use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use sea_orm::{QueryOrder, QuerySelect, Set, TransactionTrait, prelude::*};
use tracing::info;

/// Most weeks a single generation call may cover
pub const MAX_GENERATED_WEEKS: u32 = 52;

/// Finds a session by id, failing with [`Error::SessionNotFound`].
pub async fn require_session<C>(db: &C, session_id: i64) -> Result<course_session::Model>
where
    C: ConnectionTrait,
{
    CourseSession::find_by_id(session_id)
        .one(db)
        .await?
        .ok_or(Error::SessionNotFound { id: session_id })
}

/// Parses the stored status of a session.
pub fn status_of(session: &course_session::Model) -> Result<SessionStatus> {
    session.status.parse()
}

/// Fails unless the session is scheduled and starts after `now`.
pub fn ensure_upcoming(session: &course_session::Model, now: DateTime<Utc>) -> Result<()> {
    if status_of(session)? != SessionStatus::Scheduled {
        return Err(Error::SessionNotSchedulable {
            id: session.id,
            reason: format!("session is {}", session.status),
        });
    }
    if session.starts_at <= now {
        return Err(Error::SessionNotSchedulable {
            id: session.id,
            reason: "session has already started".to_string(),
        });
    }
    Ok(())
}

/// Creates a single session for a course.
pub async fn create_session(
    db: &DatabaseConnection,
    course_id: i64,
    starts_at: DateTime<Utc>,
    notes: Option<String>,
) -> Result<course_session::Model> {
    course::require_course(db, course_id).await?;

    let session = course_session::ActiveModel {
        course_id: Set(course_id),
        starts_at: Set(starts_at),
        status: Set(SessionStatus::Scheduled.as_str().to_string()),
        notes: Set(notes),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await?;

    info!(session_id = session.id, course_id, starts_at = %starts_at, "Session created");
    Ok(session)
}

/// First date on or after `from` that falls on `weekday` (0 = Monday), or
/// `None` past the end of the calendar.
#[must_use]
pub fn first_matching_day(from: NaiveDate, weekday: i32) -> Option<NaiveDate> {
    let current = i64::from(from.weekday().num_days_from_monday());
    let offset = (i64::from(weekday) - current).rem_euclid(7);
    from.checked_add_signed(Duration::days(offset))
}

fn week_after(first_day: NaiveDate, week: u32) -> Result<NaiveDate> {
    first_day
        .checked_add_signed(Duration::weeks(i64::from(week)))
        .ok_or_else(|| Error::validation("generated sessions run past the supported date range"))
}

/// Generates one session per week for `weeks` weeks, starting at the first
/// course weekday on or after `from`. Slots that already have a session are
/// skipped. Returns the created sessions.
pub async fn generate_sessions(
    db: &DatabaseConnection,
    course_id: i64,
    from: NaiveDate,
    weeks: u32,
) -> Result<Vec<course_session::Model>> {
    if weeks == 0 || weeks > MAX_GENERATED_WEEKS {
        return Err(Error::validation(format!(
            "weeks must be between 1 and {MAX_GENERATED_WEEKS}"
        )));
    }

    let txn = db.begin().await?;
    let course = course::require_course(&txn, course_id).await?;
    let start_time = course::parse_start_time(&course.start_time)?;
    let first_day = first_matching_day(from, course.weekday)
        .ok_or_else(|| Error::validation("from date is past the supported date range"))?;
    week_after(first_day, weeks - 1)?;

    let now = Utc::now();
    let mut created = Vec::new();
    for week in 0..weeks {
        let day = week_after(first_day, week)?;
        let starts_at = day.and_time(start_time).and_utc();

        let exists = CourseSession::find()
            .filter(course_session::Column::CourseId.eq(course_id))
            .filter(course_session::Column::StartsAt.eq(starts_at))
            .one(&txn)
            .await?
            .is_some();
        if exists {
            continue;
        }

        let session = course_session::ActiveModel {
            course_id: Set(course_id),
            starts_at: Set(starts_at),
            status: Set(SessionStatus::Scheduled.as_str().to_string()),
            notes: Set(None),
            created_at: Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await?;
        created.push(session);
    }

    txn.commit().await?;
    info!(course_id, weeks, created = created.len(), "Sessions generated");
    Ok(created)
}

async fn set_status<C>(
    db: &C,
    session: course_session::Model,
    status: SessionStatus,
) -> Result<course_session::Model>
where
    C: ConnectionTrait,
{
    let mut active_model: course_session::ActiveModel = session.into();
    active_model.status = Set(status.as_str().to_string());
    active_model.update(db).await.map_err(Into::into)
}

/// Cancels a scheduled session.
pub async fn cancel_session(
    db: &DatabaseConnection,
    session_id: i64,
) -> Result<course_session::Model> {
    let session = require_session(db, session_id).await?;
    let status = status_of(&session)?;
    if status != SessionStatus::Scheduled {
        return Err(Error::InvalidState {
            expected: SessionStatus::Scheduled.to_string(),
            actual: status.to_string(),
        });
    }

    let cancelled = set_status(db, session, SessionStatus::Cancelled).await?;
    info!(session_id, "Session cancelled");
    Ok(cancelled)
}

/// Marks a session as completed. Completed sessions stay completed.
pub async fn complete_session<C>(db: &C, session_id: i64) -> Result<course_session::Model>
where
    C: ConnectionTrait,
{
    let session = require_session(db, session_id).await?;
    match status_of(&session)? {
        SessionStatus::Completed => Ok(session),
        SessionStatus::Scheduled => set_status(db, session, SessionStatus::Completed).await,
        SessionStatus::Cancelled => Err(Error::SessionNotSchedulable {
            id: session_id,
            reason: "session is cancelled".to_string(),
        }),
    }
}

/// Lists the sessions of a course by start time.
pub async fn list_sessions_for_course(
    db: &DatabaseConnection,
    course_id: i64,
) -> Result<Vec<course_session::Model>> {
    CourseSession::find()
        .filter(course_session::Column::CourseId.eq(course_id))
        .order_by_asc(course_session::Column::StartsAt)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Next scheduled sessions across every course the member holds a seat in.
pub async fn upcoming_sessions_for_user(
    db: &DatabaseConnection,
    user_id: &str,
    now: DateTime<Utc>,
    limit: u64,
) -> Result<Vec<course_session::Model>> {
    let course_ids: Vec<i64> = enrollment::list_enrollments_for_user(db, user_id)
        .await?
        .into_iter()
        .filter(|e| e.status == EnrollmentStatus::Enrolled.as_str())
        .map(|e| e.course_id)
        .collect();
    if course_ids.is_empty() {
        return Ok(Vec::new());
    }

    CourseSession::find()
        .filter(course_session::Column::CourseId.is_in(course_ids))
        .filter(course_session::Column::Status.eq(SessionStatus::Scheduled.as_str()))
        .filter(course_session::Column::StartsAt.gt(now))
        .order_by_asc(course_session::Column::StartsAt)
        .limit(limit)
        .all(db)
        .await
        .map_err(Into::into)
}
