//! Makeup request business logic.
//!
//! A member who missed a session of a course they hold a seat in may attend
//! another upcoming session instead. Requests are capped per course by
//! `makeup_quota`, counting pending and approved requests, and need a free
//! seat in an active course's session the member is not already attending.

use crate::{
    core::{
        attendance, course, enrollment, leave, profile,
        requests::{self, QuotaUsage, RequestFilter, ReviewDecision},
        session,
        status::{AttendanceStatus, RequestStatus, Role},
    },
    entities::{MakeupRequest, makeup_request},
    errors::{Error, Result},
};
use chrono::{DateTime, Utc};
use sea_orm::{PaginatorTrait, QueryOrder, Set, TransactionTrait, prelude::*};
use tracing::{info, warn};

async fn require_makeup<C>(db: &C, id: i64) -> Result<makeup_request::Model>
where
    C: ConnectionTrait,
{
    MakeupRequest::find_by_id(id)
        .one(db)
        .await?
        .ok_or(Error::RequestNotFound { kind: "makeup", id })
}

/// Pending and approved makeups of a member for a course against its quota.
pub async fn makeup_quota_usage<C>(db: &C, user_id: &str, course_id: i64) -> Result<QuotaUsage>
where
    C: ConnectionTrait,
{
    let course = course::require_course(db, course_id).await?;
    let used = MakeupRequest::find()
        .filter(makeup_request::Column::UserId.eq(user_id))
        .filter(makeup_request::Column::CourseId.eq(course_id))
        .filter(makeup_request::Column::Status.is_in(requests::active_status_values()))
        .count(db)
        .await?;
    Ok(QuotaUsage::new(used, course.makeup_quota))
}

/// Whether the member missed the session: marked absent or on leave, or
/// holding an approved leave for it.
pub async fn missed_session<C>(db: &C, session_id: i64, user_id: &str) -> Result<bool>
where
    C: ConnectionTrait,
{
    if let Some(record) = attendance::find_record(db, session_id, user_id).await? {
        return Ok(record.status.parse::<AttendanceStatus>()?.is_missed());
    }
    leave::has_approved_leave(db, session_id, user_id).await
}

/// Files a pending makeup request.
pub async fn request_makeup(
    db: &DatabaseConnection,
    user_id: &str,
    original_session_id: i64,
    target_session_id: i64,
    reason: Option<String>,
    now: DateTime<Utc>,
) -> Result<makeup_request::Model> {
    if original_session_id == target_session_id {
        return Err(Error::validation(
            "the makeup session must differ from the missed one",
        ));
    }

    let txn = db.begin().await?;

    let original = session::require_session(&txn, original_session_id).await?;
    let course = course::require_course(&txn, original.course_id).await?;
    if !enrollment::is_enrolled(&txn, course.id, user_id).await? {
        return Err(Error::NotEnrolled {
            course_id: course.id,
        });
    }
    if !missed_session(&txn, original.id, user_id).await? {
        return Err(Error::InvalidState {
            expected: "a missed session".to_string(),
            actual: "session not missed".to_string(),
        });
    }

    let target = session::require_session(&txn, target_session_id).await?;
    session::ensure_upcoming(&target, now)?;
    let target_course = course::require_course(&txn, target.course_id).await?;
    if !target_course.is_active {
        return Err(Error::CourseInactive {
            id: target_course.id,
        });
    }
    let already_attending = attendance::roster_for_session(&txn, target.id)
        .await?
        .iter()
        .any(|entry| entry.user_id == user_id);
    if already_attending {
        return Err(Error::AlreadyEnrolled {
            course_id: target_course.id,
        });
    }
    let capacity = u64::try_from(target_course.capacity.max(0))?;
    if attendance::occupied_seats(&txn, target.id).await? >= capacity {
        return Err(Error::SessionFull { id: target.id });
    }

    let duplicate = MakeupRequest::find()
        .filter(makeup_request::Column::UserId.eq(user_id))
        .filter(makeup_request::Column::OriginalSessionId.eq(original.id))
        .filter(makeup_request::Column::Status.is_in(requests::active_status_values()))
        .one(&txn)
        .await?;
    if duplicate.is_some() {
        return Err(Error::DuplicateRequest { kind: "makeup" });
    }

    let usage = makeup_quota_usage(&txn, user_id, course.id).await?;
    if let Err(e) = usage.ensure_available() {
        warn!(user_id, course_id = course.id, used = usage.used, "Makeup refused: quota used up");
        return Err(e);
    }

    let request = makeup_request::ActiveModel {
        user_id: Set(user_id.to_string()),
        course_id: Set(course.id),
        original_session_id: Set(original.id),
        target_session_id: Set(target.id),
        reason: Set(reason),
        status: Set(RequestStatus::Pending.as_str().to_string()),
        reviewed_by: Set(None),
        reviewed_at: Set(None),
        created_at: Set(now),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    txn.commit().await?;
    info!(
        request_id = request.id,
        user_id,
        original = original.id,
        target = target.id,
        "Makeup requested"
    );
    Ok(request)
}

/// Approves or rejects a pending makeup request.
pub async fn review_makeup(
    db: &DatabaseConnection,
    request_id: i64,
    reviewer_id: &str,
    decision: ReviewDecision,
) -> Result<makeup_request::Model> {
    let txn = db.begin().await?;
    profile::require_role(&txn, reviewer_id, &[Role::Teacher]).await?;

    let request = require_makeup(&txn, request_id).await?;
    requests::ensure_pending(&request.status)?;

    let status = decision.resulting_status();
    let mut active_model: makeup_request::ActiveModel = request.into();
    active_model.status = Set(status.as_str().to_string());
    active_model.reviewed_by = Set(Some(reviewer_id.to_string()));
    active_model.reviewed_at = Set(Some(Utc::now()));
    let reviewed = active_model.update(&txn).await?;

    txn.commit().await?;
    info!(request_id, reviewer_id, status = %status, "Makeup reviewed");
    Ok(reviewed)
}

/// Withdraws the member's own pending makeup request.
pub async fn withdraw_makeup(
    db: &DatabaseConnection,
    request_id: i64,
    user_id: &str,
) -> Result<makeup_request::Model> {
    let request = require_makeup(db, request_id).await?;
    if request.user_id != user_id {
        return Err(Error::forbidden("only the requester can withdraw a request"));
    }
    requests::ensure_pending(&request.status)?;

    let mut active_model: makeup_request::ActiveModel = request.into();
    active_model.status = Set(RequestStatus::Withdrawn.as_str().to_string());
    let withdrawn = active_model.update(db).await?;
    info!(request_id, user_id, "Makeup withdrawn");
    Ok(withdrawn)
}

/// Lists makeup requests newest first.
pub async fn list_makeup_requests(
    db: &DatabaseConnection,
    filter: RequestFilter,
) -> Result<Vec<makeup_request::Model>> {
    let mut query = MakeupRequest::find();
    if let Some(user_id) = filter.user_id {
        query = query.filter(makeup_request::Column::UserId.eq(user_id));
    }
    if let Some(status) = filter.status {
        query = query.filter(makeup_request::Column::Status.eq(status.as_str()));
    }
    query
        .order_by_desc(makeup_request::Column::CreatedAt)
        .order_by_desc(makeup_request::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}
