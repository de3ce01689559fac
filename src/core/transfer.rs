//! Transfer request business logic.
//!
//! A member may move one upcoming session of a course they are enrolled in
//! to another upcoming session with a free seat. Approved transfers take the
//! member off the source roster and put them on the target roster.

use crate::{
    core::{
        attendance, course, enrollment, profile,
        requests::{self, QuotaUsage, RequestFilter, ReviewDecision},
        session,
        status::{RequestStatus, Role},
    },
    entities::{TransferRequest, transfer_request},
    errors::{Error, Result},
};
use chrono::{DateTime, Utc};
use sea_orm::{PaginatorTrait, QueryOrder, Set, TransactionTrait, prelude::*};
use tracing::{info, warn};

async fn require_transfer<C>(db: &C, id: i64) -> Result<transfer_request::Model>
where
    C: ConnectionTrait,
{
    TransferRequest::find_by_id(id)
        .one(db)
        .await?
        .ok_or(Error::RequestNotFound { kind: "transfer", id })
}

/// Pending and approved transfers of a member for a course against its quota.
pub async fn transfer_quota_usage<C>(db: &C, user_id: &str, course_id: i64) -> Result<QuotaUsage>
where
    C: ConnectionTrait,
{
    let course = course::require_course(db, course_id).await?;
    let used = TransferRequest::find()
        .filter(transfer_request::Column::UserId.eq(user_id))
        .filter(transfer_request::Column::CourseId.eq(course_id))
        .filter(transfer_request::Column::Status.is_in(requests::active_status_values()))
        .count(db)
        .await?;
    Ok(QuotaUsage::new(used, course.transfer_quota))
}

/// Files a pending transfer request.
pub async fn request_transfer(
    db: &DatabaseConnection,
    user_id: &str,
    from_session_id: i64,
    to_session_id: i64,
    reason: Option<String>,
    now: DateTime<Utc>,
) -> Result<transfer_request::Model> {
    if from_session_id == to_session_id {
        return Err(Error::validation("cannot transfer a session onto itself"));
    }

    let txn = db.begin().await?;

    let from = session::require_session(&txn, from_session_id).await?;
    session::ensure_upcoming(&from, now)?;
    let course = course::require_course(&txn, from.course_id).await?;
    if !enrollment::is_enrolled(&txn, course.id, user_id).await? {
        return Err(Error::NotEnrolled {
            course_id: course.id,
        });
    }

    let to = session::require_session(&txn, to_session_id).await?;
    session::ensure_upcoming(&to, now)?;
    let to_course = course::require_course(&txn, to.course_id).await?;
    if !to_course.is_active {
        return Err(Error::CourseInactive { id: to_course.id });
    }
    let capacity = u64::try_from(to_course.capacity.max(0))?;
    if attendance::occupied_seats(&txn, to.id).await? >= capacity {
        return Err(Error::SessionFull { id: to.id });
    }

    let duplicate = TransferRequest::find()
        .filter(transfer_request::Column::UserId.eq(user_id))
        .filter(transfer_request::Column::FromSessionId.eq(from.id))
        .filter(transfer_request::Column::Status.is_in(requests::active_status_values()))
        .one(&txn)
        .await?;
    if duplicate.is_some() {
        return Err(Error::DuplicateRequest { kind: "transfer" });
    }

    let usage = transfer_quota_usage(&txn, user_id, course.id).await?;
    if let Err(e) = usage.ensure_available() {
        warn!(user_id, course_id = course.id, used = usage.used, "Transfer refused: quota used up");
        return Err(e);
    }

    let request = transfer_request::ActiveModel {
        user_id: Set(user_id.to_string()),
        course_id: Set(course.id),
        from_session_id: Set(from.id),
        to_session_id: Set(to.id),
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
        from = from.id,
        to = to.id,
        "Transfer requested"
    );
    Ok(request)
}

/// Approves or rejects a pending transfer request.
pub async fn review_transfer(
    db: &DatabaseConnection,
    request_id: i64,
    reviewer_id: &str,
    decision: ReviewDecision,
) -> Result<transfer_request::Model> {
    let txn = db.begin().await?;
    profile::require_role(&txn, reviewer_id, &[Role::Teacher]).await?;

    let request = require_transfer(&txn, request_id).await?;
    requests::ensure_pending(&request.status)?;

    let status = decision.resulting_status();
    let mut active_model: transfer_request::ActiveModel = request.into();
    active_model.status = Set(status.as_str().to_string());
    active_model.reviewed_by = Set(Some(reviewer_id.to_string()));
    active_model.reviewed_at = Set(Some(Utc::now()));
    let reviewed = active_model.update(&txn).await?;

    txn.commit().await?;
    info!(request_id, reviewer_id, status = %status, "Transfer reviewed");
    Ok(reviewed)
}

/// Withdraws the member's own pending transfer request.
pub async fn withdraw_transfer(
    db: &DatabaseConnection,
    request_id: i64,
    user_id: &str,
) -> Result<transfer_request::Model> {
    let request = require_transfer(db, request_id).await?;
    if request.user_id != user_id {
        return Err(Error::forbidden("only the requester can withdraw a request"));
    }
    requests::ensure_pending(&request.status)?;

    let mut active_model: transfer_request::ActiveModel = request.into();
    active_model.status = Set(RequestStatus::Withdrawn.as_str().to_string());
    let withdrawn = active_model.update(db).await?;
    info!(request_id, user_id, "Transfer withdrawn");
    Ok(withdrawn)
}

/// Lists transfer requests newest first.
pub async fn list_transfer_requests(
    db: &DatabaseConnection,
    filter: RequestFilter,
) -> Result<Vec<transfer_request::Model>> {
    let mut query = TransferRequest::find();
    if let Some(user_id) = filter.user_id {
        query = query.filter(transfer_request::Column::UserId.eq(user_id));
    }
    if let Some(status) = filter.status {
        query = query.filter(transfer_request::Column::Status.eq(status.as_str()));
    }
    query
        .order_by_desc(transfer_request::Column::CreatedAt)
        .order_by_desc(transfer_request::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}
