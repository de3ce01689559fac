//! Leave request business logic.
//!
//! A member on a session roster may announce absence up to
//! `leave_deadline_hours` before the session starts. Approval writes a
//! `leave` attendance mark right away, which costs nothing and refunds any
//! credits already charged for the session.

use crate::{
    core::{
        attendance, profile,
        requests::{self, RequestFilter, ReviewDecision},
        session,
        status::{AttendanceStatus, RequestStatus, Role},
        system_config,
    },
    entities::{LeaveRequest, leave_request},
    errors::{Error, Result},
};
use chrono::{DateTime, Duration, Utc};
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*};
use tracing::{info, warn};

async fn require_leave<C>(db: &C, id: i64) -> Result<leave_request::Model>
where
    C: ConnectionTrait,
{
    LeaveRequest::find_by_id(id)
        .one(db)
        .await?
        .ok_or(Error::RequestNotFound { kind: "leave", id })
}

/// Whether the member has an approved leave for the session.
pub async fn has_approved_leave<C>(db: &C, session_id: i64, user_id: &str) -> Result<bool>
where
    C: ConnectionTrait,
{
    Ok(LeaveRequest::find()
        .filter(leave_request::Column::SessionId.eq(session_id))
        .filter(leave_request::Column::UserId.eq(user_id))
        .filter(leave_request::Column::Status.eq(RequestStatus::Approved.as_str()))
        .one(db)
        .await?
        .is_some())
}

/// Files a pending leave request for an upcoming session.
pub async fn request_leave(
    db: &DatabaseConnection,
    user_id: &str,
    session_id: i64,
    reason: Option<String>,
    now: DateTime<Utc>,
) -> Result<leave_request::Model> {
    let txn = db.begin().await?;

    let target = session::require_session(&txn, session_id).await?;
    session::ensure_upcoming(&target, now)?;

    let policy = system_config::load_policy(&txn).await?;
    let deadline = Duration::try_hours(policy.leave_deadline_hours)
        .and_then(|notice| now.checked_add_signed(notice))
        .ok_or_else(|| Error::Config {
            message: format!(
                "{} = {} is out of range",
                system_config::LEAVE_DEADLINE_HOURS,
                policy.leave_deadline_hours
            ),
        })?;
    if deadline > target.starts_at {
        warn!(user_id, session_id, "Leave refused: deadline passed");
        return Err(Error::DeadlinePassed {
            hours: policy.leave_deadline_hours,
        });
    }

    let on_roster = attendance::roster_for_session(&txn, session_id)
        .await?
        .iter()
        .any(|entry| entry.user_id == user_id);
    if !on_roster {
        return Err(Error::NotEnrolled {
            course_id: target.course_id,
        });
    }

    let duplicate = LeaveRequest::find()
        .filter(leave_request::Column::SessionId.eq(session_id))
        .filter(leave_request::Column::UserId.eq(user_id))
        .filter(leave_request::Column::Status.is_in(requests::active_status_values()))
        .one(&txn)
        .await?;
    if duplicate.is_some() {
        return Err(Error::DuplicateRequest { kind: "leave" });
    }

    let request = leave_request::ActiveModel {
        session_id: Set(session_id),
        user_id: Set(user_id.to_string()),
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
    info!(request_id = request.id, user_id, session_id, "Leave requested");
    Ok(request)
}

/// Approves or rejects a pending leave request.
pub async fn review_leave(
    db: &DatabaseConnection,
    request_id: i64,
    reviewer_id: &str,
    decision: ReviewDecision,
) -> Result<leave_request::Model> {
    let txn = db.begin().await?;
    profile::require_role(&txn, reviewer_id, &[Role::Teacher]).await?;

    let request = require_leave(&txn, request_id).await?;
    requests::ensure_pending(&request.status)?;

    let session_id = request.session_id;
    let user_id = request.user_id.clone();
    let status = decision.resulting_status();

    let mut active_model: leave_request::ActiveModel = request.into();
    active_model.status = Set(status.as_str().to_string());
    active_model.reviewed_by = Set(Some(reviewer_id.to_string()));
    active_model.reviewed_at = Set(Some(Utc::now()));
    let reviewed = active_model.update(&txn).await?;

    if status == RequestStatus::Approved {
        attendance::write_mark(
            &txn,
            session_id,
            &user_id,
            AttendanceStatus::Leave,
            0,
            reviewer_id,
        )
        .await?;
    }

    txn.commit().await?;
    info!(request_id, reviewer_id, status = %status, "Leave reviewed");
    Ok(reviewed)
}

/// Withdraws the member's own pending leave request.
pub async fn withdraw_leave(
    db: &DatabaseConnection,
    request_id: i64,
    user_id: &str,
) -> Result<leave_request::Model> {
    let request = require_leave(db, request_id).await?;
    if request.user_id != user_id {
        return Err(Error::forbidden("only the requester can withdraw a request"));
    }
    requests::ensure_pending(&request.status)?;

    let mut active_model: leave_request::ActiveModel = request.into();
    active_model.status = Set(RequestStatus::Withdrawn.as_str().to_string());
    let withdrawn = active_model.update(db).await?;
    info!(request_id, user_id, "Leave withdrawn");
    Ok(withdrawn)
}

/// Lists leave requests newest first.
pub async fn list_leave_requests(
    db: &DatabaseConnection,
    filter: RequestFilter,
) -> Result<Vec<leave_request::Model>> {
    let mut query = LeaveRequest::find();
    if let Some(user_id) = filter.user_id {
        query = query.filter(leave_request::Column::UserId.eq(user_id));
    }
    if let Some(status) = filter.status {
        query = query.filter(leave_request::Column::Status.eq(status.as_str()));
    }
    query
        .order_by_desc(leave_request::Column::CreatedAt)
        .order_by_desc(leave_request::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}
