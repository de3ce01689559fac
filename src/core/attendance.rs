//! Attendance business logic - Session rosters and rollcall.
//!
//! The roster of a session is the course's enrolled members, minus members
//! with an approved transfer away from the session, plus members with an
//! approved makeup or transfer into it. Taking rollcall writes one record per
//! member and charges the class card; re-marking only charges or refunds the
//! difference against what the record already cost.

use crate::{
    core::{
        card::{self, LedgerEntry},
        course, enrollment, profile, session,
        status::{AttendanceStatus, LedgerKind, RequestStatus, Role, SessionStatus},
        system_config,
    },
    entities::{
        AttendanceRecord, LeaveRequest, MakeupRequest, TransferRequest, attendance_record,
        leave_request, makeup_request, transfer_request,
    },
    errors::{Error, Result},
};
use chrono::Utc;
use sea_orm::{PaginatorTrait, QueryOrder, Set, TransactionTrait, prelude::*};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use tracing::info;

/// Why a member is on a session roster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RosterSource {
    /// Holds a seat in the course
    Regular,
    /// Approved makeup into this session
    Makeup,
    /// Approved transfer into this session
    Transfer,
}

/// One line of a session roster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RosterEntry {
    /// Profile id of the member
    pub user_id: String,
    /// Why the member is expected
    pub source: RosterSource,
    /// Whether an approved leave exists for this session
    pub on_leave: bool,
    /// Mark already recorded, if any
    pub attendance: Option<AttendanceStatus>,
}

/// One mark submitted with a rollcall.
#[derive(Debug, Clone, Deserialize)]
pub struct RollcallMark {
    /// Profile id of the member
    pub user_id: String,
    /// Mark to record
    pub status: AttendanceStatus,
}

/// Outcome of [`take_rollcall`].
#[derive(Debug, Clone, Serialize)]
pub struct RollcallSummary {
    /// Session the rollcall belongs to
    pub session_id: i64,
    /// Records as written
    pub records: Vec<attendance_record::Model>,
    /// Credits consumed by this rollcall
    pub credits_charged: i64,
    /// Credits refunded by this rollcall
    pub credits_refunded: i64,
}

async fn approved_transfers<C>(
    db: &C,
    column: transfer_request::Column,
    session_id: i64,
) -> Result<Vec<String>>
where
    C: ConnectionTrait,
{
    Ok(TransferRequest::find()
        .filter(column.eq(session_id))
        .filter(transfer_request::Column::Status.eq(RequestStatus::Approved.as_str()))
        .order_by_asc(transfer_request::Column::Id)
        .all(db)
        .await?
        .into_iter()
        .map(|t| t.user_id)
        .collect())
}

async fn approved_makeups_into<C>(db: &C, session_id: i64) -> Result<Vec<String>>
where
    C: ConnectionTrait,
{
    Ok(MakeupRequest::find()
        .filter(makeup_request::Column::TargetSessionId.eq(session_id))
        .filter(makeup_request::Column::Status.eq(RequestStatus::Approved.as_str()))
        .order_by_asc(makeup_request::Column::Id)
        .all(db)
        .await?
        .into_iter()
        .map(|m| m.user_id)
        .collect())
}

/// Members expected at a session, in enrollment order then makeups and
/// transfers in.
pub async fn roster_for_session<C>(db: &C, session_id: i64) -> Result<Vec<RosterEntry>>
where
    C: ConnectionTrait,
{
    let session = session::require_session(db, session_id).await?;

    let transferred_out: HashSet<String> =
        approved_transfers(db, transfer_request::Column::FromSessionId, session_id)
            .await?
            .into_iter()
            .collect();

    let mut sources: Vec<(String, RosterSource)> = Vec::new();
    let mut seen = HashSet::new();
    let regular = enrollment::enrolled_user_ids(db, session.course_id).await?;
    let makeups = approved_makeups_into(db, session_id).await?;
    let transfers_in =
        approved_transfers(db, transfer_request::Column::ToSessionId, session_id).await?;

    for user_id in regular {
        if !transferred_out.contains(&user_id) && seen.insert(user_id.clone()) {
            sources.push((user_id, RosterSource::Regular));
        }
    }
    for user_id in makeups {
        if seen.insert(user_id.clone()) {
            sources.push((user_id, RosterSource::Makeup));
        }
    }
    for user_id in transfers_in {
        if seen.insert(user_id.clone()) {
            sources.push((user_id, RosterSource::Transfer));
        }
    }

    let on_leave: HashSet<String> = LeaveRequest::find()
        .filter(leave_request::Column::SessionId.eq(session_id))
        .filter(leave_request::Column::Status.eq(RequestStatus::Approved.as_str()))
        .all(db)
        .await?
        .into_iter()
        .map(|l| l.user_id)
        .collect();

    let mut marks = BTreeMap::new();
    for record in attendance_for_session(db, session_id).await? {
        marks.insert(record.user_id.clone(), record.status.parse::<AttendanceStatus>()?);
    }

    Ok(sources
        .into_iter()
        .map(|(user_id, source)| RosterEntry {
            on_leave: on_leave.contains(&user_id),
            attendance: marks.get(&user_id).copied(),
            user_id,
            source,
        })
        .collect())
}

/// Seats taken at a session: roster size plus makeups and transfers into it
/// that are still pending review.
pub async fn occupied_seats<C>(db: &C, session_id: i64) -> Result<u64>
where
    C: ConnectionTrait,
{
    let roster = roster_for_session(db, session_id).await?.len();

    let pending_makeups = MakeupRequest::find()
        .filter(makeup_request::Column::TargetSessionId.eq(session_id))
        .filter(makeup_request::Column::Status.eq(RequestStatus::Pending.as_str()))
        .count(db)
        .await?;
    let pending_transfers = TransferRequest::find()
        .filter(transfer_request::Column::ToSessionId.eq(session_id))
        .filter(transfer_request::Column::Status.eq(RequestStatus::Pending.as_str()))
        .count(db)
        .await?;

    Ok(u64::try_from(roster)? + pending_makeups + pending_transfers)
}

/// The recorded mark of one member at one session.
pub async fn find_record<C>(
    db: &C,
    session_id: i64,
    user_id: &str,
) -> Result<Option<attendance_record::Model>>
where
    C: ConnectionTrait,
{
    AttendanceRecord::find()
        .filter(attendance_record::Column::SessionId.eq(session_id))
        .filter(attendance_record::Column::UserId.eq(user_id))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Credits moved by a single [`write_mark`].
#[derive(Debug, Clone)]
pub(crate) struct MarkOutcome {
    pub record: attendance_record::Model,
    pub charged: i64,
    pub refunded: i64,
}

/// Upserts the (session, member) record so it costs `target_charge`, moving
/// only the difference on the class card.
pub(crate) async fn write_mark<C>(
    db: &C,
    session_id: i64,
    user_id: &str,
    status: AttendanceStatus,
    target_charge: i64,
    marked_by: &str,
) -> Result<MarkOutcome>
where
    C: ConnectionTrait,
{
    let now = Utc::now();
    let existing = find_record(db, session_id, user_id).await?;
    let previous_charge = existing.as_ref().map_or(0, |r| r.credits_charged);

    let record = if let Some(existing) = existing {
        let mut active_model: attendance_record::ActiveModel = existing.into();
        active_model.status = Set(status.as_str().to_string());
        active_model.credits_charged = Set(target_charge);
        active_model.marked_by = Set(marked_by.to_string());
        active_model.marked_at = Set(now);
        active_model.update(db).await?
    } else {
        attendance_record::ActiveModel {
            session_id: Set(session_id),
            user_id: Set(user_id.to_string()),
            status: Set(status.as_str().to_string()),
            credits_charged: Set(target_charge),
            marked_by: Set(marked_by.to_string()),
            marked_at: Set(now),
            ..Default::default()
        }
        .insert(db)
        .await?
    };

    let diff = target_charge - previous_charge;
    if diff != 0 {
        let (kind, description) = if diff > 0 {
            (LedgerKind::Consume, format!("Session {session_id}: {status}"))
        } else {
            (
                LedgerKind::Refund,
                format!("Session {session_id}: re-marked {status}"),
            )
        };
        card::apply_ledger_entry(
            db,
            LedgerEntry {
                user_id,
                delta: -diff,
                kind,
                reference_id: Some(record.id),
                description,
                created_by: marked_by,
            },
        )
        .await?;
    }

    Ok(MarkOutcome {
        record,
        charged: diff.max(0),
        refunded: (-diff).max(0),
    })
}

/// Records the rollcall of a session and charges class cards.
///
/// Every marked member must be on the roster. If any card lacks credits the
/// whole rollcall is rolled back. The session is marked completed.
pub async fn take_rollcall(
    db: &DatabaseConnection,
    session_id: i64,
    marks: Vec<RollcallMark>,
    marked_by: &str,
) -> Result<RollcallSummary> {
    let mut unique = HashSet::new();
    for mark in &marks {
        if !unique.insert(mark.user_id.as_str()) {
            return Err(Error::validation(format!(
                "member '{}' is marked twice",
                mark.user_id
            )));
        }
    }

    let txn = db.begin().await?;
    profile::require_role(&txn, marked_by, &[Role::Teacher]).await?;

    let session = session::require_session(&txn, session_id).await?;
    if session::status_of(&session)? == SessionStatus::Cancelled {
        return Err(Error::SessionNotSchedulable {
            id: session_id,
            reason: "session is cancelled".to_string(),
        });
    }
    let course = course::require_course(&txn, session.course_id).await?;
    let policy = system_config::load_policy(&txn).await?;

    let roster: HashSet<String> = roster_for_session(&txn, session_id)
        .await?
        .into_iter()
        .map(|entry| entry.user_id)
        .collect();

    let mut summary = RollcallSummary {
        session_id,
        records: Vec::with_capacity(marks.len()),
        credits_charged: 0,
        credits_refunded: 0,
    };
    for mark in marks {
        if !roster.contains(&mark.user_id) {
            return Err(Error::validation(format!(
                "member '{}' is not on the roster of session {session_id}",
                mark.user_id
            )));
        }
        let target_charge = if mark.status.is_chargeable(policy.charge_absent) {
            course.credits_per_session
        } else {
            0
        };
        let outcome = write_mark(
            &txn,
            session_id,
            &mark.user_id,
            mark.status,
            target_charge,
            marked_by,
        )
        .await?;
        summary.credits_charged += outcome.charged;
        summary.credits_refunded += outcome.refunded;
        summary.records.push(outcome.record);
    }

    session::complete_session(&txn, session_id).await?;
    txn.commit().await?;

    info!(
        session_id,
        marked_by,
        marks = summary.records.len(),
        charged = summary.credits_charged,
        refunded = summary.credits_refunded,
        "Rollcall recorded"
    );
    Ok(summary)
}

/// All records of a session.
pub async fn attendance_for_session<C>(
    db: &C,
    session_id: i64,
) -> Result<Vec<attendance_record::Model>>
where
    C: ConnectionTrait,
{
    AttendanceRecord::find()
        .filter(attendance_record::Column::SessionId.eq(session_id))
        .order_by_asc(attendance_record::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// All records of a member, newest first.
pub async fn attendance_for_user<C>(db: &C, user_id: &str) -> Result<Vec<attendance_record::Model>>
where
    C: ConnectionTrait,
{
    AttendanceRecord::find()
        .filter(attendance_record::Column::UserId.eq(user_id))
        .order_by_desc(attendance_record::Column::MarkedAt)
        .all(db)
        .await
        .map_err(Into::into)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::*;

    fn mark(user_id: &str, status: AttendanceStatus) -> RollcallMark {
        RollcallMark {
            user_id: user_id.to_string(),
            status,
        }
    }

    #[tokio::test]
    async fn test_rollcall_charges_cards() -> Result<()> {
        let db = setup_test_db().await?;
        let (course, session) = setup_course_with_members(&db, &["a", "b", "c"], 5).await?;
        assert_eq!(course.credits_per_session, 1);

        let summary = take_rollcall(
            &db,
            session.id,
            vec![
                mark("a", AttendanceStatus::Present),
                mark("b", AttendanceStatus::Absent),
                mark("c", AttendanceStatus::Leave),
            ],
            "teacher",
        )
        .await?;

        assert_eq!(summary.records.len(), 3);
        assert_eq!(summary.credits_charged, 2);
        assert_eq!(summary.credits_refunded, 0);
        assert_eq!(card::get_balance(&db, "a").await?, 4);
        assert_eq!(card::get_balance(&db, "b").await?, 4);
        assert_eq!(card::get_balance(&db, "c").await?, 5);
        assert_eq!(
            session::require_session(&db, session.id).await?.status,
            "completed"
        );

        let roster = roster_for_session(&db, session.id).await?;
        assert_eq!(roster[0].attendance, Some(AttendanceStatus::Present));
        Ok(())
    }

    #[tokio::test]
    async fn test_remark_moves_only_the_difference() -> Result<()> {
        let db = setup_test_db().await?;
        let (_, session) = setup_course_with_members(&db, &["a"], 5).await?;
        system_config::set_value(&db, system_config::CHARGE_ABSENT, "false").await?;

        take_rollcall(&db, session.id, vec![mark("a", AttendanceStatus::Present)], "teacher")
            .await?;
        take_rollcall(&db, session.id, vec![mark("a", AttendanceStatus::Present)], "teacher")
            .await?;
        assert_eq!(card::get_balance(&db, "a").await?, 4);

        let summary =
            take_rollcall(&db, session.id, vec![mark("a", AttendanceStatus::Absent)], "teacher")
                .await?;
        assert_eq!(summary.credits_refunded, 1);
        assert_eq!(card::get_balance(&db, "a").await?, 5);
        assert_eq!(card::ledger_total(&db, "a").await?, 5);
        assert_eq!(attendance_for_session(&db, session.id).await?.len(), 1);

        let ledger = card::list_transactions(&db, "a", None).await?;
        assert_eq!(ledger[0].kind, "refund");
        assert_eq!(ledger[1].kind, "consume");
        Ok(())
    }

    #[tokio::test]
    async fn test_insufficient_credits_rolls_back_everything() -> Result<()> {
        let db = setup_test_db().await?;
        let (_, session) = setup_course_with_members(&db, &["a", "b"], 1).await?;
        card::adjust_balance(&db, "b", -1, "spent".to_string(), "admin").await?;

        let result = take_rollcall(
            &db,
            session.id,
            vec![
                mark("a", AttendanceStatus::Present),
                mark("b", AttendanceStatus::Present),
            ],
            "teacher",
        )
        .await;
        assert!(matches!(
            result.unwrap_err(),
            Error::InsufficientCredits {
                balance: 0,
                required: 1
            }
        ));

        assert_eq!(card::get_balance(&db, "a").await?, 1);
        assert!(attendance_for_session(&db, session.id).await?.is_empty());
        assert_eq!(
            session::require_session(&db, session.id).await?.status,
            "scheduled"
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_rollcall_guards() -> Result<()> {
        let db = setup_test_db().await?;
        let (_, session) = setup_course_with_members(&db, &["a"], 5).await?;
        create_test_profile(&db, "outsider", Role::Student).await?;

        assert!(matches!(
            take_rollcall(&db, session.id, vec![mark("a", AttendanceStatus::Present)], "a")
                .await
                .unwrap_err(),
            Error::Forbidden { .. }
        ));
        assert!(matches!(
            take_rollcall(
                &db,
                session.id,
                vec![mark("outsider", AttendanceStatus::Present)],
                "teacher"
            )
            .await
            .unwrap_err(),
            Error::Validation { .. }
        ));
        assert!(matches!(
            take_rollcall(
                &db,
                session.id,
                vec![
                    mark("a", AttendanceStatus::Present),
                    mark("a", AttendanceStatus::Absent)
                ],
                "teacher"
            )
            .await
            .unwrap_err(),
            Error::Validation { .. }
        ));

        session::cancel_session(&db, session.id).await?;
        assert!(matches!(
            take_rollcall(&db, session.id, vec![mark("a", AttendanceStatus::Present)], "teacher")
                .await
                .unwrap_err(),
            Error::SessionNotSchedulable { .. }
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_attendance_for_user() -> Result<()> {
        let db = setup_test_db().await?;
        let (course, first) = setup_course_with_members(&db, &["a"], 5).await?;
        let second = create_test_session(&db, course.id, hours_from_now(72)).await?;

        take_rollcall(&db, first.id, vec![mark("a", AttendanceStatus::Present)], "teacher")
            .await?;
        take_rollcall(&db, second.id, vec![mark("a", AttendanceStatus::Absent)], "teacher")
            .await?;

        let records = attendance_for_user(&db, "a").await?;
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].session_id, second.id);
        assert_eq!(find_record(&db, first.id, "a").await?.unwrap().status, "present");
        assert_eq!(occupied_seats(&db, first.id).await?, 1);
        Ok(())
    }
}
