//! Report generation business logic.
//!
//! Summaries for a member and for a course, assembled from the other core
//! modules. Everything returns structured data; [`format_member_summary`]
//! renders the plain-text variant served at `/api/me/summary.txt`.

use crate::{
    core::{
        attendance, card,
        course::{self, CourseOverview},
        enrollment, profile, session,
        status::{AttendanceStatus, EnrollmentStatus},
    },
    entities::{
        card_transaction, course_session, enrollment as enrollment_entity,
        profile as profile_entity,
    },
    errors::Result,
};
use sea_orm::DatabaseConnection;
use serde::Serialize;
use std::fmt::Write;

/// Ledger rows included in a member summary.
pub const RECENT_TRANSACTION_LIMIT: u64 = 10;

/// Attendance marks counted by status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AttendanceCounts {
    /// `present` marks
    pub present: u64,
    /// `absent` marks
    pub absent: u64,
    /// `leave` marks
    pub leave: u64,
    /// `makeup` marks
    pub makeup: u64,
}

impl AttendanceCounts {
    fn record(&mut self, status: AttendanceStatus) {
        match status {
            AttendanceStatus::Present => self.present += 1,
            AttendanceStatus::Absent => self.absent += 1,
            AttendanceStatus::Leave => self.leave += 1,
            AttendanceStatus::Makeup => self.makeup += 1,
        }
    }

    fn from_statuses<'a>(statuses: impl IntoIterator<Item = &'a str>) -> Result<Self> {
        let mut counts = Self::default();
        for status in statuses {
            counts.record(status.parse()?);
        }
        Ok(counts)
    }

    /// Number of marks of any status.
    #[must_use]
    pub const fn total(&self) -> u64 {
        self.present + self.absent + self.leave + self.makeup
    }
}

/// One active enrollment of a member.
#[derive(Debug, Clone, Serialize)]
pub struct EnrollmentLine {
    /// The enrollment row
    pub enrollment: enrollment_entity::Model,
    /// Name of the course
    pub course_name: String,
    /// 1-based queue position while waitlisted
    pub waitlist_position: Option<u64>,
}

/// Everything a member sees about themselves.
#[derive(Debug, Clone, Serialize)]
pub struct MemberSummary {
    /// The member
    pub profile: profile_entity::Model,
    /// Class-card credits left
    pub balance: i64,
    /// Enrolled and waitlisted courses, newest first
    pub enrollments: Vec<EnrollmentLine>,
    /// Marks across all sessions
    pub attendance: AttendanceCounts,
    /// Latest ledger rows, newest first
    pub recent_transactions: Vec<card_transaction::Model>,
}

/// Attendance of one session.
#[derive(Debug, Clone, Serialize)]
pub struct SessionAttendance {
    /// The session
    pub session: course_session::Model,
    /// Marks taken at it
    pub counts: AttendanceCounts,
}

/// Course overview plus attendance per session.
#[derive(Debug, Clone, Serialize)]
pub struct CourseSummary {
    /// Seat counts
    pub overview: CourseOverview,
    /// Sessions in start order
    pub sessions: Vec<SessionAttendance>,
}

/// Builds the summary of a member.
pub async fn member_summary(db: &DatabaseConnection, user_id: &str) -> Result<MemberSummary> {
    let profile = profile::require_profile(db, user_id).await?;

    let mut enrollments = Vec::new();
    for row in enrollment::list_enrollments_for_user(db, user_id).await? {
        let course = course::require_course(db, row.course_id).await?;
        let waitlist_position = if row.status == EnrollmentStatus::Waitlist.as_str() {
            enrollment::waitlist_position(db, row.course_id, user_id).await?
        } else {
            None
        };
        enrollments.push(EnrollmentLine {
            enrollment: row,
            course_name: course.name,
            waitlist_position,
        });
    }

    let records = attendance::attendance_for_user(db, user_id).await?;
    let attendance = AttendanceCounts::from_statuses(records.iter().map(|r| r.status.as_str()))?;
    let recent_transactions =
        card::list_transactions(db, user_id, Some(RECENT_TRANSACTION_LIMIT)).await?;

    Ok(MemberSummary {
        balance: profile.card_balance,
        profile,
        enrollments,
        attendance,
        recent_transactions,
    })
}

/// Builds the summary of a course.
pub async fn course_summary(db: &DatabaseConnection, course_id: i64) -> Result<CourseSummary> {
    let overview = course::get_course_overview(db, course_id).await?;

    let mut sessions = Vec::new();
    for row in session::list_sessions_for_course(db, course_id).await? {
        let records = attendance::attendance_for_session(db, row.id).await?;
        let counts = AttendanceCounts::from_statuses(records.iter().map(|r| r.status.as_str()))?;
        sessions.push(SessionAttendance {
            session: row,
            counts,
        });
    }

    Ok(CourseSummary { overview, sessions })
}

/// Formats a credit delta with its sign, like "+10" or "-1".
#[must_use]
pub fn format_credits(delta: i64) -> String {
    if delta >= 0 {
        format!("+{delta}")
    } else {
        delta.to_string()
    }
}

/// Renders a member summary as plain text.
#[must_use]
pub fn format_member_summary(summary: &MemberSummary) -> String {
    let mut out = String::new();
    let profile = &summary.profile;

    // Writing to a String cannot fail
    let _ = writeln!(out, "Member: {} ({})", profile.full_name, profile.id);
    let _ = writeln!(out, "Role: {}", profile.role);
    let _ = writeln!(out, "Card balance: {} credits", summary.balance);

    let _ = writeln!(out, "\nCourses:");
    if summary.enrollments.is_empty() {
        let _ = writeln!(out, "  (none)");
    }
    for line in &summary.enrollments {
        match line.waitlist_position {
            Some(position) => {
                let _ = writeln!(out, "  - {} (waitlist #{position})", line.course_name);
            }
            None => {
                let _ = writeln!(out, "  - {} ({})", line.course_name, line.enrollment.status);
            }
        }
    }

    let counts = &summary.attendance;
    let _ = writeln!(
        out,
        "\nAttendance: {} present, {} absent, {} leave, {} makeup",
        counts.present, counts.absent, counts.leave, counts.makeup
    );

    let _ = writeln!(out, "\nRecent card activity:");
    if summary.recent_transactions.is_empty() {
        let _ = writeln!(out, "  (none)");
    }
    for tx in &summary.recent_transactions {
        let _ = writeln!(
            out,
            "  {} | {} | {}",
            format_credits(tx.delta),
            tx.kind,
            tx.description
        );
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{
        attendance::RollcallMark,
        status::{AttendanceStatus, Role},
    };
    use crate::test_utils::*;

    #[test]
    fn test_format_credits() {
        assert_eq!(format_credits(10), "+10");
        assert_eq!(format_credits(0), "+0");
        assert_eq!(format_credits(-1), "-1");
    }

    #[tokio::test]
    async fn test_member_summary() -> Result<()> {
        let db = setup_test_db().await?;
        let (_, salsa_session) = setup_course_with_members(&db, &["a"], 5).await?;
        attendance::take_rollcall(
            &db,
            salsa_session.id,
            vec![RollcallMark {
                user_id: "a".to_string(),
                status: AttendanceStatus::Present,
            }],
            "teacher",
        )
        .await?;

        let tango = create_test_course(&db, "Tango", 1).await?;
        create_test_profile(&db, "z", Role::Student).await?;
        enrollment::enroll(&db, tango.id, "z").await?;
        enrollment::enroll(&db, tango.id, "a").await?;

        let summary = member_summary(&db, "a").await?;
        assert_eq!(summary.balance, 4);
        assert_eq!(summary.enrollments.len(), 2);
        let tango_line = summary
            .enrollments
            .iter()
            .find(|l| l.course_name == "Tango")
            .map(|l| l.waitlist_position);
        assert_eq!(tango_line, Some(Some(1)));
        assert_eq!(summary.attendance.present, 1);
        assert_eq!(summary.attendance.total(), 1);
        assert_eq!(summary.recent_transactions.len(), 2);
        assert_eq!(summary.recent_transactions[0].delta, -1);

        let text = format_member_summary(&summary);
        assert!(text.contains("Card balance: 4 credits"));
        assert!(text.contains("  - Salsa (enrolled)"));
        assert!(text.contains("  - Tango (waitlist #1)"));
        assert!(text.contains("Attendance: 1 present, 0 absent, 0 leave, 0 makeup"));
        assert!(text.contains("  -1 | consume |"));
        Ok(())
    }

    #[tokio::test]
    async fn test_member_summary_empty() -> Result<()> {
        let db = setup_test_db().await?;
        create_test_profile(&db, "new", Role::Student).await?;

        let summary = member_summary(&db, "new").await?;
        assert!(summary.enrollments.is_empty());
        assert_eq!(summary.attendance, AttendanceCounts::default());

        let text = format_member_summary(&summary);
        assert!(text.contains("Courses:\n  (none)"));
        assert!(text.contains("Recent card activity:\n  (none)"));
        Ok(())
    }

    #[tokio::test]
    async fn test_course_summary() -> Result<()> {
        let db = setup_test_db().await?;
        let (course, first) = setup_course_with_members(&db, &["a", "b"], 3).await?;
        create_test_session(&db, course.id, hours_from_now(24 * 7)).await?;
        attendance::take_rollcall(
            &db,
            first.id,
            vec![
                RollcallMark {
                    user_id: "a".to_string(),
                    status: AttendanceStatus::Present,
                },
                RollcallMark {
                    user_id: "b".to_string(),
                    status: AttendanceStatus::Absent,
                },
            ],
            "teacher",
        )
        .await?;

        let summary = course_summary(&db, course.id).await?;
        assert_eq!(summary.overview.enrolled_count, 2);
        assert_eq!(summary.sessions.len(), 2);
        assert_eq!(summary.sessions[0].counts.present, 1);
        assert_eq!(summary.sessions[0].counts.absent, 1);
        assert_eq!(summary.sessions[1].counts.total(), 0);
        Ok(())
    }
}
