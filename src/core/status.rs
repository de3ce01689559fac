//! Status and role vocabularies.
//!
//! Every status column is stored as a lowercase string. These enums are the
//! only place the strings are spelled out; the rest of the crate matches on
//! the enum and calls `as_str()` when writing a row.

use crate::errors::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

macro_rules! string_enum {
    (
        $(#[$meta:meta])*
        $name:ident, $label:literal {
            $($(#[$vmeta:meta])* $variant:ident => $text:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "lowercase")]
        pub enum $name {
            $($(#[$vmeta])* $variant),+
        }

        impl $name {
            /// The string stored in the database.
            #[must_use]
            pub const fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = Error;

            fn from_str(s: &str) -> Result<Self> {
                match s {
                    $($text => Ok(Self::$variant),)+
                    other => Err(Error::validation(format!(
                        concat!("unknown ", $label, " '{}'"),
                        other
                    ))),
                }
            }
        }
    };
}

string_enum! {
    /// Role of a profile. Admin passes every role check.
    Role, "role" {
        /// Club administrator
        Admin => "admin",
        /// Teaches courses and takes rollcall
        Teacher => "teacher",
        /// Regular member
        Student => "student",
    }
}

string_enum! {
    /// Lifecycle of an enrollment row.
    EnrollmentStatus, "enrollment status" {
        /// Holds a seat
        Enrolled => "enrolled",
        /// Queued for a seat
        Waitlist => "waitlist",
        /// Left the course
        Cancelled => "cancelled",
    }
}

string_enum! {
    /// Lifecycle of a course session.
    SessionStatus, "session status" {
        /// Upcoming and open for requests
        Scheduled => "scheduled",
        /// Will not take place
        Cancelled => "cancelled",
        /// Rollcall taken
        Completed => "completed",
    }
}

string_enum! {
    /// Rollcall mark.
    AttendanceStatus, "attendance status" {
        /// Attended a regular session
        Present => "present",
        /// Missed without leave
        Absent => "absent",
        /// Missed with leave
        Leave => "leave",
        /// Attended as a makeup or transfer
        Makeup => "makeup",
    }
}

string_enum! {
    /// Review state shared by leave, makeup, and transfer requests.
    RequestStatus, "request status" {
        /// Awaiting review
        Pending => "pending",
        /// Accepted by a reviewer
        Approved => "approved",
        /// Refused by a reviewer
        Rejected => "rejected",
        /// Taken back by the member
        Withdrawn => "withdrawn",
    }
}

string_enum! {
    /// Lifecycle of a class-card order.
    OrderStatus, "order status" {
        /// Placed, awaiting payment confirmation
        Pending => "pending",
        /// Payment confirmed and credits granted
        Paid => "paid",
        /// Abandoned before payment
        Cancelled => "cancelled",
    }
}

string_enum! {
    /// Kind of a class-card ledger row.
    LedgerKind, "ledger kind" {
        /// Credits bought through an order
        Purchase => "purchase",
        /// Credits used by attendance
        Consume => "consume",
        /// Credits returned after a re-mark or leave
        Refund => "refund",
        /// Manual correction by an admin
        Adjust => "adjust",
    }
}

impl RequestStatus {
    /// Statuses that count against quotas and block duplicates.
    pub const ACTIVE: [Self; 2] = [Self::Pending, Self::Approved];
}

impl AttendanceStatus {
    /// Whether this mark consumes credits, given the `charge_absent` setting.
    #[must_use]
    pub const fn is_chargeable(self, charge_absent: bool) -> bool {
        match self {
            Self::Present | Self::Makeup => true,
            Self::Absent => charge_absent,
            Self::Leave => false,
        }
    }

    /// Whether the member missed the session.
    #[must_use]
    pub const fn is_missed(self) -> bool {
        matches!(self, Self::Absent | Self::Leave)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;

    #[test]
    fn test_parse_and_display() {
        assert_eq!("waitlist".parse::<EnrollmentStatus>().unwrap(), EnrollmentStatus::Waitlist);
        assert_eq!(Role::Teacher.to_string(), "teacher");
        assert_eq!(LedgerKind::Consume.as_str(), "consume");
    }

    #[test]
    fn test_unknown_value_is_validation_error() {
        let err = "superuser".parse::<Role>().unwrap_err();
        assert!(matches!(err, Error::Validation { .. }));
        assert!(err.to_string().contains("unknown role 'superuser'"));
    }

    #[test]
    fn test_serde_uses_lowercase() {
        let json = serde_json::to_string(&AttendanceStatus::Makeup).unwrap();
        assert_eq!(json, "\"makeup\"");
        let parsed: RequestStatus = serde_json::from_str("\"approved\"").unwrap();
        assert_eq!(parsed, RequestStatus::Approved);
    }

    #[test]
    fn test_chargeable_marks() {
        assert!(AttendanceStatus::Present.is_chargeable(false));
        assert!(AttendanceStatus::Makeup.is_chargeable(false));
        assert!(AttendanceStatus::Absent.is_chargeable(true));
        assert!(!AttendanceStatus::Absent.is_chargeable(false));
        assert!(!AttendanceStatus::Leave.is_chargeable(true));
    }
}
