//! Unified error type for `StudioBuddy`.
//!
//! Every fallible function in the crate returns [`Result<T>`]. Business-rule
//! violations get their own variant so the web layer can map them to a status
//! code and a stable error code; the display string is what the member sees.

use thiserror::Error;

/// All errors produced by the core, configuration, and web layers.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration could not be loaded or is inconsistent
    #[error("Configuration error: {message}")]
    Config {
        /// What went wrong
        message: String,
    },

    /// Input failed validation before touching the database
    #[error("Invalid input: {message}")]
    Validation {
        /// Human-readable description of the rejected field
        message: String,
    },

    /// Error reported by the database driver
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// The request carried no caller identity
    #[error("Missing caller identity")]
    Unauthenticated,

    /// The caller's role does not permit the operation
    #[error("Not allowed: {reason}")]
    Forbidden {
        /// Why the caller was refused
        reason: String,
    },

    /// No profile with this id
    #[error("Profile '{id}' not found")]
    ProfileNotFound {
        /// Profile id
        id: String,
    },

    /// No course with this id
    #[error("Course {id} not found")]
    CourseNotFound {
        /// Course id
        id: i64,
    },

    /// No course group with this id
    #[error("Course group {id} not found")]
    CourseGroupNotFound {
        /// Course group id
        id: i64,
    },

    /// No session with this id
    #[error("Session {id} not found")]
    SessionNotFound {
        /// Session id
        id: i64,
    },

    /// No active enrollment for this member in this course
    #[error("No active enrollment in course {course_id}")]
    EnrollmentNotFound {
        /// Course id
        course_id: i64,
    },

    /// No leave/makeup/transfer request with this id
    #[error("{kind} request {id} not found")]
    RequestNotFound {
        /// `"leave"`, `"makeup"` or `"transfer"`
        kind: &'static str,
        /// Request id
        id: i64,
    },

    /// No card order with this id
    #[error("Card order {id} not found")]
    OrderNotFound {
        /// Order id
        id: i64,
    },

    /// The requested class-card package is not configured
    #[error("Card package '{name}' not found")]
    PackageNotFound {
        /// Package name
        name: String,
    },

    /// Member already holds an enrolled or waitlisted seat
    #[error("Already enrolled or waitlisted in course {course_id}")]
    AlreadyEnrolled {
        /// Course id
        course_id: i64,
    },

    /// Member is not enrolled in the course the request refers to
    #[error("Not enrolled in course {course_id}")]
    NotEnrolled {
        /// Course id
        course_id: i64,
    },

    /// The course is deactivated
    #[error("Course {id} is not active")]
    CourseInactive {
        /// Course id
        id: i64,
    },

    /// The session is cancelled, completed, or already started
    #[error("Session {id} cannot be used: {reason}")]
    SessionNotSchedulable {
        /// Session id
        id: i64,
        /// Why the session was refused
        reason: String,
    },

    /// The request came in after the deadline
    #[error("Deadline passed: requests must be made {hours} hours before the session")]
    DeadlinePassed {
        /// Hours of notice required
        hours: i64,
    },

    /// The member used up the quota for this request type
    #[error("Quota exceeded: {used} of {quota} used")]
    QuotaExceeded {
        /// Pending plus approved requests
        used: u64,
        /// Allowed requests
        quota: i64,
    },

    /// An equivalent request is already pending or approved
    #[error("A matching {kind} request already exists")]
    DuplicateRequest {
        /// `"leave"`, `"makeup"` or `"transfer"`
        kind: &'static str,
    },

    /// The row is not in the state the operation needs
    #[error("Invalid state: expected {expected}, found {actual}")]
    InvalidState {
        /// Required state
        expected: String,
        /// State found in the database
        actual: String,
    },

    /// The target session has no free seat
    #[error("Session {id} is full")]
    SessionFull {
        /// Session id
        id: i64,
    },

    /// The class card does not hold enough credits
    #[error("Insufficient credits: balance {balance}, required {required}")]
    InsufficientCredits {
        /// Current balance
        balance: i64,
        /// Credits the operation needs
        required: i64,
    },

    /// A credit delta of zero or otherwise unusable
    #[error("Invalid credit amount: {credits}")]
    InvalidCredits {
        /// The rejected amount
        credits: i64,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Environment variable error
    #[error("Environment variable error: {0}")]
    EnvVar(#[from] std::env::VarError),

    /// Integer conversion error
    #[error("Integer conversion error: {0}")]
    TryFromInt(#[from] std::num::TryFromIntError),
}

impl Error {
    /// Shorthand for a [`Error::Validation`] with the given message.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Shorthand for a [`Error::Forbidden`] with the given reason.
    pub fn forbidden(reason: impl Into<String>) -> Self {
        Self::Forbidden {
            reason: reason.into(),
        }
    }
}

/// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;
