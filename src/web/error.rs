//! Maps [`Error`] to HTTP responses.

use crate::errors::Error;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use tracing::error;

const INTERNAL_MESSAGE: &str = "Internal server error, please try again later";

impl Error {
    /// HTTP status for this error.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation { .. } | Self::InvalidCredits { .. } => StatusCode::BAD_REQUEST,
            Self::Unauthenticated => StatusCode::UNAUTHORIZED,
            Self::Forbidden { .. } | Self::NotEnrolled { .. } => StatusCode::FORBIDDEN,

            Self::ProfileNotFound { .. }
            | Self::CourseNotFound { .. }
            | Self::CourseGroupNotFound { .. }
            | Self::SessionNotFound { .. }
            | Self::EnrollmentNotFound { .. }
            | Self::RequestNotFound { .. }
            | Self::OrderNotFound { .. }
            | Self::PackageNotFound { .. } => StatusCode::NOT_FOUND,

            Self::AlreadyEnrolled { .. }
            | Self::DuplicateRequest { .. }
            | Self::InvalidState { .. }
            | Self::SessionFull { .. } => StatusCode::CONFLICT,

            Self::CourseInactive { .. }
            | Self::SessionNotSchedulable { .. }
            | Self::DeadlinePassed { .. }
            | Self::QuotaExceeded { .. }
            | Self::InsufficientCredits { .. } => StatusCode::UNPROCESSABLE_ENTITY,

            Self::Config { .. }
            | Self::Database(_)
            | Self::Io(_)
            | Self::EnvVar(_)
            | Self::TryFromInt(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable machine-readable code for this error.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::Config { .. } => "CONFIG_ERROR",
            Self::Validation { .. } => "VALIDATION_ERROR",
            Self::Database(_) => "DATABASE_ERROR",
            Self::Unauthenticated => "UNAUTHENTICATED",
            Self::Forbidden { .. } => "FORBIDDEN",
            Self::ProfileNotFound { .. } => "PROFILE_NOT_FOUND",
            Self::CourseNotFound { .. } => "COURSE_NOT_FOUND",
            Self::CourseGroupNotFound { .. } => "COURSE_GROUP_NOT_FOUND",
            Self::SessionNotFound { .. } => "SESSION_NOT_FOUND",
            Self::EnrollmentNotFound { .. } => "ENROLLMENT_NOT_FOUND",
            Self::RequestNotFound { .. } => "REQUEST_NOT_FOUND",
            Self::OrderNotFound { .. } => "ORDER_NOT_FOUND",
            Self::PackageNotFound { .. } => "PACKAGE_NOT_FOUND",
            Self::AlreadyEnrolled { .. } => "ALREADY_ENROLLED",
            Self::NotEnrolled { .. } => "NOT_ENROLLED",
            Self::CourseInactive { .. } => "COURSE_INACTIVE",
            Self::SessionNotSchedulable { .. } => "SESSION_NOT_SCHEDULABLE",
            Self::DeadlinePassed { .. } => "DEADLINE_PASSED",
            Self::QuotaExceeded { .. } => "QUOTA_EXCEEDED",
            Self::DuplicateRequest { .. } => "DUPLICATE_REQUEST",
            Self::InvalidState { .. } => "INVALID_STATE",
            Self::SessionFull { .. } => "SESSION_FULL",
            Self::InsufficientCredits { .. } => "INSUFFICIENT_CREDITS",
            Self::InvalidCredits { .. } => "INVALID_CREDITS",
            Self::Io(_) | Self::EnvVar(_) | Self::TryFromInt(_) => "INTERNAL_ERROR",
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // Internal failures are logged, the caller only gets a generic message
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            error!(error = %self, code = self.error_code(), "Request failed");
            INTERNAL_MESSAGE.to_string()
        } else {
            self.to_string()
        };

        let body = json!({
            "success": false,
            "code": self.error_code(),
            "message": message,
            "data": serde_json::Value::Null,
        });

        (status, Json(body)).into_response()
    }
}
