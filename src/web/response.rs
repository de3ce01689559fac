//! Response envelope shared by every endpoint.

use crate::errors::Result;
use axum::Json;
use serde::Serialize;

/// `{ success, code, message, data }` body of every JSON response.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    /// Whether the operation succeeded
    pub success: bool,
    /// `"SUCCESS"` or a stable error code
    pub code: String,
    /// Text shown to the member
    pub message: String,
    /// Payload, `null` on errors
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    /// Successful response carrying `data`.
    pub fn success(data: T) -> Self {
        Self::success_with_message(data, "OK")
    }

    /// Successful response with a custom message.
    pub fn success_with_message(data: T, message: impl Into<String>) -> Self {
        Self {
            success: true,
            code: "SUCCESS".to_string(),
            message: message.into(),
            data: Some(data),
        }
    }
}

/// Return type of the JSON handlers.
pub type ApiResult<T> = Result<Json<ApiResponse<T>>>;

/// Wraps `data` in a successful envelope.
pub fn ok<T>(data: T) -> ApiResult<T> {
    Ok(Json(ApiResponse::success(data)))
}
