//! Caller identity middleware.
//!
//! The upstream proxy authenticates members and forwards their id in the
//! `X-User-Id` header. The middleware turns it into a [`Caller`] request
//! extension; requests to non-public routes without it get a 401.

use crate::errors::Error;
use axum::{
    extract::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};

/// Header carrying the authenticated member id.
pub const USER_ID_HEADER: &str = "x-user-id";

const PUBLIC_PATHS: [&str; 1] = ["/api/health"];

/// The authenticated member making the request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    /// Profile id
    pub user_id: String,
}

/// Reads `X-User-Id` into a [`Caller`] extension.
pub async fn identity_middleware(mut request: Request, next: Next) -> Response {
    if PUBLIC_PATHS.contains(&request.uri().path()) {
        return next.run(request).await;
    }

    let user_id = request
        .headers()
        .get(USER_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(ToString::to_string);

    match user_id {
        Some(user_id) => {
            request.extensions_mut().insert(Caller { user_id });
            next.run(request).await
        }
        None => Error::Unauthenticated.into_response(),
    }
}
