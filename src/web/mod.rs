//! HTTP surface of `StudioBuddy`.
//!
//! A JSON REST API under `/api`. Handlers are thin: they pull the caller and
//! the payload out of the request, check the role where the core function
//! does not, and wrap the result in [`response::ApiResponse`].

pub mod error;
pub mod extract;
pub mod handlers;
pub mod middleware;
pub mod response;
pub mod routes;
pub mod state;

pub use routes::build_router;
pub use state::AppState;
