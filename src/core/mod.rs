//! Business logic, independent of the HTTP layer.
//!
//! Functions take a database connection (or any `ConnectionTrait`, so they
//! can run inside a caller's transaction) and return [`crate::errors::Result`].

pub mod attendance;
pub mod card;
pub mod course;
pub mod enrollment;
pub mod leave;
pub mod makeup;
pub mod profile;
pub mod report;
pub mod requests;
pub mod session;
pub mod status;
pub mod system_config;
pub mod transfer;
