//! Database configuration module for `StudioBuddy`.
//!
//! This module handles the database connection and table creation using `SeaORM`.
//! Tables are generated from the entity definitions with
//! `Schema::create_table_from_entity`, so the schema always matches the Rust
//! structs without hand-written SQL.

use crate::entities::{
    AttendanceRecord, CardOrder, CardTransaction, Course, CourseGroup, CourseSession, Enrollment,
    LeaveRequest, MakeupRequest, Profile, SystemConfig, TransferRequest,
};
use crate::errors::Result;
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, EntityTrait, Schema};
use tracing::{debug, info, instrument};

const DEFAULT_DATABASE_URL: &str = "sqlite://data/studio_buddy.sqlite?mode=rwc";

/// Gets the database URL from the `DATABASE_URL` environment variable or
/// returns the default local `SQLite` path.
#[must_use]
pub fn get_database_url() -> String {
    std::env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string())
}

/// Establishes a connection to the database named by `DATABASE_URL`.
#[instrument]
pub async fn create_connection() -> Result<DatabaseConnection> {
    let database_url = get_database_url();
    debug!("Connecting to database: {}", database_url);
    Database::connect(&database_url).await.map_err(Into::into)
}

async fn create_table<E: EntityTrait>(
    db: &DatabaseConnection,
    schema: &Schema,
    entity: E,
) -> Result<()> {
    let builder = db.get_database_backend();
    let mut statement = schema.create_table_from_entity(entity);
    statement.if_not_exists();
    db.execute(builder.build(&statement)).await?;
    Ok(())
}

/// Creates all tables that do not exist yet.
///
/// Referenced tables come first so foreign keys resolve on backends that check
/// them at creation time.
pub async fn create_tables(db: &DatabaseConnection) -> Result<()> {
    let schema = Schema::new(db.get_database_backend());

    create_table(db, &schema, Profile).await?;
    create_table(db, &schema, CourseGroup).await?;
    create_table(db, &schema, Course).await?;
    create_table(db, &schema, CourseSession).await?;
    create_table(db, &schema, Enrollment).await?;
    create_table(db, &schema, AttendanceRecord).await?;
    create_table(db, &schema, LeaveRequest).await?;
    create_table(db, &schema, MakeupRequest).await?;
    create_table(db, &schema, TransferRequest).await?;
    create_table(db, &schema, CardOrder).await?;
    create_table(db, &schema, CardTransaction).await?;
    create_table(db, &schema, SystemConfig).await?;

    info!("Database tables ensured");
    Ok(())
}
