//! Shared application state.

use crate::config::settings::AppConfig;
use sea_orm::DatabaseConnection;
use std::sync::Arc;

/// State handed to every handler.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: DatabaseConnection,
    /// Parsed `config.toml`
    pub config: Arc<AppConfig>,
}

impl AppState {
    /// Creates the state from a connection and the loaded configuration.
    #[must_use]
    pub fn new(db: DatabaseConnection, config: AppConfig) -> Self {
        Self {
            db,
            config: Arc::new(config),
        }
    }
}
