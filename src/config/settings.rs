//! Application settings loaded from config.toml
//!
//! The file describes the HTTP bind address, the class-card packages members
//! can buy, the course groups to seed on first start, and the defaults written
//! into `system_config` when a key is missing. Every section is optional; a
//! missing file yields the built-in defaults.

use crate::errors::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{info, warn};

/// Configuration structure representing the entire config.toml file
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct AppConfig {
    /// HTTP server settings
    pub server: ServerConfig,
    /// Class-card packages offered to members
    pub card_packages: Vec<CardPackage>,
    /// Course groups created on first start
    pub course_groups: Vec<CourseGroupSeed>,
    /// Values written to `system_config` when missing
    pub system_defaults: SystemDefaults,
}

/// HTTP server settings
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    /// Address the API listens on
    pub bind_addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".to_string(),
        }
    }
}

/// A purchasable bundle of class-card credits
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct CardPackage {
    /// Package name members pick when ordering
    pub name: String,
    /// Credits added to the card once paid
    pub credits: i64,
    /// Price of the package
    pub price: f64,
}

/// A course group to create on first start
#[derive(Debug, Deserialize, Clone)]
pub struct CourseGroupSeed {
    /// Group name
    pub name: String,
    /// Optional description
    #[serde(default)]
    pub description: Option<String>,
    /// Position in the catalog
    #[serde(default)]
    pub sort_order: i32,
}

/// Defaults for the keys of the `system_config` table
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SystemDefaults {
    /// Makeup requests allowed per member and course
    pub default_makeup_quota: i64,
    /// Transfer requests allowed per member and course
    pub default_transfer_quota: i64,
    /// Hours of notice required for a leave request
    pub leave_deadline_hours: i64,
    /// Whether an `absent` mark consumes credits
    pub charge_absent: bool,
    /// Whether a class card may go below zero
    pub allow_negative_balance: bool,
}

impl Default for SystemDefaults {
    fn default() -> Self {
        Self {
            default_makeup_quota: 2,
            default_transfer_quota: 2,
            leave_deadline_hours: 2,
            charge_absent: true,
            allow_negative_balance: false,
        }
    }
}

/// Finds a card package by name.
#[must_use]
pub fn find_package<'a>(packages: &'a [CardPackage], name: &str) -> Option<&'a CardPackage> {
    packages.iter().find(|p| p.name == name)
}

impl AppConfig {
    fn validate(&self) -> Result<()> {
        for package in &self.card_packages {
            if package.name.trim().is_empty() {
                return Err(Error::Config {
                    message: "Card package name cannot be empty".to_string(),
                });
            }
            if package.credits <= 0 {
                return Err(Error::Config {
                    message: format!("Card package '{}' must grant credits", package.name),
                });
            }
            if !package.price.is_finite() || package.price < 0.0 {
                return Err(Error::Config {
                    message: format!("Card package '{}' has an invalid price", package.name),
                });
            }
        }
        Ok(())
    }
}

/// Loads the application configuration from a TOML file
///
/// # Errors
/// Returns an error if:
/// - The file cannot be read
/// - The TOML syntax is invalid
/// - A card package is malformed
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<AppConfig> {
    let contents = std::fs::read_to_string(path.as_ref()).map_err(|e| Error::Config {
        message: format!("Failed to read config file: {e}"),
    })?;

    parse_config(&contents)
}

/// Parses and validates configuration text.
pub fn parse_config(contents: &str) -> Result<AppConfig> {
    let config: AppConfig = toml::from_str(contents).map_err(|e| Error::Config {
        message: format!("Failed to parse config.toml: {e}"),
    })?;
    config.validate()?;
    Ok(config)
}

/// Loads the configuration named by `STUDIO_CONFIG` (default `./config.toml`).
///
/// A missing file is not an error: the built-in defaults are used instead.
pub fn load_app_configuration() -> Result<AppConfig> {
    let path = std::env::var("STUDIO_CONFIG").unwrap_or_else(|_| "config.toml".to_string());
    if !Path::new(&path).exists() {
        warn!(path = %path, "Config file not found, using built-in defaults");
        return Ok(AppConfig::default());
    }

    let config = load_config(&path)?;
    info!(
        path = %path,
        packages = config.card_packages.len(),
        groups = config.course_groups.len(),
        "Loaded application configuration"
    );
    Ok(config)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;

    #[test]
    fn test_parse_full_config() {
        let toml_str = r#"
            [server]
            bind_addr = "0.0.0.0:9000"

            [[card_packages]]
            name = "10 classes"
            credits = 10
            price = 150.0

            [[card_packages]]
            name = "20 classes"
            credits = 20
            price = 280.0

            [[course_groups]]
            name = "Latin"
            sort_order = 1

            [system_defaults]
            default_makeup_quota = 3
            charge_absent = false
        "#;

        let config = parse_config(toml_str).unwrap();
        assert_eq!(config.server.bind_addr, "0.0.0.0:9000");
        assert_eq!(config.card_packages.len(), 2);
        assert_eq!(config.card_packages[1].credits, 20);
        assert_eq!(config.card_packages[1].price, 280.0);
        assert_eq!(config.course_groups[0].name, "Latin");
        assert_eq!(config.course_groups[0].description, None);
        assert_eq!(config.system_defaults.default_makeup_quota, 3);
        assert_eq!(config.system_defaults.default_transfer_quota, 2);
        assert!(!config.system_defaults.charge_absent);
        assert_eq!(
            find_package(&config.card_packages, "10 classes").map(|p| p.credits),
            Some(10)
        );
        assert!(find_package(&config.card_packages, "missing").is_none());
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = parse_config("").unwrap();
        assert_eq!(config.server.bind_addr, "127.0.0.1:8080");
        assert!(config.card_packages.is_empty());
        assert_eq!(config.system_defaults.leave_deadline_hours, 2);
        assert!(config.system_defaults.charge_absent);
        assert!(!config.system_defaults.allow_negative_balance);
    }

    #[test]
    fn test_package_without_credits_is_rejected() {
        let toml_str = r#"
            [[card_packages]]
            name = "free"
            credits = 0
            price = 0.0
        "#;
        assert!(matches!(parse_config(toml_str), Err(Error::Config { .. })));
    }

    #[test]
    fn test_invalid_toml_is_rejected() {
        assert!(matches!(
            parse_config("card_packages = 3 ="),
            Err(Error::Config { .. })
        ));
    }
}
