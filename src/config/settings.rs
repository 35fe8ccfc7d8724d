//! Application settings loaded from config.toml
//!
//! Every field is optional in the file. A missing file means all defaults. The
//! `DATABASE_URL` environment variable (possibly coming from `.env`) always wins over the
//! file's `database_url`.

use crate::core::period::Period;
use crate::errors::{Error, Result};
use serde::Deserialize;
use std::path::Path;

/// Database used when neither the file nor the environment names one.
pub const DEFAULT_DATABASE_URL: &str = "sqlite://data/ledger.sqlite?mode=rwc";

/// Log filter used when `RUST_LOG` is not set.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Configuration structure representing the entire config.toml file
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// `SeaORM` connection string
    pub database_url: String,
    /// `tracing_subscriber` filter directive, e.g. `"info,sqlx=warn"`
    pub log_filter: String,
    /// Cutoff period for the startup report; the current Jalali month when absent
    pub report_period: Option<Period>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database_url: DEFAULT_DATABASE_URL.to_string(),
            log_filter: DEFAULT_LOG_FILTER.to_string(),
            report_period: None,
        }
    }
}

impl Settings {
    fn validated(self) -> Result<Self> {
        if let Some(period) = self.report_period {
            Period::new(period.year, period.month).map_err(|e| Error::Config {
                message: format!("Invalid report_period: {e}"),
            })?;
        }
        Ok(self)
    }

    fn with_database_url_override(mut self, database_url: Option<String>) -> Self {
        if let Some(url) = database_url.filter(|url| !url.trim().is_empty()) {
            self.database_url = url;
        }
        self
    }
}

/// Parses settings from TOML text.
///
/// # Errors
/// Returns `Error::Config` if the TOML is invalid, has unknown keys, or names an
/// impossible `report_period`.
pub fn parse_settings(contents: &str) -> Result<Settings> {
    let settings: Settings = toml::from_str(contents).map_err(|e| Error::Config {
        message: format!("Failed to parse config.toml: {e}"),
    })?;
    settings.validated()
}

/// Loads settings from a TOML file, then applies the `DATABASE_URL` override.
///
/// # Errors
/// Returns an error if:
/// - The file exists but cannot be read
/// - The TOML syntax is invalid or contains unknown keys
/// - `report_period` has a month outside 1-12
pub fn load_settings<P: AsRef<Path>>(path: P) -> Result<Settings> {
    let path = path.as_ref();
    let settings = if path.exists() {
        let contents = std::fs::read_to_string(path).map_err(|e| Error::Config {
            message: format!("Failed to read config file {}: {e}", path.display()),
        })?;
        parse_settings(&contents)?
    } else {
        tracing::debug!(path = %path.display(), "No config file, using defaults");
        Settings::default()
    };

    Ok(settings.with_database_url_override(std::env::var("DATABASE_URL").ok()))
}

/// Loads settings from the default location (./config.toml)
pub fn load_default_settings() -> Result<Settings> {
    load_settings("config.toml")
}
