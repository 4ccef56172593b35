//! Configuration management for Chargeclock
//!
//! This module handles loading, validation, and management of the application
//! configuration from YAML files.

use crate::error::{ChargeClockError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

mod defaults;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Scheduling and charger-control backend
    pub backend: BackendConfig,

    /// Durable storage of the active session
    pub storage: StorageConfig,

    /// Logging configuration
    pub logging: LoggingConfig,

    /// Web server binding configuration
    pub web: WebConfig,

    /// Display tick period in milliseconds
    pub tick_interval_ms: u64,

    /// IANA time zone used for wall-clock hours
    pub timezone: String,
}

/// Backend HTTP endpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Base URL of the backend (e.g. `http://127.0.0.1:8000`)
    pub base_url: String,

    /// Per-request timeout in milliseconds
    pub request_timeout_ms: u64,

    /// Base URL of the session history service; falls back to `base_url`
    pub sessions_url: Option<String>,
}

/// Session storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Path of the JSON file holding the persisted session fields
    pub path: String,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    pub level: String,

    /// Path to log file (its parent directory receives the rolling files)
    pub file: String,

    /// Number of rotated files to keep
    pub backup_count: u32,

    /// Whether to log to console
    pub console_output: bool,

    /// Whether to use JSON format
    pub json_format: bool,
}

/// Web server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WebConfig {
    /// Serve the snapshot API
    pub enabled: bool,

    /// Bind address
    pub host: String,

    /// TCP port
    pub port: u16,
}

impl Config {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&contents)?;
        Ok(config)
    }

    /// Load configuration from the first default location that exists
    pub fn load() -> Result<Self> {
        let default_paths = [
            "chargeclock.yaml",
            "/data/chargeclock.yaml",
            "/etc/chargeclock/config.yaml",
        ];

        for path in &default_paths {
            if Path::new(path).exists() {
                return Self::from_file(path);
            }
        }

        Ok(Config::default())
    }

    /// Save configuration to a YAML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    /// Parsed time zone
    pub fn tz(&self) -> Result<chrono_tz::Tz> {
        self.timezone.parse::<chrono_tz::Tz>().map_err(|_| {
            ChargeClockError::validation(
                "timezone".to_string(),
                format!("Unknown time zone: {}", self.timezone),
            )
        })
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        let url = self.backend.base_url.trim();
        if url.is_empty() {
            return Err(ChargeClockError::validation(
                "backend.base_url",
                "Base URL cannot be empty",
            ));
        }
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ChargeClockError::validation(
                "backend.base_url",
                "Base URL must use http or https",
            ));
        }

        if let Some(sessions) = &self.backend.sessions_url {
            let sessions = sessions.trim();
            if !(sessions.starts_with("http://") || sessions.starts_with("https://")) {
                return Err(ChargeClockError::validation(
                    "backend.sessions_url",
                    "Sessions URL must use http or https",
                ));
            }
        }

        if self.backend.request_timeout_ms == 0 {
            return Err(ChargeClockError::validation(
                "backend.request_timeout_ms",
                "Must be greater than 0",
            ));
        }

        if self.storage.path.trim().is_empty() {
            return Err(ChargeClockError::validation(
                "storage.path",
                "Path cannot be empty",
            ));
        }

        if self.tick_interval_ms == 0 {
            return Err(ChargeClockError::validation(
                "tick_interval_ms",
                "Must be greater than 0",
            ));
        }

        if self.web.enabled && self.web.port == 0 {
            return Err(ChargeClockError::validation(
                "web.port",
                "Port must be greater than 0",
            ));
        }

        crate::logging::parse_log_level(&self.logging.level).map_err(|_| {
            ChargeClockError::validation(
                "logging.level".to_string(),
                format!("Invalid log level: {}", self.logging.level),
            )
        })?;

        self.tz()?;

        Ok(())
    }
}
