//! Error types and handling for Chargeclock
//!
//! This module defines the error types used throughout the application.
//! The three session-level kinds (`FetchFailure`, `InvalidSessionState`,
//! `StaleEvent`) drive the degradation policy of the tracker; the rest are
//! ambient failures of configuration, storage and I/O.

use thiserror::Error;

/// Result type alias for Chargeclock operations
pub type Result<T> = std::result::Result<T, ChargeClockError>;

/// Main error type for Chargeclock
#[derive(Debug, Error)]
pub enum ChargeClockError {
    /// A plan query, start or stop command did not succeed
    #[error("Fetch failure: {message}")]
    FetchFailure { message: String },

    /// Session fields missing or unparseable where a computation needs them
    #[error("Invalid session state: {message}")]
    InvalidSessionState { message: String },

    /// An async completion arrived for a session that is no longer current
    #[error("Stale event: {message}")]
    StaleEvent { message: String },

    /// Configuration-related errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Validation errors
    #[error("Validation error: {field} - {message}")]
    Validation { field: String, message: String },

    /// Serialization/deserialization errors
    #[error("Serialization error: {message}")]
    Serialization { message: String },

    /// File I/O errors
    #[error("I/O error: {message}")]
    Io { message: String },

    /// Network-related errors
    #[error("Network error: {message}")]
    Network { message: String },

    /// HTTP/Web server errors
    #[error("Web server error: {message}")]
    Web { message: String },

    /// Generic errors with context
    #[error("Error: {message}")]
    Generic { message: String },
}

impl ChargeClockError {
    /// Create a new fetch failure
    pub fn fetch<S: Into<String>>(message: S) -> Self {
        ChargeClockError::FetchFailure {
            message: message.into(),
        }
    }

    /// Create a new invalid session state error
    pub fn invalid_session<S: Into<String>>(message: S) -> Self {
        ChargeClockError::InvalidSessionState {
            message: message.into(),
        }
    }

    /// Create a new stale event error
    pub fn stale<S: Into<String>>(message: S) -> Self {
        ChargeClockError::StaleEvent {
            message: message.into(),
        }
    }

    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        ChargeClockError::Config {
            message: message.into(),
        }
    }

    /// Create a new validation error
    pub fn validation<S: Into<String>>(field: S, message: S) -> Self {
        ChargeClockError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create a new I/O error
    pub fn io<S: Into<String>>(message: S) -> Self {
        ChargeClockError::Io {
            message: message.into(),
        }
    }

    /// Create a new network error
    pub fn network<S: Into<String>>(message: S) -> Self {
        ChargeClockError::Network {
            message: message.into(),
        }
    }

    /// Create a new web error
    pub fn web<S: Into<String>>(message: S) -> Self {
        ChargeClockError::Web {
            message: message.into(),
        }
    }

    /// Create a new generic error
    pub fn generic<S: Into<String>>(message: S) -> Self {
        ChargeClockError::Generic {
            message: message.into(),
        }
    }

    /// Whether this error is an expected race rather than a failure
    pub fn is_stale(&self) -> bool {
        matches!(self, ChargeClockError::StaleEvent { .. })
    }
}

impl From<std::io::Error> for ChargeClockError {
    fn from(err: std::io::Error) -> Self {
        ChargeClockError::io(err.to_string())
    }
}

impl From<serde_yaml::Error> for ChargeClockError {
    fn from(err: serde_yaml::Error) -> Self {
        ChargeClockError::Serialization {
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for ChargeClockError {
    fn from(err: serde_json::Error) -> Self {
        ChargeClockError::Serialization {
            message: err.to_string(),
        }
    }
}

#[cfg(feature = "backend")]
impl From<reqwest::Error> for ChargeClockError {
    fn from(err: reqwest::Error) -> Self {
        ChargeClockError::network(err.to_string())
    }
}

impl From<chrono::ParseError> for ChargeClockError {
    fn from(err: chrono::ParseError) -> Self {
        ChargeClockError::invalid_session(format!("unparseable timestamp: {}", err))
    }
}
