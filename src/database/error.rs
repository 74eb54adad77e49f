//! Database error types.

use serde::Serialize;
use std::fmt;
use std::time::Duration;

use crate::database::classifier::classify;
use crate::database::state::ConnectionState;

/// A raw failure reported by a driver, before classification.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct DriverError {
    pub message: String,
    /// Driver or OS error code (`ENOTFOUND`, `8000`, ...) when one is available.
    pub code: Option<String>,
}

impl DriverError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: None,
        }
    }

    pub fn with_code(message: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: Some(code.into()),
        }
    }
}

/// Actionable failure categories surfaced to the request boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    ConfigurationMissing,
    Timeout,
    NameResolutionFailed,
    AuthenticationFailed,
    InconsistentState,
    Unknown,
}

impl ErrorCategory {
    /// Machine-readable code used in response bodies and metric labels.
    pub fn code(self) -> &'static str {
        match self {
            ErrorCategory::ConfigurationMissing => "configuration_missing",
            ErrorCategory::Timeout => "timeout",
            ErrorCategory::NameResolutionFailed => "name_resolution_failed",
            ErrorCategory::AuthenticationFailed => "authentication_failed",
            ErrorCategory::InconsistentState => "inconsistent_state",
            ErrorCategory::Unknown => "unknown",
        }
    }

    /// Human-readable message that is safe to return to clients.
    pub fn message(self) -> &'static str {
        match self {
            ErrorCategory::ConfigurationMissing => {
                "Database configuration error: the connection target is not set."
            }
            ErrorCategory::Timeout => {
                "Database connection timeout. Please check network connectivity and database server availability."
            }
            ErrorCategory::NameResolutionFailed => {
                "Cannot resolve the database hostname. Please check the connection string."
            }
            ErrorCategory::AuthenticationFailed => {
                "Database authentication failed. Please check the credentials in the connection string."
            }
            ErrorCategory::InconsistentState => {
                "Database connection did not settle into a ready state. Please try again later."
            }
            ErrorCategory::Unknown => "Unable to connect to database. Please try again later.",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// A classified connection failure.
///
/// `Clone` because one attempt's outcome is handed to every joined caller.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{category}: {detail}")]
pub struct ConnectError {
    category: ErrorCategory,
    detail: String,
}

impl ConnectError {
    pub fn new(category: ErrorCategory, detail: impl Into<String>) -> Self {
        Self {
            category,
            detail: detail.into(),
        }
    }

    pub fn configuration_missing(setting: &str) -> Self {
        Self::new(
            ErrorCategory::ConfigurationMissing,
            format!("{setting} is not set"),
        )
    }

    pub fn timeout(step: &str, after: Duration) -> Self {
        Self::new(
            ErrorCategory::Timeout,
            format!("{step} timed out after {}ms", after.as_millis()),
        )
    }

    pub fn inconsistent_state(observed: ConnectionState) -> Self {
        Self::new(
            ErrorCategory::InconsistentState,
            format!("connection not ready after connect, driver reports {observed}"),
        )
    }

    pub fn category(&self) -> ErrorCategory {
        self.category
    }

    /// Raw failure text, for logs only.
    pub fn detail(&self) -> &str {
        &self.detail
    }
}

impl From<DriverError> for ConnectError {
    fn from(err: DriverError) -> Self {
        Self::new(classify(&err), err.message)
    }
}
