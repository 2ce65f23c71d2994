// src/error.rs

//! Unified error handling for the extraction pipeline.

use std::fmt;

use thiserror::Error;

/// Result type alias for pipeline operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Unified application error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP transport failed (connect, timeout, body decode)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Server answered with a non-success status
    #[error("HTTP {status} for {url}")]
    Status { url: String, status: u16 },

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing failed
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// URL parsing failed
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    /// SQLite operation failed
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// CSS selector parsing failed
    #[error("Invalid selector '{selector}': {message}")]
    Selector { selector: String, message: String },

    /// Document did not have the expected shape
    #[error("Parse error in {context}: {message}")]
    Parse { context: String, message: String },

    /// A field required for a record to be trusted was absent
    #[error("Missing required field '{field}' in {context}")]
    MissingField { context: String, field: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Data validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Storage contract violated (bad identifier, empty record, ...)
    #[error("Storage error: {0}")]
    Storage(String),

    /// A stage every later stage depends on could not complete
    #[error("Required stage '{stage}' failed: {message}")]
    Dependency { stage: String, message: String },
}

impl AppError {
    /// Create a selector parsing error.
    pub fn selector(selector: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Selector {
            selector: selector.into(),
            message: message.to_string(),
        }
    }

    /// Create a parse error with context.
    pub fn parse(context: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Parse {
            context: context.into(),
            message: message.to_string(),
        }
    }

    /// Create a missing-field error.
    pub fn missing(context: impl Into<String>, field: impl Into<String>) -> Self {
        Self::MissingField {
            context: context.into(),
            field: field.into(),
        }
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a storage error.
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage(message.into())
    }

    /// Create a dependency failure for a named stage.
    pub fn dependency(stage: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Dependency {
            stage: stage.into(),
            message: message.to_string(),
        }
    }

    /// HTTP status carried by this error, if any.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Whether retrying later could plausibly succeed.
    ///
    /// Timeouts, connection failures, 429 and 5xx are transient. Everything
    /// else (4xx, parse, storage) will fail the same way again.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Http(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            Self::Status { status, .. } => *status == 429 || (500..600).contains(status),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_errors_classify_transient() {
        let limited = AppError::Status {
            url: "https://x".into(),
            status: 429,
        };
        let unavailable = AppError::Status {
            url: "https://x".into(),
            status: 503,
        };
        let missing = AppError::Status {
            url: "https://x".into(),
            status: 404,
        };
        assert!(limited.is_transient());
        assert!(unavailable.is_transient());
        assert!(!missing.is_transient());
        assert_eq!(missing.status_code(), Some(404));
    }

    #[test]
    fn parse_errors_are_not_transient() {
        let err = AppError::parse("roster", "no table");
        assert!(!err.is_transient());
        assert_eq!(err.status_code(), None);
        assert_eq!(err.to_string(), "Parse error in roster: no table");
    }
}
