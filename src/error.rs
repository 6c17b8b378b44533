//! Error types for bq-report.
//!
//! Defines the main error enum used throughout the application.

use thiserror::Error;

/// Main error type for report operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ReportError {
    /// Configuration errors (missing project id, empty query text, bad config file, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Warehouse connection errors (credential parsing, client construction, etc.)
    #[error("Connection error: {0}")]
    Connection(String),

    /// Query execution errors (syntax errors, location mismatch, transport failures, etc.)
    #[error("Query error: {0}")]
    Query(String),

    /// The request deadline elapsed before the warehouse answered.
    #[error("Timeout: {0}")]
    Timeout(String),

    /// The request was cancelled by the caller or by server shutdown.
    #[error("Cancelled: {0}")]
    Cancelled(String),

    /// The warehouse answered with a result shape we could not interpret.
    #[error("Decode error: {0}")]
    Decode(String),
}

impl ReportError {
    /// Creates a configuration error with the given message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Creates a connection error with the given message.
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    /// Creates a query error with the given message.
    pub fn query(msg: impl Into<String>) -> Self {
        Self::Query(msg.into())
    }

    /// Creates a timeout error with the given message.
    pub fn timeout(msg: impl Into<String>) -> Self {
        Self::Timeout(msg.into())
    }

    /// Creates a cancellation error with the given message.
    pub fn cancelled(msg: impl Into<String>) -> Self {
        Self::Cancelled(msg.into())
    }

    /// Creates a decode error with the given message.
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    /// Prefixes the message with the operation that failed, keeping the variant.
    pub fn context(self, operation: &str) -> Self {
        let wrap = |msg: String| format!("{operation}: {msg}");
        match self {
            Self::Config(m) => Self::Config(wrap(m)),
            Self::Connection(m) => Self::Connection(wrap(m)),
            Self::Query(m) => Self::Query(wrap(m)),
            Self::Timeout(m) => Self::Timeout(wrap(m)),
            Self::Cancelled(m) => Self::Cancelled(wrap(m)),
            Self::Decode(m) => Self::Decode(wrap(m)),
        }
    }

    /// Returns the error category as a string for display purposes.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Config(_) => "Configuration Error",
            Self::Connection(_) => "Connection Error",
            Self::Query(_) => "Query Error",
            Self::Timeout(_) => "Timeout",
            Self::Cancelled(_) => "Cancelled",
            Self::Decode(_) => "Decode Error",
        }
    }

    /// Returns true for deadline and cancellation errors.
    pub fn is_interrupted(&self) -> bool {
        matches!(self, Self::Timeout(_) | Self::Cancelled(_))
    }
}

/// Result type alias using ReportError.
pub type Result<T> = std::result::Result<T, ReportError>;
