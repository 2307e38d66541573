//! Error handling for the benchmark history store
//!
//! This module provides the error taxonomy for every store operation:
//! run validation, suite lookup, persistence and configuration.

use std::io;

use thiserror::Error;

/// The main error type for the history store
#[derive(Error, Debug)]
pub enum HistoryError {
    /// A run was rejected before anything was written
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Query against a suite that has never been written
    #[error("Suite not found: {suite}")]
    NotFound { suite: String },

    /// The stored suite changed underneath an unserialized writer
    #[error("Concurrent modification detected for suite: {suite}")]
    ConcurrencyConflict { suite: String },

    /// Malformed suite identifier
    #[error("Invalid suite id '{id}': {reason}")]
    InvalidSuiteId { id: String, reason: String },

    /// Storage backend errors
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Configuration related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Metrics errors
    #[error("Metrics error: {0}")]
    Metrics(String),
}

/// Reasons a run is refused by `append_run`
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("run has no benches")]
    EmptyBenches,

    #[error("commit id is empty")]
    EmptyCommitId,

    #[error("run date must be a positive epoch millisecond value")]
    NonPositiveDate,

    #[error("bench name '{name}' appears more than once in the run")]
    DuplicateBenchName { name: String },

    #[error("bench at index {index} has an empty name")]
    EmptyBenchName { index: usize },

    #[error("bench '{name}' has a non-finite value")]
    NonFiniteValue { name: String },

    #[error("run has {count} benches, limit is {limit}")]
    TooManyBenches { count: usize, limit: usize },
}

/// Storage backend errors
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Failed to read {path}: {reason}")]
    ReadFailed { path: String, reason: String },

    #[error("Failed to write {path}: {reason}")]
    WriteFailed { path: String, reason: String },

    #[error("Invalid suite file format in {path}: {reason}")]
    InvalidFormat { path: String, reason: String },

    #[error("Directory creation failed: {path}")]
    DirectoryCreationFailed { path: String },
}

/// Configuration related errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {path}")]
    FileNotFound { path: String },

    #[error("Invalid configuration value: {field} = {value}")]
    InvalidValue { field: String, value: String },

    #[error("Configuration validation failed: {reason}")]
    ValidationFailed { reason: String },

    #[error("Configuration file permission denied: {path}")]
    PermissionDenied { path: String },

    #[error("Configuration parsing error: {reason}")]
    ParseError { reason: String },
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, HistoryError>;

/// A specialized result type for run validation
pub type ValidationResult<T> = std::result::Result<T, ValidationError>;

/// A specialized result type for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

impl HistoryError {
    pub fn not_found(suite: impl ToString) -> Self {
        HistoryError::NotFound { suite: suite.to_string() }
    }

    /// Check if retrying the same call may succeed
    pub fn is_recoverable(&self) -> bool {
        match self {
            HistoryError::ConcurrencyConflict { .. } => true,
            HistoryError::Io(io_error) => {
                matches!(io_error.kind(), io::ErrorKind::Interrupted | io::ErrorKind::WouldBlock)
            }
            _ => false,
        }
    }

    /// Get the error category for logging and metrics
    pub fn category(&self) -> &'static str {
        match self {
            HistoryError::Validation(_) => "validation",
            HistoryError::NotFound { .. } => "not_found",
            HistoryError::ConcurrencyConflict { .. } => "concurrency",
            HistoryError::InvalidSuiteId { .. } => "suite_id",
            HistoryError::Storage(_) => "storage",
            HistoryError::Config(_) => "config",
            HistoryError::Io(_) => "io",
            HistoryError::Serialization(_) => "serialization",
            HistoryError::Metrics(_) => "metrics",
        }
    }
}

impl From<prometheus::Error> for HistoryError {
    fn from(err: prometheus::Error) -> Self {
        HistoryError::Metrics(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_categorization() {
        let validation = HistoryError::from(ValidationError::EmptyBenches);
        assert_eq!(validation.category(), "validation");
        assert!(!validation.is_recoverable());

        let conflict = HistoryError::ConcurrencyConflict { suite: "premium/latency/read".to_string() };
        assert_eq!(conflict.category(), "concurrency");
        assert!(conflict.is_recoverable());

        let missing = HistoryError::not_found("standard/bandwidth/create");
        assert_eq!(missing.category(), "not_found");
        assert_eq!(missing.to_string(), "Suite not found: standard/bandwidth/create");
    }

    #[test]
    fn test_io_recoverability() {
        let interrupted = HistoryError::from(io::Error::new(io::ErrorKind::Interrupted, "signal"));
        assert!(interrupted.is_recoverable());

        let denied = HistoryError::from(io::Error::new(io::ErrorKind::PermissionDenied, "nope"));
        assert!(!denied.is_recoverable());
    }

    #[test]
    fn test_validation_messages() {
        let err = ValidationError::DuplicateBenchName { name: "random_read".to_string() };
        assert_eq!(err.to_string(), "bench name 'random_read' appears more than once in the run");
    }
}
