//! Custom error types for the imputation benchmark.
//!
//! This module provides the error hierarchy using `thiserror`. Only a handful
//! of conditions are fatal; most configuration mismatches are recovered
//! locally with a warning and never reach this type.
//!
//! Errors are serializable so they can be embedded in the JSON report.

use serde::Serialize;
use serde::ser::SerializeStruct;
use thiserror::Error;

/// The main error type for the benchmark.
#[derive(Error, Debug)]
pub enum BenchError {
    /// Run was cancelled through a [`CancellationToken`](crate::pipeline::CancellationToken).
    #[error("Benchmark cancelled")]
    Cancelled,

    /// Invalid configuration provided.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A missingness mechanism name that is not recognised.
    #[error("Unknown missingness mechanism '{0}'")]
    UnknownMechanism(String),

    /// The table is too short to hold a single burst.
    #[error("Insufficient rows for burst length: table has {rows} rows, burst needs {burst_length}")]
    InsufficientRows { rows: usize, burst_length: usize },

    /// Ground truth and candidate tables differ in row count.
    #[error("Shape mismatch: expected {expected} rows, found {actual}")]
    ShapeMismatch { expected: usize, actual: usize },

    /// A strategy left gaps behind or produced non-finite values.
    #[error("Failed to impute missing values in column '{column}': {reason}")]
    ImputationFailed { column: String, reason: String },

    /// Internal error (a strategy broke its contract).
    #[error("Internal error: {0}")]
    Internal(String),

    /// IO error wrapper.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Polars error wrapper.
    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with context.
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<BenchError>,
    },
}

impl BenchError {
    /// Add context to an error.
    pub fn with_context(self, context: impl Into<String>) -> Self {
        BenchError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Stable error code, used in the JSON report.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Cancelled => "CANCELLED",
            Self::InvalidConfig(_) => "INVALID_CONFIG",
            Self::UnknownMechanism(_) => "UNKNOWN_MECHANISM",
            Self::InsufficientRows { .. } => "INSUFFICIENT_ROWS",
            Self::ShapeMismatch { .. } => "SHAPE_MISMATCH",
            Self::ImputationFailed { .. } => "IMPUTATION_FAILED",
            Self::Internal(_) => "INTERNAL_ERROR",
            Self::Io(_) => "IO_ERROR",
            Self::Polars(_) => "POLARS_ERROR",
            Self::Json(_) => "JSON_ERROR",
            Self::WithContext { source, .. } => source.error_code(),
        }
    }

    /// Check if this error represents a cancellation.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Check if this error only aborts the current scenario.
    ///
    /// The scenario matrix keeps running after these. The runner also keeps
    /// any other strategy failure within its scenario; cancellation and
    /// loading errors end the run.
    pub fn is_scenario_local(&self) -> bool {
        match self {
            Self::InsufficientRows { .. } | Self::ImputationFailed { .. } => true,
            Self::WithContext { source, .. } => source.is_scenario_local(),
            _ => false,
        }
    }

    /// Check if this error is recoverable (i.e., not a fundamental failure).
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::Cancelled | Self::InvalidConfig(_) | Self::UnknownMechanism(_)
        ) || self.is_scenario_local()
    }
}

impl From<crate::config::ConfigValidationError> for BenchError {
    fn from(err: crate::config::ConfigValidationError) -> Self {
        BenchError::InvalidConfig(err.to_string())
    }
}

/// Errors are serialized as a struct with `code` and `message` fields.
impl Serialize for BenchError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut state = serializer.serialize_struct("BenchError", 2)?;
        state.serialize_field("code", &self.error_code())?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}

/// Result type alias for benchmark operations.
pub type Result<T> = std::result::Result<T, BenchError>;

/// Extension trait for adding context to Results.
pub trait ResultExt<T> {
    /// Add context to an error result.
    fn context(self, context: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, polars::error::PolarsError> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| BenchError::Polars(e).with_context(context))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, std::io::Error> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| BenchError::Io(e).with_context(context))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code() {
        assert_eq!(BenchError::Cancelled.error_code(), "CANCELLED");
        assert_eq!(
            BenchError::InsufficientRows {
                rows: 3,
                burst_length: 5
            }
            .error_code(),
            "INSUFFICIENT_ROWS"
        );
    }

    #[test]
    fn test_insufficient_rows_message() {
        let err = BenchError::InsufficientRows {
            rows: 3,
            burst_length: 5,
        };
        assert!(err.to_string().contains("Insufficient rows for burst length"));
    }

    #[test]
    fn test_is_cancelled() {
        assert!(BenchError::Cancelled.is_cancelled());
        assert!(!BenchError::InvalidConfig("x".to_string()).is_cancelled());
    }

    #[test]
    fn test_scenario_local_survives_context() {
        let err = BenchError::InsufficientRows {
            rows: 2,
            burst_length: 5,
        }
        .with_context("Scenario 2");
        assert!(err.is_scenario_local());
        assert!(err.is_recoverable());
        assert!(BenchError::ImputationFailed {
            column: "wind".to_string(),
            reason: "NaN left".to_string()
        }
        .is_scenario_local());
        assert!(!BenchError::ShapeMismatch {
            expected: 1,
            actual: 2
        }
        .is_scenario_local());
    }

    #[test]
    fn test_error_serialization() {
        let error = BenchError::UnknownMechanism("zigzag".to_string());
        let json = serde_json::to_string(&error).unwrap();
        assert!(json.contains("UNKNOWN_MECHANISM"));
        assert!(json.contains("zigzag"));
    }

    #[test]
    fn test_with_context() {
        let error = BenchError::InvalidConfig("bad".to_string()).with_context("Loading config");
        assert!(error.to_string().contains("Loading config"));
        assert_eq!(error.error_code(), "INVALID_CONFIG");
    }
}
