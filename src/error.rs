//! Error types for the data exploration core.
//!
//! One `thiserror` hierarchy covers the whole upload/clean/filter/export
//! cycle. Errors are serializable so a frontend can display them directly.
//!
//! Coercion problems are deliberately *not* errors: a numeric column full of
//! text degrades results but does not stop processing. Those surface as
//! warnings inside [`crate::types::CleanReport`]. Likewise an empty filter
//! result is a valid outcome, not an error.

use serde::Serialize;
use serde::ser::SerializeStruct;
use thiserror::Error;

/// The main error type for the exploration pipeline.
#[derive(Error, Debug)]
pub enum ExplorerError {
    /// Upload payload could not be parsed into a table.
    #[error("Failed to parse upload '{filename}': {reason}")]
    Parse { filename: String, reason: String },

    /// Table shape does not match the reference template, or the table is empty.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Persistence layer failure.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Column was not found in the table.
    #[error("Column '{0}' not found in table")]
    ColumnNotFound(String),

    /// Export serialization failed.
    #[error("Failed to export table as {format}: {reason}")]
    ExportFailed { format: String, reason: String },

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
        source: Box<ExplorerError>,
    },
}

impl ExplorerError {
    /// Add context to an error.
    pub fn with_context(self, context: impl Into<String>) -> Self {
        ExplorerError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Get error code for frontend handling.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Parse { .. } => "PARSE_ERROR",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Storage(_) => "STORAGE_ERROR",
            Self::ColumnNotFound(_) => "COLUMN_NOT_FOUND",
            Self::ExportFailed { .. } => "EXPORT_FAILED",
            Self::Io(_) => "IO_ERROR",
            Self::Polars(_) => "POLARS_ERROR",
            Self::Json(_) => "JSON_ERROR",
            Self::WithContext { source, .. } => source.error_code(),
        }
    }

    /// Check if the caller can recover by fixing the upload (as opposed to
    /// an infrastructure failure).
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::Parse { .. } | Self::Validation(_) | Self::ColumnNotFound(_)
        )
    }
}

/// Serialize implementation for IPC/display compatibility.
///
/// Errors are serialized as a struct with `code` and `message` fields.
impl Serialize for ExplorerError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut state = serializer.serialize_struct("ExplorerError", 2)?;
        state.serialize_field("code", &self.error_code())?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}

/// Result type alias for pipeline operations.
pub type Result<T> = std::result::Result<T, ExplorerError>;

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
        self.map_err(|e| ExplorerError::Polars(e).with_context(context))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, std::io::Error> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| ExplorerError::Io(e).with_context(context))
    }
}
