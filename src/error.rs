//! Structured error types for the task store and its document backends.

use serde::Serialize;
use thiserror::Error;

/// Error codes for programmatic error handling.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Validation errors
    MissingRequiredField,
    InvalidFieldValue,

    // Not found errors
    TaskNotFound,

    // State errors
    Uninitialized,
    DependencyCycle,

    // Internal errors
    StorageError,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::MissingRequiredField => "MISSING_REQUIRED_FIELD",
            ErrorCode::InvalidFieldValue => "INVALID_FIELD_VALUE",
            ErrorCode::TaskNotFound => "TASK_NOT_FOUND",
            ErrorCode::Uninitialized => "UNINITIALIZED",
            ErrorCode::DependencyCycle => "DEPENDENCY_CYCLE",
            ErrorCode::StorageError => "STORAGE_ERROR",
        }
    }
}

/// Failure reading or writing the persisted document.
#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("document I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed task document: {0}")]
    Json(#[from] serde_json::Error),

    #[error("document store rejected the write")]
    WriteRejected,
}

/// Errors surfaced by [`crate::store::TaskStore`] operations.
///
/// Lookups of unknown ids are not errors: they come back as `None`/`false`.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("task store is not bound to a document store")]
    Uninitialized,

    #[error("{field}: {reason}")]
    Validation {
        code: ErrorCode,
        field: String,
        reason: String,
    },

    #[error("parent task not found: {0}")]
    ParentNotFound(String),

    #[error("cannot move task {id} under {parent_id}: it is the task itself or one of its descendants")]
    InvalidMove { id: String, parent_id: String },

    #[error(transparent)]
    Document(#[from] DocumentError),
}

impl StoreError {
    pub fn missing_field(field: &str) -> Self {
        StoreError::Validation {
            code: ErrorCode::MissingRequiredField,
            field: field.to_string(),
            reason: format!("{} is required", field),
        }
    }

    pub fn invalid_value(field: &str, reason: impl Into<String>) -> Self {
        StoreError::Validation {
            code: ErrorCode::InvalidFieldValue,
            field: field.to_string(),
            reason: reason.into(),
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            StoreError::Uninitialized => ErrorCode::Uninitialized,
            StoreError::Validation { code, .. } => *code,
            StoreError::ParentNotFound(_) => ErrorCode::TaskNotFound,
            StoreError::InvalidMove { .. } => ErrorCode::DependencyCycle,
            StoreError::Document(_) => ErrorCode::StorageError,
        }
    }
}

/// Result type for store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes() {
        assert_eq!(
            StoreError::missing_field("title").code(),
            ErrorCode::MissingRequiredField
        );
        assert_eq!(
            StoreError::invalid_value("tasks", "duplicate id 3").code(),
            ErrorCode::InvalidFieldValue
        );
        assert_eq!(
            StoreError::invalid_value("title", "a non-blank title is required").code(),
            ErrorCode::InvalidFieldValue
        );
        assert_eq!(
            StoreError::ParentNotFound("9".into()).code(),
            ErrorCode::TaskNotFound
        );
        assert_eq!(
            StoreError::from(DocumentError::WriteRejected).code(),
            ErrorCode::StorageError
        );
    }

    #[test]
    fn test_code_serializes_screaming_snake() {
        let json = serde_json::to_string(&ErrorCode::TaskNotFound).unwrap();
        assert_eq!(json, format!("\"{}\"", ErrorCode::TaskNotFound.as_str()));
    }

    #[test]
    fn test_messages() {
        assert_eq!(
            StoreError::missing_field("title").to_string(),
            "title: title is required"
        );
        assert_eq!(
            StoreError::ParentNotFound("7".into()).to_string(),
            "parent task not found: 7"
        );
    }
}
