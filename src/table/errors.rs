//! Table error types
//!
//! Error codes:
//! - ADAM_TABLE_NOT_FOUND
//! - ADAM_TABLE_COLUMN_NOT_FOUND
//! - ADAM_TABLE_LENGTH_MISMATCH
//! - ADAM_TABLE_INVALID_RECORD
//! - ADAM_TABLE_IO

use thiserror::Error;

/// Result type for table operations
pub type TableResult<T> = Result<T, TableError>;

/// Errors raised while loading, shaping or writing tables
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TableError {
    #[error("Table '{0}' not found")]
    NotFound(String),

    #[error("Column '{column}' not found in table '{table}'")]
    ColumnNotFound { table: String, column: String },

    #[error("Column '{column}' in table '{table}' has {actual} rows, expected {expected}")]
    LengthMismatch {
        table: String,
        column: String,
        expected: usize,
        actual: usize,
    },

    #[error("Invalid record in table '{table}': {reason}")]
    InvalidRecord { table: String, reason: String },

    #[error("I/O error on '{path}': {message}")]
    Io { path: String, message: String },
}

impl TableError {
    /// Stable error code
    pub fn code(&self) -> &'static str {
        match self {
            TableError::NotFound(_) => "ADAM_TABLE_NOT_FOUND",
            TableError::ColumnNotFound { .. } => "ADAM_TABLE_COLUMN_NOT_FOUND",
            TableError::LengthMismatch { .. } => "ADAM_TABLE_LENGTH_MISMATCH",
            TableError::InvalidRecord { .. } => "ADAM_TABLE_INVALID_RECORD",
            TableError::Io { .. } => "ADAM_TABLE_IO",
        }
    }

    pub(crate) fn io(path: impl Into<String>, message: impl ToString) -> Self {
        TableError::Io {
            path: path.into(),
            message: message.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(TableError::NotFound("AE".into()).code(), "ADAM_TABLE_NOT_FOUND");
        let err = TableError::ColumnNotFound {
            table: "DM".into(),
            column: "AGE".into(),
        };
        assert_eq!(err.code(), "ADAM_TABLE_COLUMN_NOT_FOUND");
        assert_eq!(err.to_string(), "Column 'AGE' not found in table 'DM'");
    }
}
