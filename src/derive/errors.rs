//! Derivation error types
//!
//! Error codes:
//! - ADAM_CONFIGURATION
//! - ADAM_HEIGHT_UNKNOWN
//! - ADAM_COLUMN_NOT_FOUND
//! - ADAM_DERIVATION_FAILED
//!
//! Every derivation error is recoverable: the engine null-fills the column,
//! records the error in the build report and moves on.

use thiserror::Error;

use crate::errors::Severity;

/// Result type for derivation operations
pub type DeriveResult<T> = Result<T, DeriveError>;

/// Per-column derivation failures
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DeriveError {
    #[error("Column '{column}' is misconfigured: {reason}")]
    Configuration { column: String, reason: String },

    #[error("Cannot size column '{column}': frame height unknown and no primary table loaded")]
    HeightUnknown { column: String },

    #[error("Column '{reference}' referenced by '{column}' not found")]
    ColumnNotFound { column: String, reference: String },

    #[error("Derivation of '{column}' failed: {reason}")]
    Derivation { column: String, reason: String },
}

impl DeriveError {
    pub fn code(&self) -> &'static str {
        match self {
            DeriveError::Configuration { .. } => "ADAM_CONFIGURATION",
            DeriveError::HeightUnknown { .. } => "ADAM_HEIGHT_UNKNOWN",
            DeriveError::ColumnNotFound { .. } => "ADAM_COLUMN_NOT_FOUND",
            DeriveError::Derivation { .. } => "ADAM_DERIVATION_FAILED",
        }
    }

    pub fn severity(&self) -> Severity {
        Severity::Recoverable
    }

    pub(crate) fn configuration(column: &str, reason: impl Into<String>) -> Self {
        DeriveError::Configuration {
            column: column.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn failed(column: &str, reason: impl ToString) -> Self {
        DeriveError::Derivation {
            column: column.to_string(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn not_found(column: &str, reference: impl ToString) -> Self {
        DeriveError::ColumnNotFound {
            column: column.to_string(),
            reference: reference.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_and_severity() {
        let err = DeriveError::configuration("TRTA", "closest requires a target");
        assert_eq!(err.code(), "ADAM_CONFIGURATION");
        assert_eq!(err.severity(), Severity::Recoverable);
        assert_eq!(
            err.to_string(),
            "Column 'TRTA' is misconfigured: closest requires a target"
        );
        assert_eq!(
            DeriveError::not_found("AGE", "DM.AGE").code(),
            "ADAM_COLUMN_NOT_FOUND"
        );
        assert_eq!(
            DeriveError::HeightUnknown { column: "X".into() }.code(),
            "ADAM_HEIGHT_UNKNOWN"
        );
    }
}
