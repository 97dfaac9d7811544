//! Engine error types
//!
//! Error codes:
//! - ADAM_SPEC_* (from spec resolution)
//! - ADAM_DEPENDENCY_MISSING
//! - ADAM_KEYFRAME
//! - ADAM_TABLE_* (from table I/O)
//!
//! All engine errors are fatal. Column-level problems never reach this type;
//! they are recorded in the build report instead.

use thiserror::Error;

use crate::errors::Severity;
use crate::spec::SpecError;
use crate::table::TableError;

/// Result type for engine operations
pub type EngineResult<T> = Result<T, EngineError>;

/// Build-level failures
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Spec(#[from] SpecError),

    #[error("Required source table(s) unavailable: {}", tables.join(", "))]
    Dependency { tables: Vec<String> },

    #[error("Cannot build key frame: {0}")]
    KeyFrame(String),

    #[error(transparent)]
    Table(#[from] TableError),
}

impl EngineError {
    pub fn code(&self) -> &'static str {
        match self {
            EngineError::Spec(e) => e.code().code(),
            EngineError::Dependency { .. } => "ADAM_DEPENDENCY_MISSING",
            EngineError::KeyFrame(_) => "ADAM_KEYFRAME",
            EngineError::Table(e) => e.code(),
        }
    }

    pub fn severity(&self) -> Severity {
        Severity::Fatal
    }
}
