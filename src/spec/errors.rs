//! Spec error types
//!
//! Error codes:
//! - ADAM_SPEC_INVALID (FATAL)
//! - ADAM_SPEC_READ (FATAL)
//! - ADAM_SPEC_PARENT_MISSING (FATAL)
//! - ADAM_SPEC_CYCLE (FATAL)
//!
//! Field-level problems found while resolving are collected into one
//! `ADAM_SPEC_INVALID` error so every issue is reported at once.

use std::fmt;
use std::path::Path;

use crate::errors::Severity;

/// Spec-specific error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpecErrorCode {
    /// Merged spec has field-level problems
    AdamSpecInvalid,
    /// Document could not be read or parsed
    AdamSpecRead,
    /// A declared parent document does not exist
    AdamSpecParentMissing,
    /// Parent chain loops back on itself
    AdamSpecCycle,
}

impl SpecErrorCode {
    /// Returns the string code
    pub fn code(&self) -> &'static str {
        match self {
            SpecErrorCode::AdamSpecInvalid => "ADAM_SPEC_INVALID",
            SpecErrorCode::AdamSpecRead => "ADAM_SPEC_READ",
            SpecErrorCode::AdamSpecParentMissing => "ADAM_SPEC_PARENT_MISSING",
            SpecErrorCode::AdamSpecCycle => "ADAM_SPEC_CYCLE",
        }
    }

    /// All spec errors stop the build before derivation begins
    pub fn severity(&self) -> Severity {
        Severity::Fatal
    }
}

impl fmt::Display for SpecErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// One field-level problem
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecIssue {
    /// Location, e.g. `columns[AGE].type`
    pub path: String,
    pub message: String,
}

impl SpecIssue {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn missing(path: impl Into<String>) -> Self {
        Self::new(path, "required field is missing")
    }
}

impl fmt::Display for SpecIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

/// Spec error with full context
#[derive(Debug)]
pub struct SpecError {
    code: SpecErrorCode,
    message: String,
    issues: Vec<SpecIssue>,
}

impl SpecError {
    /// Aggregated field-level problems
    pub fn invalid(issues: Vec<SpecIssue>) -> Self {
        Self {
            code: SpecErrorCode::AdamSpecInvalid,
            message: format!("Spec has {} invalid field(s)", issues.len()),
            issues,
        }
    }

    /// Unreadable or unparsable document
    pub fn read_failed(path: &Path, reason: impl fmt::Display) -> Self {
        Self {
            code: SpecErrorCode::AdamSpecRead,
            message: format!("Failed to read spec '{}': {}", path.display(), reason),
            issues: Vec::new(),
        }
    }

    /// Declared parent does not exist
    pub fn parent_missing(child: &Path, parent: &Path) -> Self {
        Self {
            code: SpecErrorCode::AdamSpecParentMissing,
            message: format!(
                "Parent spec '{}' declared by '{}' not found",
                parent.display(),
                child.display()
            ),
            issues: Vec::new(),
        }
    }

    /// Parent chain loops
    pub fn cycle(path: &Path) -> Self {
        Self {
            code: SpecErrorCode::AdamSpecCycle,
            message: format!("Spec '{}' is its own ancestor", path.display()),
            issues: Vec::new(),
        }
    }

    pub fn code(&self) -> SpecErrorCode {
        self.code
    }

    pub fn severity(&self) -> Severity {
        self.code.severity()
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn issues(&self) -> &[SpecIssue] {
        &self.issues
    }

    pub fn is_fatal(&self) -> bool {
        self.severity() == Severity::Fatal
    }
}

impl fmt::Display for SpecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.code.severity(), self.code.code(), self.message)?;
        for issue in &self.issues {
            write!(f, "\n  - {}", issue)?;
        }
        Ok(())
    }
}

impl std::error::Error for SpecError {}

/// Result type for spec operations
pub type SpecResult<T> = Result<T, SpecError>;
