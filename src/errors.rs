//! Shared error severity
//!
//! Every subsystem error exposes a stable `ADAM_*` code and one of these
//! severities:
//!
//! - FATAL: the build cannot start or continue
//! - RECOVERABLE: the affected column is null-filled and the build continues

use std::fmt;

use serde::Serialize;

/// Severity levels for engine errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    /// Column-scoped failure; the build continues
    Recoverable,
    /// Build-scoped failure
    Fatal,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Recoverable => write!(f, "RECOVERABLE"),
            Severity::Fatal => write!(f, "FATAL"),
        }
    }
}
