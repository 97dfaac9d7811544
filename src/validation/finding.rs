//! Validation findings

use std::fmt;

use serde::Serialize;

/// How serious a finding is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FindingLevel {
    Error,
    Warning,
}

impl fmt::Display for FindingLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FindingLevel::Error => write!(f, "ERROR"),
            FindingLevel::Warning => write!(f, "WARNING"),
        }
    }
}

/// One validation result
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Finding {
    pub level: FindingLevel,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column: Option<String>,
    /// Rule that produced the finding, e.g. `unique`
    pub rule: &'static str,
    pub message: String,
}

impl Finding {
    pub fn error(column: Option<&str>, rule: &'static str, message: impl Into<String>) -> Self {
        Self {
            level: FindingLevel::Error,
            column: column.map(str::to_string),
            rule,
            message: message.into(),
        }
    }

    pub fn warning(column: Option<&str>, rule: &'static str, message: impl Into<String>) -> Self {
        Self {
            level: FindingLevel::Warning,
            column: column.map(str::to_string),
            rule,
            message: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.level == FindingLevel::Error
    }
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.column {
            Some(column) => write!(f, "[{}] {} ({}): {}", self.level, column, self.rule, self.message),
            None => write!(f, "[{}] ({}): {}", self.level, self.rule, self.message),
        }
    }
}
