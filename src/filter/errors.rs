//! Filter error types
//!
//! Filter errors never abort a build. They are logged and the unfiltered
//! input is used instead.

use thiserror::Error;

/// Result type for filter parsing and evaluation
pub type FilterResult<T> = Result<T, FilterError>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum FilterError {
    #[error("Unexpected character '{found}' at position {position}")]
    Lex { position: usize, found: char },

    #[error("Unterminated string starting at position {0}")]
    UnterminatedString(usize),

    #[error("Syntax error: {0}")]
    Syntax(String),

    #[error("Unknown column '{0}'")]
    UnknownColumn(String),

    #[error("Unknown table '{0}'")]
    UnknownTable(String),

    #[error("Tables '{left}' and '{right}' share no key columns")]
    NoSharedKeys { left: String, right: String },
}

impl FilterError {
    /// Stable error code
    pub fn code(&self) -> &'static str {
        match self {
            FilterError::Lex { .. } | FilterError::UnterminatedString(_) => "ADAM_FILTER_LEX",
            FilterError::Syntax(_) => "ADAM_FILTER_SYNTAX",
            FilterError::UnknownColumn(_) => "ADAM_FILTER_UNKNOWN_COLUMN",
            FilterError::UnknownTable(_) => "ADAM_FILTER_UNKNOWN_TABLE",
            FilterError::NoSharedKeys { .. } => "ADAM_FILTER_NO_SHARED_KEYS",
        }
    }
}
