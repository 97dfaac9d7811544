//! Column references (`TABLE.COLUMN` or bare `COLUMN`)

use std::fmt;

use serde::{Serialize, Serializer};

/// Reference to a column, optionally qualified by its table.
///
/// Table qualifiers are normalised to uppercase; column names are kept as
/// written.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ColumnRef {
    pub table: Option<String>,
    pub column: String,
}

impl ColumnRef {
    /// Bare reference
    pub fn bare(column: impl Into<String>) -> Self {
        Self {
            table: None,
            column: column.into(),
        }
    }

    /// Qualified reference
    pub fn qualified(table: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            table: Some(table.into().to_uppercase()),
            column: column.into(),
        }
    }

    /// Parses `TABLE.COLUMN` or `COLUMN`.
    ///
    /// Only the first dot separates the qualifier. Empty halves make the
    /// whole text a bare name.
    pub fn parse(text: &str) -> Self {
        let text = text.trim();
        match text.split_once('.') {
            Some((table, column)) if !table.is_empty() && !column.is_empty() => {
                Self::qualified(table, column)
            }
            _ => Self::bare(text),
        }
    }

    pub fn is_qualified(&self) -> bool {
        self.table.is_some()
    }

    /// True when the qualifier names `table` (case-insensitive)
    pub fn targets(&self, table: &str) -> bool {
        self.table
            .as_deref()
            .map_or(false, |t| t.eq_ignore_ascii_case(table))
    }
}

impl fmt::Display for ColumnRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.table {
            Some(table) => write!(f, "{}.{}", table, self.column),
            None => write!(f, "{}", self.column),
        }
    }
}

impl Serialize for ColumnRef {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
