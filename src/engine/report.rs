//! Build report

use std::path::PathBuf;

use serde::Serialize;
use tracing::info;

use crate::observability::Event;
use crate::table::{Table, TableResult, TableSink};
use crate::validation::Finding;

/// What happened to one output column
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ColumnStatus {
    /// Taken from the key frame
    Key { non_null: usize },
    Derived { non_null: usize },
    /// Null-filled after a recoverable error
    Failed { code: String, message: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnOutcome {
    pub name: String,
    pub strategy: String,
    #[serde(flatten)]
    pub status: ColumnStatus,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl ColumnOutcome {
    pub fn is_failed(&self) -> bool {
        matches!(self.status, ColumnStatus::Failed { .. })
    }
}

/// Structured summary of one build
#[derive(Debug, Clone, Default, Serialize)]
pub struct BuildReport {
    pub domain: String,
    pub rows: usize,
    /// Table the key frame was taken from
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_source: Option<String>,
    pub duplicate_keys: usize,
    pub source_tables: Vec<String>,
    pub columns: Vec<ColumnOutcome>,
    pub findings: Vec<Finding>,
}

impl BuildReport {
    pub fn new(domain: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            ..Self::default()
        }
    }

    pub fn outcome(&self, column: &str) -> Option<&ColumnOutcome> {
        self.columns.iter().find(|c| c.name == column)
    }

    /// Columns derived without error, key columns excluded
    pub fn derived_count(&self) -> usize {
        self.columns
            .iter()
            .filter(|c| matches!(c.status, ColumnStatus::Derived { .. }))
            .count()
    }

    pub fn failed_count(&self) -> usize {
        self.columns.iter().filter(|c| c.is_failed()).count()
    }

    pub fn failed_columns(&self) -> Vec<&str> {
        self.columns
            .iter()
            .filter(|c| c.is_failed())
            .map(|c| c.name.as_str())
            .collect()
    }

    pub fn warning_count(&self) -> usize {
        self.columns.iter().map(|c| c.warnings.len()).sum()
    }
}

/// The built table and its report
#[derive(Debug, Clone)]
pub struct BuildOutput {
    pub table: Table,
    pub report: BuildReport,
}

impl BuildOutput {
    /// Persists the table through `sink`
    pub fn write(&self, sink: &dyn TableSink) -> TableResult<PathBuf> {
        let path = sink.write(&self.table)?;
        info!(
            event = Event::OutputWritten.as_str(),
            domain = %self.report.domain,
            path = %path.display(),
            rows = self.table.height(),
            "output written"
        );
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_counts_and_serialization() {
        let mut report = BuildReport::new("ADSL");
        report.columns.push(ColumnOutcome {
            name: "USUBJID".into(),
            strategy: "source".into(),
            status: ColumnStatus::Key { non_null: 2 },
            warnings: Vec::new(),
        });
        report.columns.push(ColumnOutcome {
            name: "BMIBL".into(),
            strategy: "function".into(),
            status: ColumnStatus::Failed {
                code: "ADAM_DERIVATION_FAILED".into(),
                message: "boom".into(),
            },
            warnings: Vec::new(),
        });
        report.columns.push(ColumnOutcome {
            name: "SEX".into(),
            strategy: "source".into(),
            status: ColumnStatus::Derived { non_null: 2 },
            warnings: vec!["positional".into()],
        });

        assert_eq!(report.derived_count(), 1);
        assert_eq!(report.failed_count(), 1);
        assert_eq!(report.failed_columns(), vec!["BMIBL"]);
        assert_eq!(report.warning_count(), 1);

        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(
            value["columns"][1],
            json!({
                "name": "BMIBL",
                "strategy": "function",
                "status": "failed",
                "code": "ADAM_DERIVATION_FAILED",
                "message": "boom"
            })
        );
        assert_eq!(value["columns"][2]["warnings"], json!(["positional"]));
    }
}
