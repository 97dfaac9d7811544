//! Dependency analysis
//!
//! Finds every `TABLE.FIELD` reference a spec makes by scanning the text of
//! each column's derivation and validation blocks. The scan is structural:
//! any uppercase identifier pair counts, there is no list of known tables.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use serde_json::Value;
use tracing::info;

use super::types::ResolvedSpec;
use crate::observability::Event;

static DEPENDENCY_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b([A-Z][A-Z0-9_]{0,19})\.([A-Z][A-Z0-9_]{0,19})\b").expect("valid regex")
});

/// One referenced source field
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Dependency {
    /// Output column whose spec makes the reference
    pub column: String,
    pub table: String,
    pub field: String,
}

/// Scan result for a whole spec
#[derive(Debug, Clone, Default, Serialize)]
pub struct DependencyReport {
    /// Distinct references in first-seen order
    pub dependencies: Vec<Dependency>,
    /// Distinct referenced tables in first-seen order, excluding the domain
    pub tables: Vec<String>,
}

impl DependencyReport {
    pub fn fields_of(&self, table: &str) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.dependencies
            .iter()
            .filter(|d| d.table == table)
            .map(|d| d.field.as_str())
            .filter(|f| seen.insert(*f))
            .collect()
    }
}

/// Scans a resolved spec for source-table references
pub struct DependencyAnalyzer;

impl DependencyAnalyzer {
    pub fn analyze(spec: &ResolvedSpec) -> DependencyReport {
        let mut report = DependencyReport::default();
        let mut seen: HashSet<Dependency> = HashSet::new();
        let mut tables: HashSet<String> = HashSet::new();

        for column in &spec.columns {
            for block in [&column.raw_derivation, &column.raw_validation] {
                for (table, field) in scan_value(block) {
                    let dependency = Dependency {
                        column: column.name.clone(),
                        table,
                        field,
                    };
                    if table_is_source(&dependency.table, &spec.domain)
                        && tables.insert(dependency.table.clone())
                    {
                        report.tables.push(dependency.table.clone());
                    }
                    if seen.insert(dependency.clone()) {
                        report.dependencies.push(dependency);
                    }
                }
            }
        }

        if let Some(primary) = &spec.primary {
            if table_is_source(primary, &spec.domain) && tables.insert(primary.clone()) {
                report.tables.push(primary.clone());
            }
        }

        info!(
            event = Event::DependenciesResolved.as_str(),
            domain = %spec.domain,
            tables = ?report.tables,
            references = report.dependencies.len(),
            "dependencies resolved"
        );
        report
    }
}

fn table_is_source(table: &str, domain: &str) -> bool {
    table != domain
}

/// `(table, field)` pairs found in the text form of `value`
pub fn scan_value(value: &Value) -> Vec<(String, String)> {
    if value.is_null() {
        return Vec::new();
    }
    scan_text(&value.to_string())
}

pub fn scan_text(text: &str) -> Vec<(String, String)> {
    DEPENDENCY_PATTERN
        .captures_iter(text)
        .map(|caps| (caps[1].to_string(), caps[2].to_string()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::{SpecDocument, SpecResolver};
    use serde_json::json;

    fn spec(body: Value) -> ResolvedSpec {
        SpecResolver::resolve(&[SpecDocument::from_value(body)]).unwrap()
    }

    #[test]
    fn test_scan_text() {
        let found = scan_text(r#"{"source":"VS.VSSTRESN","filter":"VS.VSTESTCD == 'WEIGHT'"}"#);
        assert_eq!(
            found,
            vec![
                ("VS".to_string(), "VSSTRESN".to_string()),
                ("VS".to_string(), "VSTESTCD".to_string()),
            ]
        );
        assert!(scan_text("vs.vsstresn and 1.5").is_empty());
    }

    #[test]
    fn test_analyze_dedupes_and_excludes_domain() {
        let spec = spec(json!({
            "domain": "ADSL",
            "key": ["USUBJID"],
            "columns": [
                {"name": "USUBJID", "type": "str", "derivation": {"source": "DM.USUBJID"}},
                {"name": "WEIGHT", "type": "float", "derivation": {
                    "source": "VS.VSSTRESN",
                    "aggregation": {"function": "closest", "target": "DM.RFSTDTC"},
                    "filter": "VS.VSTESTCD == 'WEIGHT' and VS.VSTESTCD != 'X'"
                }},
                {"name": "FLAG", "type": "str", "derivation": {"source": "ADSL.WEIGHT"}},
            ]
        }));
        let report = DependencyAnalyzer::analyze(&spec);
        assert_eq!(report.tables, vec!["DM", "VS"]);
        let triples: Vec<(&str, &str, &str)> = report
            .dependencies
            .iter()
            .map(|d| (d.column.as_str(), d.table.as_str(), d.field.as_str()))
            .collect();
        assert_eq!(
            triples,
            vec![
                ("USUBJID", "DM", "USUBJID"),
                ("WEIGHT", "VS", "VSSTRESN"),
                ("WEIGHT", "DM", "RFSTDTC"),
                ("WEIGHT", "VS", "VSTESTCD"),
                ("FLAG", "ADSL", "WEIGHT"),
            ]
        );
        assert_eq!(report.fields_of("VS"), vec!["VSSTRESN", "VSTESTCD"]);
    }

    #[test]
    fn test_unknown_tables_still_reported() {
        let spec = spec(json!({
            "domain": "ADAE",
            "primary": "AE",
            "columns": [{"name": "X", "type": "str", "derivation": {"source": "ZZ9.FOO"}}]
        }));
        let report = DependencyAnalyzer::analyze(&spec);
        assert_eq!(report.tables, vec!["ZZ9", "AE"]);
    }
}
