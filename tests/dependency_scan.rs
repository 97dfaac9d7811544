//! Dependency Scan Tests
//!
//! Structural `TABLE.FIELD` scanning over resolved specs:
//! - Any uppercase identifier pair counts, no list of known tables
//! - Tables are ordered by first reference
//! - The output domain is never a source table
//! - The CLI prints the same result

use adamderive::cli::{run_command, Command};
use adamderive::spec::{scan_text, DependencyAnalyzer, SpecResolver};
use serde_json::Value;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_spec() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("adsl.yaml");
    fs::write(
        &path,
        r#"
domain: ADSL
key: [USUBJID]
primary: DM
columns:
  - name: USUBJID
    type: str
    derivation: {source: DM.USUBJID}
  - name: TRTSDT
    type: date
    derivation:
      source: EX.EXSTDTC
      aggregation: min
  - name: WEIGHTBL
    type: float
    derivation:
      source: VS.VSSTRESN
      filter: "VS.VSTESTCD == 'WEIGHT' and VS.VSDTC <= ADSL.TRTSDT"
      aggregation: {function: closest, target: ADSL.TRTSDT}
  - name: MHFL
    type: str
    derivation:
      condition:
        - {when: "XMH.MHTERM IS NOT NULL", then: "Y"}
        - {else: "N"}
    validation:
      allowed_values: [Y, N]
"#,
    )
    .unwrap();
    (tmp, path)
}

// =============================================================================
// Analyzer Tests
// =============================================================================

/// Tables appear in first-reference order, the domain excluded.
#[test]
fn test_tables_in_first_seen_order() {
    let (_tmp, path) = setup_spec();
    let spec = SpecResolver::resolve_file(&path).unwrap();
    let report = DependencyAnalyzer::analyze(&spec);
    assert_eq!(report.tables, vec!["DM", "EX", "VS", "XMH"]);
}

/// Fields are listed per table without repeats.
#[test]
fn test_fields_per_table() {
    let (_tmp, path) = setup_spec();
    let spec = SpecResolver::resolve_file(&path).unwrap();
    let report = DependencyAnalyzer::analyze(&spec);

    assert_eq!(report.fields_of("VS"), vec!["VSSTRESN", "VSTESTCD", "VSDTC"]);
    assert_eq!(report.fields_of("XMH"), vec!["MHTERM"]);

    let weight: Vec<(&str, &str)> = report
        .dependencies
        .iter()
        .filter(|d| d.column == "WEIGHTBL")
        .map(|d| (d.table.as_str(), d.field.as_str()))
        .collect();
    assert_eq!(
        weight,
        vec![
            ("VS", "VSSTRESN"),
            ("VS", "VSTESTCD"),
            ("VS", "VSDTC"),
            ("ADSL", "TRTSDT"),
        ]
    );
}

/// The scan is identical on every run.
#[test]
fn test_scan_is_deterministic() {
    let (_tmp, path) = setup_spec();
    let spec = SpecResolver::resolve_file(&path).unwrap();
    let first = DependencyAnalyzer::analyze(&spec);
    for _ in 0..10 {
        let again = DependencyAnalyzer::analyze(&spec);
        assert_eq!(first.tables, again.tables);
        assert_eq!(first.dependencies, again.dependencies);
    }
}

/// Lowercase names and decimals are not references.
#[test]
fn test_scan_text_ignores_non_references() {
    assert!(scan_text("dm.usubjid > 1.5").is_empty());
    assert_eq!(
        scan_text("SUPPDM.QVAL == 'Y'"),
        vec![("SUPPDM".to_string(), "QVAL".to_string())]
    );
}

// =============================================================================
// CLI Tests
// =============================================================================

/// `deps` prints tables with their fields.
#[test]
fn test_deps_command_output() {
    let (_tmp, path) = setup_spec();
    let mut out = Vec::new();
    run_command(Command::Deps { spec: path }, &mut out).unwrap();

    let printed: Value = serde_json::from_slice(&out).unwrap();
    assert_eq!(printed["domain"], "ADSL");
    let tables: Vec<&str> = printed["tables"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["table"].as_str().unwrap())
        .collect();
    assert_eq!(tables, vec!["DM", "EX", "VS", "XMH"]);
    assert_eq!(printed["tables"][0]["fields"], serde_json::json!(["USUBJID"]));
}

/// `resolve` on a broken spec returns a CLI error carrying the spec code.
#[test]
fn test_resolve_command_error() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("bad.yaml");
    fs::write(&path, "columns: []\n").unwrap();

    let err = run_command(Command::Resolve { spec: path }, &mut Vec::new()).unwrap_err();
    assert_eq!(err.code_str(), "ADAM_CLI_SPEC_ERROR");
    assert!(err.message().contains("ADAM_SPEC_INVALID"));
}
