//! Build Invariant Tests
//!
//! End-to-end builds through `DerivationEngine`:
//! - One output row per distinct key tuple, first row kept
//! - Constants fill the frame height
//! - `closest` picks the nearest date
//! - Broken filters degrade instead of failing
//! - A failing column is null-filled and the build completes
//! - Later cut rules win
//! - Output is written through a table sink

use adamderive::derive::FunctionArgs;
use adamderive::engine::{ColumnStatus, DerivationEngine};
use adamderive::filter::{FilterEvaluator, ParsedFilter};
use adamderive::spec::{ResolvedSpec, SpecDocument, SpecResolver};
use adamderive::table::{
    JsonDirectorySink, JsonDirectorySource, MemoryTableSource, SourceSet, Table,
};
use serde_json::{json, Value};
use std::fs;
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn dm() -> Table {
    Table::from_records(
        "DM",
        &[
            json!({"STUDYID": "ST1", "USUBJID": "S1", "AGE": 10, "SEX": "M", "ARMCD": "A", "RFSTDTC": "2024-01-10"}),
            json!({"STUDYID": "ST1", "USUBJID": "S1", "AGE": 99, "SEX": "M", "ARMCD": "A", "RFSTDTC": "2024-01-10"}),
            json!({"STUDYID": "ST1", "USUBJID": "S2", "AGE": 18, "SEX": "F", "ARMCD": "B", "RFSTDTC": "2024-02-01"}),
            json!({"STUDYID": "ST1", "USUBJID": "S3", "AGE": 64, "SEX": "X", "ARMCD": "SCRNFAIL", "RFSTDTC": null}),
            json!({"STUDYID": "ST1", "USUBJID": "S4", "AGE": 65, "SEX": "F", "ARMCD": "B", "RFSTDTC": "2024-03-01"}),
        ],
    )
    .unwrap()
}

fn vs() -> Table {
    Table::from_records(
        "VS",
        &[
            json!({"USUBJID": "S1", "VSTESTCD": "WEIGHT", "VSSTRESN": 60, "VSDTC": "2024-01-05"}),
            json!({"USUBJID": "S1", "VSTESTCD": "WEIGHT", "VSSTRESN": 61, "VSDTC": "2024-01-11"}),
            json!({"USUBJID": "S1", "VSTESTCD": "WEIGHT", "VSSTRESN": 62, "VSDTC": "2024-01-20"}),
            json!({"USUBJID": "S1", "VSTESTCD": "HEIGHT", "VSSTRESN": 150, "VSDTC": "2024-01-05"}),
            json!({"USUBJID": "S2", "VSTESTCD": "WEIGHT", "VSSTRESN": 80, "VSDTC": "2024-02-01T08:30"}),
            json!({"USUBJID": "S2", "VSTESTCD": "HEIGHT", "VSSTRESN": 180, "VSDTC": "2024-02-01"}),
        ],
    )
    .unwrap()
}

fn source() -> MemoryTableSource {
    MemoryTableSource::new().with_table(dm()).with_table(vs())
}

fn spec(columns: Value) -> ResolvedSpec {
    SpecResolver::resolve(&[SpecDocument::from_value(json!({
        "domain": "ADSL",
        "key": ["USUBJID"],
        "primary": "DM",
        "columns": columns
    }))])
    .unwrap()
}

fn usubjid() -> Value {
    json!({"name": "USUBJID", "type": "str", "derivation": {"source": "DM.USUBJID"}})
}

// =============================================================================
// Key Frame Tests
// =============================================================================

/// Duplicate key tuples collapse to the first row.
#[test]
fn test_one_row_per_key() {
    let spec = spec(json!([
        usubjid(),
        {"name": "AGE", "type": "int", "derivation": {"source": "DM.AGE"}}
    ]));
    let mut engine = DerivationEngine::new(Box::new(source()));
    let output = engine.build(&spec).unwrap();

    assert_eq!(output.table.height(), 4);
    assert_eq!(output.report.duplicate_keys, 1);
    assert_eq!(
        output.table.values("USUBJID").unwrap(),
        &[json!("S1"), json!("S2"), json!("S3"), json!("S4")]
    );
    assert_eq!(output.table.values("AGE").unwrap()[0], json!(10));
    assert!(matches!(
        output.report.outcome("USUBJID").unwrap().status,
        ColumnStatus::Key { non_null: 4 }
    ));
}

/// Keys come first, then the other columns in declared order.
#[test]
fn test_output_column_order() {
    let spec = spec(json!([
        {"name": "STUDYID", "type": "str", "derivation": {"source": "DM.STUDYID"}},
        usubjid(),
        {"name": "SEX", "type": "str", "derivation": {"source": "DM.SEX"}}
    ]));
    let mut engine = DerivationEngine::new(Box::new(source()));
    let output = engine.build(&spec).unwrap();
    assert_eq!(output.table.column_names(), vec!["USUBJID", "STUDYID", "SEX"]);
}

// =============================================================================
// Strategy Tests
// =============================================================================

/// A constant fills every row.
#[test]
fn test_constant_fills_height() {
    let dm = Table::from_records(
        "DM",
        &(1..=5)
            .map(|i| json!({"USUBJID": format!("S{}", i)}))
            .collect::<Vec<_>>(),
    )
    .unwrap();
    let spec = spec(json!([
        usubjid(),
        {"name": "SAFFL", "type": "str", "derivation": {"constant": "Y"}}
    ]));
    let mut engine = DerivationEngine::new(Box::new(MemoryTableSource::new().with_table(dm)));
    let output = engine.build(&spec).unwrap();
    assert_eq!(output.table.values("SAFFL").unwrap(), vec![json!("Y"); 5]);
}

/// `closest` takes the value nearest the target date; -5, +1 and +10 days pick +1.
#[test]
fn test_closest_selects_nearest_date() {
    let spec = spec(json!([
        usubjid(),
        {"name": "WEIGHTBL", "type": "float", "derivation": {
            "source": "VS.VSSTRESN",
            "filter": "VSTESTCD == 'WEIGHT'",
            "aggregation": {"function": "closest", "target": "DM.RFSTDTC", "date": "VSDTC"}
        }}
    ]));
    let mut engine = DerivationEngine::new(Box::new(source()));
    let output = engine.build(&spec).unwrap();
    assert_eq!(
        output.table.values("WEIGHTBL").unwrap(),
        &[json!(61), json!(80), Value::Null, Value::Null]
    );
}

/// Overlapping cut rules: the later rule wins.
#[test]
fn test_cut_rules_later_wins() {
    let spec = spec(json!([
        usubjid(),
        {"name": "AGEGR1", "type": "str", "derivation": {
            "source": "DM.AGE",
            "cut": {"<18": "Peds", ">=18 and <65": "Adult", ">=65": "Elderly"}
        }},
        {"name": "AGEGR2", "type": "str", "derivation": {
            "source": "DM.AGE",
            "cut": {">=0": "Any", ">=18": "Adult"}
        }}
    ]));
    let mut engine = DerivationEngine::new(Box::new(source()));
    let output = engine.build(&spec).unwrap();
    assert_eq!(
        output.table.values("AGEGR1").unwrap(),
        &[json!("Peds"), json!("Adult"), json!("Adult"), json!("Elderly")]
    );
    assert_eq!(
        output.table.values("AGEGR2").unwrap(),
        &[json!("Any"), json!("Adult"), json!("Adult"), json!("Adult")]
    );
}

/// First matching condition wins; unmatched rows take `else`.
#[test]
fn test_conditional_first_match() {
    let spec = spec(json!([
        usubjid(),
        {"name": "AGE", "type": "int", "derivation": {"source": "DM.AGE"}},
        {"name": "RANDFL", "type": "str", "derivation": {"condition": [
            {"when": "DM.ARMCD == 'SCRNFAIL'", "then": "N"},
            {"when": "AGE >= 18", "then": {"constant": "Y"}},
            {"when": "AGE >= 65", "then": "never"},
            {"else": "U"}
        ]}}
    ]));
    let mut engine = DerivationEngine::new(Box::new(source()));
    let output = engine.build(&spec).unwrap();
    assert_eq!(
        output.table.values("RANDFL").unwrap(),
        &[json!("U"), json!("Y"), json!("N"), json!("Y")]
    );
}

/// Mapping recodes values; the empty key mapped to null drops unknowns.
#[test]
fn test_source_mapping() {
    let spec = spec(json!([
        usubjid(),
        {"name": "SEXN", "type": "int", "derivation": {
            "source": "DM.SEX", "mapping": {"M": 1, "F": 2, "": null}
        }},
        {"name": "SEXL", "type": "str", "derivation": {
            "source": "DM.SEX", "mapping": {"M": "Male", "F": "Female"}
        }}
    ]));
    let mut engine = DerivationEngine::new(Box::new(source()));
    let output = engine.build(&spec).unwrap();
    assert_eq!(
        output.table.values("SEXN").unwrap(),
        &[json!(1), json!(2), Value::Null, json!(2)]
    );
    assert_eq!(
        output.table.values("SEXL").unwrap(),
        &[json!("Male"), json!("Female"), json!("X"), json!("Female")]
    );
}

/// The built-in BMI function over filtered source columns.
#[test]
fn test_bmi_function() {
    let spec = spec(json!([
        usubjid(),
        {"name": "HEIGHTBL", "type": "float", "derivation": {
            "source": "VS.VSSTRESN", "filter": "VSTESTCD == 'HEIGHT'"
        }},
        {"name": "WEIGHTBL", "type": "float", "derivation": {
            "source": "VS.VSSTRESN", "filter": "VSTESTCD == 'WEIGHT'",
            "aggregation": "first"
        }},
        {"name": "BMIBL", "type": "float", "derivation": {
            "function": "get_bmi", "height": "HEIGHTBL", "weight": "WEIGHTBL"
        }}
    ]));
    let mut engine = DerivationEngine::new(Box::new(source()));
    let output = engine.build(&spec).unwrap();
    assert_eq!(
        output.table.values("BMIBL").unwrap(),
        &[json!(26.7), json!(24.7), Value::Null, Value::Null]
    );
}

/// A column dropped by a child document never reaches the built table.
#[test]
fn test_dropped_column_absent_from_table() {
    let spec = SpecResolver::resolve(&[
        SpecDocument::from_value(json!({
            "domain": "ADSL",
            "key": ["USUBJID"],
            "primary": "DM",
            "columns": [
                usubjid(),
                {"name": "SEX", "type": "str", "derivation": {"source": "DM.SEX"}},
                {"name": "AGE", "type": "int", "derivation": {"source": "DM.AGE"}}
            ]
        })),
        SpecDocument::from_value(json!({"columns": [{"name": "SEX", "drop": true}]})),
    ])
    .unwrap();

    let mut engine = DerivationEngine::new(Box::new(source()));
    let output = engine.build(&spec).unwrap();
    assert!(output.table.values("SEX").is_err());
    assert!(output.report.outcome("SEX").is_none());
    assert_eq!(output.table.column_names(), vec!["USUBJID", "AGE"]);
}

/// A filter may compare against a column already derived on the frame.
#[test]
fn test_filter_against_frame_column() {
    let spec = spec(json!([
        usubjid(),
        {"name": "TRTSDT", "type": "date", "derivation": {"source": "DM.RFSTDTC"}},
        {"name": "WEIGHTBL", "type": "float", "derivation": {
            "source": "VS.VSSTRESN",
            "filter": "VSTESTCD == 'WEIGHT' and VS.VSDTC < ADSL.TRTSDT",
            "aggregation": "last"
        }}
    ]));
    let mut engine = DerivationEngine::new(Box::new(source()));
    let output = engine.build(&spec).unwrap();

    let outcome = output.report.outcome("WEIGHTBL").unwrap();
    assert!(outcome.warnings.iter().all(|w| !w.contains("not applied")));
    // S2 weighed on its start date, so nothing precedes it
    assert_eq!(
        output.table.values("WEIGHTBL").unwrap(),
        &[json!(60), Value::Null, Value::Null, Value::Null]
    );
}

// =============================================================================
// Failure Isolation Tests
// =============================================================================

/// A broken filter never raises and leaves the input unchanged.
#[test]
fn test_bogus_filter_passes_through() {
    let vs = vs();
    let sources = SourceSet::new(vec![&vs]);
    let keys = vec!["USUBJID".to_string()];
    let filtered = FilterEvaluator::new(&sources, &keys).apply(&vs, &ParsedFilter::parse("BOGUS ===="));
    assert!(filtered.degraded.is_some());
    assert_eq!(filtered.table.height(), vs.height());

    let spec = spec(json!([
        usubjid(),
        {"name": "VSVAL", "type": "float", "derivation": {
            "source": "VS.VSSTRESN", "filter": "BOGUS ===="
        }}
    ]));
    let mut engine = DerivationEngine::new(Box::new(source()));
    let output = engine.build(&spec).unwrap();
    let outcome = output.report.outcome("VSVAL").unwrap();
    assert!(!outcome.is_failed());
    assert!(outcome.warnings.iter().any(|w| w.contains("BOGUS ====")));
}

/// A failing function nulls its column only.
#[test]
fn test_failing_function_is_isolated() {
    let spec = spec(json!([
        usubjid(),
        {"name": "AGE", "type": "int", "derivation": {"source": "DM.AGE"}},
        {"name": "RISK", "type": "float", "derivation": {"function": "risk_score", "age": "AGE"}},
        {"name": "PANIC", "type": "float", "derivation": {"function": "panics"}},
        {"name": "UNKNOWN", "type": "float", "derivation": {"function": "not_registered"}},
        {"name": "SAFFL", "type": "str", "derivation": {"constant": "Y"}}
    ]));
    let mut engine = DerivationEngine::new(Box::new(source()));
    engine
        .functions_mut()
        .register("risk_score", |_: &FunctionArgs| -> Result<Vec<Value>, String> {
            Err("model unavailable".to_string())
        });
    engine
        .functions_mut()
        .register("panics", |_: &FunctionArgs| -> Result<Vec<Value>, String> {
            panic!("boom")
        });

    let output = engine.build(&spec).unwrap();
    for column in ["RISK", "PANIC", "UNKNOWN"] {
        assert!(output.table.values(column).unwrap().iter().all(Value::is_null));
    }
    assert_eq!(output.table.values("SAFFL").unwrap(), vec![json!("Y"); 4]);
    assert_eq!(output.report.failed_columns(), vec!["RISK", "PANIC", "UNKNOWN"]);

    let codes: Vec<&str> = output
        .report
        .columns
        .iter()
        .filter_map(|c| match &c.status {
            ColumnStatus::Failed { code, .. } => Some(code.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(
        codes,
        vec!["ADAM_DERIVATION_FAILED", "ADAM_DERIVATION_FAILED", "ADAM_CONFIGURATION"]
    );
}

/// A missing source column fails that column only.
#[test]
fn test_unknown_column_is_recoverable() {
    let spec = spec(json!([
        usubjid(),
        {"name": "RACE", "type": "str", "derivation": {"source": "DM.RACE"}},
        {"name": "BAD", "type": "str", "derivation": {"mapping": {"A": "B"}}},
        {"name": "SEX", "type": "str", "derivation": {"source": "SEX"}}
    ]));
    let mut engine = DerivationEngine::new(Box::new(source()));
    let output = engine.build(&spec).unwrap();
    assert_eq!(output.report.failed_columns(), vec!["RACE", "BAD"]);
    assert_eq!(output.table.values("SEX").unwrap()[1], json!("F"));
}

/// Validation findings land in the report without failing the build.
#[test]
fn test_validation_findings_reported() {
    let spec = spec(json!([
        usubjid(),
        {"name": "SEX", "type": "str", "derivation": {"source": "DM.SEX"},
         "validation": {"allowed_values": ["M", "F"]}},
        {"name": "AGE", "type": "int", "derivation": {"source": "DM.AGE"},
         "validation": {"min": 18}}
    ]));
    let mut engine = DerivationEngine::new(Box::new(source()));
    let output = engine.build(&spec).unwrap();
    let rules: Vec<&str> = output.report.findings.iter().map(|f| f.rule).collect();
    assert_eq!(rules, vec!["allowed_values", "min"]);
}

// =============================================================================
// Directory Source and Sink Tests
// =============================================================================

/// Tables load from and write to JSON directories; dropped columns never appear.
#[test]
fn test_json_directory_build() {
    let tmp = TempDir::new().unwrap();
    let sdtm = tmp.path().join("sdtm");
    fs::create_dir_all(&sdtm).unwrap();
    fs::write(
        sdtm.join("dm.json"),
        serde_json::to_string(&dm().to_records()).unwrap(),
    )
    .unwrap();

    let spec = SpecResolver::resolve(&[
        SpecDocument::from_value(json!({
            "domain": "ADSL",
            "key": ["USUBJID"],
            "columns": [
                usubjid(),
                {"name": "SEX", "type": "str", "derivation": {"source": "DM.SEX"}},
                {"name": "RACE", "type": "str", "derivation": {"source": "DM.RACE"}}
            ]
        })),
        SpecDocument::from_value(json!({"columns": [{"name": "RACE", "drop": true}]})),
    ])
    .unwrap();

    let mut engine = DerivationEngine::new(Box::new(JsonDirectorySource::new(&sdtm)));
    let output = engine.build(&spec).unwrap();
    assert!(output.report.failed_columns().is_empty());

    let path = output.write(&JsonDirectorySink::new(tmp.path().join("adam"))).unwrap();
    assert_eq!(path, tmp.path().join("adam").join("adsl.json"));

    let written: Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(written.as_array().unwrap().len(), 4);
    assert_eq!(written[0], json!({"USUBJID": "S1", "SEX": "M"}));
}

/// A required table that cannot be loaded stops the build.
#[test]
fn test_missing_source_table_is_fatal() {
    let tmp = TempDir::new().unwrap();
    let spec = spec(json!([usubjid()]));
    let mut engine = DerivationEngine::new(Box::new(JsonDirectorySource::new(tmp.path())));
    let err = engine.build(&spec).unwrap_err();
    assert_eq!(err.code(), "ADAM_DEPENDENCY_MISSING");
}
