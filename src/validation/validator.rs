//! Dataset validator

use std::collections::HashSet;

use serde_json::Value;
use tracing::warn;

use super::finding::Finding;
use crate::observability::Event;
use crate::spec::{ColumnSpec, ResolvedSpec, ValidationRules};
use crate::table::value::{as_number, display_text, loose_eq};
use crate::table::{Column, Table};

/// Most offending values quoted in one message
const SAMPLE_LIMIT: usize = 5;

/// Validates a built table against its resolved spec
pub struct DataValidator<'a> {
    spec: &'a ResolvedSpec,
}

impl<'a> DataValidator<'a> {
    pub fn new(spec: &'a ResolvedSpec) -> Self {
        Self { spec }
    }

    /// Runs every dataset and column check
    pub fn validate(&self, table: &Table) -> Vec<Finding> {
        let mut findings = self.dataset_findings(table);
        for column in &self.spec.columns {
            match table.column(&column.name) {
                Some(values) => findings.extend(column_findings(column, values)),
                None => findings.push(Finding::error(
                    Some(&column.name),
                    "present",
                    format!("column {} not found in dataset", column.name),
                )),
            }
        }

        for finding in &findings {
            warn!(
                event = Event::ValidationFinding.as_str(),
                level = %finding.level,
                column = finding.column.as_deref().unwrap_or(""),
                rule = finding.rule,
                "{}",
                finding.message
            );
        }
        findings
    }

    fn dataset_findings(&self, table: &Table) -> Vec<Finding> {
        let mut findings = Vec::new();
        let keys = &self.spec.key;

        let mut all_present = true;
        for key in keys {
            if !table.has_column(key) {
                all_present = false;
                findings.push(Finding::error(
                    None,
                    "key",
                    format!("key variable {} not found in dataset", key),
                ));
            }
        }

        if all_present && !keys.is_empty() {
            let mut seen = HashSet::new();
            let duplicates = (0..table.height())
                .filter(|&row| {
                    let tuple: Vec<String> = keys
                        .iter()
                        .filter_map(|k| table.column(k))
                        .map(|c| c.values[row].to_string())
                        .collect();
                    !seen.insert(tuple)
                })
                .count();
            if duplicates > 0 {
                findings.push(Finding::error(
                    None,
                    "key",
                    format!(
                        "dataset has {} duplicate record(s) on key {}",
                        duplicates,
                        keys.join(", ")
                    ),
                ));
            }
        }

        if let Some(domain) = table.column("DOMAIN") {
            let distinct: HashSet<String> = domain
                .values
                .iter()
                .filter(|v| !v.is_null())
                .map(display_text)
                .collect();
            if distinct.len() == 1 && !distinct.contains(&self.spec.domain) {
                let actual = distinct.into_iter().next().unwrap_or_default();
                findings.push(Finding::warning(
                    Some("DOMAIN"),
                    "domain",
                    format!("expected {}, found {}", self.spec.domain, actual),
                ));
            }
        }
        findings
    }
}

fn column_findings(spec: &ColumnSpec, column: &Column) -> Vec<Finding> {
    let Some(rules) = &spec.validation else {
        return Vec::new();
    };
    let name = spec.name.as_str();
    let values = &column.values;
    let mut findings = Vec::new();

    if let Some(limit) = rules.maximum_missing_percentage {
        if !values.is_empty() {
            let missing = values.len() - column.non_null_count();
            let pct = missing as f64 * 100.0 / values.len() as f64;
            if pct > limit {
                findings.push(Finding::warning(
                    Some(name),
                    "maximum_missing_percentage",
                    format!("{:.1}% missing values, exceeds maximum of {}%", pct, limit),
                ));
            }
        }
    }

    if rules.unique {
        let distinct: HashSet<String> = values.iter().map(Value::to_string).collect();
        let duplicates = values.len() - distinct.len();
        if duplicates > 0 {
            findings.push(Finding::error(
                Some(name),
                "unique",
                format!("should be unique but has {} duplicate value(s)", duplicates),
            ));
        }
    }

    if let Some(allowed) = &rules.allowed_values {
        let invalid = distinct_offenders(values, |v| !allowed.iter().any(|a| loose_eq(v, a)));
        if !invalid.is_empty() {
            findings.push(Finding::warning(
                Some(name),
                "allowed_values",
                format!("values outside the allowed set: {}", invalid.join(", ")),
            ));
        }
    }

    if spec.data_type.is_numeric() {
        findings.extend(range_findings(name, rules, values));
    }

    if rules.min_length.is_some() || rules.max_length.is_some() || rules.pattern.is_some() {
        findings.extend(text_findings(name, rules, values));
    }
    findings
}

fn range_findings(name: &str, rules: &ValidationRules, values: &[Value]) -> Vec<Finding> {
    let numbers: Vec<f64> = values.iter().filter_map(as_number).collect();
    let mut findings = Vec::new();
    if let Some(min) = rules.min {
        let below = numbers.iter().filter(|&&n| n < min).count();
        if below > 0 {
            findings.push(Finding::warning(
                Some(name),
                "min",
                format!("{} value(s) below minimum {}", below, min),
            ));
        }
    }
    if let Some(max) = rules.max {
        let above = numbers.iter().filter(|&&n| n > max).count();
        if above > 0 {
            findings.push(Finding::warning(
                Some(name),
                "max",
                format!("{} value(s) above maximum {}", above, max),
            ));
        }
    }
    findings
}

fn text_findings(name: &str, rules: &ValidationRules, values: &[Value]) -> Vec<Finding> {
    let mut findings = Vec::new();
    let length_ok = |v: &Value| {
        let len = display_text(v).chars().count();
        rules.min_length.map_or(true, |min| len >= min) && rules.max_length.map_or(true, |max| len <= max)
    };
    let bad_length = distinct_offenders(values, |v| !length_ok(v));
    if !bad_length.is_empty() {
        findings.push(Finding::warning(
            Some(name),
            "length",
            format!("values with out-of-range length: {}", bad_length.join(", ")),
        ));
    }
    if let Some(pattern) = &rules.pattern {
        let mismatched = distinct_offenders(values, |v| !pattern.is_match(&display_text(v)));
        if !mismatched.is_empty() {
            findings.push(Finding::warning(
                Some(name),
                "pattern",
                format!("values not matching {}: {}", pattern.as_str(), mismatched.join(", ")),
            ));
        }
    }
    findings
}

/// Distinct non-null values failing `offends`, first-seen, capped
fn distinct_offenders(values: &[Value], offends: impl Fn(&Value) -> bool) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for value in values.iter().filter(|v| !v.is_null()) {
        if out.len() == SAMPLE_LIMIT {
            break;
        }
        let text = value.to_string();
        if offends(value) && !out.contains(&text) {
            out.push(text);
        }
    }
    out
}
