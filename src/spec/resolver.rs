//! Spec resolution
//!
//! Turns a merged document chain into a [`ResolvedSpec`]. Every field-level
//! problem is collected and raised as one `ADAM_SPEC_INVALID` error before
//! any derivation begins. Derivation descriptors that cannot be typed are
//! not resolution errors; they surface per column at build time.

use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use tracing::{info, warn};

use super::descriptor::DerivationDescriptor;
use super::errors::{SpecError, SpecIssue, SpecResult};
use super::loader::{SpecDocument, SpecLoader};
use super::merger::{merge_documents, ColumnEntry};
use super::types::{ColumnSpec, DataType, ResolvedSpec, ValidationRules, CORE_VALUES};
use crate::observability::Event;

/// Resolves document chains into typed specs
pub struct SpecResolver;

impl SpecResolver {
    /// Loads `path` with its parents and resolves the chain
    pub fn resolve_file(path: &Path) -> SpecResult<ResolvedSpec> {
        let chain = SpecLoader::load_chain(path)?;
        Self::resolve(&chain)
    }

    /// Merges and types documents given lowest precedence first
    pub fn resolve(documents: &[SpecDocument]) -> SpecResult<ResolvedSpec> {
        let merged = merge_documents(documents);
        let mut issues = merged.issues;
        let fields = &merged.fields;

        let domain = match fields.get("domain") {
            Some(Value::String(d)) if !d.trim().is_empty() => d.trim().to_uppercase(),
            Some(_) => {
                issues.push(SpecIssue::new("domain", "must be a non-empty string"));
                String::new()
            }
            None => {
                issues.push(SpecIssue::missing("domain"));
                String::new()
            }
        };
        let key = string_list(fields, "key", &mut issues);
        let primary = optional_string(fields, "primary", &mut issues).map(|p| p.to_uppercase());
        let source_dir = optional_string(fields, "sdtm_dir", &mut issues).map(PathBuf::from);
        let output_dir = optional_string(fields, "adam_dir", &mut issues).map(PathBuf::from);

        let columns: Vec<ColumnSpec> = merged
            .columns
            .iter()
            .filter_map(|entry| resolve_column(entry, &mut issues))
            .collect();

        for k in &key {
            if !merged.columns.iter().any(|c| &c.name == k) {
                issues.push(SpecIssue::new(
                    "key",
                    format!("key variable '{}' is not declared as a column", k),
                ));
            }
        }

        if !issues.is_empty() {
            return Err(SpecError::invalid(issues));
        }

        let spec = ResolvedSpec {
            domain,
            key,
            primary,
            source_dir,
            output_dir,
            columns,
        };
        warn_forward_references(&spec);

        info!(
            event = Event::SpecResolved.as_str(),
            domain = %spec.domain,
            documents = documents.len(),
            columns = spec.columns.len(),
            "spec resolved"
        );
        Ok(spec)
    }
}

fn resolve_column(entry: &ColumnEntry, issues: &mut Vec<SpecIssue>) -> Option<ColumnSpec> {
    let at = |field: &str| format!("columns[{}].{}", entry.name, field);
    let body = &entry.body;
    let before = issues.len();

    let data_type = match body.get("type") {
        Some(Value::String(t)) => {
            let parsed = DataType::parse(t);
            if parsed.is_none() {
                issues.push(SpecIssue::new(at("type"), format!("unknown data type '{}'", t)));
            }
            parsed
        }
        Some(_) => {
            issues.push(SpecIssue::new(at("type"), "must be a string"));
            None
        }
        None => {
            issues.push(SpecIssue::missing(at("type")));
            None
        }
    };

    let label = match body.get("label") {
        Some(Value::String(l)) => l.clone(),
        Some(Value::Null) | None => entry.name.clone(),
        Some(_) => {
            issues.push(SpecIssue::new(at("label"), "must be a string"));
            String::new()
        }
    };

    let core = match body.get("core") {
        Some(Value::String(c)) if CORE_VALUES.contains(&c.as_str()) => Some(c.clone()),
        Some(Value::String(c)) => {
            issues.push(SpecIssue::new(
                at("core"),
                format!("'{}' is not one of {}", c, CORE_VALUES.join(", ")),
            ));
            None
        }
        Some(Value::Null) | None => None,
        Some(_) => {
            issues.push(SpecIssue::new(at("core"), "must be a string"));
            None
        }
    };

    let raw_validation = body.get("validation").cloned().unwrap_or(Value::Null);
    let validation = if raw_validation.is_null() {
        None
    } else {
        match ValidationRules::from_raw(&raw_validation) {
            Ok(rules) => Some(rules),
            Err(problems) => {
                for (field, message) in problems {
                    let path = if field.is_empty() {
                        at("validation")
                    } else {
                        at(&format!("validation.{}", field))
                    };
                    issues.push(SpecIssue::new(path, message));
                }
                None
            }
        }
    };

    let raw_derivation = body.get("derivation").cloned().unwrap_or(Value::Null);
    let derivation = if raw_derivation.is_null() {
        DerivationDescriptor::Invalid {
            reason: "no derivation declared".to_string(),
        }
    } else {
        DerivationDescriptor::from_raw(&raw_derivation)
    };

    if issues.len() > before {
        return None;
    }
    Some(ColumnSpec {
        name: entry.name.clone(),
        data_type: data_type?,
        label,
        core,
        derivation,
        validation,
        raw_derivation,
        raw_validation,
    })
}

fn string_list(fields: &Map<String, Value>, field: &str, issues: &mut Vec<SpecIssue>) -> Vec<String> {
    match fields.get(field) {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::String(s)) => vec![s.clone()],
        Some(Value::Array(items)) => {
            let mut out = Vec::with_capacity(items.len());
            for (idx, item) in items.iter().enumerate() {
                match item.as_str() {
                    Some(s) if !s.is_empty() => out.push(s.to_string()),
                    _ => issues.push(SpecIssue::new(
                        format!("{}[{}]", field, idx),
                        "must be a non-empty string",
                    )),
                }
            }
            out
        }
        Some(_) => {
            issues.push(SpecIssue::new(field, "must be a list of strings"));
            Vec::new()
        }
    }
}

fn optional_string(
    fields: &Map<String, Value>,
    field: &str,
    issues: &mut Vec<SpecIssue>,
) -> Option<String> {
    match fields.get(field) {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s.clone()),
        Some(_) => {
            issues.push(SpecIssue::new(field, "must be a non-empty string"));
            None
        }
    }
}

/// Warns when a bare name matches an output column declared later.
///
/// The name may legitimately be a source column, so this never fails.
fn warn_forward_references(spec: &ResolvedSpec) {
    for (idx, column) in spec.columns.iter().enumerate() {
        for name in column.derivation.bare_references() {
            let later = spec.columns[idx + 1..].iter().any(|c| c.name == name);
            if later {
                warn!(
                    event = Event::SpecWarning.as_str(),
                    column = %column.name,
                    reference = name,
                    "reference to an output column declared later; it resolves against source tables"
                );
            }
        }
    }
}
