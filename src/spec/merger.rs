//! Spec document merging
//!
//! Documents merge pairwise, left to right, later documents winning:
//!
//! - maps deep-merge key by key
//! - scalars and lists other than `columns` are replaced wholesale
//! - `columns` entries are matched by `name`; matches deep-merge, new names
//!   append in the overriding document's order
//! - `drop: true` on any level removes the column for good
//!
//! Column merging is two pure stages: [`upsert_by_name`] builds an ordered
//! table where the drop flag is sticky, then [`filter_dropped`] removes the
//! dropped entries.

use serde_json::{Map, Value};

use super::errors::SpecIssue;
use super::loader::SpecDocument;

/// Merges `overlay` into `base`. Maps merge recursively; anything else is
/// replaced.
pub fn deep_merge(base: &mut Value, overlay: &Value) {
    match (base, overlay) {
        (Value::Object(base_map), Value::Object(overlay_map)) => {
            for (key, value) in overlay_map {
                match base_map.get_mut(key) {
                    Some(existing) => deep_merge(existing, value),
                    None => {
                        base_map.insert(key.clone(), value.clone());
                    }
                }
            }
        }
        (base, overlay) => *base = overlay.clone(),
    }
}

/// One column while documents are being merged
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnEntry {
    pub name: String,
    pub body: Map<String, Value>,
    pub dropped: bool,
}

/// Ordered column entries keyed by name
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColumnTable {
    entries: Vec<ColumnEntry>,
}

impl ColumnTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[ColumnEntry] {
        &self.entries
    }

    pub fn get(&self, name: &str) -> Option<&ColumnEntry> {
        self.entries.iter().find(|e| e.name == name)
    }

    fn get_mut(&mut self, name: &str) -> Option<&mut ColumnEntry> {
        self.entries.iter_mut().find(|e| e.name == name)
    }
}

/// Stage one: applies `overrides` (raw column entries) onto `base`.
///
/// Entries without a string `name` are skipped and reported against
/// `origin`.
pub fn upsert_by_name(
    mut base: ColumnTable,
    overrides: &[Value],
    origin: &str,
    issues: &mut Vec<SpecIssue>,
) -> ColumnTable {
    for (idx, raw) in overrides.iter().enumerate() {
        let Some(obj) = raw.as_object() else {
            issues.push(SpecIssue::new(
                format!("{}columns[{}]", origin, idx),
                "column entry must be a mapping",
            ));
            continue;
        };
        let Some(name) = obj.get("name").and_then(Value::as_str).filter(|n| !n.is_empty()) else {
            issues.push(SpecIssue::missing(format!("{}columns[{}].name", origin, idx)));
            continue;
        };

        let drop = obj.get("drop").and_then(Value::as_bool).unwrap_or(false);
        let mut body = obj.clone();
        body.remove("drop");

        match base.get_mut(name) {
            Some(entry) => {
                let mut merged = Value::Object(std::mem::take(&mut entry.body));
                deep_merge(&mut merged, &Value::Object(body));
                if let Value::Object(map) = merged {
                    entry.body = map;
                }
                entry.dropped |= drop;
            }
            None => base.entries.push(ColumnEntry {
                name: name.to_string(),
                body,
                dropped: drop,
            }),
        }
    }
    base
}

/// Stage two: removes dropped entries, keeping order
pub fn filter_dropped(table: ColumnTable) -> Vec<ColumnEntry> {
    table.entries.into_iter().filter(|e| !e.dropped).collect()
}

/// Result of merging a document chain
#[derive(Debug, Clone, PartialEq)]
pub struct MergedSpec {
    /// Every top-level field except `columns` and `parents`
    pub fields: Map<String, Value>,
    /// Surviving columns in resolved order
    pub columns: Vec<ColumnEntry>,
    /// Structural problems met while merging
    pub issues: Vec<SpecIssue>,
}

/// Merges documents lowest precedence first
pub fn merge_documents(documents: &[SpecDocument]) -> MergedSpec {
    let mut fields = Value::Object(Map::new());
    let mut columns = ColumnTable::new();
    let mut issues = Vec::new();

    for document in documents {
        let Some(body) = document.body.as_object() else {
            continue;
        };
        let origin = if document.path.as_os_str().is_empty() {
            String::new()
        } else {
            format!("{}: ", document.path.display())
        };

        let mut scalars = body.clone();
        scalars.remove("parents");
        match scalars.remove("columns") {
            Some(Value::Array(entries)) => {
                columns = upsert_by_name(columns, &entries, &origin, &mut issues);
            }
            Some(Value::Null) | None => {}
            Some(_) => issues.push(SpecIssue::new(
                format!("{}columns", origin),
                "must be a list of column entries",
            )),
        }
        deep_merge(&mut fields, &Value::Object(scalars));
    }

    let fields = match fields {
        Value::Object(map) => map,
        _ => Map::new(),
    };
    MergedSpec {
        fields,
        columns: filter_dropped(columns),
        issues,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(body: Value) -> SpecDocument {
        SpecDocument::from_value(body)
    }

    fn names(merged: &MergedSpec) -> Vec<&str> {
        merged.columns.iter().map(|c| c.name.as_str()).collect()
    }

    #[test]
    fn test_deep_merge_maps_and_replaces_lists() {
        let mut base = json!({"a": {"x": 1, "y": [1, 2]}, "b": 1});
        deep_merge(&mut base, &json!({"a": {"y": [3], "z": true}, "b": {"c": 2}}));
        assert_eq!(base, json!({"a": {"x": 1, "y": [3], "z": true}, "b": {"c": 2}}));
    }

    #[test]
    fn test_columns_merge_by_name_and_append() {
        let merged = merge_documents(&[
            doc(json!({"domain": "ADSL", "columns": [
                {"name": "USUBJID", "type": "str"},
                {"name": "AGE", "type": "int", "derivation": {"source": "DM.AGE"}}
            ]})),
            doc(json!({"columns": [
                {"name": "SEX", "type": "str"},
                {"name": "AGE", "derivation": {"filter": "DM.AGE > 0"}}
            ]})),
        ]);
        assert_eq!(names(&merged), vec!["USUBJID", "AGE", "SEX"]);
        let age = &merged.columns[1].body;
        assert_eq!(age["type"], json!("int"));
        assert_eq!(
            age["derivation"],
            json!({"source": "DM.AGE", "filter": "DM.AGE > 0"})
        );
    }

    #[test]
    fn test_drop_is_sticky() {
        let merged = merge_documents(&[
            doc(json!({"columns": [{"name": "A", "type": "str"}, {"name": "B", "type": "str"}]})),
            doc(json!({"columns": [{"name": "A", "drop": true}]})),
            doc(json!({"columns": [{"name": "A", "type": "int", "drop": false}]})),
        ]);
        assert_eq!(names(&merged), vec!["B"]);
    }

    #[test]
    fn test_drop_of_unknown_column_blocks_later_definition() {
        let merged = merge_documents(&[
            doc(json!({"columns": [{"name": "X", "drop": true}]})),
            doc(json!({"columns": [{"name": "X", "type": "str"}]})),
        ]);
        assert!(merged.columns.is_empty());
    }

    #[test]
    fn test_top_level_fields_later_wins() {
        let merged = merge_documents(&[
            doc(json!({"domain": "ADSL", "key": ["USUBJID"], "parents": ["x.yaml"]})),
            doc(json!({"key": ["STUDYID", "USUBJID"]})),
        ]);
        assert_eq!(merged.fields["domain"], json!("ADSL"));
        assert_eq!(merged.fields["key"], json!(["STUDYID", "USUBJID"]));
        assert!(!merged.fields.contains_key("parents"));
    }

    #[test]
    fn test_nameless_entries_reported() {
        let merged = merge_documents(&[doc(json!({"columns": [{"type": "str"}, "AGE"]}))]);
        assert!(merged.columns.is_empty());
        assert_eq!(merged.issues.len(), 2);
        assert_eq!(merged.issues[0].path, "columns[0].name");
    }

    #[test]
    fn test_merge_is_deterministic() {
        let docs = vec![
            doc(json!({"columns": [{"name": "A", "type": "str"}, {"name": "B", "type": "int"}]})),
            doc(json!({"columns": [{"name": "C", "type": "str"}, {"name": "A", "label": "Alpha"}]})),
        ];
        assert_eq!(merge_documents(&docs), merge_documents(&docs));
    }
}
