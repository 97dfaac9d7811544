//! Key frame construction
//!
//! The key frame holds one row per distinct identity-key tuple. Its rows come
//! from a single source table, chosen in this order:
//!
//! 1. the table named by the first key column's `TABLE.COLUMN` source
//! 2. the declared primary table
//! 3. the first loaded table carrying every key column
//!
//! Duplicate tuples collapse to their first row and are counted.

use std::collections::HashSet;

use tracing::{info, warn};

use super::errors::{EngineError, EngineResult};
use crate::observability::Event;
use crate::spec::{DerivationDescriptor, ResolvedSpec};
use crate::table::{Column, SourceSet, Table};

/// Deduplicated key columns and where they came from
#[derive(Debug, Clone)]
pub struct KeyFrame {
    pub table: Table,
    pub source: String,
    /// Rows discarded as repeats of an earlier key tuple
    pub duplicates: usize,
}

pub struct KeyFrameBuilder<'a> {
    spec: &'a ResolvedSpec,
    sources: &'a SourceSet<'a>,
}

impl<'a> KeyFrameBuilder<'a> {
    pub fn new(spec: &'a ResolvedSpec, sources: &'a SourceSet<'a>) -> Self {
        Self { spec, sources }
    }

    /// Builds the key frame; `None` when the domain declares no keys
    pub fn build(&self) -> EngineResult<Option<KeyFrame>> {
        if self.spec.key.is_empty() {
            return Ok(None);
        }
        let fields = self.key_fields();
        let source = self.source_table(&fields)?;

        let mut columns = Vec::with_capacity(fields.len());
        for (key, (_, field)) in self.spec.key.iter().zip(&fields) {
            let values = source.values(field).map_err(|_| {
                EngineError::KeyFrame(format!(
                    "key {} has no column {} in {}",
                    key,
                    field,
                    source.name()
                ))
            })?;
            columns.push(Column::new(key.clone(), values.to_vec()));
        }
        let keys = Table::from_columns(self.spec.domain.clone(), columns)?;

        let mut seen = HashSet::new();
        let rows: Vec<usize> = (0..keys.height())
            .filter(|&row| {
                let tuple: Vec<String> = keys
                    .columns()
                    .iter()
                    .map(|c| c.values[row].to_string())
                    .collect();
                seen.insert(tuple)
            })
            .collect();
        let duplicates = keys.height() - rows.len();
        let table = keys.take_rows(&rows);

        if duplicates > 0 {
            warn!(
                event = Event::KeyFrameBuilt.as_str(),
                source = source.name(),
                duplicates,
                kept = table.height(),
                "duplicate key combinations discarded, first row kept"
            );
        }
        info!(
            event = Event::KeyFrameBuilt.as_str(),
            source = source.name(),
            keys = ?self.spec.key,
            rows = table.height(),
            "key frame built"
        );

        Ok(Some(KeyFrame {
            table,
            source: source.name().to_string(),
            duplicates,
        }))
    }

    /// Source table and field for every key, from its `TABLE.COLUMN` source
    fn key_fields(&self) -> Vec<(Option<String>, String)> {
        self.spec
            .key
            .iter()
            .map(|key| match self.spec.column(key).map(|c| &c.derivation) {
                Some(DerivationDescriptor::SourceRef { source, .. }) => {
                    (source.table.clone(), source.column.clone())
                }
                _ => (None, key.clone()),
            })
            .collect()
    }

    fn source_table(&self, fields: &[(Option<String>, String)]) -> EngineResult<&'a Table> {
        let carries_all = |t: &&Table| fields.iter().all(|(_, f)| t.has_column(f));

        let declared = fields
            .iter()
            .find_map(|(table, _)| table.as_deref())
            .filter(|t| !t.eq_ignore_ascii_case(&self.spec.domain));
        if let Some(name) = declared {
            return self.sources.get(name).ok_or_else(|| {
                EngineError::KeyFrame(format!("key source table {} is not loaded", name))
            });
        }

        self.spec
            .primary
            .as_deref()
            .and_then(|p| self.sources.get(p))
            .filter(carries_all)
            .or_else(|| self.sources.iter().find(carries_all))
            .ok_or_else(|| {
                EngineError::KeyFrame(format!(
                    "no loaded table carries key columns {}",
                    self.spec.key.join(", ")
                ))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::{SpecDocument, SpecResolver};
    use serde_json::{json, Value};

    fn spec(body: Value) -> ResolvedSpec {
        SpecResolver::resolve(&[SpecDocument::from_value(body)]).unwrap()
    }

    #[test]
    fn test_duplicates_collapse_to_first() {
        let spec = spec(json!({
            "domain": "ADSL",
            "key": ["USUBJID"],
            "columns": [{"name": "USUBJID", "type": "str", "derivation": {"source": "DM.USUBJID"}}]
        }));
        let dm = Table::from_records(
            "DM",
            &[
                json!({"USUBJID": "S1", "AGE": 30}),
                json!({"USUBJID": "S1", "AGE": 31}),
                json!({"USUBJID": "S2", "AGE": 40}),
            ],
        )
        .unwrap();
        let sources = SourceSet::new(vec![&dm]);
        let frame = KeyFrameBuilder::new(&spec, &sources).build().unwrap().unwrap();
        assert_eq!(frame.table.height(), 2);
        assert_eq!(frame.duplicates, 1);
        assert_eq!(frame.source, "DM");
        assert_eq!(frame.table.values("USUBJID").unwrap(), &[json!("S1"), json!("S2")]);
    }

    #[test]
    fn test_key_renamed_from_source_field() {
        let spec = spec(json!({
            "domain": "ADAE",
            "key": ["USUBJID", "AESEQ"],
            "columns": [
                {"name": "USUBJID", "type": "str", "derivation": {"source": "AE.USUBJID"}},
                {"name": "AESEQ", "type": "int", "derivation": {"source": "AE.SEQ"}}
            ]
        }));
        let ae = Table::from_records("AE", &[json!({"USUBJID": "S1", "SEQ": 1})]).unwrap();
        let sources = SourceSet::new(vec![&ae]);
        let frame = KeyFrameBuilder::new(&spec, &sources).build().unwrap().unwrap();
        assert_eq!(frame.table.column_names(), vec!["USUBJID", "AESEQ"]);
    }

    #[test]
    fn test_primary_then_first_carrier() {
        let spec = spec(json!({
            "domain": "ADSL",
            "key": ["USUBJID"],
            "primary": "DM",
            "columns": [{"name": "USUBJID", "type": "str", "derivation": {"constant": "x"}}]
        }));
        let ex = Table::from_records("EX", &[json!({"USUBJID": "S9"})]).unwrap();
        let dm = Table::from_records("DM", &[json!({"USUBJID": "S1"})]).unwrap();
        let sources = SourceSet::new(vec![&ex, &dm]);
        let frame = KeyFrameBuilder::new(&spec, &sources).build().unwrap().unwrap();
        assert_eq!(frame.source, "DM");

        let sources = SourceSet::new(vec![&ex]);
        let frame = KeyFrameBuilder::new(&spec, &sources).build().unwrap().unwrap();
        assert_eq!(frame.source, "EX");

        let sources = SourceSet::default();
        let err = KeyFrameBuilder::new(&spec, &sources).build().unwrap_err();
        assert_eq!(err.code(), "ADAM_KEYFRAME");
    }

    #[test]
    fn test_no_keys() {
        let spec = spec(json!({
            "domain": "ADTTE",
            "columns": [{"name": "X", "type": "str", "derivation": {"constant": "x"}}]
        }));
        let sources = SourceSet::default();
        assert!(KeyFrameBuilder::new(&spec, &sources).build().unwrap().is_none());
    }
}
