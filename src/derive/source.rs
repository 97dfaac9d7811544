//! Source-mapping derivation
//!
//! Copies one column from a source table (or from an earlier frame column)
//! onto the frame, optionally filtering source rows first and recoding
//! values afterwards.

use super::context::{DerivationContext, Derived};
use super::errors::DeriveResult;
use crate::filter::ParsedFilter;
use crate::spec::ValueMapping;
use crate::table::ColumnRef;

pub fn derive_source(
    ctx: &DerivationContext<'_>,
    column: &str,
    source: &ColumnRef,
    filter: Option<&ParsedFilter>,
    mapping: Option<&ValueMapping>,
) -> DeriveResult<Derived> {
    let mut warnings = Vec::new();
    let values = ctx.resolve_values(column, source, filter, &mut warnings)?;
    let values = match mapping {
        Some(mapping) => values.iter().map(|v| mapping.apply(v)).collect(),
        None => values,
    };
    Ok(Derived::with_warnings(values, warnings))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::derive::FunctionRegistry;
    use crate::table::{SourceSet, Table};
    use serde_json::{json, Map, Value};

    fn frame() -> Table {
        Table::from_records(
            "ADSL",
            &[
                json!({"USUBJID": "S1"}),
                json!({"USUBJID": "S2"}),
                json!({"USUBJID": "S3"}),
            ],
        )
        .unwrap()
    }

    fn dm() -> Table {
        Table::from_records(
            "DM",
            &[
                json!({"USUBJID": "S3", "SEX": "U"}),
                json!({"USUBJID": "S1", "SEX": "M"}),
                json!({"USUBJID": "S2", "SEX": "F"}),
            ],
        )
        .unwrap()
    }

    fn mapping(raw: Value) -> ValueMapping {
        let map: Map<String, Value> = raw.as_object().cloned().unwrap_or_default();
        ValueMapping::from_raw(&map)
    }

    #[test]
    fn test_source_join_preserves_frame_order() {
        let (frame, dm) = (frame(), dm());
        let sources = SourceSet::new(vec![&dm]);
        let keys = vec!["USUBJID".to_string()];
        let functions = FunctionRegistry::new();
        let ctx = DerivationContext::new(&frame, Some(3), &sources, &keys, "ADSL", &functions);

        let derived = derive_source(&ctx, "SEX", &ColumnRef::parse("DM.SEX"), None, None).unwrap();
        assert_eq!(derived.values, vec![json!("M"), json!("F"), json!("U")]);
        assert!(derived.warnings.is_empty());
    }

    #[test]
    fn test_mapping_unmapped_bucket() {
        let (frame, dm) = (frame(), dm());
        let sources = SourceSet::new(vec![&dm]);
        let keys = vec!["USUBJID".to_string()];
        let functions = FunctionRegistry::new();
        let ctx = DerivationContext::new(&frame, Some(3), &sources, &keys, "ADSL", &functions);
        let source = ColumnRef::parse("SEX");

        let passthrough = mapping(json!({"M": "Male", "F": "Female"}));
        let derived = derive_source(&ctx, "SEXN", &source, None, Some(&passthrough)).unwrap();
        assert_eq!(derived.values, vec![json!("Male"), json!("Female"), json!("U")]);

        let strict = mapping(json!({"M": "Male", "F": "Female", "": null}));
        let derived = derive_source(&ctx, "SEXN", &source, None, Some(&strict)).unwrap();
        assert_eq!(derived.values, vec![json!("Male"), json!("Female"), Value::Null]);
    }

    #[test]
    fn test_missing_column() {
        let (frame, dm) = (frame(), dm());
        let sources = SourceSet::new(vec![&dm]);
        let keys = vec!["USUBJID".to_string()];
        let functions = FunctionRegistry::new();
        let ctx = DerivationContext::new(&frame, Some(3), &sources, &keys, "ADSL", &functions);

        let err = derive_source(&ctx, "RACE", &ColumnRef::parse("RACE"), None, None).unwrap_err();
        assert_eq!(err.code(), "ADAM_COLUMN_NOT_FOUND");
    }
}
