//! Derivation dispatcher
//!
//! Maps each typed descriptor to its strategy. Descriptor precedence was
//! settled when the spec was resolved, so this is a plain exhaustive match.

use super::aggregation::derive_aggregation;
use super::categorization::derive_categorization;
use super::conditional::derive_conditional;
use super::constant::derive_constant;
use super::context::{DerivationContext, Derived};
use super::custom::derive_custom;
use super::errors::{DeriveError, DeriveResult};
use super::source::derive_source;
use crate::spec::{ColumnSpec, DerivationDescriptor};

/// Selects and runs the strategy for one column
pub struct DerivationDispatcher;

impl DerivationDispatcher {
    pub fn derive(ctx: &DerivationContext<'_>, column: &ColumnSpec) -> DeriveResult<Derived> {
        let name = column.name.as_str();
        match &column.derivation {
            DerivationDescriptor::Conditional {
                branches,
                otherwise,
            } => derive_conditional(ctx, name, branches, otherwise.as_ref()),
            DerivationDescriptor::Constant(value) => derive_constant(ctx, name, value),
            DerivationDescriptor::CustomFunction { name: function, args } => {
                derive_custom(ctx, name, function, args)
            }
            DerivationDescriptor::Categorization { source, cuts } => {
                derive_categorization(ctx, name, source, cuts)
            }
            DerivationDescriptor::Aggregation {
                source,
                function,
                target,
                date,
                filter,
            } => derive_aggregation(
                ctx,
                name,
                source,
                *function,
                target.as_ref(),
                date.as_deref(),
                filter.as_ref(),
            ),
            DerivationDescriptor::SourceRef {
                source,
                filter,
                mapping,
            } => derive_source(ctx, name, source, filter.as_ref(), mapping.as_ref()),
            DerivationDescriptor::Invalid { reason } => Err(DeriveError::configuration(
                name,
                format!("{}; derivation: {}", reason, column.raw_derivation),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::derive::FunctionRegistry;
    use crate::spec::{DataType, DerivationDescriptor};
    use crate::table::{SourceSet, Table};
    use serde_json::{json, Value};

    fn column(name: &str, raw: Value) -> ColumnSpec {
        ColumnSpec {
            name: name.to_string(),
            data_type: DataType::Text,
            label: name.to_string(),
            core: None,
            derivation: DerivationDescriptor::from_raw(&raw),
            validation: None,
            raw_derivation: raw,
            raw_validation: Value::Null,
        }
    }

    #[test]
    fn test_dispatch_by_descriptor() {
        let frame = Table::from_records("ADSL", &[json!({"USUBJID": "S1", "AGE": 70})]).unwrap();
        let sources = SourceSet::default();
        let keys = vec!["USUBJID".to_string()];
        let functions = FunctionRegistry::new();
        let ctx = DerivationContext::new(&frame, Some(1), &sources, &keys, "ADSL", &functions);

        let derived = DerivationDispatcher::derive(&ctx, &column("C", json!({"constant": "Y"}))).unwrap();
        assert_eq!(derived.values, vec![json!("Y")]);

        let derived = DerivationDispatcher::derive(
            &ctx,
            &column("AGEGR", json!({"source": "AGE", "cut": {">=65": ">=65"}})),
        )
        .unwrap();
        assert_eq!(derived.values, vec![json!(">=65")]);
    }

    #[test]
    fn test_invalid_descriptor_names_column_and_raw() {
        let frame = Table::from_records("ADSL", &[json!({"USUBJID": "S1"})]).unwrap();
        let sources = SourceSet::default();
        let keys = vec!["USUBJID".to_string()];
        let functions = FunctionRegistry::new();
        let ctx = DerivationContext::new(&frame, Some(1), &sources, &keys, "ADSL", &functions);

        let err = DerivationDispatcher::derive(&ctx, &column("ODD", json!({"lookup": "X"}))).unwrap_err();
        assert_eq!(err.code(), "ADAM_CONFIGURATION");
        let text = err.to_string();
        assert!(text.contains("'ODD'"));
        assert!(text.contains("lookup"));
    }
}
