//! Categorization derivation
//!
//! Cut rules are applied as one priority chain: a later rule overrides an
//! earlier one wherever both match. Rows no rule matches keep the source
//! value.

use serde_json::Value;

use super::context::{DerivationContext, Derived};
use super::errors::DeriveResult;
use crate::spec::CutRule;
use crate::table::ColumnRef;

pub fn derive_categorization(
    ctx: &DerivationContext<'_>,
    column: &str,
    source: &ColumnRef,
    cuts: &[CutRule],
) -> DeriveResult<Derived> {
    let mut warnings = Vec::new();
    let values = ctx.resolve_values(column, source, None, &mut warnings)?;
    let labelled = values.iter().map(|v| categorize(cuts, v)).collect();
    Ok(Derived::with_warnings(labelled, warnings))
}

/// Label of the last matching rule, else the value itself
pub fn categorize(cuts: &[CutRule], value: &Value) -> Value {
    cuts.iter()
        .rev()
        .find(|rule| rule.condition.matches(value))
        .map_or_else(|| value.clone(), |rule| rule.label.clone())
}
