//! Conditional derivation
//!
//! Branches are tested in declaration order and the first true predicate
//! wins. Predicates see a context frame: the target frame plus any column
//! they reference that the frame lacks, joined in from its qualifier table,
//! else the primary table, else the first source table carrying it.

use serde_json::Value;

use super::context::{DerivationContext, Derived};
use super::errors::{DeriveError, DeriveResult};
use crate::filter::{evaluate_mask, FrameLookup};
use crate::spec::WhenThen;
use crate::table::{Column, ColumnRef, Table};

pub fn derive_conditional(
    ctx: &DerivationContext<'_>,
    column: &str,
    branches: &[WhenThen],
    otherwise: Option<&Value>,
) -> DeriveResult<Derived> {
    let mut warnings = Vec::new();
    let frame = context_frame(ctx, column, branches, &mut warnings)?;
    let height = ctx.height().unwrap_or(frame.height());
    let lookup = FrameLookup::new(&frame);

    let fallback = otherwise.cloned().unwrap_or(Value::Null);
    let mut values = vec![fallback; height];
    let mut decided = vec![false; height];

    for branch in branches {
        let mask = evaluate_mask(&branch.condition, &lookup)
            .map_err(|e| DeriveError::failed(column, format!("when '{}': {}", branch.text, e)))?;
        for (row, hit) in mask.into_iter().enumerate().take(height) {
            if hit && !decided[row] {
                values[row] = branch.then.clone();
                decided[row] = true;
            }
        }
    }
    Ok(Derived::with_warnings(values, warnings))
}

/// Frame columns plus every referenced column it is missing
fn context_frame(
    ctx: &DerivationContext<'_>,
    column: &str,
    branches: &[WhenThen],
    warnings: &mut Vec<String>,
) -> DeriveResult<Table> {
    let mut frame = ctx.frame().clone();
    for reference in branches.iter().flat_map(|b| b.condition.references()) {
        if frame.has_column(&reference.column) {
            continue;
        }
        let holder = auxiliary_table(ctx, reference)
            .ok_or_else(|| DeriveError::not_found(column, reference))?;
        let values = ctx.align(column, holder, &reference.column, warnings)?;
        frame
            .push_column(Column::new(reference.column.clone(), values))
            .map_err(|e| DeriveError::failed(column, e))?;
    }
    Ok(frame)
}

fn auxiliary_table<'a>(ctx: &DerivationContext<'a>, reference: &ColumnRef) -> Option<&'a Table> {
    let has = |t: &&Table| t.has_column(&reference.column);
    reference
        .table
        .as_deref()
        .and_then(|t| ctx.sources().get(t))
        .filter(has)
        .or_else(|| ctx.primary_table().filter(has))
        .or_else(|| ctx.sources().first_with_column(&reference.column))
}
