//! Aggregation derivation
//!
//! Source rows are grouped by the identity keys the source table actually
//! carries, reduced to one value per group, then joined back onto the
//! frame. Frame rows without a group get null.

use std::borrow::Cow;

use super::context::{DerivationContext, Derived};
use super::errors::{DeriveError, DeriveResult};
use crate::aggregate::{closest, group_reduce, AggregateFunction};
use crate::filter::ParsedFilter;
use crate::table::{left_join_column, shared_keys, ColumnRef, Table};

/// Marker used to pick a date column when none is declared
const DATE_MARKER: &str = "DTC";

pub fn derive_aggregation(
    ctx: &DerivationContext<'_>,
    column: &str,
    source: &ColumnRef,
    function: AggregateFunction,
    target: Option<&ColumnRef>,
    date: Option<&str>,
    filter: Option<&ParsedFilter>,
) -> DeriveResult<Derived> {
    let mut warnings = Vec::new();
    let table = ctx.locate(column, source)?;
    let rows = ctx.apply_filter(table, filter, &mut warnings);

    let group_keys: Vec<String> = ctx
        .keys()
        .iter()
        .filter(|k| rows.has_column(k))
        .cloned()
        .collect();
    if group_keys.is_empty() {
        return Err(DeriveError::configuration(
            column,
            format!("source table {} carries none of the key columns", table.name()),
        ));
    }

    let reduced = match function {
        AggregateFunction::Closest => {
            let target = target.ok_or_else(|| {
                DeriveError::configuration(column, "closest aggregation requires a target")
            })?;
            match date_column(&rows, date) {
                Some(date_column) => {
                    let targets = target_dates(ctx, column, &rows, target)?;
                    closest(&rows, &group_keys, &source.column, &date_column, &targets)
                }
                None => {
                    warnings.push(format!(
                        "no date column in {}; closest fell back to first",
                        table.name()
                    ));
                    group_reduce(&rows, &group_keys, &source.column, AggregateFunction::First)
                }
            }
        }
        other => group_reduce(&rows, &group_keys, &source.column, other),
    }
    .map_err(|e| DeriveError::failed(column, e))?;

    let values = ctx.align(column, &reduced, &source.column, &mut warnings)?;
    Ok(Derived::with_warnings(values, warnings))
}

/// Declared date column, else the first column whose name contains `DTC`
fn date_column(table: &Table, declared: Option<&str>) -> Option<String> {
    match declared {
        Some(name) => Some(name.to_string()).filter(|n| table.has_column(n)),
        None => table
            .column_names()
            .into_iter()
            .find(|n| n.contains(DATE_MARKER))
            .map(str::to_string),
    }
}

/// Target date for every source row, joined in by shared keys
fn target_dates(
    ctx: &DerivationContext<'_>,
    column: &str,
    rows: &Cow<'_, Table>,
    target: &ColumnRef,
) -> DeriveResult<Vec<serde_json::Value>> {
    let holder = ctx.locate(column, target)?;
    let keys = shared_keys(ctx.keys(), rows, holder);
    if keys.is_empty() {
        return Err(DeriveError::configuration(
            column,
            format!(
                "target {} shares no key columns with {}",
                target,
                rows.name()
            ),
        ));
    }
    left_join_column(rows, holder, &keys, &target.column)
        .map(|joined| joined.values)
        .map_err(|e| DeriveError::failed(column, e))
}
