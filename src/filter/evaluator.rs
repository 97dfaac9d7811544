//! Filter evaluation
//!
//! Expressions are evaluated to a row mask over one table. Column lookups go
//! through [`ColumnLookup`] so the same evaluator serves both cases:
//!
//! - [`QualifiedLookup`]: row filters on a source table, where a reference
//!   to another table is joined in by shared identity keys. A qualifier
//!   naming the output frame resolves against that frame.
//! - [`FrameLookup`]: conditional derivations over a context frame, where
//!   qualifiers are ignored and columns are found by name
//!
//! `apply` is fail-open. Any parse or evaluation error is logged and the
//! input table is returned unchanged.

use std::borrow::Cow;

use serde_json::Value;
use tracing::warn;

use super::ast::{FilterExpr, Operand};
use super::errors::{FilterError, FilterResult};
use super::parser::parse_filter;
use crate::observability::Event;
use crate::table::{left_join_column, shared_keys, ColumnRef, SourceSet, Table};

/// A filter string together with its parse result.
///
/// Parsing happens once when the spec is resolved; a failed parse is kept so
/// that applying the filter degrades instead of failing.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedFilter {
    pub source: String,
    pub expr: Result<FilterExpr, FilterError>,
}

impl ParsedFilter {
    pub fn parse(source: impl Into<String>) -> Self {
        let source = source.into();
        let expr = parse_filter(&source);
        Self { source, expr }
    }

    pub fn is_valid(&self) -> bool {
        self.expr.is_ok()
    }
}

/// Resolves column references to row-aligned values
pub trait ColumnLookup {
    /// Number of rows being filtered
    fn height(&self) -> usize;

    /// Values for `column`, one per row
    fn values(&self, column: &ColumnRef) -> FilterResult<Cow<'_, [Value]>>;
}

/// Lookup over a source table with cross-table joins for qualified references
pub struct QualifiedLookup<'a> {
    table: &'a Table,
    sources: &'a SourceSet<'a>,
    keys: &'a [String],
    frame: Option<&'a Table>,
}

impl<'a> QualifiedLookup<'a> {
    pub fn new(table: &'a Table, sources: &'a SourceSet<'a>, keys: &'a [String]) -> Self {
        Self {
            table,
            sources,
            keys,
            frame: None,
        }
    }

    /// Output frame answering references qualified with its name
    pub fn with_frame(mut self, frame: Option<&'a Table>) -> Self {
        self.frame = frame;
        self
    }

    fn other_table(&self, name: &str) -> Option<&'a Table> {
        self.frame
            .filter(|f| f.name().eq_ignore_ascii_case(name))
            .or_else(|| self.sources.get(name))
    }
}

impl ColumnLookup for QualifiedLookup<'_> {
    fn height(&self) -> usize {
        self.table.height()
    }

    fn values(&self, column: &ColumnRef) -> FilterResult<Cow<'_, [Value]>> {
        let local = match &column.table {
            None => true,
            Some(t) => t.eq_ignore_ascii_case(self.table.name()),
        };
        if local {
            return self
                .table
                .values(&column.column)
                .map(Cow::Borrowed)
                .map_err(|_| FilterError::UnknownColumn(column.to_string()));
        }

        let other_name = column.table.as_deref().unwrap_or_default();
        let other = self
            .other_table(other_name)
            .ok_or_else(|| FilterError::UnknownTable(other_name.to_string()))?;
        let keys = shared_keys(self.keys, self.table, other);
        if keys.is_empty() {
            return Err(FilterError::NoSharedKeys {
                left: self.table.name().to_string(),
                right: other.name().to_string(),
            });
        }
        let joined = left_join_column(self.table, other, &keys, &column.column)
            .map_err(|_| FilterError::UnknownColumn(column.to_string()))?;
        Ok(Cow::Owned(joined.values))
    }
}

/// Lookup by bare column name; table qualifiers are ignored
pub struct FrameLookup<'a> {
    table: &'a Table,
}

impl<'a> FrameLookup<'a> {
    pub fn new(table: &'a Table) -> Self {
        Self { table }
    }
}

impl ColumnLookup for FrameLookup<'_> {
    fn height(&self) -> usize {
        self.table.height()
    }

    fn values(&self, column: &ColumnRef) -> FilterResult<Cow<'_, [Value]>> {
        self.table
            .values(&column.column)
            .map(Cow::Borrowed)
            .map_err(|_| FilterError::UnknownColumn(column.to_string()))
    }
}

/// Evaluates an expression to a row mask
pub fn evaluate_mask(expr: &FilterExpr, lookup: &dyn ColumnLookup) -> FilterResult<Vec<bool>> {
    let height = lookup.height();
    match expr {
        FilterExpr::Comparison { left, op, right } => {
            let lhs = lookup.values(left)?;
            let mask = match right {
                Operand::Literal(literal) => lhs.iter().map(|v| op.test(v, literal)).collect(),
                Operand::Column(r) => {
                    let rhs = lookup.values(r)?;
                    lhs.iter().zip(rhs.iter()).map(|(a, b)| op.test(a, b)).collect()
                }
            };
            Ok(mask)
        }
        FilterExpr::And(parts) => {
            let mut mask = vec![true; height];
            for part in parts {
                let sub = evaluate_mask(part, lookup)?;
                mask.iter_mut().zip(sub).for_each(|(m, s)| *m = *m && s);
            }
            Ok(mask)
        }
        FilterExpr::IsNull(r) => Ok(lookup.values(r)?.iter().map(Value::is_null).collect()),
        FilterExpr::IsNotNull(r) => Ok(lookup.values(r)?.iter().map(|v| !v.is_null()).collect()),
    }
}

/// Result of applying a filter
#[derive(Debug)]
pub struct Filtered<'t> {
    pub table: Cow<'t, Table>,
    /// Set when the filter could not be applied and the input passed through
    pub degraded: Option<FilterError>,
}

/// Row filtering over source tables
pub struct FilterEvaluator<'a> {
    sources: &'a SourceSet<'a>,
    keys: &'a [String],
    frame: Option<&'a Table>,
}

impl<'a> FilterEvaluator<'a> {
    pub fn new(sources: &'a SourceSet<'a>, keys: &'a [String]) -> Self {
        Self {
            sources,
            keys,
            frame: None,
        }
    }

    /// Lets filters compare against columns of the output frame
    pub fn with_frame(mut self, frame: &'a Table) -> Self {
        self.frame = Some(frame);
        self
    }

    /// Filters `table`, surfacing errors
    pub fn try_apply(&self, table: &Table, filter: &ParsedFilter) -> FilterResult<Table> {
        let expr = filter.expr.as_ref().map_err(Clone::clone)?;
        let lookup = QualifiedLookup::new(table, self.sources, self.keys).with_frame(self.frame);
        let mask = evaluate_mask(expr, &lookup)?;
        Ok(table.filter_rows(&mask))
    }

    /// Filters `table`; on any error logs a warning and passes it through
    pub fn apply<'t>(&self, table: &'t Table, filter: &ParsedFilter) -> Filtered<'t> {
        match self.try_apply(table, filter) {
            Ok(filtered) => Filtered {
                table: Cow::Owned(filtered),
                degraded: None,
            },
            Err(e) => {
                warn!(
                    event = Event::FilterDegraded.as_str(),
                    table = table.name(),
                    filter = %filter.source,
                    code = e.code(),
                    error = %e,
                    "filter not applied, using unfiltered rows"
                );
                Filtered {
                    table: Cow::Borrowed(table),
                    degraded: Some(e),
                }
            }
        }
    }
}
