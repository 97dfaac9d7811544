//! Derivation context
//!
//! Everything a strategy may read while deriving one column: the target
//! frame built so far, the loaded source tables, the identity keys and the
//! function registry. Strategies perform no I/O; the context only borrows.

use std::borrow::Cow;

use serde_json::Value;

use super::errors::{DeriveError, DeriveResult};
use super::functions::FunctionRegistry;
use crate::filter::{FilterEvaluator, ParsedFilter};
use crate::table::{align_positional, left_join_column, shared_keys, ColumnRef, SourceSet, Table};

/// Output of one strategy
#[derive(Debug, Clone, PartialEq)]
pub struct Derived {
    pub values: Vec<Value>,
    /// Non-fatal observations for the build report
    pub warnings: Vec<String>,
}

impl Derived {
    pub fn new(values: Vec<Value>) -> Self {
        Self {
            values,
            warnings: Vec::new(),
        }
    }

    pub fn with_warnings(values: Vec<Value>, warnings: Vec<String>) -> Self {
        Self { values, warnings }
    }
}

/// Read-only view handed to strategies
pub struct DerivationContext<'a> {
    frame: &'a Table,
    height: Option<usize>,
    sources: &'a SourceSet<'a>,
    keys: &'a [String],
    domain: &'a str,
    primary: Option<&'a str>,
    functions: &'a FunctionRegistry,
}

impl<'a> DerivationContext<'a> {
    /// `height` is `None` while the frame has no rows established
    pub fn new(
        frame: &'a Table,
        height: Option<usize>,
        sources: &'a SourceSet<'a>,
        keys: &'a [String],
        domain: &'a str,
        functions: &'a FunctionRegistry,
    ) -> Self {
        Self {
            frame,
            height,
            sources,
            keys,
            domain,
            primary: None,
            functions,
        }
    }

    pub fn with_primary(mut self, primary: Option<&'a str>) -> Self {
        self.primary = primary;
        self
    }

    pub fn frame(&self) -> &'a Table {
        self.frame
    }

    pub fn height(&self) -> Option<usize> {
        self.height
    }

    pub fn sources(&self) -> &'a SourceSet<'a> {
        self.sources
    }

    pub fn keys(&self) -> &'a [String] {
        self.keys
    }

    pub fn domain(&self) -> &'a str {
        self.domain
    }

    pub fn functions(&self) -> &'a FunctionRegistry {
        self.functions
    }

    /// The designated primary source table, if declared and loaded
    pub fn primary_table(&self) -> Option<&'a Table> {
        self.primary.and_then(|p| self.sources.get(p))
    }

    /// Frame height, else the primary table's height
    pub fn target_height(&self, column: &str) -> DeriveResult<usize> {
        self.height
            .or_else(|| self.primary_table().map(Table::height))
            .ok_or_else(|| DeriveError::HeightUnknown {
                column: column.to_string(),
            })
    }

    /// Table holding `reference`.
    ///
    /// A qualifier equal to the domain means the frame. Bare names look in
    /// the frame first, then in source tables in load order.
    pub fn locate(&self, column: &str, reference: &ColumnRef) -> DeriveResult<&'a Table> {
        let found = match reference.table.as_deref() {
            Some(t) if t.eq_ignore_ascii_case(self.domain) => {
                Some(self.frame).filter(|f| f.has_column(&reference.column))
            }
            Some(t) => self
                .sources
                .get(t)
                .filter(|table| table.has_column(&reference.column)),
            None if self.frame.has_column(&reference.column) => Some(self.frame),
            None => self.sources.first_with_column(&reference.column),
        };
        found.ok_or_else(|| DeriveError::not_found(column, reference))
    }

    /// Applies a row filter, recording a warning if it had to be skipped
    pub fn apply_filter<'t>(
        &self,
        table: &'t Table,
        filter: Option<&ParsedFilter>,
        warnings: &mut Vec<String>,
    ) -> Cow<'t, Table> {
        let Some(filter) = filter else {
            return Cow::Borrowed(table);
        };
        let filtered = FilterEvaluator::new(self.sources, self.keys)
            .with_frame(self.frame)
            .apply(table, filter);
        if let Some(e) = filtered.degraded {
            warnings.push(format!(
                "filter '{}' not applied ({}): {}",
                filter.source,
                e.code(),
                e
            ));
        }
        filtered.table
    }

    /// Aligns `field` of `table` to the frame rows.
    ///
    /// Rows are matched on the identity keys both sides carry; the first
    /// match per key wins. Without shared keys the values are aligned by
    /// position. Before the frame has a height, values are taken as is.
    pub fn align(
        &self,
        column: &str,
        table: &Table,
        field: &str,
        warnings: &mut Vec<String>,
    ) -> DeriveResult<Vec<Value>> {
        let values = table
            .values(field)
            .map_err(|_| DeriveError::not_found(column, format!("{}.{}", table.name(), field)))?;

        let Some(height) = self.height else {
            return Ok(values.to_vec());
        };
        if std::ptr::eq(table, self.frame) {
            return Ok(values.to_vec());
        }

        let keys = shared_keys(self.keys, self.frame, table);
        if keys.is_empty() {
            if values.len() != height {
                warnings.push(format!(
                    "no shared key columns with {}; aligned {} rows by position to {}",
                    table.name(),
                    values.len(),
                    height
                ));
            } else {
                warnings.push(format!(
                    "no shared key columns with {}; aligned by position",
                    table.name()
                ));
            }
            return Ok(align_positional(values, height));
        }

        let joined = left_join_column(self.frame, table, &keys, field)
            .map_err(|e| DeriveError::failed(column, e))?;
        if joined.ambiguous_keys > 0 {
            warnings.push(format!(
                "{} key value(s) matched several rows in {}; first row used",
                joined.ambiguous_keys,
                table.name()
            ));
        }
        Ok(joined.values)
    }

    /// Locates, filters and aligns one referenced column
    pub fn resolve_values(
        &self,
        column: &str,
        reference: &ColumnRef,
        filter: Option<&ParsedFilter>,
        warnings: &mut Vec<String>,
    ) -> DeriveResult<Vec<Value>> {
        let table = self.locate(column, reference)?;
        let filtered = self.apply_filter(table, filter, warnings);
        // A filtered frame is no longer row-aligned and must be joined back
        if filter.is_some() && std::ptr::eq(table, self.frame) {
            return self.align_filtered_frame(column, &filtered, &reference.column, warnings);
        }
        self.align(column, &filtered, &reference.column, warnings)
    }

    fn align_filtered_frame(
        &self,
        column: &str,
        filtered: &Table,
        field: &str,
        warnings: &mut Vec<String>,
    ) -> DeriveResult<Vec<Value>> {
        let height = self.height.unwrap_or(filtered.height());
        let keys: Vec<String> = self
            .keys
            .iter()
            .filter(|k| self.frame.has_column(k))
            .cloned()
            .collect();
        if keys.is_empty() {
            let values = filtered
                .values(field)
                .map_err(|_| DeriveError::not_found(column, field))?;
            warnings.push("filtered frame has no key columns; aligned by position".to_string());
            return Ok(align_positional(values, height));
        }
        let joined = left_join_column(self.frame, filtered, &keys, field)
            .map_err(|e| DeriveError::failed(column, e))?;
        Ok(joined.values)
    }
}
