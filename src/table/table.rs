//! Columnar in-memory table

use serde::Serialize;
use serde_json::{Map, Value};

use super::errors::{TableError, TableResult};

/// A named column of cells
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Column {
    pub name: String,
    pub values: Vec<Value>,
}

impl Column {
    pub fn new(name: impl Into<String>, values: Vec<Value>) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }

    /// Column of `height` copies of `value`
    pub fn filled(name: impl Into<String>, value: Value, height: usize) -> Self {
        Self::new(name, vec![value; height])
    }

    /// Number of non-null cells
    pub fn non_null_count(&self) -> usize {
        self.values.iter().filter(|v| !v.is_null()).count()
    }
}

/// A named table of equal-length columns.
///
/// Column order is preserved. Names are unique; pushing a column with an
/// existing name replaces it in place.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    name: String,
    columns: Vec<Column>,
}

impl Table {
    /// Creates an empty table
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
        }
    }

    /// Creates a table from columns, checking that all lengths agree
    pub fn from_columns(name: impl Into<String>, columns: Vec<Column>) -> TableResult<Self> {
        let mut table = Self::new(name);
        for column in columns {
            table.push_column(column)?;
        }
        Ok(table)
    }

    /// Creates a table from row objects.
    ///
    /// Columns appear in first-seen order across all records; a record
    /// missing a column contributes null.
    pub fn from_records(name: impl Into<String>, records: &[Value]) -> TableResult<Self> {
        let name = name.into();
        let mut names: Vec<String> = Vec::new();
        let mut rows: Vec<&Map<String, Value>> = Vec::with_capacity(records.len());

        for (idx, record) in records.iter().enumerate() {
            let obj = record.as_object().ok_or_else(|| TableError::InvalidRecord {
                table: name.clone(),
                reason: format!("record {} is not an object", idx),
            })?;
            for key in obj.keys() {
                if !names.iter().any(|n| n == key) {
                    names.push(key.clone());
                }
            }
            rows.push(obj);
        }

        let columns = names
            .into_iter()
            .map(|col| {
                let values = rows
                    .iter()
                    .map(|row| row.get(&col).cloned().unwrap_or(Value::Null))
                    .collect();
                Column::new(col, values)
            })
            .collect();

        Ok(Self { name, columns })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Row count; an empty table has height 0
    pub fn height(&self) -> usize {
        self.columns.first().map_or(0, |c| c.values.len())
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    /// Values of a column, or `ColumnNotFound`
    pub fn values(&self, name: &str) -> TableResult<&[Value]> {
        self.column(name)
            .map(|c| c.values.as_slice())
            .ok_or_else(|| TableError::ColumnNotFound {
                table: self.name.clone(),
                column: name.to_string(),
            })
    }

    /// Appends a column, or replaces the column of the same name.
    ///
    /// The first column fixes the height; later columns must match it.
    pub fn push_column(&mut self, column: Column) -> TableResult<()> {
        if !self.columns.is_empty() && column.values.len() != self.height() {
            return Err(TableError::LengthMismatch {
                table: self.name.clone(),
                column: column.name,
                expected: self.height(),
                actual: column.values.len(),
            });
        }
        match self.columns.iter_mut().find(|c| c.name == column.name) {
            Some(existing) => *existing = column,
            None => self.columns.push(column),
        }
        Ok(())
    }

    /// Projection onto the named columns that exist, in the given order
    pub fn select(&self, names: &[String]) -> Table {
        let columns = names
            .iter()
            .filter_map(|n| self.column(n).cloned())
            .collect();
        Table {
            name: self.name.clone(),
            columns,
        }
    }

    /// Keeps rows whose mask entry is true
    pub fn filter_rows(&self, mask: &[bool]) -> Table {
        self.take_rows(
            &mask
                .iter()
                .enumerate()
                .filter(|(_, keep)| **keep)
                .map(|(idx, _)| idx)
                .collect::<Vec<_>>(),
        )
    }

    /// Rows at the given indices, in the given order
    pub fn take_rows(&self, rows: &[usize]) -> Table {
        let columns = self
            .columns
            .iter()
            .map(|c| {
                Column::new(
                    c.name.clone(),
                    rows.iter()
                        .map(|&r| c.values.get(r).cloned().unwrap_or(Value::Null))
                        .collect(),
                )
            })
            .collect();
        Table {
            name: self.name.clone(),
            columns,
        }
    }

    /// Row objects, preserving column order
    pub fn to_records(&self) -> Vec<Value> {
        (0..self.height())
            .map(|row| {
                let obj: Map<String, Value> = self
                    .columns
                    .iter()
                    .map(|c| (c.name.clone(), c.values[row].clone()))
                    .collect();
                Value::Object(obj)
            })
            .collect()
    }
}
