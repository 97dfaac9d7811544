//! Key-preserving joins
//!
//! All joins here are left joins onto an existing row order: the left side
//! never gains or loses rows. Rows are matched on the declared identity-key
//! columns both tables carry; keys are never inferred from column names.
//! When the right side holds several rows for one key tuple the first row
//! wins and the key is counted as ambiguous so callers can report it.

use std::collections::{HashMap, HashSet};

use serde_json::Value;

use super::errors::TableResult;
use super::table::Table;
use super::value::key_part;

/// Declared key columns present in both tables, in declaration order
pub fn shared_keys(keys: &[String], left: &Table, right: &Table) -> Vec<String> {
    keys.iter()
        .filter(|k| left.has_column(k) && right.has_column(k))
        .cloned()
        .collect()
}

/// Key tuple of one row; `None` if any key cell is null
pub fn row_key(table: &Table, keys: &[String], row: usize) -> Option<Vec<String>> {
    keys.iter()
        .map(|k| {
            table
                .column(k)
                .and_then(|c| c.values.get(row))
                .and_then(key_part)
        })
        .collect()
}

/// First-row index of every key tuple in a table
#[derive(Debug)]
pub struct KeyIndex {
    first_row: HashMap<Vec<String>, usize>,
    ambiguous: usize,
}

impl KeyIndex {
    pub fn build(table: &Table, keys: &[String]) -> Self {
        let mut first_row = HashMap::new();
        let mut seen_twice: HashSet<Vec<String>> = HashSet::new();
        for row in 0..table.height() {
            let Some(key) = row_key(table, keys, row) else {
                continue;
            };
            if first_row.contains_key(&key) {
                seen_twice.insert(key);
            } else {
                first_row.insert(key, row);
            }
        }
        Self {
            first_row,
            ambiguous: seen_twice.len(),
        }
    }

    pub fn get(&self, key: &[String]) -> Option<usize> {
        self.first_row.get(key).copied()
    }

    /// Number of key tuples backed by more than one row
    pub fn ambiguous(&self) -> usize {
        self.ambiguous
    }
}

/// Column values aligned to a left table
#[derive(Debug, Clone, PartialEq)]
pub struct Joined {
    pub values: Vec<Value>,
    /// Key tuples that matched several right-hand rows
    pub ambiguous_keys: usize,
}

/// Left-joins `column` of `right` onto the rows of `left` by `keys`.
///
/// Unmatched left rows get null.
pub fn left_join_column(
    left: &Table,
    right: &Table,
    keys: &[String],
    column: &str,
) -> TableResult<Joined> {
    let source = right.values(column)?;
    let index = KeyIndex::build(right, keys);
    let values = (0..left.height())
        .map(|row| {
            row_key(left, keys, row)
                .and_then(|key| index.get(&key))
                .map_or(Value::Null, |r| source[r].clone())
        })
        .collect();
    Ok(Joined {
        values,
        ambiguous_keys: index.ambiguous(),
    })
}

/// Positional alignment: truncate or pad with null to `height`
pub fn align_positional(values: &[Value], height: usize) -> Vec<Value> {
    let mut out: Vec<Value> = values.iter().take(height).cloned().collect();
    out.resize(height, Value::Null);
    out
}
