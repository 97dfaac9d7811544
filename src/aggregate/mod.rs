//! Aggregation engine
//!
//! Reduces a multi-row source table to one value per identity-key tuple.
//! Output is a small table holding the key columns plus the reduced column,
//! ready to be left-joined onto the target frame.
//!
//! Groups keep first-seen order. Rows whose key contains a null are never
//! grouped, since they could never join back.

mod closest;

pub use closest::closest;

use std::collections::HashMap;
use std::fmt;

use serde_json::Value;

use crate::table::value::{as_number, compare, number_value};
use crate::table::{row_key, Column, Table, TableResult};

/// Supported reductions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateFunction {
    First,
    Last,
    Mean,
    Median,
    Min,
    Max,
    Sum,
    Count,
    Closest,
}

impl AggregateFunction {
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "first" => Some(AggregateFunction::First),
            "last" => Some(AggregateFunction::Last),
            "mean" | "avg" => Some(AggregateFunction::Mean),
            "median" => Some(AggregateFunction::Median),
            "min" => Some(AggregateFunction::Min),
            "max" => Some(AggregateFunction::Max),
            "sum" => Some(AggregateFunction::Sum),
            "count" => Some(AggregateFunction::Count),
            "closest" => Some(AggregateFunction::Closest),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AggregateFunction::First => "first",
            AggregateFunction::Last => "last",
            AggregateFunction::Mean => "mean",
            AggregateFunction::Median => "median",
            AggregateFunction::Min => "min",
            AggregateFunction::Max => "max",
            AggregateFunction::Sum => "sum",
            AggregateFunction::Count => "count",
            AggregateFunction::Closest => "closest",
        }
    }
}

impl fmt::Display for AggregateFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rows sharing one key tuple
#[derive(Debug, Clone, PartialEq)]
pub struct Group {
    pub key: Vec<String>,
    pub rows: Vec<usize>,
}

/// Groups rows by `keys` in first-seen order
pub fn group_rows(table: &Table, keys: &[String]) -> Vec<Group> {
    let mut groups: Vec<Group> = Vec::new();
    let mut index: HashMap<Vec<String>, usize> = HashMap::new();
    for row in 0..table.height() {
        let Some(key) = row_key(table, keys, row) else {
            continue;
        };
        match index.get(&key) {
            Some(&g) => groups[g].rows.push(row),
            None => {
                index.insert(key.clone(), groups.len());
                groups.push(Group {
                    key,
                    rows: vec![row],
                });
            }
        }
    }
    groups
}

/// Builds the per-group output table: key columns, then `column`
pub(crate) fn grouped_table(
    table: &Table,
    keys: &[String],
    groups: &[Group],
    column: &str,
    values: Vec<Value>,
) -> TableResult<Table> {
    let mut columns = Vec::with_capacity(keys.len() + 1);
    for key in keys {
        let source = table.values(key)?;
        columns.push(Column::new(
            key.clone(),
            groups.iter().map(|g| source[g.rows[0]].clone()).collect(),
        ));
    }
    columns.push(Column::new(column, values));
    Table::from_columns(table.name(), columns)
}

/// Reduces `column` of `table` per key tuple.
///
/// `Closest` needs target dates and is served by [`closest`]; here it
/// behaves like `First`.
pub fn group_reduce(
    table: &Table,
    keys: &[String],
    column: &str,
    function: AggregateFunction,
) -> TableResult<Table> {
    let source = table.values(column)?;
    let groups = group_rows(table, keys);
    let values = groups
        .iter()
        .map(|g| {
            let cells: Vec<&Value> = g.rows.iter().map(|&r| &source[r]).collect();
            reduce(function, &cells)
        })
        .collect();
    grouped_table(table, keys, &groups, column, values)
}

/// Applies one reduction to a group's cells
pub fn reduce(function: AggregateFunction, cells: &[&Value]) -> Value {
    match function {
        AggregateFunction::First | AggregateFunction::Closest => {
            cells.first().map_or(Value::Null, |v| (*v).clone())
        }
        AggregateFunction::Last => cells.last().map_or(Value::Null, |v| (*v).clone()),
        AggregateFunction::Count => Value::from(cells.len() as u64),
        AggregateFunction::Sum => number_value(numbers(cells).iter().sum()),
        AggregateFunction::Mean => {
            let nums = numbers(cells);
            if nums.is_empty() {
                Value::Null
            } else {
                number_value(nums.iter().sum::<f64>() / nums.len() as f64)
            }
        }
        AggregateFunction::Median => {
            let mut nums = numbers(cells);
            if nums.is_empty() {
                return Value::Null;
            }
            nums.sort_by(|a, b| a.total_cmp(b));
            let mid = nums.len() / 2;
            if nums.len() % 2 == 0 {
                number_value((nums[mid - 1] + nums[mid]) / 2.0)
            } else {
                number_value(nums[mid])
            }
        }
        AggregateFunction::Min => extreme(cells, std::cmp::Ordering::Less),
        AggregateFunction::Max => extreme(cells, std::cmp::Ordering::Greater),
    }
}

fn numbers(cells: &[&Value]) -> Vec<f64> {
    cells.iter().filter_map(|v| as_number(v)).collect()
}

/// Smallest or largest non-null cell; unordered pairs are skipped
fn extreme(cells: &[&Value], wanted: std::cmp::Ordering) -> Value {
    let mut best: Option<&Value> = None;
    for cell in cells.iter().copied().filter(|v| !v.is_null()) {
        best = match best {
            None => Some(cell),
            Some(current) if compare(cell, current) == Some(wanted) => Some(cell),
            keep => keep,
        };
    }
    best.cloned().unwrap_or(Value::Null)
}
