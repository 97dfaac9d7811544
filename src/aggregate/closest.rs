//! Date-nearest reduction
//!
//! For each key tuple, picks the row whose date is closest (in absolute
//! days) to that row's target date. Rows with an unparsable date on either
//! side are not candidates. Ties keep the earliest row in table order.

use serde_json::Value;

use super::{group_rows, grouped_table};
use crate::table::value::parse_date;
use crate::table::{Table, TableResult};

/// Reduces `column` to the value of the row nearest in time.
///
/// `targets` holds one target date per row of `table`, typically joined in
/// from another table by key. Groups without any candidate get null.
pub fn closest(
    table: &Table,
    keys: &[String],
    column: &str,
    date_column: &str,
    targets: &[Value],
) -> TableResult<Table> {
    let source = table.values(column)?;
    let dates = table.values(date_column)?;
    let groups = group_rows(table, keys);

    let values = groups
        .iter()
        .map(|group| {
            let mut best: Option<(i64, usize)> = None;
            for &row in &group.rows {
                let (Some(date), Some(target)) = (
                    parse_date(&dates[row]),
                    targets.get(row).and_then(parse_date),
                ) else {
                    continue;
                };
                let diff = (target - date).num_days().abs();
                if best.map_or(true, |(d, _)| diff < d) {
                    best = Some((diff, row));
                }
            }
            best.map_or(Value::Null, |(_, row)| source[row].clone())
        })
        .collect();

    grouped_table(table, keys, &groups, column, values)
}
