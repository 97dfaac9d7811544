//! Cell value helpers
//!
//! Cells are `serde_json::Value` scalars (null, bool, number, string).
//! Comparison rules shared by filters, cuts, aggregation and validation:
//!
//! - Null never compares equal or ordered to anything
//! - Two values that both coerce to numbers compare numerically
//! - Two strings that do not both coerce compare lexically
//! - Mixed non-numeric kinds are unordered

use std::cmp::Ordering;

use chrono::NaiveDate;
use serde_json::{Number, Value};

/// Numeric view of a cell, parsing numeric strings
pub fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()),
        _ => None,
    }
}

/// Builds a numeric cell; non-finite results become null
pub fn number_value(f: f64) -> Value {
    Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null)
}

/// Text view of a scalar cell
pub fn display_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Equality with numeric coercion; nulls never match
pub fn loose_eq(a: &Value, b: &Value) -> bool {
    if a.is_null() || b.is_null() {
        return false;
    }
    match (as_number(a), as_number(b)) {
        (Some(x), Some(y)) => x == y,
        _ => display_text(a) == display_text(b),
    }
}

/// Ordering with numeric coercion; `None` when the pair is unordered
pub fn compare(a: &Value, b: &Value) -> Option<Ordering> {
    if a.is_null() || b.is_null() {
        return None;
    }
    if let (Some(x), Some(y)) = (as_number(a), as_number(b)) {
        return x.partial_cmp(&y);
    }
    match (a, b) {
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

/// Parses an ISO calendar date, ignoring any trailing time part.
///
/// Partial dates (`2024-03`) and anything unparsable yield `None`.
pub fn parse_date(value: &Value) -> Option<NaiveDate> {
    let text = value.as_str()?.trim();
    let head = text.get(..10)?;
    match text[10..].chars().next() {
        None | Some('T') | Some(' ') => {}
        Some(_) => return None,
    }
    NaiveDate::parse_from_str(head, "%Y-%m-%d").ok()
}

/// Hashable identity of a cell for key tuples; `None` for null
pub fn key_part(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        other => Some(other.to_string()),
    }
}
