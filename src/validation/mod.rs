//! Post-build data validation
//!
//! Checks the finished table against each column's `validation` block and
//! the dataset-level key contract. Findings are reported, never raised: a
//! build with error findings still produces its table.

mod finding;
mod validator;

pub use finding::{Finding, FindingLevel};
pub use validator::DataValidator;
