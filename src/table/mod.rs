//! Tabular data model
//!
//! Source datasets and the derived dataset are both represented as a
//! columnar [`Table`] of `serde_json::Value` cells. This module also owns the
//! pieces every derivation shares:
//!
//! - [`ColumnRef`]: `TABLE.COLUMN` / `COLUMN` references
//! - key joins that never change the left side's row count
//! - the [`TableSource`] / [`TableSink`] collaborators
//! - the per-engine [`TableCache`] and the borrowed [`SourceSet`] view

mod cache;
mod errors;
mod join;
mod reference;
mod source;
#[allow(clippy::module_inception)]
mod table;
pub mod value;

pub use cache::{SourceSet, TableCache};
pub use errors::{TableError, TableResult};
pub use join::{align_positional, left_join_column, row_key, shared_keys, Joined, KeyIndex};
pub use reference::ColumnRef;
pub use source::{JsonDirectorySink, JsonDirectorySource, MemoryTableSource, TableSink, TableSource};
pub use table::{Column, Table};
