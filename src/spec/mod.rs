//! Derivation spec subsystem
//!
//! A spec is a chain of YAML or JSON documents. Each document may name
//! `parents`; parents are loaded first and every document overrides the
//! ones before it. The merged chain is typed into a [`ResolvedSpec`]:
//!
//! - scalar and mapping fields: child wins, mappings merge key by key
//! - `columns`: matched by `name`; matching entries merge, new entries are
//!   appended in child order, `drop: true` removes a column for good
//! - each column's `derivation` is typed once into a
//!   [`DerivationDescriptor`]
//!
//! All field-level problems are gathered into a single fatal
//! [`SpecError`] so a spec author sees every issue in one pass.
//!
//! [`DependencyAnalyzer`] then lists the source tables the spec reads.

mod dependency;
mod descriptor;
mod errors;
mod loader;
mod merger;
mod resolver;
mod types;

pub use dependency::{scan_text, scan_value, Dependency, DependencyAnalyzer, DependencyReport};
pub use descriptor::{CutRule, DerivationDescriptor, FunctionArg, ValueMapping, WhenThen};
pub use errors::{SpecError, SpecErrorCode, SpecIssue, SpecResult};
pub use loader::{SpecDocument, SpecLoader};
pub use merger::{
    deep_merge, filter_dropped, merge_documents, upsert_by_name, ColumnEntry, ColumnTable,
    MergedSpec,
};
pub use resolver::SpecResolver;
pub use types::{ColumnSpec, DataType, ResolvedSpec, ValidationRules, CORE_VALUES};
