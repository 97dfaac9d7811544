//! Column derivation
//!
//! One strategy per [`DerivationDescriptor`](crate::spec::DerivationDescriptor)
//! variant:
//!
//! | Descriptor     | Strategy                                   |
//! |----------------|--------------------------------------------|
//! | Constant       | literal replicated to the frame height     |
//! | SourceRef      | filtered source column joined by key       |
//! | Aggregation    | per-key reduction joined by key            |
//! | Categorization | cut rules, later rules win                 |
//! | Conditional    | when/then branches, first match wins       |
//! | CustomFunction | registered function over resolved args     |
//!
//! Strategies only read from a [`DerivationContext`]. Every failure is a
//! [`DeriveError`] scoped to one column; the engine null-fills the column and
//! continues.

mod aggregation;
mod categorization;
mod conditional;
mod constant;
mod context;
mod custom;
mod dispatcher;
mod errors;
mod functions;
mod source;

pub use categorization::categorize;
pub use context::{DerivationContext, Derived};
pub use dispatcher::DerivationDispatcher;
pub use errors::{DeriveError, DeriveResult};
pub use functions::{bmi, ArgValue, CustomFunction, FunctionArgs, FunctionRegistry};
