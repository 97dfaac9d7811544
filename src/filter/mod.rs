//! Filter expression language
//!
//! A small predicate language used by `filter:` clauses, categorization
//! `cut:` rules and conditional `when:` branches. Text is parsed once into
//! a [`FilterExpr`] AST by a recursive-descent parser and evaluated to row
//! masks against tables.
//!
//! # Invariants
//!
//! - Nulls never satisfy a comparison
//! - Filter application never fails a derivation; errors degrade to the
//!   unfiltered input with a warning

mod ast;
mod errors;
mod evaluator;
mod parser;

pub use ast::{CompareOp, CutCondition, FilterExpr, Operand};
pub use errors::{FilterError, FilterResult};
pub use evaluator::{
    evaluate_mask, ColumnLookup, FilterEvaluator, Filtered, FrameLookup, ParsedFilter,
    QualifiedLookup,
};
pub use parser::{parse_cut, parse_filter};
