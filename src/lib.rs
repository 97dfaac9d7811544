//! adamderive - derive analysis datasets from source tables and a YAML spec
//!
//! A spec names an output domain, its identity keys and one derivation per
//! column. The engine loads the source tables the spec refers to, builds a
//! key frame, derives each column in declaration order and validates the
//! result. A column that fails is null-filled and reported; only missing
//! source tables or an unusable key frame stop a build.
//!
//! ```ignore
//! use adamderive::engine::DerivationEngine;
//! use adamderive::spec::SpecResolver;
//! use adamderive::table::JsonDirectorySource;
//!
//! let spec = SpecResolver::resolve_file("specs/adsl.yaml".as_ref())?;
//! let mut engine = DerivationEngine::new(Box::new(JsonDirectorySource::new("data/sdtm")));
//! let output = engine.build(&spec)?;
//! ```

pub mod aggregate;
pub mod cli;
pub mod config;
pub mod derive;
pub mod engine;
pub mod errors;
pub mod filter;
pub mod observability;
pub mod spec;
pub mod table;
pub mod validation;
