//! Command line interface
//!
//! Commands:
//! - `resolve`: print the merged spec
//! - `deps`: print the source tables a spec depends on
//! - `build`: derive, write and report one dataset
//!
//! Every command prints a single JSON document to stdout. Errors are printed
//! to stderr as `CODE: message` and exit with status 1.

mod args;
mod commands;
mod errors;
mod io;

pub use args::{BuildArgs, Cli, Command};
pub use commands::{build, deps, resolve, run, run_command};
pub use errors::{CliError, CliErrorCode, CliResult};
