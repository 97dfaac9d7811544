//! CLI argument definitions using clap
//!
//! Commands:
//! - adamderive resolve --spec <path>
//! - adamderive deps --spec <path>
//! - adamderive build --spec <path> [--config <path>] [--source-dir <dir>] [--output-dir <dir>]

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// adamderive - derive analysis datasets from source tables and a YAML spec
#[derive(Parser, Debug)]
#[command(name = "adamderive")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the merged, typed spec as JSON
    Resolve {
        /// Path to the spec document
        #[arg(long)]
        spec: PathBuf,
    },

    /// List the source tables and fields a spec reads
    Deps {
        /// Path to the spec document
        #[arg(long)]
        spec: PathBuf,
    },

    /// Build the dataset, write it and print the build report
    Build(BuildArgs),
}

#[derive(Args, Debug, Clone)]
pub struct BuildArgs {
    /// Path to the spec document
    #[arg(long)]
    pub spec: PathBuf,

    /// Path to an engine configuration file
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Directory of source tables (overrides config and spec)
    #[arg(long)]
    pub source_dir: Option<PathBuf>,

    /// Output directory (overrides config and spec)
    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    /// Also write the build report to this file
    #[arg(long)]
    pub report: Option<PathBuf>,
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
