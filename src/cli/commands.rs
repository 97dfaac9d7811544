//! CLI command implementations
//!
//! Each command writes one JSON document to the given writer. Logs go to
//! stderr through the observability subsystem.

use std::io::{self, Write};
use std::path::PathBuf;

use serde::Serialize;
use serde_json::json;

use super::args::{BuildArgs, Cli, Command};
use super::errors::{CliError, CliResult};
use super::io::{write_json, write_json_file};
use crate::config::EngineConfig;
use crate::engine::{BuildReport, DerivationEngine};
use crate::observability::init_logging;
use crate::spec::{DependencyAnalyzer, ResolvedSpec, SpecResolver};
use crate::table::{JsonDirectorySink, JsonDirectorySource};

/// Main entry point for CLI
pub fn run() -> CliResult<()> {
    let cli = Cli::parse_args();
    // `build` installs logging itself once its config file is read
    if !matches!(cli.command, Command::Build(_)) {
        init_logging(None);
    }
    let stdout = io::stdout();
    let mut out = stdout.lock();
    run_command(cli.command, &mut out)
}

/// Run a specific command
pub fn run_command(command: Command, out: &mut dyn Write) -> CliResult<()> {
    match command {
        Command::Resolve { spec } => resolve(spec, out),
        Command::Deps { spec } => deps(spec, out),
        Command::Build(args) => build(args, out),
    }
}

/// Print the merged, typed spec
pub fn resolve(spec: PathBuf, out: &mut dyn Write) -> CliResult<()> {
    let spec = SpecResolver::resolve_file(&spec)?;
    write_json(out, &spec)
}

/// Print the source tables and fields the spec reads
pub fn deps(spec: PathBuf, out: &mut dyn Write) -> CliResult<()> {
    let spec = SpecResolver::resolve_file(&spec)?;
    let report = DependencyAnalyzer::analyze(&spec);

    let tables: Vec<_> = report
        .tables
        .iter()
        .map(|t| json!({"table": t, "fields": report.fields_of(t)}))
        .collect();
    write_json(
        out,
        &json!({
            "domain": spec.domain,
            "tables": tables,
            "dependencies": report.dependencies,
        }),
    )
}

#[derive(Serialize)]
struct BuildSummary<'a> {
    output: PathBuf,
    report: &'a BuildReport,
}

/// Build the dataset and write it to the output directory.
///
/// Directory precedence: command line flag, then config file, then the
/// spec's `sdtm_dir` / `adam_dir`.
pub fn build(args: BuildArgs, out: &mut dyn Write) -> CliResult<()> {
    let config = match &args.config {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };
    init_logging(config.log_filter.as_deref());

    let spec = SpecResolver::resolve_file(&args.spec)?;
    let (source_dir, output_dir) = directories(&args, &config, &spec)?;

    let mut engine = DerivationEngine::new(Box::new(JsonDirectorySource::new(source_dir)));
    let output = engine.build(&spec)?;
    let path = output.write(&JsonDirectorySink::new(output_dir))?;

    if let Some(report_path) = &args.report {
        write_json_file(report_path, &output.report)?;
    }

    write_json(
        out,
        &BuildSummary {
            output: path,
            report: &output.report,
        },
    )
}

fn directories(
    args: &BuildArgs,
    config: &EngineConfig,
    spec: &ResolvedSpec,
) -> CliResult<(PathBuf, PathBuf)> {
    let source_dir = args
        .source_dir
        .clone()
        .or_else(|| config.source_dir.clone())
        .or_else(|| spec.source_dir.clone())
        .ok_or_else(|| CliError::missing_directory("source directory"))?;
    let output_dir = args
        .output_dir
        .clone()
        .or_else(|| config.output_dir.clone())
        .or_else(|| spec.output_dir.clone())
        .ok_or_else(|| CliError::missing_directory("output directory"))?;
    Ok((source_dir, output_dir))
}
