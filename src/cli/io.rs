//! JSON output for CLI commands
//!
//! Every command prints exactly one pretty-printed JSON document to stdout.

use std::fs;
use std::io::Write;
use std::path::Path;

use serde::Serialize;

use super::errors::CliResult;

/// Writes `value` as pretty JSON followed by a newline
pub fn write_json(out: &mut dyn Write, value: &impl Serialize) -> CliResult<()> {
    serde_json::to_writer_pretty(&mut *out, value)?;
    writeln!(out)?;
    out.flush()?;
    Ok(())
}

/// Writes `value` as pretty JSON to a file, creating parent directories
pub fn write_json_file(path: &Path, value: &impl Serialize) -> CliResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let body = serde_json::to_string_pretty(value)?;
    fs::write(path, body + "\n")?;
    Ok(())
}
