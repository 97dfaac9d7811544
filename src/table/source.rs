//! Table sources and sinks
//!
//! The engine never reads files itself. It asks a `TableSource` for tables
//! by name and hands finished tables to a `TableSink`. Names are normalised
//! to uppercase on the way in.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{debug, warn};

use super::errors::{TableError, TableResult};
use super::table::Table;
use crate::observability::Event;

/// Provider of named source tables
pub trait TableSource {
    /// Loads one table by (case-insensitive) name
    fn load(&self, name: &str) -> TableResult<Table>;

    /// Loads several tables; failures are logged and skipped
    fn load_many(&self, names: &[String]) -> BTreeMap<String, Table> {
        let mut loaded = BTreeMap::new();
        for name in names {
            let upper = name.to_uppercase();
            match self.load(&upper) {
                Ok(table) => {
                    loaded.insert(upper, table);
                }
                Err(e) => {
                    warn!(
                        event = Event::SourceLoadFailed.as_str(),
                        table = %upper,
                        error = %e,
                        "failed to load source table"
                    );
                }
            }
        }
        loaded
    }
}

/// Consumer of finished tables
pub trait TableSink {
    /// Persists a table and returns where it went
    fn write(&self, table: &Table) -> TableResult<PathBuf>;
}

/// In-memory source, mostly for tests and embedding
#[derive(Debug, Default, Clone)]
pub struct MemoryTableSource {
    tables: HashMap<String, Table>,
}

impl MemoryTableSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a table under its uppercased name
    pub fn insert(&mut self, table: Table) {
        self.tables.insert(table.name().to_uppercase(), table);
    }

    pub fn with_table(mut self, table: Table) -> Self {
        self.insert(table);
        self
    }
}

impl TableSource for MemoryTableSource {
    fn load(&self, name: &str) -> TableResult<Table> {
        self.tables
            .get(&name.to_uppercase())
            .cloned()
            .ok_or_else(|| TableError::NotFound(name.to_uppercase()))
    }
}

/// Directory of `<name>.json` files, each a JSON array of row objects.
///
/// Lowercase file names are tried first, then uppercase.
#[derive(Debug, Clone)]
pub struct JsonDirectorySource {
    dir: PathBuf,
}

impl JsonDirectorySource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, name: &str) -> Option<PathBuf> {
        [name.to_lowercase(), name.to_uppercase()]
            .iter()
            .map(|stem| self.dir.join(format!("{}.json", stem)))
            .find(|p| p.is_file())
    }
}

impl TableSource for JsonDirectorySource {
    fn load(&self, name: &str) -> TableResult<Table> {
        let upper = name.to_uppercase();
        let path = self
            .path_for(name)
            .ok_or_else(|| TableError::NotFound(upper.clone()))?;
        let shown = path.display().to_string();

        let content = fs::read_to_string(&path).map_err(|e| TableError::io(&shown, e))?;
        let parsed: Value =
            serde_json::from_str(&content).map_err(|e| TableError::io(&shown, e))?;
        let records = parsed.as_array().ok_or_else(|| TableError::InvalidRecord {
            table: upper.clone(),
            reason: format!("{} does not contain a JSON array", shown),
        })?;

        let table = Table::from_records(upper, records)?;
        debug!(
            table = table.name(),
            rows = table.height(),
            columns = table.width(),
            path = %shown,
            "loaded source table"
        );
        Ok(table)
    }
}

/// Writes tables as `<dir>/<name lowercase>.json`
#[derive(Debug, Clone)]
pub struct JsonDirectorySink {
    dir: PathBuf,
}

impl JsonDirectorySink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl TableSink for JsonDirectorySink {
    fn write(&self, table: &Table) -> TableResult<PathBuf> {
        fs::create_dir_all(&self.dir)
            .map_err(|e| TableError::io(self.dir.display().to_string(), e))?;
        let path = self
            .dir
            .join(format!("{}.json", table.name().to_lowercase()));
        let shown = path.display().to_string();
        let body = serde_json::to_string_pretty(&Value::Array(table.to_records()))
            .map_err(|e| TableError::io(&shown, e))?;
        fs::write(&path, body).map_err(|e| TableError::io(&shown, e))?;
        Ok(path)
    }
}
