//! Per-engine cache of loaded source tables

use std::collections::HashMap;

use tracing::info;

use super::source::TableSource;
use super::table::Table;
use crate::observability::Event;

/// Source tables loaded once per engine, keyed by uppercase name.
///
/// Load order is remembered: bare-name lookups search tables in the order
/// they were first loaded.
#[derive(Debug, Default)]
pub struct TableCache {
    tables: HashMap<String, Table>,
    order: Vec<String>,
}

impl TableCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads the named tables that are not cached yet.
    ///
    /// Returns the names that still could not be loaded.
    pub fn load_missing(&mut self, source: &dyn TableSource, names: &[String]) -> Vec<String> {
        let wanted: Vec<String> = names
            .iter()
            .map(|n| n.to_uppercase())
            .filter(|n| !self.tables.contains_key(n))
            .collect();

        if !wanted.is_empty() {
            let mut loaded = source.load_many(&wanted);
            for name in &wanted {
                if let Some(table) = loaded.remove(name) {
                    info!(
                        event = Event::SourceLoaded.as_str(),
                        table = %name,
                        rows = table.height(),
                        "source table cached"
                    );
                    self.order.push(name.clone());
                    self.tables.insert(name.clone(), table);
                }
            }
        }

        names
            .iter()
            .map(|n| n.to_uppercase())
            .filter(|n| !self.tables.contains_key(n))
            .collect()
    }

    pub fn get(&self, name: &str) -> Option<&Table> {
        self.tables.get(&name.to_uppercase())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tables.contains_key(&name.to_uppercase())
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Drops every cached table
    pub fn clear(&mut self) {
        self.tables.clear();
        self.order.clear();
    }

    /// Ordered view over the named tables, following load order
    pub fn view(&self, names: &[String]) -> SourceSet<'_> {
        let wanted: Vec<String> = names.iter().map(|n| n.to_uppercase()).collect();
        let tables = self
            .order
            .iter()
            .filter(|n| wanted.contains(n))
            .filter_map(|n| self.tables.get(n))
            .collect();
        SourceSet::new(tables)
    }
}

/// Borrowed, ordered set of source tables handed to derivation strategies
#[derive(Debug, Clone, Default)]
pub struct SourceSet<'a> {
    tables: Vec<&'a Table>,
}

impl<'a> SourceSet<'a> {
    pub fn new(tables: Vec<&'a Table>) -> Self {
        Self { tables }
    }

    /// Table by (case-insensitive) name
    pub fn get(&self, name: &str) -> Option<&'a Table> {
        self.tables
            .iter()
            .copied()
            .find(|t| t.name().eq_ignore_ascii_case(name))
    }

    /// First table in load order carrying `column`
    pub fn first_with_column(&self, column: &str) -> Option<&'a Table> {
        self.tables.iter().copied().find(|t| t.has_column(column))
    }

    pub fn iter(&self) -> impl Iterator<Item = &'a Table> + '_ {
        self.tables.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}
