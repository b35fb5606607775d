//! Table Registry
//!
//! Holds every table definition for the lifetime of the process. Built once
//! at start-up and shared by reference; definitions are validated on
//! registration and read-only afterwards.

use super::schema::{ColumnSource, Table};
use crate::error::{Error, Result};
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

/// Registered tables, keyed by name
#[derive(Debug, Clone, Default)]
pub struct TableRegistry {
    tables: BTreeMap<&'static str, Arc<Table>>,
}

impl TableRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every AWS table
    pub fn aws() -> Result<Self> {
        let mut registry = Self::new();
        for table in crate::tables::all() {
            registry.register(table)?;
        }
        Ok(registry)
    }

    /// Validate and add a table
    pub fn register(&mut self, table: Table) -> Result<()> {
        if self.tables.contains_key(table.name) {
            return Err(Error::Schema(format!("table '{}' registered twice", table.name)));
        }
        validate(&table)?;
        tracing::debug!("registered table {} ({} columns)", table.name, table.columns.len());
        self.tables.insert(table.name, Arc::new(table));
        Ok(())
    }

    /// Get a table definition by name
    pub fn get(&self, name: &str) -> Result<Arc<Table>> {
        self.tables
            .get(name)
            .cloned()
            .ok_or_else(|| Error::UnknownTable(name.to_string()))
    }

    /// All table names, sorted
    pub fn table_names(&self) -> Vec<&'static str> {
        self.tables.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

fn validate(table: &Table) -> Result<()> {
    let schema_err = |msg: String| Err(Error::Schema(format!("{}: {}", table.name, msg)));

    let mut names = HashSet::new();
    for column in &table.columns {
        if !names.insert(column.name) {
            return schema_err(format!("duplicate column '{}'", column.name));
        }
    }

    let mut sources = HashSet::new();
    for source in &table.hydrate {
        if !sources.insert(source.name) {
            return schema_err(format!("duplicate hydration source '{}'", source.name));
        }
    }

    for column in &table.columns {
        if let ColumnSource::Hydrate { source, .. } = &column.source {
            if !sources.contains(source) {
                return schema_err(format!(
                    "column '{}' references unknown hydration source '{}'",
                    column.name, source
                ));
            }
        }
    }

    let list_keys = table.list.as_ref().map(|l| l.key_columns).unwrap_or(&[]);
    let get_keys = table.get.as_ref().map(|g| g.key_columns).unwrap_or(&[]);
    for key in list_keys.iter().chain(get_keys) {
        if !names.contains(key) {
            return schema_err(format!("key column '{}' is not a column", key));
        }
    }

    if let Some(satisfied) = table.get.as_ref().and_then(|g| g.satisfies) {
        if !sources.contains(satisfied) {
            return schema_err(format!("get satisfies unknown source '{}'", satisfied));
        }
    }

    if table.list.is_none() && table.get.is_none() {
        return schema_err("no list or get strategy".to_string());
    }

    Ok(())
}
