//! Cache management for Velio database.
//!
//! This module provides the `TableCache` struct which manages multiple table stores.

use crate::row_store::RowStore;
use alloc::collections::BTreeMap;
use alloc::format;
use alloc::rc::Rc;
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use velio_core::schema::Table;
use velio_core::{Error, Result, Row, RowId};

/// Cache for managing multiple table stores.
pub struct TableCache {
    /// Table name → RowStore mapping.
    tables: BTreeMap<String, RowStore>,
}

impl TableCache {
    /// Creates a new empty table cache.
    pub fn new() -> Self {
        Self {
            tables: BTreeMap::new(),
        }
    }

    /// Creates a table in the cache.
    pub fn create_table(&mut self, schema: Table) -> Result<()> {
        let name = schema.name().to_string();
        if self.tables.contains_key(&name) {
            return Err(Error::invalid_schema(format!(
                "Table already exists: {}",
                name
            )));
        }
        self.tables.insert(name, RowStore::new(schema));
        Ok(())
    }

    /// Drops a table from the cache.
    pub fn drop_table(&mut self, name: &str) -> Result<()> {
        if self.tables.remove(name).is_none() {
            return Err(Error::table_not_found(name));
        }
        Ok(())
    }

    /// Gets a reference to a table store.
    pub fn get_table(&self, name: &str) -> Option<&RowStore> {
        self.tables.get(name)
    }

    /// Gets a mutable reference to a table store.
    pub fn get_table_mut(&mut self, name: &str) -> Option<&mut RowStore> {
        self.tables.get_mut(name)
    }

    /// Returns the number of tables.
    pub fn table_count(&self) -> usize {
        self.tables.len()
    }

    /// Returns all table names.
    pub fn table_names(&self) -> Vec<&str> {
        self.tables.keys().map(|s| s.as_str()).collect()
    }

    /// Returns the total row count across all tables.
    pub fn total_row_count(&self) -> usize {
        self.tables.values().map(|t| t.len()).sum()
    }

    /// Gets a row by table name and row ID.
    pub fn get_row(&self, table: &str, row_id: RowId) -> Option<Rc<Row>> {
        self.tables.get(table).and_then(|t| t.get(row_id))
    }

    /// Gets multiple rows by table name and row IDs.
    pub fn get_many(&self, table: &str, row_ids: &[RowId]) -> Vec<Option<Rc<Row>>> {
        if let Some(store) = self.tables.get(table) {
            store.get_many(row_ids)
        } else {
            row_ids.iter().map(|_| None).collect()
        }
    }

    /// Checks if a table exists.
    pub fn has_table(&self, name: &str) -> bool {
        self.tables.contains_key(name)
    }

    /// Clears all tables.
    pub fn clear(&mut self) {
        for store in self.tables.values_mut() {
            store.clear();
        }
    }

    /// Clears a specific table.
    pub fn clear_table(&mut self, name: &str) -> Result<()> {
        if let Some(store) = self.tables.get_mut(name) {
            store.clear();
            Ok(())
        } else {
            Err(Error::table_not_found(name))
        }
    }
}

impl Default for TableCache {
    fn default() -> Self {
        Self::new()
    }
}
