//! Row storage for Velio database.
//!
//! This module provides the `RowStore` struct which manages rows for a single table,
//! including primary key and secondary index maintenance.

use alloc::collections::BTreeMap;
use alloc::format;
use alloc::rc::Rc;
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use velio_core::schema::Table;
use velio_core::{Error, Result, Row, RowId, Value};
use velio_incremental::Delta;
use velio_index::{BTreeIndex, HashIndex, Index, KeyRange, RangeIndex};

/// Row storage backend: HashMap (O(1) lookup) or BTreeMap (O(log n) lookup).
#[cfg(feature = "hash-store")]
type RowMap = hashbrown::HashMap<RowId, Rc<Row>>;
#[cfg(not(feature = "hash-store"))]
type RowMap = BTreeMap<RowId, Rc<Row>>;

/// Trait for index storage that supports both point and range queries.
pub trait IndexStore {
    /// Adds a key-value pair to the index.
    fn add(&mut self, key: Value, row_id: RowId) -> core::result::Result<(), velio_index::IndexError>;
    /// Sets a key-value pair, replacing any existing values.
    fn set(&mut self, key: Value, row_id: RowId);
    /// Gets all row IDs for a key.
    fn get(&self, key: &Value) -> Vec<RowId>;
    /// Removes a key-value pair.
    fn remove(&mut self, key: &Value, row_id: Option<RowId>);
    /// Checks if the index contains a key.
    fn contains_key(&self, key: &Value) -> bool;
    /// Returns the number of entries.
    fn len(&self) -> usize;
    /// Returns true if empty.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
    /// Returns whether this is a unique index.
    fn is_unique(&self) -> bool;
    /// Clears all entries.
    fn clear(&mut self);
    /// Gets range of row IDs.
    fn get_range(&self, range: Option<&KeyRange<Value>>, reverse: bool, limit: Option<usize>, skip: usize) -> Vec<RowId>;
    /// Returns all row IDs in the index.
    fn get_all(&self) -> Vec<RowId>;
}

/// Wrapper for BTreeIndex that implements IndexStore.
pub struct BTreeIndexStore {
    inner: BTreeIndex<Value>,
}

impl BTreeIndexStore {
    /// Creates a new BTree index store.
    pub fn new(unique: bool) -> Self {
        Self {
            inner: BTreeIndex::new(64, unique),
        }
    }
}

impl IndexStore for BTreeIndexStore {
    fn add(&mut self, key: Value, row_id: RowId) -> core::result::Result<(), velio_index::IndexError> {
        self.inner.add(key, row_id)
    }

    fn set(&mut self, key: Value, row_id: RowId) {
        self.inner.set(key, row_id);
    }

    fn get(&self, key: &Value) -> Vec<RowId> {
        self.inner.get(key)
    }

    fn remove(&mut self, key: &Value, row_id: Option<RowId>) {
        self.inner.remove(key, row_id);
    }

    fn contains_key(&self, key: &Value) -> bool {
        self.inner.contains_key(key)
    }

    fn len(&self) -> usize {
        self.inner.len()
    }

    fn is_unique(&self) -> bool {
        self.inner.is_unique()
    }

    fn clear(&mut self) {
        self.inner.clear();
    }

    fn get_range(&self, range: Option<&KeyRange<Value>>, reverse: bool, limit: Option<usize>, skip: usize) -> Vec<RowId> {
        self.inner.get_range(range, reverse, limit, skip)
    }

    fn get_all(&self) -> Vec<RowId> {
        self.inner.get_range(None, false, None, 0)
    }
}

/// Wrapper for HashIndex that implements IndexStore.
pub struct HashIndexStore {
    inner: HashIndex<Value>,
}

impl HashIndexStore {
    /// Creates a new Hash index store.
    pub fn new(unique: bool) -> Self {
        Self {
            inner: HashIndex::new(unique),
        }
    }
}

impl IndexStore for HashIndexStore {
    fn add(&mut self, key: Value, row_id: RowId) -> core::result::Result<(), velio_index::IndexError> {
        self.inner.add(key, row_id)
    }

    fn set(&mut self, key: Value, row_id: RowId) {
        self.inner.set(key, row_id);
    }

    fn get(&self, key: &Value) -> Vec<RowId> {
        self.inner.get(key)
    }

    fn remove(&mut self, key: &Value, row_id: Option<RowId>) {
        self.inner.remove(key, row_id);
    }

    fn contains_key(&self, key: &Value) -> bool {
        self.inner.contains_key(key)
    }

    fn len(&self) -> usize {
        self.inner.len()
    }

    fn is_unique(&self) -> bool {
        self.inner.is_unique()
    }

    fn clear(&mut self) {
        self.inner.clear();
    }

    fn get_range(&self, _range: Option<&KeyRange<Value>>, _reverse: bool, _limit: Option<usize>, _skip: usize) -> Vec<RowId> {
        self.get_all()
    }

    fn get_all(&self) -> Vec<RowId> {
        self.inner.get_all_row_ids()
    }
}

/// Extracts the key value from a row for the given column indices.
fn extract_key(row: &Row, col_indices: &[usize]) -> Value {
    if col_indices.len() == 1 {
        row.get(col_indices[0]).cloned().unwrap_or(Value::Null)
    } else {
        let values: Vec<Value> = col_indices
            .iter()
            .map(|&i| row.get(i).cloned().unwrap_or(Value::Null))
            .collect();
        let key_str: String = values
            .iter()
            .map(|v| format!("{:?}", v))
            .collect::<Vec<_>>()
            .join("|");
        Value::String(key_str)
    }
}

/// Row storage for a single table.
pub struct RowStore {
    schema: Table,
    rows: RowMap,
    row_id_index: BTreeIndexStore,
    primary_index: Option<BTreeIndexStore>,
    pk_columns: Vec<usize>,
    secondary_indices: BTreeMap<String, BTreeIndexStore>,
    index_columns: BTreeMap<String, Vec<usize>>,
}

impl RowStore {
    /// Creates a new row store for the given table schema.
    pub fn new(schema: Table) -> Self {
        let mut store = Self {
            schema: schema.clone(),
            rows: RowMap::default(),
            row_id_index: BTreeIndexStore::new(true),
            primary_index: None,
            pk_columns: Vec::new(),
            secondary_indices: BTreeMap::new(),
            index_columns: BTreeMap::new(),
        };

        if let Some(pk) = schema.primary_key() {
            store.primary_index = Some(BTreeIndexStore::new(true));
            store.pk_columns = pk
                .columns()
                .iter()
                .filter_map(|c| schema.get_column_index(&c.name))
                .collect();
        }

        for idx in schema.indices() {
            let cols: Vec<usize> = idx
                .columns()
                .iter()
                .filter_map(|c| schema.get_column_index(&c.name))
                .collect();

            store.secondary_indices.insert(
                idx.name().to_string(),
                BTreeIndexStore::new(idx.is_unique()),
            );
            store.index_columns.insert(idx.name().to_string(), cols);
        }

        store
    }

    /// Returns the table schema.
    pub fn schema(&self) -> &Table {
        &self.schema
    }

    /// Returns the number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns true if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Inserts a row into the store.
    pub fn insert(&mut self, row: Row) -> Result<RowId> {
        let row_id = row.id();

        if self.rows.contains_key(&row_id) {
            return Err(Error::invalid_operation("Row ID already exists"));
        }

        // Check primary key uniqueness
        let pk_value = if !self.pk_columns.is_empty() {
            let pk = extract_key(&row, &self.pk_columns);
            if let Some(ref pk_index) = self.primary_index {
                if pk_index.contains_key(&pk) {
                    return Err(Error::UniqueConstraint {
                        column: "primary_key".into(),
                        value: pk,
                    });
                }
            }
            Some(pk)
        } else {
            None
        };

        // Add to row ID index
        self.row_id_index
            .add(Value::Int64(row_id as i64), row_id)
            .map_err(|_| Error::invalid_operation("Failed to add to row ID index"))?;

        // Add to primary key index
        if let (Some(ref mut pk_index), Some(pk)) = (&mut self.primary_index, pk_value.clone()) {
            if pk_index.add(pk.clone(), row_id).is_err() {
                self.row_id_index.remove(&Value::Int64(row_id as i64), Some(row_id));
                return Err(Error::UniqueConstraint {
                    column: "primary_key".into(),
                    value: pk,
                });
            }
        }

        // Add to secondary indices
        // Collect index names first to avoid borrow conflict
        let index_names: Vec<String> = self.index_columns.keys().cloned().collect();
        for idx_name in &index_names {
            let cols = &self.index_columns[idx_name];
            let key = extract_key(&row, cols);
            if let Some(idx) = self.secondary_indices.get_mut(idx_name) {
                if idx.add(key.clone(), row_id).is_err() {
                    self.rollback_insert(row_id, &row);
                    return Err(Error::UniqueConstraint {
                        column: idx_name.clone(),
                        value: key,
                    });
                }
            }
        }

        self.rows.insert(row_id, Rc::new(row));
        Ok(row_id)
    }

    fn rollback_insert(&mut self, row_id: RowId, row: &Row) {
        self.row_id_index.remove(&Value::Int64(row_id as i64), Some(row_id));

        if let Some(ref mut pk_index) = self.primary_index {
            let pk_value = extract_key(row, &self.pk_columns);
            pk_index.remove(&pk_value, Some(row_id));
        }

        let index_names: Vec<String> = self.index_columns.keys().cloned().collect();
        for idx_name in &index_names {
            let cols = &self.index_columns[idx_name];
            let key = extract_key(row, cols);
            if let Some(idx) = self.secondary_indices.get_mut(idx_name) {
                idx.remove(&key, Some(row_id));
            }
        }
    }

    /// Updates a row in the store.
    pub fn update(&mut self, row_id: RowId, new_row: Row) -> Result<()> {
        let old_row = self.rows.get(&row_id).ok_or_else(|| {
            Error::not_found(self.schema.name(), Value::Int64(row_id as i64))
        })?.clone();

        // Check primary key uniqueness if PK changed
        if !self.pk_columns.is_empty() {
            let old_pk = extract_key(&old_row, &self.pk_columns);
            let new_pk = extract_key(&new_row, &self.pk_columns);
            if let Some(ref pk_index) = self.primary_index {
                if old_pk != new_pk && pk_index.contains_key(&new_pk) {
                    return Err(Error::UniqueConstraint {
                        column: "primary_key".into(),
                        value: new_pk,
                    });
                }
            }
        }

        // Check secondary index uniqueness (only for unique indexes)
        for (idx_name, cols) in &self.index_columns {
            let old_key = extract_key(&old_row, cols);
            let new_key = extract_key(&new_row, cols);
            if let Some(idx) = self.secondary_indices.get(idx_name) {
                if idx.is_unique() && old_key != new_key && idx.contains_key(&new_key) {
                    return Err(Error::UniqueConstraint {
                        column: idx_name.clone(),
                        value: new_key,
                    });
                }
            }
        }

        // Update primary key index
        if !self.pk_columns.is_empty() {
            let old_pk = extract_key(&old_row, &self.pk_columns);
            let new_pk = extract_key(&new_row, &self.pk_columns);
            if let Some(ref mut pk_index) = self.primary_index {
                if old_pk != new_pk {
                    pk_index.remove(&old_pk, Some(row_id));
                    let _ = pk_index.add(new_pk, row_id);
                }
            }
        }

        // Update secondary indices
        let index_names: Vec<String> = self.index_columns.keys().cloned().collect();
        for idx_name in &index_names {
            let cols = &self.index_columns[idx_name];
            let old_key = extract_key(&old_row, cols);
            let new_key = extract_key(&new_row, cols);
            if let Some(idx) = self.secondary_indices.get_mut(idx_name) {
                if old_key != new_key {
                    idx.remove(&old_key, Some(row_id));
                    let _ = idx.add(new_key, row_id);
                }
            }
        }

        self.rows.insert(row_id, Rc::new(new_row));
        Ok(())
    }

    /// Deletes a row from the store.
    pub fn delete(&mut self, row_id: RowId) -> Result<Rc<Row>> {
        let row = self.rows.remove(&row_id).ok_or_else(|| {
            Error::not_found(self.schema.name(), Value::Int64(row_id as i64))
        })?;

        self.row_id_index.remove(&Value::Int64(row_id as i64), Some(row_id));

        if !self.pk_columns.is_empty() {
            let pk_value = extract_key(&row, &self.pk_columns);
            if let Some(ref mut pk_index) = self.primary_index {
                pk_index.remove(&pk_value, Some(row_id));
            }
        }

        let index_names: Vec<String> = self.index_columns.keys().cloned().collect();
        for idx_name in &index_names {
            let cols = &self.index_columns[idx_name];
            let key = extract_key(&row, cols);
            if let Some(idx) = self.secondary_indices.get_mut(idx_name) {
                idx.remove(&key, Some(row_id));
            }
        }

        Ok(row)
    }

    /// Gets a row by ID.
    pub fn get(&self, row_id: RowId) -> Option<Rc<Row>> {
        self.rows.get(&row_id).cloned()
    }

    /// Gets a mutable reference to a row by ID (requires exclusive access).
    /// Note: This clones the Rc and returns a new Row if mutation is needed.
    pub fn get_mut(&mut self, row_id: RowId) -> Option<&mut Row> {
        self.rows.get_mut(&row_id).map(|rc| Rc::make_mut(rc))
    }

    /// Returns an iterator over all rows.
    pub fn scan(&self) -> impl Iterator<Item = Rc<Row>> + '_ {
        self.rows.values().cloned()
    }

    /// Returns all row IDs.
    pub fn row_ids(&self) -> Vec<RowId> {
        self.rows.keys().copied().collect()
    }

    /// Gets rows by primary key value.
    pub fn get_by_pk(&self, pk_value: &Value) -> Vec<Rc<Row>> {
        if let Some(ref pk_index) = self.primary_index {
            pk_index
                .get(pk_value)
                .iter()
                .filter_map(|&id| self.rows.get(&id).cloned())
                .collect()
        } else {
            Vec::new()
        }
    }

    /// Finds existing row ID by primary key.
    pub fn find_row_id_by_pk(&self, row: &Row) -> Option<RowId> {
        if let Some(ref pk_index) = self.primary_index {
            let pk_value = extract_key(row, &self.pk_columns);
            pk_index.get(&pk_value).first().copied()
        } else {
            None
        }
    }

    /// Checks if a primary key value exists.
    pub fn pk_exists(&self, pk_value: &Value) -> bool {
        if let Some(ref pk_index) = self.primary_index {
            pk_index.contains_key(pk_value)
        } else {
            false
        }
    }

    /// Gets rows by index scan.
    pub fn index_scan(&self, index_name: &str, range: Option<&KeyRange<Value>>) -> Vec<Rc<Row>> {
        if let Some(idx) = self.secondary_indices.get(index_name) {
            idx.get_range(range, false, None, 0)
                .iter()
                .filter_map(|&id| self.rows.get(&id).cloned())
                .collect()
        } else {
            Vec::new()
        }
    }

    /// Gets rows by index scan with limit.
    pub fn index_scan_with_limit(
        &self,
        index_name: &str,
        range: Option<&KeyRange<Value>>,
        limit: Option<usize>,
    ) -> Vec<Rc<Row>> {
        self.index_scan_with_limit_offset(index_name, range, limit, 0)
    }

    /// Gets rows by index scan with limit and offset.
    /// This enables true pushdown of LIMIT/OFFSET to the storage layer.
    pub fn index_scan_with_limit_offset(
        &self,
        index_name: &str,
        range: Option<&KeyRange<Value>>,
        limit: Option<usize>,
        offset: usize,
    ) -> Vec<Rc<Row>> {
        self.index_scan_with_options(index_name, range, limit, offset, false)
    }

    /// Gets rows by index scan with limit, offset, and reverse option.
    /// This enables true pushdown of LIMIT/OFFSET/ORDER to the storage layer.
    pub fn index_scan_with_options(
        &self,
        index_name: &str,
        range: Option<&KeyRange<Value>>,
        limit: Option<usize>,
        offset: usize,
        reverse: bool,
    ) -> Vec<Rc<Row>> {
        if let Some(idx) = self.secondary_indices.get(index_name) {
            idx.get_range(range, reverse, limit, offset)
                .iter()
                .filter_map(|&id| self.rows.get(&id).cloned())
                .collect()
        } else {
            Vec::new()
        }
    }

    /// Clears all rows and indices.
    pub fn clear(&mut self) {
        self.rows.clear();
        self.row_id_index.clear();
        if let Some(ref mut pk_index) = self.primary_index {
            pk_index.clear();
        }
        for idx in self.secondary_indices.values_mut() {
            idx.clear();
        }
    }

    /// Gets multiple rows by IDs.
    pub fn get_many(&self, row_ids: &[RowId]) -> Vec<Option<Rc<Row>>> {
        row_ids.iter().map(|&id| self.rows.get(&id).cloned()).collect()
    }

    /// Inserts a row or replaces an existing row with the same primary key.
    /// Returns the row ID and whether it was a replacement.
    pub fn insert_or_replace(&mut self, row: Row) -> Result<(RowId, bool)> {
        // Check if a row with the same PK already exists
        if let Some(existing_row_id) = self.find_row_id_by_pk(&row) {
            // Replace: update the existing row, preserving the original row ID
            let updated_row = Row::new(existing_row_id, row.values().to_vec());
            self.update(existing_row_id, updated_row)?;
            Ok((existing_row_id, true))
        } else {
            // Insert: add as new row
            let row_id = self.insert(row)?;
            Ok((row_id, false))
        }
    }

    /// Checks if a secondary index contains a key (for unique constraint checking).
    pub fn secondary_index_contains(&self, index_name: &str, key: &Value) -> bool {
        if let Some(idx) = self.secondary_indices.get(index_name) {
            idx.contains_key(key)
        } else {
            false
        }
    }

    /// Gets the primary key columns indices.
    pub fn pk_columns(&self) -> &[usize] {
        &self.pk_columns
    }

    /// Extracts the primary key value from a row.
    pub fn extract_pk(&self, row: &Row) -> Option<Value> {
        if self.pk_columns.is_empty() {
            None
        } else {
            Some(extract_key(row, &self.pk_columns))
        }
    }

    /// Inserts a row and returns a Delta for IVM propagation.
    pub fn insert_with_delta(&mut self, row: Row) -> Result<Delta<Row>> {
        let row_clone = row.clone();
        self.insert(row)?;
        Ok(Delta::insert(row_clone))
    }

    /// Deletes a row and returns a Delta for IVM propagation.
    pub fn delete_with_delta(&mut self, row_id: RowId) -> Result<Delta<Row>> {
        let row = self.delete(row_id)?;
        Ok(Delta::delete((*row).clone()))
    }

    /// Updates a row and returns Deltas for IVM propagation (delete old + insert new).
    pub fn update_with_delta(&mut self, row_id: RowId, new_row: Row) -> Result<(Delta<Row>, Delta<Row>)> {
        let old_row = self.rows.get(&row_id).ok_or_else(|| {
            Error::not_found(self.schema.name(), Value::Int64(row_id as i64))
        })?.clone();
        let new_row_clone = new_row.clone();
        self.update(row_id, new_row)?;
        Ok((Delta::delete((*old_row).clone()), Delta::insert(new_row_clone)))
    }

}
