//! Hash index implementation for Velio database.
//!
//! This module provides a hash-based index for O(1) point queries.

use crate::stats::IndexStats;
use crate::traits::{Index, IndexError, KeyRange};
use alloc::vec::Vec;
use velio_core::RowId;
use hashbrown::HashMap;

/// A hash-based index for O(1) point queries.
///
/// This index uses a HashMap internally and supports both unique and non-unique indexes.
/// It does not support range queries efficiently.
#[derive(Debug)]
pub struct HashIndex<K> {
    /// The underlying map from keys to row IDs.
    map: HashMap<K, Vec<RowId>>,
    /// Whether this is a unique index.
    unique: bool,
    /// Statistics for this index.
    stats: IndexStats,
}

impl<K: Eq + core::hash::Hash + Clone> HashIndex<K> {
    /// Creates a new hash index.
    pub fn new(unique: bool) -> Self {
        Self {
            map: HashMap::new(),
            unique,
            stats: IndexStats::new(),
        }
    }

    /// Returns whether this is a unique index.
    pub fn is_unique(&self) -> bool {
        self.unique
    }

    /// Returns the statistics for this index.
    pub fn stats(&self) -> &IndexStats {
        &self.stats
    }

    /// Returns all row IDs in the index.
    pub fn get_all_row_ids(&self) -> Vec<RowId> {
        self.map.values().flatten().copied().collect()
    }
}

impl<K: Eq + core::hash::Hash + Clone + Ord> Index<K> for HashIndex<K> {
    fn add(&mut self, key: K, value: RowId) -> Result<(), IndexError> {
        if self.unique && self.map.contains_key(&key) {
            return Err(IndexError::DuplicateKey);
        }

        self.map.entry(key).or_insert_with(Vec::new).push(value);
        self.stats.add_rows(1);
        Ok(())
    }

    fn set(&mut self, key: K, value: RowId) {
        let old_count = self.map.get(&key).map(|v| v.len()).unwrap_or(0);
        self.map.insert(key, alloc::vec![value]);

        if old_count > 0 {
            self.stats.remove_rows(old_count);
        }
        self.stats.add_rows(1);
    }

    fn get(&self, key: &K) -> Vec<RowId> {
        self.map.get(key).cloned().unwrap_or_default()
    }

    fn remove(&mut self, key: &K, value: Option<RowId>) {
        match value {
            Some(v) => {
                if let Some(values) = self.map.get_mut(key) {
                    let original_len = values.len();
                    values.retain(|&x| x != v);
                    let removed = original_len - values.len();
                    if removed > 0 {
                        self.stats.remove_rows(removed);
                    }
                    if values.is_empty() {
                        self.map.remove(key);
                    }
                }
            }
            None => {
                if let Some(values) = self.map.remove(key) {
                    self.stats.remove_rows(values.len());
                }
            }
        }
    }

    fn contains_key(&self, key: &K) -> bool {
        self.map.contains_key(key)
    }

    fn len(&self) -> usize {
        self.stats.total_rows()
    }

    fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    fn clear(&mut self) {
        self.map.clear();
        self.stats.clear();
    }

    fn min(&self) -> Option<(&K, Vec<RowId>)> {
        // HashMap is unordered, so we need to iterate to find the minimum
        self.map
            .keys()
            .min()
            .map(|k| (k, self.map.get(k).unwrap().clone()))
    }

    fn max(&self) -> Option<(&K, Vec<RowId>)> {
        // HashMap is unordered, so we need to iterate to find the maximum
        self.map
            .keys()
            .max()
            .map(|k| (k, self.map.get(k).unwrap().clone()))
    }

    fn cost(&self, range: &KeyRange<K>) -> usize {
        match range {
            KeyRange::All => self.stats.total_rows(),
            KeyRange::Only(key) => self.map.get(key).map(|v| v.len()).unwrap_or(0),
            _ => self.stats.total_rows(), // Hash index doesn't efficiently support range queries
        }
    }
}
