//! Change set for tracking query result changes.
//!
//! A ChangeSet represents the difference between two query result states,
//! containing added, removed, and modified rows.

use alloc::collections::BTreeMap;
use alloc::vec::Vec;
use velio_core::{Row, Value};
use velio_incremental::Delta;

/// A set of changes to query results.
///
/// This struct tracks:
/// - `added`: Rows that were inserted
/// - `removed`: Rows that were deleted
/// - `modified`: Rows that were updated (old value, new value)
/// - `current_result`: The complete current result set after applying changes
#[derive(Clone, Debug, Default)]
pub struct ChangeSet {
    /// Rows that were added to the result
    pub added: Vec<Row>,
    /// Rows that were removed from the result
    pub removed: Vec<Row>,
    /// Rows that were modified (old, new)
    pub modified: Vec<(Row, Row)>,
    /// The complete current result set after applying changes
    pub current_result: Vec<Row>,
}

impl ChangeSet {
    /// Creates a new empty change set.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a change set from a slice of deltas.
    ///
    /// Deltas with diff > 0 become additions, diff < 0 become removals.
    pub fn from_deltas(deltas: &[Delta<Row>], current_result: Vec<Row>) -> Self {
        let mut changes = Self::new();
        changes.current_result = current_result;
        for delta in deltas {
            if delta.is_insert() {
                changes.added.push(delta.data.clone());
            } else if delta.is_delete() {
                changes.removed.push(delta.data.clone());
            }
        }
        changes
    }

    /// Creates a change set by diffing two result sets keyed by identity.
    ///
    /// `key_fn` should return a row's primary key columns when the query's
    /// rows have one; otherwise return the row's own values so that rows
    /// are compared by full payload equality. A key present in both sets
    /// whose row differs is a modification; a key only in `new` is an
    /// addition; a key only in `old` is a removal.
    pub fn from_diff(old: Vec<Row>, new: Vec<Row>, key_fn: impl Fn(&Row) -> Vec<Value>) -> Self {
        let mut old_by_key: BTreeMap<Vec<Value>, Row> =
            old.into_iter().map(|row| (key_fn(&row), row)).collect();
        let mut changes = Self::new();
        changes.current_result = new.clone();

        for row in new {
            let key = key_fn(&row);
            match old_by_key.remove(&key) {
                Some(old_row) if old_row == row => {}
                Some(old_row) => changes.modified.push((old_row, row)),
                None => changes.added.push(row),
            }
        }
        changes.removed = old_by_key.into_values().collect();
        changes
    }

    /// Creates a change set representing an initial result set.
    ///
    /// All rows are treated as additions.
    /// Note: This clones the rows for the added list. For large datasets,
    /// consider using `initial_no_added` if you don't need the added list.
    pub fn initial(rows: Vec<Row>) -> Self {
        Self {
            added: rows.clone(),
            removed: Vec::new(),
            modified: Vec::new(),
            current_result: rows,
        }
    }

    /// Creates a change set representing an initial result set without populating added.
    ///
    /// This is more efficient for large datasets when you only need current_result.
    pub fn initial_result_only(rows: Vec<Row>) -> Self {
        Self {
            added: Vec::new(),
            removed: Vec::new(),
            modified: Vec::new(),
            current_result: rows,
        }
    }

    /// Returns true if there are no changes.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.modified.is_empty()
    }

    /// Returns the total number of changes.
    #[inline]
    pub fn len(&self) -> usize {
        self.added.len() + self.removed.len() + self.modified.len()
    }

    /// Merges another change set into this one.
    pub fn merge(&mut self, other: ChangeSet) {
        self.added.extend(other.added);
        self.removed.extend(other.removed);
        self.modified.extend(other.modified);
    }

    /// Clears all changes.
    pub fn clear(&mut self) {
        self.added.clear();
        self.removed.clear();
        self.modified.clear();
    }

    /// Adds an inserted row.
    #[inline]
    pub fn add(&mut self, row: Row) {
        self.added.push(row);
    }

    /// Adds a removed row.
    #[inline]
    pub fn remove(&mut self, row: Row) {
        self.removed.push(row);
    }

    /// Adds a modified row pair.
    #[inline]
    pub fn modify(&mut self, old: Row, new: Row) {
        self.modified.push((old, new));
    }
}
