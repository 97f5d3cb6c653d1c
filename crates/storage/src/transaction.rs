//! Transaction management for Velio database.
//!
//! This module provides transaction support with isolation and rollback capabilities.

use crate::cache::TableCache;
use crate::journal::{Journal, JournalEntry};
use alloc::vec::Vec;
use velio_core::{Error, Result, Row, RowId};
use core::sync::atomic::{AtomicU64, Ordering};

/// Global transaction ID counter.
static NEXT_TX_ID: AtomicU64 = AtomicU64::new(1);

/// Transaction ID type.
pub type TransactionId = u64;

/// Transaction state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransactionState {
    /// Transaction is active and can perform operations.
    Active,
    /// Transaction has been committed.
    Committed,
    /// Transaction has been rolled back.
    RolledBack,
}

/// A database transaction.
pub struct Transaction {
    /// Unique transaction ID.
    id: TransactionId,
    /// Journal for tracking changes.
    journal: Journal,
    /// Current state.
    state: TransactionState,
}

impl Transaction {
    /// Creates a new transaction.
    pub fn begin() -> Self {
        Self {
            id: NEXT_TX_ID.fetch_add(1, Ordering::SeqCst),
            journal: Journal::new(),
            state: TransactionState::Active,
        }
    }

    /// Returns the transaction ID.
    pub fn id(&self) -> TransactionId {
        self.id
    }

    /// Returns the current state.
    pub fn state(&self) -> TransactionState {
        self.state
    }

    /// Returns true if the transaction is active.
    pub fn is_active(&self) -> bool {
        self.state == TransactionState::Active
    }

    /// Checks if the transaction is active, returns error if not.
    fn check_active(&self) -> Result<()> {
        if self.state != TransactionState::Active {
            return Err(Error::invalid_operation("Transaction is not active"));
        }
        Ok(())
    }

    /// Reads a row as it would appear inside this transaction: a pending
    /// write in the journal shadows whatever is in `cache`, which is never
    /// touched until commit.
    pub fn get(&self, cache: &TableCache, table: &str, row_id: RowId) -> Option<Row> {
        if let Some(diff) = self.journal.get_table_diff(table) {
            if diff.get_deleted().contains_key(&row_id) {
                return None;
            }
            if let Some(row) = diff.get_added().get(&row_id) {
                return Some(row.clone());
            }
            if let Some((_, new)) = diff.get_modified().get(&row_id) {
                return Some(new.clone());
            }
        }
        cache
            .get_table(table)
            .and_then(|store| store.get(row_id))
            .map(|row| (*row).clone())
    }

    /// Stages an insert. The row is not visible in `cache` until commit.
    pub fn insert(&mut self, table: &str, row: Row) -> Result<()> {
        self.check_active()?;
        self.journal.record_insert(table, row);
        Ok(())
    }

    /// Stages an update against the row's value as seen by this
    /// transaction (journal first, then cache).
    pub fn update(&mut self, cache: &TableCache, table: &str, row_id: RowId, new_row: Row) -> Result<()> {
        self.check_active()?;

        let old_row = self
            .get(cache, table, row_id)
            .ok_or_else(|| Error::not_found(table, velio_core::Value::Int64(row_id as i64)))?;

        self.journal.record_update(table, old_row, new_row);
        Ok(())
    }

    /// Stages a delete, returning the row as it was seen by this
    /// transaction. Neither the cache nor its indices are touched yet.
    pub fn delete(&mut self, cache: &TableCache, table: &str, row_id: RowId) -> Result<Row> {
        self.check_active()?;

        let row = self
            .get(cache, table, row_id)
            .ok_or_else(|| Error::not_found(table, velio_core::Value::Int64(row_id as i64)))?;

        self.journal.record_delete(table, row.clone());
        Ok(row)
    }

    /// Commits the transaction, writing every staged change through to
    /// `cache` (and its indices) for the first time.
    pub fn commit(mut self, cache: &mut TableCache) -> Result<Vec<JournalEntry>> {
        self.check_active()?;
        self.state = TransactionState::Committed;
        self.journal.apply(cache)
    }

    /// Rolls back the transaction. Writes were only ever staged in the
    /// journal, so rollback is just discarding it.
    pub fn rollback(mut self) -> Result<()> {
        self.check_active()?;
        self.state = TransactionState::RolledBack;
        self.journal.clear();
        Ok(())
    }

    /// Returns the journal entries.
    pub fn get_changes(&self) -> &[JournalEntry] {
        self.journal.get_entries()
    }

    /// Returns the journal.
    pub fn journal(&self) -> &Journal {
        &self.journal
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use velio_core::schema::TableBuilder;
    use velio_core::{DataType, Value};
    use alloc::format;
    use alloc::vec;

    fn test_schema() -> velio_core::schema::Table {
        TableBuilder::new("test")
            .unwrap()
            .add_column("id", DataType::Int64)
            .unwrap()
            .add_column("name", DataType::String)
            .unwrap()
            .add_primary_key(&["id"], false)
            .unwrap()
            .build()
            .unwrap()
    }

    #[test]
    fn test_transaction_begin() {
        let tx = Transaction::begin();
        assert!(tx.is_active());
        assert!(tx.id() > 0);
    }

    #[test]
    fn test_transaction_insert_commit() {
        let mut cache = TableCache::new();
        cache.create_table(test_schema()).unwrap();

        let mut tx = Transaction::begin();
        let row = Row::new(1, vec![Value::Int64(1), Value::String("test".into())]);
        tx.insert("test", row).unwrap();

        // Not visible until commit.
        assert_eq!(cache.get_table("test").unwrap().len(), 0);

        let entries = tx.commit(&mut cache).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(cache.get_table("test").unwrap().len(), 1);
    }

    #[test]
    fn test_transaction_rollback() {
        let mut cache = TableCache::new();
        cache.create_table(test_schema()).unwrap();

        let mut tx = Transaction::begin();
        let row = Row::new(1, vec![Value::Int64(1), Value::String("test".into())]);
        tx.insert("test", row).unwrap();

        tx.rollback().unwrap();
        assert_eq!(cache.get_table("test").unwrap().len(), 0);
    }

    #[test]
    fn test_transaction_update() {
        let mut cache = TableCache::new();
        cache.create_table(test_schema()).unwrap();

        // Insert initial row
        let row = Row::new(1, vec![Value::Int64(1), Value::String("initial".into())]);
        cache.get_table_mut("test").unwrap().insert(row).unwrap();

        // Update in transaction
        let mut tx = Transaction::begin();
        let new_row = Row::new(1, vec![Value::Int64(1), Value::String("updated".into())]);
        tx.update(&cache, "test", 1, new_row).unwrap();

        // The transaction's own view already reflects the pending write.
        assert_eq!(
            tx.get(&cache, "test", 1).unwrap().get(1),
            Some(&Value::String("updated".into()))
        );
        // But the cache itself hasn't changed yet.
        assert_eq!(
            cache.get_table("test").unwrap().get(1).unwrap().get(1),
            Some(&Value::String("initial".into()))
        );

        let entries = tx.commit(&mut cache).unwrap();
        assert_eq!(entries.len(), 1);

        let stored = cache.get_table("test").unwrap().get(1).unwrap();
        assert_eq!(stored.get(1), Some(&Value::String("updated".into())));
    }

    #[test]
    fn test_transaction_delete() {
        let mut cache = TableCache::new();
        cache.create_table(test_schema()).unwrap();

        // Insert initial row
        let row = Row::new(1, vec![Value::Int64(1), Value::String("test".into())]);
        cache.get_table_mut("test").unwrap().insert(row).unwrap();

        // Delete in transaction
        let mut tx = Transaction::begin();
        tx.delete(&cache, "test", 1).unwrap();

        // Staged delete is visible through the transaction, not yet in the cache.
        assert!(tx.get(&cache, "test", 1).is_none());
        assert!(cache.get_table("test").unwrap().get(1).is_some());

        let entries = tx.commit(&mut cache).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(cache.get_table("test").unwrap().len(), 0);
    }

    #[test]
    fn test_transaction_state_after_commit() {
        let mut cache = TableCache::new();
        cache.create_table(test_schema()).unwrap();

        let tx = Transaction::begin();
        let _ = tx.commit(&mut cache);
        // Transaction is consumed after commit
    }

    #[test]
    fn test_multiple_operations() {
        let mut cache = TableCache::new();
        cache.create_table(test_schema()).unwrap();

        let mut tx = Transaction::begin();

        // Insert multiple rows
        for i in 1..=3 {
            let row = Row::new(i, vec![Value::Int64(i as i64), Value::String(format!("row{}", i))]);
            tx.insert("test", row).unwrap();
        }

        // Update one (reading its pre-commit value back through the transaction)
        let updated = Row::new(2, vec![Value::Int64(2), Value::String("updated".into())]);
        tx.update(&cache, "test", 2, updated).unwrap();

        // Delete one
        tx.delete(&cache, "test", 3).unwrap();

        // Nothing has reached the cache yet.
        assert_eq!(cache.get_table("test").unwrap().len(), 0);

        let entries = tx.commit(&mut cache).unwrap();
        assert_eq!(entries.len(), 5); // 3 inserts + 1 update + 1 delete
        assert_eq!(cache.get_table("test").unwrap().len(), 2);
    }

    #[test]
    fn test_transaction_rollback_update() {
        let mut cache = TableCache::new();
        cache.create_table(test_schema()).unwrap();

        // Insert initial row
        let row = Row::new(1, vec![Value::Int64(1), Value::String("original".into())]);
        cache.get_table_mut("test").unwrap().insert(row).unwrap();

        // Update in transaction
        let mut tx = Transaction::begin();
        let new_row = Row::new(1, vec![Value::Int64(1), Value::String("modified".into())]);
        tx.update(&cache, "test", 1, new_row).unwrap();

        // The transaction's own view reflects the pending change...
        assert_eq!(
            tx.get(&cache, "test", 1).unwrap().get(1),
            Some(&Value::String("modified".into()))
        );

        // ...but the cache is untouched, so rollback needs nothing beyond
        // discarding the journal.
        tx.rollback().unwrap();

        assert_eq!(
            cache.get_table("test").unwrap().get(1).unwrap().get(1),
            Some(&Value::String("original".into()))
        );
    }

    #[test]
    fn test_transaction_rollback_delete() {
        let mut cache = TableCache::new();
        cache.create_table(test_schema()).unwrap();

        // Insert initial row
        let row = Row::new(1, vec![Value::Int64(1), Value::String("test".into())]);
        cache.get_table_mut("test").unwrap().insert(row).unwrap();

        // Delete in transaction
        let mut tx = Transaction::begin();
        tx.delete(&cache, "test", 1).unwrap();

        // Staged delete hides the row from the transaction's own view...
        assert!(tx.get(&cache, "test", 1).is_none());

        // ...but rollback simply discards the journal, cache untouched throughout.
        tx.rollback().unwrap();
        assert!(cache.get_table("test").unwrap().get(1).is_some());
    }

    #[test]
    fn test_transaction_complex_rollback() {
        let mut cache = TableCache::new();
        cache.create_table(test_schema()).unwrap();

        // Insert initial rows
        let row1 = Row::new(1, vec![Value::Int64(1), Value::String("row1".into())]);
        let row2 = Row::new(2, vec![Value::Int64(2), Value::String("row2".into())]);
        cache.get_table_mut("test").unwrap().insert(row1).unwrap();
        cache.get_table_mut("test").unwrap().insert(row2).unwrap();

        // Start transaction with multiple operations
        let mut tx = Transaction::begin();

        // Insert new row
        let row3 = Row::new(3, vec![Value::Int64(3), Value::String("row3".into())]);
        tx.insert("test", row3).unwrap();

        // Update existing row
        let updated_row1 = Row::new(1, vec![Value::Int64(1), Value::String("updated".into())]);
        tx.update(&cache, "test", 1, updated_row1).unwrap();

        // Delete existing row
        tx.delete(&cache, "test", 2).unwrap();

        // None of this has reached the cache yet.
        assert_eq!(cache.get_table("test").unwrap().len(), 2); // row1, row2 unchanged

        // Rollback all changes
        tx.rollback().unwrap();

        // Original state, never perturbed.
        assert_eq!(cache.get_table("test").unwrap().len(), 2); // row1, row2
        assert_eq!(
            cache.get_table("test").unwrap().get(1).unwrap().get(1),
            Some(&Value::String("row1".into()))
        );
        assert!(cache.get_table("test").unwrap().get(2).is_some());
        assert!(cache.get_table("test").unwrap().get(3).is_none());
    }

    #[test]
    fn test_transaction_error_on_inactive() {
        let mut cache = TableCache::new();
        cache.create_table(test_schema()).unwrap();

        let tx = Transaction::begin();
        let _ = tx.commit(&mut cache);

        // Cannot use committed transaction - it's consumed
        // This is enforced by Rust's ownership system
    }

    #[test]
    fn test_transaction_journal_entries() {
        let mut cache = TableCache::new();
        cache.create_table(test_schema()).unwrap();

        let mut tx = Transaction::begin();

        let row = Row::new(1, vec![Value::Int64(1), Value::String("test".into())]);
        tx.insert("test", row).unwrap();

        // Check journal has the entry
        let changes = tx.get_changes();
        assert_eq!(changes.len(), 1);
        assert!(matches!(changes[0], JournalEntry::Insert { .. }));

        tx.commit(&mut cache).unwrap();
    }
}
