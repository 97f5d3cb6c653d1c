//! Pluggable durable-storage boundary beneath the in-process cache.
//!
//! A `BackStore` is the contract an engine instance talks to for anything
//! that needs to outlive the current process. An engine opens one store per
//! schema at startup, recovers the row-id counter by scanning each table's
//! final key, and then routes every committed write through it; the
//! in-process `TableCache` is just a read-through cache in front of it.
//!
//! `InMemoryBackStore` is the default reference implementation: it keeps
//! everything in ordered maps and never touches disk. It exists so the
//! engine has something to run against without requiring an embedded KV
//! engine as a dependency, and so the trait's contract is exercised by
//! tests.

use alloc::collections::BTreeMap;
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use velio_core::schema::Table;
use velio_core::{Row, RowId};

/// Errors a back store implementation can report.
#[derive(Debug, thiserror::Error)]
pub enum BackStoreError {
    #[error("table not found: {0}")]
    TableNotFound(String),
    #[error("back store is closed")]
    Closed,
    #[error("no such transaction: {0}")]
    NoSuchTransaction(BackStoreTxId),
    #[error("transaction {0} is read-only")]
    ReadOnly(BackStoreTxId),
    #[error("i/o error: {0}")]
    Io(String),
}

pub type BackStoreResult<T> = Result<T, BackStoreError>;

impl From<BackStoreError> for velio_core::Error {
    fn from(err: BackStoreError) -> Self {
        velio_core::Error::invalid_operation(alloc::format!("back store: {err}"))
    }
}

/// Read-only or read-write transaction mode. Mirrors the Runner's task
/// scopes: a `ReadWrite` transaction is exclusive with any other
/// transaction touching an overlapping table.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TxMode {
    ReadOnly,
    ReadWrite,
}

/// Handle identifying an open back-store transaction.
pub type BackStoreTxId = u64;

/// A forward cursor over a table's rows in row-id order.
pub trait Cursor {
    fn next(&mut self) -> Option<(RowId, Row)>;
}

/// Pluggable durable storage boundary.
///
/// Implementations are free to be as simple (in-memory) or as durable
/// (append-only log, embedded KV store) as the deployment needs; the
/// engine only ever talks to this trait.
pub trait BackStore {
    /// Opens (or creates) the store for the given schema and recovers each
    /// table's row-id high-water mark by scanning its final key.
    fn open(&mut self, tables: &[Table]) -> BackStoreResult<()>;

    /// Begins a transaction scoped to `tables`.
    fn create_tx(&mut self, mode: TxMode, tables: &[String]) -> BackStoreResult<BackStoreTxId>;

    fn get(&self, tx: BackStoreTxId, table: &str, row_id: RowId) -> BackStoreResult<Option<Row>>;
    fn put(&mut self, tx: BackStoreTxId, table: &str, row_id: RowId, row: Row) -> BackStoreResult<()>;
    fn delete(&mut self, tx: BackStoreTxId, table: &str, row_id: RowId) -> BackStoreResult<()>;

    /// Opens a cursor over `table` as it stands inside `tx` (its own
    /// pending writes included).
    fn open_cursor<'a>(
        &'a self,
        tx: BackStoreTxId,
        table: &str,
    ) -> BackStoreResult<alloc::boxed::Box<dyn Cursor + 'a>>;

    /// Commits a `ReadWrite` transaction, making its writes visible to
    /// every subsequent `get`/`open_cursor`. A no-op for `ReadOnly`
    /// transactions beyond releasing the handle.
    fn commit(&mut self, tx: BackStoreTxId) -> BackStoreResult<()>;

    /// Discards a transaction's pending writes.
    fn abort(&mut self, tx: BackStoreTxId) -> BackStoreResult<()>;

    fn close(&mut self) -> BackStoreResult<()>;

    /// The row id to start allocating from, recovered at `open` by
    /// scanning each table's final key. `0` before `open` has run.
    fn next_row_id(&self) -> RowId;

    /// The schema version last recorded by [`set_schema_version`], or `0`
    /// for a store that has never recorded one.
    ///
    /// [`set_schema_version`]: BackStore::set_schema_version
    fn schema_version(&self) -> u32;

    /// Records the schema version now current after an upgrade (or after
    /// the first open of a fresh store).
    fn set_schema_version(&mut self, version: u32) -> BackStoreResult<()>;
}

struct PendingTx {
    mode: TxMode,
    tables: Vec<String>,
    writes: BTreeMap<(String, RowId), Option<Row>>,
}

/// In-memory reference implementation of [`BackStore`]. Every table is an
/// ordered `RowId -> Row` map; transactions buffer their writes separately
/// and only merge them into the table maps on commit, matching the
/// journal-then-cache staging the engine itself does one layer up.
#[derive(Default)]
pub struct InMemoryBackStore {
    tables: BTreeMap<String, BTreeMap<RowId, Row>>,
    pending: BTreeMap<BackStoreTxId, PendingTx>,
    next_tx_id: BackStoreTxId,
    next_row_id: RowId,
    closed: bool,
    schema_version: u32,
}

impl InMemoryBackStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn pending_mut(&mut self, tx: BackStoreTxId) -> BackStoreResult<&mut PendingTx> {
        self.pending
            .get_mut(&tx)
            .ok_or(BackStoreError::NoSuchTransaction(tx))
    }

    fn pending_ref(&self, tx: BackStoreTxId) -> BackStoreResult<&PendingTx> {
        self.pending
            .get(&tx)
            .ok_or(BackStoreError::NoSuchTransaction(tx))
    }

    fn check_open(&self) -> BackStoreResult<()> {
        if self.closed {
            return Err(BackStoreError::Closed);
        }
        Ok(())
    }

    fn check_in_scope(pending: &PendingTx, table: &str) -> BackStoreResult<()> {
        if pending.tables.iter().any(|t| t == table) {
            Ok(())
        } else {
            Err(BackStoreError::TableNotFound(table.to_string()))
        }
    }
}

impl BackStore for InMemoryBackStore {
    fn open(&mut self, tables: &[Table]) -> BackStoreResult<()> {
        let mut max_row_id = None;
        for table in tables {
            let store = self.tables.entry(table.name().to_string()).or_default();
            if let Some((&last, _)) = store.iter().next_back() {
                max_row_id = Some(max_row_id.map_or(last, |m: RowId| m.max(last)));
            }
        }
        self.next_row_id = max_row_id.map_or(0, |m| m + 1);
        self.closed = false;
        Ok(())
    }

    fn create_tx(&mut self, mode: TxMode, tables: &[String]) -> BackStoreResult<BackStoreTxId> {
        self.check_open()?;
        let id = self.next_tx_id;
        self.next_tx_id += 1;
        self.pending.insert(
            id,
            PendingTx {
                mode,
                tables: tables.to_vec(),
                writes: BTreeMap::new(),
            },
        );
        Ok(id)
    }

    fn get(&self, tx: BackStoreTxId, table: &str, row_id: RowId) -> BackStoreResult<Option<Row>> {
        self.check_open()?;
        let pending = self.pending_ref(tx)?;
        Self::check_in_scope(pending, table)?;
        if let Some(staged) = pending.writes.get(&(table.to_string(), row_id)) {
            return Ok(staged.clone());
        }
        Ok(self
            .tables
            .get(table)
            .and_then(|t| t.get(&row_id))
            .cloned())
    }

    fn put(&mut self, tx: BackStoreTxId, table: &str, row_id: RowId, row: Row) -> BackStoreResult<()> {
        self.check_open()?;
        let pending = self.pending_mut(tx)?;
        if pending.mode == TxMode::ReadOnly {
            return Err(BackStoreError::ReadOnly(tx));
        }
        Self::check_in_scope(pending, table)?;
        pending.writes.insert((table.to_string(), row_id), Some(row));
        Ok(())
    }

    fn delete(&mut self, tx: BackStoreTxId, table: &str, row_id: RowId) -> BackStoreResult<()> {
        self.check_open()?;
        let pending = self.pending_mut(tx)?;
        if pending.mode == TxMode::ReadOnly {
            return Err(BackStoreError::ReadOnly(tx));
        }
        Self::check_in_scope(pending, table)?;
        pending.writes.insert((table.to_string(), row_id), None);
        Ok(())
    }

    fn open_cursor<'a>(
        &'a self,
        tx: BackStoreTxId,
        table: &str,
    ) -> BackStoreResult<alloc::boxed::Box<dyn Cursor + 'a>> {
        self.check_open()?;
        let pending = self.pending_ref(tx)?;
        Self::check_in_scope(pending, table)?;

        let mut rows: BTreeMap<RowId, Row> = self
            .tables
            .get(table)
            .cloned()
            .unwrap_or_default();
        for ((t, row_id), staged) in &pending.writes {
            if t != table {
                continue;
            }
            match staged {
                Some(row) => {
                    rows.insert(*row_id, row.clone());
                }
                None => {
                    rows.remove(row_id);
                }
            }
        }

        Ok(alloc::boxed::Box::new(InMemoryCursor {
            rows: rows.into_iter().collect::<Vec<_>>().into_iter(),
        }))
    }

    fn commit(&mut self, tx: BackStoreTxId) -> BackStoreResult<()> {
        self.check_open()?;
        let pending = self
            .pending
            .remove(&tx)
            .ok_or(BackStoreError::NoSuchTransaction(tx))?;

        for ((table, row_id), staged) in pending.writes {
            let store = self.tables.entry(table).or_default();
            match staged {
                Some(row) => {
                    store.insert(row_id, row);
                }
                None => {
                    store.remove(&row_id);
                }
            }
            if row_id >= self.next_row_id {
                self.next_row_id = row_id + 1;
            }
        }
        Ok(())
    }

    fn abort(&mut self, tx: BackStoreTxId) -> BackStoreResult<()> {
        self.check_open()?;
        self.pending
            .remove(&tx)
            .ok_or(BackStoreError::NoSuchTransaction(tx))?;
        Ok(())
    }

    fn close(&mut self) -> BackStoreResult<()> {
        self.closed = true;
        self.pending.clear();
        Ok(())
    }

    fn next_row_id(&self) -> RowId {
        self.next_row_id
    }

    fn schema_version(&self) -> u32 {
        self.schema_version
    }

    fn set_schema_version(&mut self, version: u32) -> BackStoreResult<()> {
        self.check_open()?;
        self.schema_version = version;
        Ok(())
    }
}

struct InMemoryCursor {
    rows: alloc::vec::IntoIter<(RowId, Row)>,
}

impl Cursor for InMemoryCursor {
    fn next(&mut self) -> Option<(RowId, Row)> {
        self.rows.next()
    }
}
