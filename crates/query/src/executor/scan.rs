//! Table and index scan executors.

use crate::executor::Relation;
use alloc::rc::Rc;
use alloc::string::String;
use alloc::vec::Vec;
use velio_core::Row;

/// Table scan executor - scans all rows from a table.
pub struct TableScanExecutor {
    table: String,
    rows: Vec<Rc<Row>>,
}

impl TableScanExecutor {
    /// Creates a new table scan executor.
    pub fn new(table: impl Into<String>, rows: Vec<Rc<Row>>) -> Self {
        Self {
            table: table.into(),
            rows,
        }
    }

    /// Executes the scan and returns the relation.
    pub fn execute(&self) -> Relation {
        Relation::from_rows(self.rows.clone(), alloc::vec![self.table.clone()])
    }
}

/// Index scan executor - scans rows using an index.
pub struct IndexScanExecutor {
    table: String,
    rows: Vec<Rc<Row>>,
}

impl IndexScanExecutor {
    /// Creates a new index scan executor with pre-fetched rows.
    pub fn new(table: impl Into<String>, rows: Vec<Rc<Row>>) -> Self {
        Self {
            table: table.into(),
            rows,
        }
    }

    /// Executes the scan and returns the relation.
    pub fn execute(&self) -> Relation {
        Relation::from_rows(self.rows.clone(), alloc::vec![self.table.clone()])
    }
}
