//! Project executor.

use crate::executor::{Relation, RelationEntry, SharedTables};
use alloc::rc::Rc;
use alloc::vec;
use alloc::vec::Vec;
use velio_core::{Row, Value};

/// Project executor - projects specific columns from rows.
pub struct ProjectExecutor {
    /// Column indices to project.
    column_indices: Vec<usize>,
}

impl ProjectExecutor {
    /// Creates a new project executor.
    pub fn new(column_indices: Vec<usize>) -> Self {
        Self { column_indices }
    }

    /// Executes the projection on the input relation.
    pub fn execute(&self, input: Relation) -> Relation {
        let tables = input.tables().to_vec();
        let shared_tables: SharedTables = tables.clone().into();
        let entries: Vec<RelationEntry> = input
            .into_iter()
            .map(|entry| {
                let values: Vec<Value> = self
                    .column_indices
                    .iter()
                    .map(|&idx| entry.get_field(idx).cloned().unwrap_or(Value::Null))
                    .collect();
                RelationEntry::new_combined(Rc::new(Row::new(entry.id(), values)), shared_tables.clone())
            })
            .collect();

        // After projection, we have a single combined result with projected columns
        let table_column_counts = vec![self.column_indices.len()];
        Relation { entries, tables, table_column_counts }
    }
}

/// Projects columns from a relation using a transformation function.
#[allow(dead_code)]
pub fn project_relation<F>(input: Relation, transform: F) -> Relation
where
    F: Fn(&RelationEntry) -> Vec<Value>,
{
    let tables = input.tables().to_vec();
    let shared_tables: SharedTables = tables.clone().into();
    let entries: Vec<RelationEntry> = input
        .into_iter()
        .map(|entry| {
            let values = transform(&entry);
            RelationEntry::new_combined(Rc::new(Row::new(entry.id(), values)), shared_tables.clone())
        })
        .collect();

    // After transform, we don't know the exact column count, use entries length as approximation
    let table_column_counts = if entries.is_empty() {
        vec![0]
    } else {
        vec![entries[0].row.len()]
    };
    Relation { entries, tables, table_column_counts }
}
