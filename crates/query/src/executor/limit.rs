//! Limit executor.

use crate::executor::Relation;

/// Limit executor - applies LIMIT and OFFSET to a relation.
pub struct LimitExecutor {
    limit: usize,
    offset: usize,
}

impl LimitExecutor {
    /// Creates a new limit executor.
    pub fn new(limit: usize, offset: usize) -> Self {
        Self { limit, offset }
    }

    /// Creates a limit executor with only a limit (no offset).
    pub fn limit_only(limit: usize) -> Self {
        Self { limit, offset: 0 }
    }

    /// Executes the limit on the input relation.
    ///
    /// Note: This operation is O(offset + limit) for the actual work,
    /// but dropping the unused entries is O(n - offset - limit).
    /// In a real query engine, limit would be pushed down to avoid
    /// materializing unnecessary rows.
    pub fn execute(&self, mut input: Relation) -> Relation {
        let tables = input.tables().to_vec();
        let table_column_counts = input.table_column_counts().to_vec();
        let len = input.entries.len();
        let start = self.offset.min(len);
        let end = (self.offset + self.limit).min(len);

        // Truncate tail first (drops elements after end)
        input.entries.truncate(end);
        // Remove head elements (drops elements before start)
        if start > 0 {
            input.entries.drain(..start);
        }

        Relation {
            entries: input.entries,
            tables,
            table_column_counts,
        }
    }
}

/// Applies limit and offset to a relation.
#[allow(dead_code)]
pub fn limit_relation(input: Relation, limit: usize, offset: usize) -> Relation {
    let tables = input.tables().to_vec();
    let table_column_counts = input.table_column_counts().to_vec();
    let entries = input
        .entries
        .into_iter()
        .skip(offset)
        .take(limit)
        .collect();

    Relation { entries, tables, table_column_counts }
}
