//! Incremental map and project operators.

use crate::delta::Delta;
use alloc::vec::Vec;
use velio_core::{Row, Value};

/// Applies a mapper function to a batch of deltas.
///
/// Each delta's data is transformed using the mapper function.
/// The diff values are preserved.
pub fn map_incremental<T, U, F>(input: &[Delta<T>], mapper: F) -> Vec<Delta<U>>
where
    F: Fn(&T) -> U,
{
    input
        .iter()
        .map(|d| Delta::new(mapper(&d.data), d.diff))
        .collect()
}

/// Applies a mapper function to a batch of deltas, consuming the input.
#[allow(dead_code)]
pub fn map_incremental_owned<T, U, F>(input: Vec<Delta<T>>, mapper: F) -> Vec<Delta<U>>
where
    F: Fn(T) -> U,
{
    input
        .into_iter()
        .map(|d| Delta::new(mapper(d.data), d.diff))
        .collect()
}

/// Projects specific columns from row deltas.
///
/// Creates new rows containing only the specified columns.
pub fn project_incremental(input: &[Delta<Row>], columns: &[usize]) -> Vec<Delta<Row>> {
    input
        .iter()
        .map(|d| {
            let projected_values: Vec<Value> = columns
                .iter()
                .filter_map(|&col| d.data.get(col).cloned())
                .collect();
            Delta::new(Row::dummy(projected_values), d.diff)
        })
        .collect()
}
