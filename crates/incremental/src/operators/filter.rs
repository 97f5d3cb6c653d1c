//! Incremental filter operator.

use crate::delta::Delta;
use alloc::vec::Vec;

/// Applies a filter predicate to a batch of deltas.
///
/// Only deltas whose data satisfies the predicate are passed through.
/// The diff values are preserved.
///
/// # Example
///
/// ```ignore
/// let deltas = vec![
///     Delta::insert(10),
///     Delta::insert(5),
///     Delta::delete(20),
/// ];
/// let filtered = filter_incremental(&deltas, |&x| x > 8);
/// // Result: [Delta::insert(10), Delta::delete(20)]
/// ```
pub fn filter_incremental<T, F>(input: &[Delta<T>], predicate: F) -> Vec<Delta<T>>
where
    T: Clone,
    F: Fn(&T) -> bool,
{
    input
        .iter()
        .filter(|d| predicate(&d.data))
        .cloned()
        .collect()
}

/// Applies a filter predicate to a batch of deltas, consuming the input.
#[allow(dead_code)]
pub fn filter_incremental_owned<T, F>(input: Vec<Delta<T>>, predicate: F) -> Vec<Delta<T>>
where
    F: Fn(&T) -> bool,
{
    input.into_iter().filter(|d| predicate(&d.data)).collect()
}
