//! Crate-level error type returned across the builder/runner/observer boundary.
//!
//! The lower, `no_std` crates (`velio-core`, `velio-index`, `velio-query`) keep
//! their existing lightweight `Display`-only error enums so they stay
//! `alloc`-only. This crate is the first one in the stack allowed to depend on
//! `std`, so it is the one that wraps all of those into a single `thiserror`
//! type plus the error kinds from the upper boundary that have no lower
//! representation at all.

use alloc::string::String;

use crate::back_store::BackStoreError;

/// Errors surfaced by the engine's query and transaction API.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// A schema, constraint, or row-lookup error from the storage core.
    #[error("{0}")]
    Core(velio_core::Error),

    /// An index-layer error (duplicate key in a unique index, missing key).
    #[error("{0}")]
    Index(velio_index::IndexError),

    /// A query-plan execution error (unknown table/column, type mismatch).
    #[error("{0}")]
    Execution(velio_query::executor::ExecutionError),

    /// The configured back store reported an I/O or constraint failure.
    #[error(transparent)]
    BackStore(#[from] BackStoreError),

    /// The host has no back store capable of satisfying the declared schema.
    #[error("no back store available: {0}")]
    NotSupported(String),

    /// A call was made before the engine finished opening.
    #[error("engine not initialized")]
    Uninitialized,

    /// A builder referenced a table or column that does not exist, or a
    /// malformed query context (unresolved bind slot, empty FROM, ...).
    #[error("{0}")]
    Syntax(String),

    /// Re-execution of a transaction that already committed or rolled back.
    #[error("transaction already completed")]
    Transaction,

    /// A task was cancelled before it started running.
    #[error("task cancelled")]
    TaskCancelled,
}

impl From<velio_core::Error> for EngineError {
    fn from(e: velio_core::Error) -> Self {
        EngineError::Core(e)
    }
}

impl From<velio_index::IndexError> for EngineError {
    fn from(e: velio_index::IndexError) -> Self {
        EngineError::Index(e)
    }
}

impl From<velio_query::executor::ExecutionError> for EngineError {
    fn from(e: velio_query::executor::ExecutionError) -> Self {
        EngineError::Execution(e)
    }
}

pub type EngineResult<T> = Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_core_error_converts_and_displays() {
        let err: EngineError = velio_core::Error::table_not_found("users").into();
        assert!(err.to_string().contains("users"));
    }

    #[test]
    fn test_index_error_converts_and_displays() {
        let err: EngineError = velio_index::IndexError::DuplicateKey.into();
        assert!(err.to_string().contains("Duplicate"));
    }

    #[test]
    fn test_transaction_error_display() {
        let err = EngineError::Transaction;
        assert_eq!(err.to_string(), "transaction already completed");
    }
}
