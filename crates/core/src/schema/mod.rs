//! Schema module for Velio database.
//!
//! This module contains all schema-related definitions including columns, tables,
//! indices, and constraints.

mod column;
mod constraint;
mod index;
mod table;

pub use column::Column;
pub use constraint::{ConstraintAction, ConstraintTiming, Constraints, ForeignKey};
pub use index::{IndexDef, IndexType, IndexedColumn, Order};
pub use table::{Table, TableBuilder};
