//! Constraint checking for Velio database.
//!
//! This module provides constraint validation including primary key,
//! unique, not-null, and foreign key constraints.

use crate::cache::TableCache;
use crate::row_store::RowStore;
use alloc::format;
use velio_core::schema::{ConstraintTiming, Table};
use velio_core::{Error, Result, Row, RowId};

/// Constraint checker for validating database constraints.
pub struct ConstraintChecker;

impl ConstraintChecker {
    /// Checks the not-null constraint for a row.
    pub fn check_not_null(schema: &Table, row: &Row) -> Result<()> {
        let not_nullable = schema.constraints().get_not_nullable();

        for col_name in not_nullable {
            if schema.get_column(col_name).is_some() {
                let col_idx = schema.get_column_index(col_name).unwrap();
                if let Some(value) = row.get(col_idx) {
                    if value.is_null() {
                        return Err(Error::NullConstraint {
                            column: col_name.clone(),
                        });
                    }
                }
            }
        }

        Ok(())
    }

    /// Checks the not-null constraint for multiple rows.
    pub fn check_not_null_rows(schema: &Table, rows: &[Row]) -> Result<()> {
        for row in rows {
            Self::check_not_null(schema, row)?;
        }
        Ok(())
    }

    /// Checks foreign key constraints for insert.
    pub fn check_foreign_keys_for_insert(
        cache: &TableCache,
        schema: &Table,
        rows: &[Row],
        timing: ConstraintTiming,
    ) -> Result<()> {
        let foreign_keys = schema.constraints().get_foreign_keys();

        for fk in foreign_keys {
            if fk.timing != timing {
                continue;
            }

            let parent_store = cache.get_table(&fk.parent_table).ok_or_else(|| {
                Error::table_not_found(&fk.parent_table)
            })?;

            let child_col_idx = schema.get_column_index(&fk.child_column).ok_or_else(|| {
                Error::column_not_found(schema.name(), &fk.child_column)
            })?;

            for row in rows {
                if let Some(value) = row.get(child_col_idx) {
                    if !value.is_null() && !parent_store.pk_exists(value) {
                        return Err(Error::ForeignKeyViolation {
                            constraint: fk.name.clone(),
                            message: format!(
                                "Referenced key {:?} does not exist in {}",
                                value, fk.parent_table
                            ),
                        });
                    }
                }
            }
        }

        Ok(())
    }

    /// Checks foreign key constraints for delete.
    pub fn check_foreign_keys_for_delete(
        cache: &TableCache,
        schema: &Table,
        rows: &[Row],
        timing: ConstraintTiming,
    ) -> Result<()> {
        // Find all tables that reference this table
        for table_name in cache.table_names() {
            if let Some(child_store) = cache.get_table(table_name) {
                let child_schema = child_store.schema();
                let foreign_keys = child_schema.constraints().get_foreign_keys();

                for fk in foreign_keys {
                    if fk.parent_table != schema.name() || fk.timing != timing {
                        continue;
                    }

                    let parent_col_idx = schema.get_column_index(&fk.parent_column).ok_or_else(|| {
                        Error::column_not_found(schema.name(), &fk.parent_column)
                    })?;

                    for row in rows {
                        if let Some(pk_value) = row.get(parent_col_idx) {
                            // Check if any child rows reference this value
                            let child_rows = child_store.get_by_pk(pk_value);
                            if !child_rows.is_empty() {
                                return Err(Error::ForeignKeyViolation {
                                    constraint: fk.name.clone(),
                                    message: format!(
                                        "Cannot delete: referenced by {} rows in {}",
                                        child_rows.len(),
                                        child_schema.name()
                                    ),
                                });
                            }
                        }
                    }
                }
            }
        }

        Ok(())
    }

    /// Checks foreign key constraints for update.
    pub fn check_foreign_keys_for_update(
        cache: &TableCache,
        schema: &Table,
        modifications: &[(Row, Row)],
        timing: ConstraintTiming,
    ) -> Result<()> {
        // Check if updated values still satisfy FK constraints (as child)
        let foreign_keys = schema.constraints().get_foreign_keys();

        for fk in foreign_keys {
            if fk.timing != timing {
                continue;
            }

            let parent_store = cache.get_table(&fk.parent_table).ok_or_else(|| {
                Error::table_not_found(&fk.parent_table)
            })?;

            let child_col_idx = schema.get_column_index(&fk.child_column).ok_or_else(|| {
                Error::column_not_found(schema.name(), &fk.child_column)
            })?;

            for (_, new_row) in modifications {
                if let Some(value) = new_row.get(child_col_idx) {
                    if !value.is_null() && !parent_store.pk_exists(value) {
                        return Err(Error::ForeignKeyViolation {
                            constraint: fk.name.clone(),
                            message: format!(
                                "Referenced key {:?} does not exist in {}",
                                value, fk.parent_table
                            ),
                        });
                    }
                }
            }
        }

        // Check if updated values break FK constraints (as parent)
        for table_name in cache.table_names() {
            if let Some(child_store) = cache.get_table(table_name) {
                let child_schema = child_store.schema();
                let child_fks = child_schema.constraints().get_foreign_keys();

                for fk in child_fks {
                    if fk.parent_table != schema.name() || fk.timing != timing {
                        continue;
                    }

                    let parent_col_idx = schema.get_column_index(&fk.parent_column).ok_or_else(|| {
                        Error::column_not_found(schema.name(), &fk.parent_column)
                    })?;

                    for (old_row, new_row) in modifications {
                        let old_value = old_row.get(parent_col_idx);
                        let new_value = new_row.get(parent_col_idx);

                        // If the referenced column value changed
                        if old_value != new_value {
                            if let Some(old_val) = old_value {
                                let child_rows = child_store.get_by_pk(old_val);
                                if !child_rows.is_empty() {
                                    return Err(Error::ForeignKeyViolation {
                                        constraint: fk.name.clone(),
                                        message: format!(
                                            "Cannot update: referenced by {} rows in {}",
                                            child_rows.len(),
                                            child_schema.name()
                                        ),
                                    });
                                }
                            }
                        }
                    }
                }
            }
        }

        Ok(())
    }

    /// Finds existing row ID by primary key in the store.
    pub fn find_existing_row_id_in_pk_index(store: &RowStore, row: &Row) -> Option<RowId> {
        store.find_row_id_by_pk(row)
    }
}
