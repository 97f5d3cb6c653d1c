//! Plain-Rust query surface: `Engine` plus its fluent builders.
//!
//! `Engine` wraps a [`Runner`] and an [`ObserverRegistry`] behind `Rc<RefCell<_>>`
//! so builders can be handed out by value (cheap clone) while still sharing
//! one cache, one task queue and one set of live subscriptions. Builders
//! accumulate a draft and only touch the runner on a terminal verb
//! (`exec`/`explain`/`observe`), per the two-builder-layers design: the
//! draft itself is just data, resolved into a `velio_query` plan the
//! moment it is frozen.

use alloc::boxed::Box;
use alloc::collections::BTreeSet;
use alloc::rc::Rc;
use alloc::string::{String, ToString};
use alloc::vec;
use alloc::vec::Vec;
use core::cell::RefCell;

use hashbrown::HashMap;
use velio_core::schema::Table;
use velio_core::{next_row_id, Row, RowId, Value};
use velio_query::ast::{Expr, SortOrder};
use velio_query::planner::LogicalPlan;
use velio_reactive::ChangeSet;
use velio_storage::{Transaction as StorageTransaction, TableCache};

use crate::back_store::BackStore;
use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::observer_registry::{ObserverRegistry, QueryId, SubscriberId};
use crate::predicate::Predicate;
use crate::query_engine::execute_plan;
use crate::runner::Runner;

/// Entry point for the query surface. Cheap to clone: every clone shares
/// the same cache, task queue, and observer registry.
#[derive(Clone)]
pub struct Engine {
    runner: Rc<RefCell<Runner>>,
    observers: Rc<RefCell<ObserverRegistry>>,
    tables: Rc<RefCell<HashMap<String, Table>>>,
    index_scan_threshold_ratio: f64,
    join_enumeration_limit: usize,
}

impl Engine {
    /// Opens an engine against the default in-memory back store.
    pub fn open() -> EngineResult<Self> {
        Self::open_with_config(EngineConfig::default())
    }

    /// Opens an engine with explicit planner and storage configuration.
    pub fn open_with_config(config: EngineConfig) -> EngineResult<Self> {
        let cache = Rc::new(RefCell::new(TableCache::new()));
        let back_store = config.back_store.clone();
        back_store.borrow_mut().open(&[])?;

        let stored_version = back_store.borrow().schema_version();
        if stored_version < config.schema_version {
            if let Some(upgrade) = config.upgrade {
                upgrade(&mut *back_store.borrow_mut())?;
            }
            back_store.borrow_mut().set_schema_version(config.schema_version)?;
        }

        let runner = Rc::new(RefCell::new(Runner::new(cache.clone(), back_store)));
        let observers = Rc::new(RefCell::new(ObserverRegistry::new()));

        let observers_for_commit = observers.clone();
        let cache_for_commit = cache.clone();
        runner.borrow_mut().set_on_commit(move |version, mutated| {
            observers_for_commit
                .borrow_mut()
                .on_commit(&cache_for_commit.borrow(), version, mutated);
        });

        Ok(Self {
            runner,
            observers,
            tables: Rc::new(RefCell::new(HashMap::new())),
            index_scan_threshold_ratio: config.index_scan_threshold_ratio,
            join_enumeration_limit: config.join_enumeration_limit,
        })
    }

    /// Declares a table and opens it against the configured back store,
    /// loading any rows already persisted for it (a reopen of a table that
    /// already has committed data restores that data into the cache).
    pub fn create_table(&self, table: Table) -> EngineResult<()> {
        let cache = {
            let runner = self.runner.borrow();
            runner.cache().borrow_mut().create_table(table.clone())?;
            runner.cache()
        };
        let back_store = self.runner.borrow().back_store();
        back_store.borrow_mut().open(core::slice::from_ref(&table))?;
        hydrate_table(&back_store, &cache, &table)?;
        self.tables.borrow_mut().insert(table.name().to_string(), table);
        Ok(())
    }

    pub fn table_names(&self) -> Vec<String> {
        self.tables.borrow().keys().cloned().collect()
    }

    pub fn has_table(&self, name: &str) -> bool {
        self.tables.borrow().contains_key(name)
    }

    fn table(&self, name: &str) -> EngineResult<Table> {
        self.tables
            .borrow()
            .get(name)
            .cloned()
            .ok_or_else(|| EngineError::Syntax(alloc::format!("unknown table '{name}'")))
    }

    pub fn select(&self, columns: Vec<String>) -> Select {
        Select::new(self.clone(), columns)
    }

    pub fn insert(&self, table: impl Into<String>) -> Insert {
        Insert::new(self.clone(), table.into(), false)
    }

    pub fn insert_or_replace(&self, table: impl Into<String>) -> Insert {
        Insert::new(self.clone(), table.into(), true)
    }

    pub fn update(&self, table: impl Into<String>) -> Update {
        Update::new(self.clone(), table.into())
    }

    pub fn delete(&self) -> Delete {
        Delete::new(self.clone())
    }

    pub fn create_transaction(&self) -> TransactionBuilder {
        TransactionBuilder::new(self.clone())
    }

    /// Registers `query` for live updates and subscribes `callback` to its
    /// diffs. Returns the ids needed to `unobserve` later.
    pub fn observe(
        &self,
        query: &Select,
        callback: impl FnMut(&ChangeSet) + 'static,
    ) -> EngineResult<(QueryId, SubscriberId)> {
        let plan = query.build_plan()?;
        let query_id = {
            let runner = self.runner.borrow();
            let cache = runner.cache();
            let cache_ref = cache.borrow();
            self.observers.borrow_mut().register(&cache_ref, plan)
        };
        let subscriber_id = self
            .observers
            .borrow_mut()
            .subscribe(query_id, callback)
            .expect("query was just registered");
        Ok((query_id, subscriber_id))
    }

    pub fn unobserve(&self, query_id: QueryId, subscriber_id: SubscriberId) -> bool {
        self.observers.borrow_mut().unsubscribe(query_id, subscriber_id)
    }
}

/// Loads rows already committed to the back store for `table` into the
/// freshly created in-process cache entry, and advances the row-id counter
/// past whatever it finds so new inserts never collide with restored rows.
fn hydrate_table(
    back_store: &Rc<RefCell<dyn BackStore>>,
    cache: &Rc<RefCell<TableCache>>,
    table: &Table,
) -> EngineResult<()> {
    use crate::back_store::TxMode;

    let rows: Vec<Row> = {
        let mut store = back_store.borrow_mut();
        let tx = store.create_tx(TxMode::ReadOnly, &[table.name().to_string()])?;
        let mut cursor = store.open_cursor(tx, table.name())?;
        let mut rows = Vec::new();
        while let Some((_, row)) = cursor.next() {
            rows.push(row);
        }
        drop(cursor);
        store.abort(tx)?;
        rows
    };

    if rows.is_empty() {
        return Ok(());
    }

    let mut cache_mut = cache.borrow_mut();
    let row_store = cache_mut
        .get_table_mut(table.name())
        .ok_or(EngineError::Uninitialized)?;
    let mut max_id: Option<RowId> = None;
    for row in rows {
        max_id = Some(max_id.map_or(row.id(), |m| m.max(row.id())));
        row_store.insert(row)?;
    }
    if let Some(id) = max_id {
        velio_core::set_next_row_id_if_greater(id + 1);
    }
    Ok(())
}

fn execution_context_tables(cache: &TableCache, tables: &BTreeSet<String>) -> velio_query::context::ExecutionContext {
    let mut ctx = velio_query::context::ExecutionContext::new();
    for name in tables {
        if let Some(store) = cache.get_table(name) {
            let schema = store.schema();
            let mut indexes = Vec::new();
            for idx in schema.indices() {
                indexes.push(velio_query::context::IndexInfo::new(
                    idx.name(),
                    idx.columns().iter().map(|c| c.name.clone()).collect(),
                    idx.is_unique(),
                ));
            }
            ctx.register_table(
                name.clone(),
                velio_query::context::TableStats {
                    row_count: store.len(),
                    is_sorted: false,
                    indexes,
                },
            );
        }
    }
    ctx
}

fn run_select_plan(
    cache: &TableCache,
    driving_table: &str,
    tables: &BTreeSet<String>,
    plan: LogicalPlan,
) -> EngineResult<Vec<Rc<Row>>> {
    if tables.len() <= 1 {
        return Ok(execute_plan(cache, driving_table, plan)?);
    }
    let ctx = execution_context_tables(cache, tables);
    let planner = velio_query::planner::QueryPlanner::new(ctx);
    let physical = planner.plan(plan);
    let data_source = crate::query_engine::TableCacheDataSource::new(cache);
    let runner = velio_query::executor::PhysicalPlanRunner::new(&data_source);
    let relation = runner.execute(&physical)?;
    Ok(relation.entries.into_iter().map(|e| e.row).collect())
}

/// Join clause accumulated by [`Select::inner_join`]/[`Select::left_outer_join`].
#[derive(Clone)]
struct Join {
    kind: velio_query::ast::JoinType,
    table: String,
    condition: Expr,
}

/// Fluent `SELECT` builder. Only touches the engine on `exec`/`explain`/`observe`.
#[derive(Clone)]
pub struct Select {
    engine: Engine,
    columns: Vec<String>,
    from: Option<String>,
    joins: Vec<Join>,
    predicate: Option<Predicate>,
    order_by: Vec<(String, SortOrder)>,
    group_by: Vec<String>,
    count_star: bool,
    limit: Option<usize>,
    offset: usize,
    bound_values: Vec<Value>,
}

impl Select {
    fn new(engine: Engine, columns: Vec<String>) -> Self {
        Self {
            engine,
            columns,
            from: None,
            joins: Vec::new(),
            predicate: None,
            order_by: Vec::new(),
            group_by: Vec::new(),
            count_star: false,
            limit: None,
            offset: 0,
            bound_values: Vec::new(),
        }
    }

    pub fn from(mut self, table: impl Into<String>) -> Self {
        self.from = Some(table.into());
        self
    }

    pub fn where_(mut self, predicate: Predicate) -> Self {
        self.predicate = Some(predicate);
        self
    }

    pub fn inner_join(mut self, table: impl Into<String>, condition: Expr) -> Self {
        self.joins.push(Join {
            kind: velio_query::ast::JoinType::Inner,
            table: table.into(),
            condition,
        });
        self
    }

    pub fn left_outer_join(mut self, table: impl Into<String>, condition: Expr) -> Self {
        self.joins.push(Join {
            kind: velio_query::ast::JoinType::LeftOuter,
            table: table.into(),
            condition,
        });
        self
    }

    pub fn order_by(mut self, column: impl Into<String>, order: SortOrder) -> Self {
        self.order_by.push((column.into(), order));
        self
    }

    pub fn group_by(mut self, column: impl Into<String>) -> Self {
        self.group_by.push(column.into());
        self
    }

    /// Projects a single `COUNT(*)` row instead of `columns`.
    pub fn count(mut self) -> Self {
        self.count_star = true;
        self
    }

    pub fn limit(mut self, n: usize) -> Self {
        self.limit = Some(n);
        self
    }

    pub fn offset(mut self, n: usize) -> Self {
        self.offset = n;
        self
    }

    /// Resolves bind slots left by `param(i)` in the predicate. Re-binding
    /// replaces the stored values and does not mutate any previous `exec`'s
    /// result; it only affects the next terminal verb.
    pub fn bind(mut self, values: Vec<Value>) -> Self {
        self.bound_values = values;
        self
    }

    fn driving_table(&self) -> EngineResult<String> {
        self.from
            .clone()
            .ok_or_else(|| EngineError::Syntax("select() has no from() target".to_string()))
    }

    fn scanned_tables(&self) -> EngineResult<BTreeSet<String>> {
        let mut tables = BTreeSet::new();
        tables.insert(self.driving_table()?);
        for join in &self.joins {
            tables.insert(join.table.clone());
        }
        Ok(tables)
    }

    fn resolve_predicate(&self, table: &Table) -> EngineResult<Option<Expr>> {
        let Some(pred) = &self.predicate else {
            return Ok(None);
        };
        let ast = pred.to_ast(table)?;
        let resolved = ast
            .resolve(&self.bound_values)
            .map_err(|e| EngineError::Syntax(alloc::format!("{e}")))?;
        Ok(Some(resolved))
    }

    /// Freezes the draft into a `LogicalPlan` against the engine's current
    /// schema. Shared by `exec`, `explain`, and `observe`.
    fn build_plan(&self) -> EngineResult<LogicalPlan> {
        let driving = self.driving_table()?;
        let driving_schema = self.engine.table(&driving)?;

        let mut plan = LogicalPlan::scan(driving.clone());
        for join in &self.joins {
            self.engine.table(&join.table)?;
            let right_plan = LogicalPlan::scan(join.table.clone());
            plan = LogicalPlan::join(plan, right_plan, join.condition.clone(), join.kind);
        }

        if let Some(predicate) = self.resolve_predicate(&driving_schema)? {
            plan = LogicalPlan::filter(plan, predicate);
        }

        if self.count_star {
            plan = LogicalPlan::aggregate(plan, Vec::new(), vec![(velio_query::ast::AggregateFunc::Count, Expr::count_star())]);
        } else if !self.group_by.is_empty() {
            let group_exprs: EngineResult<Vec<Expr>> = self
                .group_by
                .iter()
                .map(|c| column_expr(&driving_schema, c))
                .collect();
            plan = LogicalPlan::aggregate(plan, group_exprs?, Vec::new());
        } else if !self.columns.is_empty() {
            let proj: EngineResult<Vec<Expr>> = self
                .columns
                .iter()
                .map(|c| column_expr(&driving_schema, c))
                .collect();
            plan = LogicalPlan::project(plan, proj?);
        }

        if !self.order_by.is_empty() {
            let order: EngineResult<Vec<(Expr, SortOrder)>> = self
                .order_by
                .iter()
                .map(|(c, o)| Ok((column_expr(&driving_schema, c)?, *o)))
                .collect();
            plan = LogicalPlan::sort(plan, order?);
        }

        if self.limit.is_some() || self.offset > 0 {
            plan = LogicalPlan::limit(plan, self.limit.unwrap_or(usize::MAX), self.offset);
        }

        Ok(plan)
    }

    pub fn exec(&self) -> EngineResult<Vec<Rc<Row>>> {
        let plan = self.build_plan()?;
        let driving = self.driving_table()?;
        let tables = self.scanned_tables()?;
        let runner = self.engine.runner.borrow();
        let cache = runner.cache();
        let cache_ref = cache.borrow();
        run_select_plan(&cache_ref, &driving, &tables, plan)
    }

    pub fn explain(&self) -> EngineResult<String> {
        let plan = self.build_plan()?;
        let driving = self.driving_table()?;
        let runner = self.engine.runner.borrow();
        let cache = runner.cache();
        let cache_ref = cache.borrow();
        let result = crate::query_engine::explain_plan(&cache_ref, &driving, plan);
        Ok(alloc::format!(
            "logical:\n{}\noptimized:\n{}\nphysical:\n{}",
            result.logical_plan,
            result.optimized_plan,
            result.physical_plan
        ))
    }

    /// Registers this query for live updates. Equivalent to
    /// `engine.observe(&self, callback)`.
    pub fn observe(&self, callback: impl FnMut(&ChangeSet) + 'static) -> EngineResult<(QueryId, SubscriberId)> {
        self.engine.observe(self, callback)
    }
}

fn column_expr(table: &Table, name: &str) -> EngineResult<Expr> {
    let index = table
        .get_column_index(name)
        .ok_or_else(|| EngineError::Syntax(alloc::format!("unknown column '{name}' on table '{}'", table.name())))?;
    Ok(Expr::column(table.name().to_string(), name.to_string(), index))
}

fn row_values(table: &Table, assignments: &[(String, Value)]) -> Vec<Value> {
    let mut values = vec![Value::Null; table.columns().len()];
    for (name, value) in assignments {
        if let Some(idx) = table.get_column_index(name) {
            values[idx] = value.clone();
        }
    }
    values
}

fn primary_key_values(table: &Table, values: &[Value]) -> Option<Vec<Value>> {
    let pk = table.primary_key()?;
    Some(
        pk.columns()
            .iter()
            .filter_map(|c| table.get_column_index(&c.name).map(|idx| values[idx].clone()))
            .collect(),
    )
}

fn find_row_by_primary_key(cache: &TableCache, table: &Table, pk_values: &[Value]) -> Option<Rc<Row>> {
    let pk = table.primary_key()?;
    let mut plan = LogicalPlan::scan(table.name());
    let mut predicate = None;
    for (col, value) in pk.columns().iter().zip(pk_values.iter()) {
        let idx = table.get_column_index(&col.name)?;
        let expr = Expr::eq(
            Expr::column(table.name().to_string(), col.name.clone(), idx),
            Expr::literal(value.clone()),
        );
        predicate = Some(match predicate {
            None => expr,
            Some(prev) => Expr::and(prev, expr),
        });
    }
    let predicate = predicate?;
    plan = LogicalPlan::filter(plan, predicate);
    execute_plan(cache, table.name(), plan).ok()?.into_iter().next()
}

/// Fluent `INSERT`/`INSERT OR REPLACE` builder.
pub struct Insert {
    engine: Engine,
    table: String,
    replace: bool,
    rows: Vec<Vec<(String, Value)>>,
}

impl Insert {
    fn new(engine: Engine, table: String, replace: bool) -> Self {
        Self {
            engine,
            table,
            replace,
            rows: Vec::new(),
        }
    }

    pub fn values(mut self, rows: Vec<Vec<(String, Value)>>) -> Self {
        self.rows.extend(rows);
        self
    }

    pub fn exec(&self) -> EngineResult<Vec<RowId>> {
        let table = self.engine.table(&self.table)?;
        let rows = self.rows.clone();
        let replace = self.replace;
        let table_name = self.table.clone();
        let result = self
            .engine
            .runner
            .borrow_mut()
            .run_write([table_name.clone()], move |cache, tx| {
                apply_insert(cache, tx, &table, &rows, replace)
            })?;
        Ok(result)
    }
}

fn apply_insert(
    cache: &TableCache,
    tx: &mut StorageTransaction,
    table: &Table,
    rows: &[Vec<(String, Value)>],
    replace: bool,
) -> velio_core::Result<Vec<RowId>> {
    let mut ids = Vec::with_capacity(rows.len());
    for assignments in rows {
        let values = row_values(table, assignments);
        if replace {
            if let Some(pk_values) = primary_key_values(table, &values) {
                if let Some(existing) = find_row_by_primary_key(cache, table, &pk_values) {
                    tx.delete(cache, table.name(), existing.id())?;
                }
            }
        }
        let id = next_row_id();
        tx.insert(table.name(), Row::new(id, values))?;
        ids.push(id);
    }
    Ok(ids)
}

/// Fluent `UPDATE` builder.
pub struct Update {
    engine: Engine,
    table: String,
    assignments: Vec<(String, Value)>,
    predicate: Option<Predicate>,
}

impl Update {
    fn new(engine: Engine, table: String) -> Self {
        Self {
            engine,
            table,
            assignments: Vec::new(),
            predicate: None,
        }
    }

    pub fn set(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.assignments.push((column.into(), value.into()));
        self
    }

    pub fn where_(mut self, predicate: Predicate) -> Self {
        self.predicate = Some(predicate);
        self
    }

    pub fn exec(&self) -> EngineResult<usize> {
        let table = self.engine.table(&self.table)?;
        let predicate = match &self.predicate {
            Some(p) => Some(p.to_ast(&table)?),
            None => None,
        };
        let assignments = self.assignments.clone();
        let table_name = self.table.clone();
        let count = self
            .engine
            .runner
            .borrow_mut()
            .run_write([table_name], move |cache, tx| {
                apply_update(cache, tx, &table, &assignments, predicate.as_ref())
            })?;
        Ok(count)
    }
}

fn apply_update(
    cache: &TableCache,
    tx: &mut StorageTransaction,
    table: &Table,
    assignments: &[(String, Value)],
    predicate: Option<&Expr>,
) -> velio_core::Result<usize> {
    let plan = match predicate {
        Some(p) => LogicalPlan::filter(LogicalPlan::scan(table.name()), p.clone()),
        None => LogicalPlan::scan(table.name()),
    };
    let matches = execute_plan(cache, table.name(), plan)
        .map_err(|e| velio_core::Error::invalid_operation(alloc::format!("{e}")))?;
    let mut count = 0;
    for row in matches {
        let mut new_values = row.values().to_vec();
        for (col, value) in assignments {
            if let Some(idx) = table.get_column_index(col) {
                new_values[idx] = value.clone();
            }
        }
        tx.update(cache, table.name(), row.id(), Row::new(row.id(), new_values))?;
        count += 1;
    }
    Ok(count)
}

/// Fluent `DELETE` builder.
pub struct Delete {
    engine: Engine,
    table: Option<String>,
    predicate: Option<Predicate>,
}

impl Delete {
    fn new(engine: Engine) -> Self {
        Self {
            engine,
            table: None,
            predicate: None,
        }
    }

    pub fn from(mut self, table: impl Into<String>) -> Self {
        self.table = Some(table.into());
        self
    }

    pub fn where_(mut self, predicate: Predicate) -> Self {
        self.predicate = Some(predicate);
        self
    }

    pub fn exec(&self) -> EngineResult<usize> {
        let table_name = self
            .table
            .clone()
            .ok_or_else(|| EngineError::Syntax("delete() has no from() target".to_string()))?;
        let table = self.engine.table(&table_name)?;
        let predicate = match &self.predicate {
            Some(p) => Some(p.to_ast(&table)?),
            None => None,
        };
        let count = self
            .engine
            .runner
            .borrow_mut()
            .run_write([table_name], move |cache, tx| apply_delete(cache, tx, &table, predicate.as_ref()))?;
        Ok(count)
    }
}

fn apply_delete(
    cache: &TableCache,
    tx: &mut StorageTransaction,
    table: &Table,
    predicate: Option<&Expr>,
) -> velio_core::Result<usize> {
    let plan = match predicate {
        Some(p) => LogicalPlan::filter(LogicalPlan::scan(table.name()), p.clone()),
        None => LogicalPlan::scan(table.name()),
    };
    let matches = execute_plan(cache, table.name(), plan)
        .map_err(|e| velio_core::Error::invalid_operation(alloc::format!("{e}")))?;
    let count = matches.len();
    for row in matches {
        tx.delete(cache, table.name(), row.id())?;
    }
    Ok(count)
}

type TxOp = Box<dyn FnOnce(&TableCache, &mut StorageTransaction) -> velio_core::Result<()>>;

/// Atomic multi-query builder: `engine.create_transaction().insert(...).update(...).exec()`.
///
/// Every queued operation runs inside a single `Runner::run_write` call, so
/// if any of them fails the whole batch rolls back with no partial effect.
pub struct TransactionBuilder {
    engine: Engine,
    scope: BTreeSet<String>,
    ops: Vec<TxOp>,
}

impl TransactionBuilder {
    fn new(engine: Engine) -> Self {
        Self {
            engine,
            scope: BTreeSet::new(),
            ops: Vec::new(),
        }
    }

    pub fn insert(mut self, table: impl Into<String>, rows: Vec<Vec<(String, Value)>>) -> EngineResult<Self> {
        let table_name = table.into();
        let table = self.engine.table(&table_name)?;
        self.scope.insert(table_name);
        self.ops.push(Box::new(move |cache, tx| {
            apply_insert(cache, tx, &table, &rows, false).map(|_| ())
        }));
        Ok(self)
    }

    pub fn update(
        mut self,
        table: impl Into<String>,
        assignments: Vec<(String, Value)>,
        predicate: Option<Predicate>,
    ) -> EngineResult<Self> {
        let table_name = table.into();
        let table = self.engine.table(&table_name)?;
        let predicate = match predicate {
            Some(p) => Some(p.to_ast(&table)?),
            None => None,
        };
        self.scope.insert(table_name);
        self.ops.push(Box::new(move |cache, tx| {
            apply_update(cache, tx, &table, &assignments, predicate.as_ref()).map(|_| ())
        }));
        Ok(self)
    }

    pub fn delete(mut self, table: impl Into<String>, predicate: Option<Predicate>) -> EngineResult<Self> {
        let table_name = table.into();
        let table = self.engine.table(&table_name)?;
        let predicate = match predicate {
            Some(p) => Some(p.to_ast(&table)?),
            None => None,
        };
        self.scope.insert(table_name);
        self.ops.push(Box::new(move |cache, tx| {
            apply_delete(cache, tx, &table, predicate.as_ref()).map(|_| ())
        }));
        Ok(self)
    }

    /// Runs every queued operation as one write task. On failure no op's
    /// effects become visible, matching atomicity for the whole batch.
    pub fn exec(self) -> EngineResult<()> {
        if self.ops.is_empty() {
            return Ok(());
        }
        let ops = self.ops;
        let result = self
            .engine
            .runner
            .borrow_mut()
            .run_write(self.scope, move |cache, tx| {
                for op in ops {
                    op(cache, tx)?;
                }
                Ok(())
            })?;
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::rc::Rc as AllocRc;
    use core::cell::RefCell as CoreRefCell;
    use velio_core::schema::TableBuilder;
    use velio_core::DataType;

    fn users_table() -> Table {
        TableBuilder::new("users")
            .unwrap()
            .add_column("id", DataType::Int64)
            .unwrap()
            .add_column("email", DataType::String)
            .unwrap()
            .add_column("age", DataType::Int32)
            .unwrap()
            .add_primary_key(&["id"], false)
            .unwrap()
            .add_unique("users_email", &["email"])
            .unwrap()
            .build()
            .unwrap()
    }

    fn movie_table() -> Table {
        TableBuilder::new("movie")
            .unwrap()
            .add_column("id", DataType::Int64)
            .unwrap()
            .add_column("year", DataType::Int32)
            .unwrap()
            .add_primary_key(&["id"], false)
            .unwrap()
            .build()
            .unwrap()
    }

    fn row(values: Vec<(&str, Value)>) -> Vec<(String, Value)> {
        values.into_iter().map(|(k, v)| (k.to_string(), v)).collect()
    }

    #[test]
    fn test_insert_then_select_round_trips() {
        let engine = Engine::open().unwrap();
        engine.create_table(users_table()).unwrap();

        engine
            .insert("users")
            .values(vec![row(vec![
                ("id", Value::Int64(1)),
                ("email", Value::String("a@b.com".into())),
                ("age", Value::Int32(30)),
            ])])
            .exec()
            .unwrap();

        let results = engine.select(vec!["age".to_string()]).from("users").exec().unwrap();
        assert_eq!(results.len(), 1);
    }

    #[test]
    fn test_where_predicate_filters_rows() {
        let engine = Engine::open().unwrap();
        engine.create_table(users_table()).unwrap();
        engine
            .insert("users")
            .values(vec![
                row(vec![("id", Value::Int64(1)), ("email", Value::String("a@b.com".into())), ("age", Value::Int32(20))]),
                row(vec![("id", Value::Int64(2)), ("email", Value::String("c@d.com".into())), ("age", Value::Int32(40))]),
            ])
            .exec()
            .unwrap();

        let results = engine
            .select(Vec::new())
            .from("users")
            .where_(crate::predicate::col("age").gt(30))
            .exec()
            .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].get(2), Some(&Value::Int32(40)));
    }

    #[test]
    fn test_bind_resolves_param_slot() {
        let engine = Engine::open().unwrap();
        engine.create_table(users_table()).unwrap();
        engine
            .insert("users")
            .values(vec![row(vec![("id", Value::Int64(1)), ("email", Value::String("a@b.com".into())), ("age", Value::Int32(25))])])
            .exec()
            .unwrap();

        let results = engine
            .select(Vec::new())
            .from("users")
            .where_(crate::predicate::col("age").eq(crate::predicate::param(0)))
            .bind(vec![Value::Int32(25)])
            .exec()
            .unwrap();
        assert_eq!(results.len(), 1);
    }

    // S2: unique constraint rejects a second row with a duplicate key, and
    // the failed row is never visible.
    #[test]
    fn test_unique_constraint_rejects_duplicate_in_same_transaction() {
        let engine = Engine::open().unwrap();
        engine.create_table(users_table()).unwrap();

        let result = engine
            .create_transaction()
            .insert(
                "users",
                vec![row(vec![("id", Value::Int64(1)), ("email", Value::String("x@y".into())), ("age", Value::Int32(1))])],
            )
            .unwrap()
            .insert(
                "users",
                vec![row(vec![("id", Value::Int64(2)), ("email", Value::String("x@y".into())), ("age", Value::Int32(2))])],
            )
            .unwrap()
            .exec();

        assert!(result.is_err());
        let count = engine.select(Vec::new()).from("users").exec().unwrap().len();
        assert_eq!(count, 0);
    }

    // S2: the same duplicate key rejected across two separate transactions
    // leaves the first row's commit intact.
    #[test]
    fn test_unique_constraint_rejects_duplicate_across_separate_transactions() {
        let engine = Engine::open().unwrap();
        engine.create_table(users_table()).unwrap();

        engine
            .insert("users")
            .values(vec![row(vec![
                ("id", Value::Int64(1)),
                ("email", Value::String("x@y".into())),
                ("age", Value::Int32(1)),
            ])])
            .exec()
            .unwrap();

        let result = engine
            .insert("users")
            .values(vec![row(vec![
                ("id", Value::Int64(2)),
                ("email", Value::String("x@y".into())),
                ("age", Value::Int32(2)),
            ])])
            .exec();

        assert!(result.is_err());
        let rows = engine.select(Vec::new()).from("users").exec().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get(0), Some(&Value::Int64(1)));
    }

    #[test]
    fn test_update_applies_only_to_matching_rows() {
        let engine = Engine::open().unwrap();
        engine.create_table(users_table()).unwrap();
        engine
            .insert("users")
            .values(vec![
                row(vec![("id", Value::Int64(1)), ("email", Value::String("a@b.com".into())), ("age", Value::Int32(20))]),
                row(vec![("id", Value::Int64(2)), ("email", Value::String("c@d.com".into())), ("age", Value::Int32(40))]),
            ])
            .exec()
            .unwrap();

        let updated = engine
            .update("users")
            .set("age", Value::Int32(99))
            .where_(crate::predicate::col("id").eq(Value::Int64(1)))
            .exec()
            .unwrap();
        assert_eq!(updated, 1);
    }

    #[test]
    fn test_delete_removes_matching_rows() {
        let engine = Engine::open().unwrap();
        engine.create_table(users_table()).unwrap();
        engine
            .insert("users")
            .values(vec![row(vec![("id", Value::Int64(1)), ("email", Value::String("a@b.com".into())), ("age", Value::Int32(20))])])
            .exec()
            .unwrap();

        let deleted = engine.delete().from("users").exec().unwrap();
        assert_eq!(deleted, 1);
        assert_eq!(engine.select(Vec::new()).from("users").exec().unwrap().len(), 0);
    }

    // S3: observer is notified on a commit that changes the query's result.
    #[test]
    fn test_observer_notified_on_relevant_commit() {
        let engine = Engine::open().unwrap();
        engine.create_table(movie_table()).unwrap();

        let notifications = AllocRc::new(CoreRefCell::new(0));
        let notifications_clone = notifications.clone();
        let query = engine.select(Vec::new()).from("movie").count();
        let (_qid, _sid) = engine
            .observe(&query, move |_changes| {
                *notifications_clone.borrow_mut() += 1;
            })
            .unwrap();

        engine
            .insert("movie")
            .values(vec![row(vec![("id", Value::Int64(1)), ("year", Value::Int32(1995))])])
            .exec()
            .unwrap();

        assert_eq!(*notifications.borrow(), 1);
    }

    // S5: a transaction with a failing second statement leaves the first
    // statement's table unchanged.
    #[test]
    fn test_transaction_atomicity_on_later_failure() {
        let engine = Engine::open().unwrap();
        engine.create_table(users_table()).unwrap();
        engine.create_table(movie_table()).unwrap();
        engine
            .insert("users")
            .values(vec![row(vec![("id", Value::Int64(1)), ("email", Value::String("a@b.com".into())), ("age", Value::Int32(1))])])
            .exec()
            .unwrap();

        let result = engine
            .create_transaction()
            .update(
                "users",
                vec![("age".to_string(), Value::Int32(2))],
                Some(crate::predicate::col("id").eq(Value::Int64(1))),
            )
            .unwrap()
            .insert("movie", vec![row(vec![("id", Value::Int64(1)), ("year", Value::Null)])])
            .unwrap()
            .exec();

        assert!(result.is_err());
        let rows = engine.select(Vec::new()).from("users").exec().unwrap();
        assert_eq!(rows[0].get(2), Some(&Value::Int32(1)));
    }

    // S4: a range predicate over an indexed column plans to an index scan,
    // and an additional non-indexed condition shows up as a residual filter.
    #[test]
    fn test_explain_prefers_point_lookup_index_with_residual_range_filter() {
        // `a = 5 and b > 10`, both `a` and `b` indexed: the point lookup on
        // `a` is more selective than the range on `b`, so it's chosen as
        // the access path and `b > 10` survives as a residual filter.
        let table = TableBuilder::new("t")
            .unwrap()
            .add_column("id", DataType::Int64)
            .unwrap()
            .add_column("a", DataType::Int64)
            .unwrap()
            .add_column("b", DataType::Int64)
            .unwrap()
            .add_primary_key(&["id"], false)
            .unwrap()
            .add_index("t_a", &["a"], false)
            .unwrap()
            .add_index("t_b", &["b"], false)
            .unwrap()
            .build()
            .unwrap();

        let engine = Engine::open().unwrap();
        engine.create_table(table).unwrap();
        let rows: Vec<_> = (0..50)
            .map(|i| {
                row(vec![
                    ("id", Value::Int64(i)),
                    ("a", Value::Int64(i)),
                    ("b", Value::Int64(i)),
                ])
            })
            .collect();
        engine.insert("t").values(rows).exec().unwrap();

        let plan_text = engine
            .select(Vec::new())
            .from("t")
            .where_(
                crate::predicate::col("a")
                    .eq(Value::Int64(5))
                    .and(crate::predicate::col("b").gt(Value::Int64(10))),
            )
            .explain()
            .unwrap();

        assert!(plan_text.contains("IndexGet"), "expected a point-lookup index access in:\n{plan_text}");
        assert!(plan_text.contains("Filter"), "expected a residual filter in:\n{plan_text}");
    }

    fn t1_table() -> Table {
        TableBuilder::new("t1").unwrap().add_column("id", DataType::Int64).unwrap().build().unwrap()
    }

    fn t2_table() -> Table {
        TableBuilder::new("t2").unwrap().add_column("id", DataType::Int64).unwrap().build().unwrap()
    }

    // S6: reopening at a newer declared version runs the upgrade callback
    // exactly once; prior rows survive, the new table starts empty.
    #[test]
    fn test_reopen_at_newer_version_runs_upgrade_once() {
        let back_store: Rc<RefCell<dyn crate::back_store::BackStore>> =
            Rc::new(RefCell::new(crate::back_store::InMemoryBackStore::new()));

        let engine_v1 = Engine::open_with_config(
            EngineConfig::new().with_back_store(back_store.clone()).with_schema_version(1),
        )
        .unwrap();
        engine_v1.create_table(t1_table()).unwrap();
        engine_v1
            .insert("t1")
            .values(vec![row(vec![("id", Value::Int64(1))])])
            .exec()
            .unwrap();
        drop(engine_v1);

        let upgrade_calls = AllocRc::new(CoreRefCell::new(0));
        let upgrade_calls_clone = upgrade_calls.clone();
        let engine_v2 = Engine::open_with_config(
            EngineConfig::new()
                .with_back_store(back_store)
                .with_schema_version(2)
                .with_upgrade(move |_store| {
                    *upgrade_calls_clone.borrow_mut() += 1;
                    Ok(())
                }),
        )
        .unwrap();
        engine_v2.create_table(t1_table()).unwrap();
        engine_v2.create_table(t2_table()).unwrap();

        assert_eq!(*upgrade_calls.borrow(), 1);
        assert_eq!(engine_v2.select(Vec::new()).from("t1").exec().unwrap().len(), 1);
        assert_eq!(engine_v2.select(Vec::new()).from("t2").exec().unwrap().len(), 0);
    }

    #[test]
    fn test_reopen_at_same_version_does_not_rerun_upgrade() {
        let back_store: Rc<RefCell<dyn crate::back_store::BackStore>> =
            Rc::new(RefCell::new(crate::back_store::InMemoryBackStore::new()));

        Engine::open_with_config(EngineConfig::new().with_back_store(back_store.clone()).with_schema_version(1)).unwrap();

        let upgrade_calls = AllocRc::new(CoreRefCell::new(0));
        let upgrade_calls_clone = upgrade_calls.clone();
        Engine::open_with_config(
            EngineConfig::new()
                .with_back_store(back_store)
                .with_schema_version(1)
                .with_upgrade(move |_store| {
                    *upgrade_calls_clone.borrow_mut() += 1;
                    Ok(())
                }),
        )
        .unwrap();

        assert_eq!(*upgrade_calls.borrow(), 0);
    }
}
