//! Query engine integration for API layer.
//!
//! This module bridges the storage layer with the query engine,
//! providing optimized query execution using indexes.

#[allow(unused_imports)]
use alloc::boxed::Box;
use alloc::rc::Rc;
use alloc::vec::Vec;
use velio_core::{Row, Value};
use velio_index::KeyRange;
use velio_query::context::{ExecutionContext, IndexInfo, TableStats};
use velio_query::executor::{DataSource, ExecutionError, ExecutionResult, PhysicalPlanRunner};
use velio_query::planner::{LogicalPlan, PhysicalPlan, QueryPlanner};
use velio_storage::TableCache;

/// DataSource implementation for TableCache.
///
/// This allows the query engine to access table data and indexes.
pub struct TableCacheDataSource<'a> {
    cache: &'a TableCache,
}

impl<'a> TableCacheDataSource<'a> {
    /// Creates a new data source from a TableCache reference.
    pub fn new(cache: &'a TableCache) -> Self {
        Self { cache }
    }
}

impl<'a> DataSource for TableCacheDataSource<'a> {
    fn get_table_rows(&self, table: &str) -> ExecutionResult<Vec<Rc<Row>>> {
        let store = self
            .cache
            .get_table(table)
            .ok_or_else(|| ExecutionError::TableNotFound(table.into()))?;
        // Rc::clone is cheap (just increment ref count)
        Ok(store.scan().collect())
    }

    fn get_index_range(
        &self,
        table: &str,
        index: &str,
        range_start: Option<&Value>,
        range_end: Option<&Value>,
        include_start: bool,
        include_end: bool,
    ) -> ExecutionResult<Vec<Rc<Row>>> {
        self.get_index_range_with_limit(
            table,
            index,
            range_start,
            range_end,
            include_start,
            include_end,
            None,
            0,
            false,
        )
    }

    fn get_index_range_with_limit(
        &self,
        table: &str,
        index: &str,
        range_start: Option<&Value>,
        range_end: Option<&Value>,
        include_start: bool,
        include_end: bool,
        limit: Option<usize>,
        offset: usize,
        reverse: bool,
    ) -> ExecutionResult<Vec<Rc<Row>>> {
        let store = self
            .cache
            .get_table(table)
            .ok_or_else(|| ExecutionError::TableNotFound(table.into()))?;

        // Build KeyRange from bounds
        let range = match (range_start, range_end) {
            (Some(start), Some(end)) => Some(KeyRange::bound(
                start.clone(),
                end.clone(),
                !include_start,
                !include_end,
            )),
            (Some(start), None) => Some(KeyRange::lower_bound(start.clone(), !include_start)),
            (None, Some(end)) => Some(KeyRange::upper_bound(end.clone(), !include_end)),
            (None, None) => None,
        };

        // Push limit, offset, and reverse down to storage layer for early termination
        Ok(store.index_scan_with_options(index, range.as_ref(), limit, offset, reverse))
    }

    fn get_index_point(&self, table: &str, index: &str, key: &Value) -> ExecutionResult<Vec<Rc<Row>>> {
        let store = self
            .cache
            .get_table(table)
            .ok_or_else(|| ExecutionError::TableNotFound(table.into()))?;

        // Use index_scan with a point range (key == key)
        let range = KeyRange::only(key.clone());

        Ok(store.index_scan(index, Some(&range)))
    }

    fn get_index_point_with_limit(
        &self,
        table: &str,
        index: &str,
        key: &Value,
        limit: Option<usize>,
    ) -> ExecutionResult<Vec<Rc<Row>>> {
        let store = self
            .cache
            .get_table(table)
            .ok_or_else(|| ExecutionError::TableNotFound(table.into()))?;

        // Use index_scan_with_limit for early termination
        let range = KeyRange::only(key.clone());

        Ok(store.index_scan_with_limit(index, Some(&range), limit))
    }

    fn get_column_count(&self, table: &str) -> ExecutionResult<usize> {
        let store = self
            .cache
            .get_table(table)
            .ok_or_else(|| ExecutionError::TableNotFound(table.into()))?;
        Ok(store.schema().columns().len())
    }
}

/// Builds ExecutionContext from TableCache for optimizer.
pub fn build_execution_context(cache: &TableCache, table_name: &str) -> ExecutionContext {
    let mut ctx = ExecutionContext::new();

    if let Some(store) = cache.get_table(table_name) {
        let schema = store.schema();

        // Collect index information
        let mut indexes = Vec::new();

        // Add secondary indexes
        for idx in schema.indices() {
            indexes.push(IndexInfo::new(
                idx.name(),
                idx.columns().iter().map(|c| c.name.clone()).collect(),
                idx.is_unique(),
            ));
        }

        let stats = TableStats {
            row_count: store.len(),
            is_sorted: false,
            indexes,
        };

        ctx.register_table(table_name, stats);
    }

    ctx
}

/// Executes a logical plan using the query engine.
///
/// This function:
/// 1. Builds execution context with index information
/// 2. Creates QueryPlanner with unified optimization pipeline
/// 3. Plans and optimizes the query (logical + physical)
/// 4. Executes using PhysicalPlanRunner
pub fn execute_plan(
    cache: &TableCache,
    table_name: &str,
    plan: LogicalPlan,
) -> ExecutionResult<Vec<Rc<Row>>> {
    execute_plan_internal(cache, table_name, plan, false)
}

/// Executes a logical plan with optional debug output.
pub fn execute_plan_debug(
    cache: &TableCache,
    table_name: &str,
    plan: LogicalPlan,
) -> ExecutionResult<Vec<Rc<Row>>> {
    execute_plan_internal(cache, table_name, plan, true)
}

fn execute_plan_internal(
    cache: &TableCache,
    table_name: &str,
    plan: LogicalPlan,
    _debug: bool,
) -> ExecutionResult<Vec<Rc<Row>>> {
    // Build execution context with index info
    let ctx = build_execution_context(cache, table_name);

    // Use unified QueryPlanner for complete optimization pipeline
    let planner = QueryPlanner::new(ctx);

    // Plan: logical optimization + physical conversion + physical optimization
    let physical_plan = planner.plan(plan);

    // Execute
    let data_source = TableCacheDataSource::new(cache);
    let runner = PhysicalPlanRunner::new(&data_source);
    let relation = runner.execute(&physical_plan)?;

    // Extract rows from relation entries
    Ok(relation.entries.into_iter().map(|e| e.row).collect())
}

/// Compiles a logical plan to a physical plan.
/// The physical plan can be cached and reused for repeated executions.
pub fn compile_plan(
    cache: &TableCache,
    table_name: &str,
    plan: LogicalPlan,
) -> PhysicalPlan {
    // Build execution context with index info
    let ctx = build_execution_context(cache, table_name);

    // Use unified QueryPlanner for complete optimization pipeline
    let planner = QueryPlanner::new(ctx);
    planner.plan(plan)
}

/// Query plan explanation result.
#[derive(Debug)]
pub struct ExplainResult {
    pub logical_plan: String,
    pub optimized_plan: String,
    pub physical_plan: String,
}

/// Explains a logical plan by showing the optimization stages.
///
/// Returns the logical plan, optimized plan, and physical plan as strings.
pub fn explain_plan(
    cache: &TableCache,
    table_name: &str,
    plan: LogicalPlan,
) -> ExplainResult {
    let logical_plan = alloc::format!("{:#?}", plan);

    // Build execution context with index info
    let ctx = build_execution_context(cache, table_name);

    // Use unified QueryPlanner
    let planner = QueryPlanner::new(ctx);

    // Get optimized logical plan
    let optimized_plan_node = planner.optimize_logical(plan.clone());
    let optimized_plan = alloc::format!("{:#?}", optimized_plan_node);

    // Get physical plan (includes all physical optimizations)
    let physical_plan_node = planner.plan(plan);
    let physical_plan = alloc::format!("{:#?}", physical_plan_node);

    ExplainResult {
        logical_plan,
        optimized_plan,
        physical_plan,
    }
}

/// Executes a pre-compiled physical plan.
/// This is faster than execute_plan because it skips optimization.
pub fn execute_physical_plan(
    cache: &TableCache,
    physical_plan: &PhysicalPlan,
) -> ExecutionResult<Vec<Rc<Row>>> {
    let data_source = TableCacheDataSource::new(cache);
    let runner = PhysicalPlanRunner::new(&data_source);
    let relation = runner.execute(physical_plan)?;

    // Extract rows from relation entries
    Ok(relation.entries.into_iter().map(|e| e.row).collect())
}
