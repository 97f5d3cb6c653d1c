//! Observer registry: tracks live queries and re-runs them on commit.
//!
//! Each registered query keeps its last materialised result set. On a
//! commit whose mutated table set intersects the query's dependencies, the
//! query is re-run against the post-commit cache and the new result is
//! diffed against the last one by row identity (primary key when the
//! driving table has one, full row payload otherwise) — see
//! [`velio_reactive::ChangeSet::from_diff`]. Subscribers receive the diff;
//! a query left with zero subscribers is evicted.
//!
//! Re-running happens directly against the `TableCache`, not through
//! `Runner::run_read`: by the time a commit hook fires, `Runner::run_pending`
//! has already finished draining for that write, so no other task can be
//! mid-flight and a direct borrow is equivalent to a serialised read task.

use alloc::boxed::Box;
use alloc::collections::BTreeSet;
use alloc::rc::Rc;
use alloc::string::String;
use alloc::vec::Vec;
use hashbrown::HashMap;
use velio_core::{Row, Value};
use velio_query::planner::LogicalPlan;
use velio_reactive::ChangeSet;
use velio_storage::TableCache;

use crate::query_engine::execute_plan;

pub type QueryId = u64;
pub type SubscriberId = u64;

struct Entry {
    plan: LogicalPlan,
    primary_table: String,
    tables: BTreeSet<String>,
    key_fn: Rc<dyn Fn(&Row) -> Vec<Value>>,
    subscribers: Vec<(SubscriberId, Box<dyn FnMut(&ChangeSet)>)>,
    next_subscriber_id: SubscriberId,
    last_materialised_version: u64,
    last_results: Vec<Row>,
}

/// `queryId -> Entry{query, subscribers, lastMaterialisedVersion, lastResults}`.
pub struct ObserverRegistry {
    entries: HashMap<QueryId, Entry>,
    next_query_id: QueryId,
}

impl Default for ObserverRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ObserverRegistry {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
            next_query_id: 1,
        }
    }

    /// Registers a query. `cache` is consulted once, at registration time,
    /// to pick a row-identity key (primary key columns of the driving
    /// table, or full-row equality if it has none).
    pub fn register(&mut self, cache: &TableCache, plan: LogicalPlan) -> QueryId {
        let tables = collect_scanned_tables(&plan);
        let primary_table = tables.iter().next().cloned().unwrap_or_default();
        let key_fn: Rc<dyn Fn(&Row) -> Vec<Value>> = cache
            .get_table(&primary_table)
            .map(|store| build_key_fn(store.schema()))
            .unwrap_or_else(|| Rc::new(|row: &Row| row.values().to_vec()));

        let id = self.next_query_id;
        self.next_query_id += 1;
        self.entries.insert(
            id,
            Entry {
                plan,
                primary_table,
                tables,
                key_fn,
                subscribers: Vec::new(),
                next_subscriber_id: 0,
                last_materialised_version: 0,
                last_results: Vec::new(),
            },
        );
        id
    }

    /// Subscribes to a registered query's diffs. Returns `None` if the id
    /// is unknown (e.g. already evicted).
    pub fn subscribe(
        &mut self,
        query_id: QueryId,
        callback: impl FnMut(&ChangeSet) + 'static,
    ) -> Option<SubscriberId> {
        let entry = self.entries.get_mut(&query_id)?;
        let id = entry.next_subscriber_id;
        entry.next_subscriber_id += 1;
        entry.subscribers.push((id, Box::new(callback)));
        Some(id)
    }

    /// Unsubscribes. Evicts the query entirely once it has no subscribers
    /// left. Returns `false` if the query or subscriber id is unknown.
    pub fn unsubscribe(&mut self, query_id: QueryId, subscriber_id: SubscriberId) -> bool {
        let Some(entry) = self.entries.get_mut(&query_id) else {
            return false;
        };
        let before = entry.subscribers.len();
        entry.subscribers.retain(|(id, _)| *id != subscriber_id);
        let removed = entry.subscribers.len() != before;
        if removed && entry.subscribers.is_empty() {
            self.entries.remove(&query_id);
        }
        removed
    }

    pub fn query_count(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Re-runs every entry whose dependencies intersect `mutated` and whose
    /// last materialised version is stale, diffs the new result against
    /// the stored one, and notifies subscribers with a non-empty diff.
    pub fn on_commit(&mut self, cache: &TableCache, version: u64, mutated: &BTreeSet<String>) {
        let due: Vec<QueryId> = self
            .entries
            .iter()
            .filter(|(_, e)| e.last_materialised_version < version && !e.tables.is_disjoint(mutated))
            .map(|(id, _)| *id)
            .collect();

        for id in due {
            let Some(entry) = self.entries.get(&id) else {
                continue;
            };
            let new_results: Vec<Row> = match execute_plan(cache, &entry.primary_table, entry.plan.clone()) {
                Ok(rows) => rows.iter().map(|row| (**row).clone()).collect(),
                Err(_) => continue,
            };

            let entry = self.entries.get_mut(&id).expect("checked above");
            let old_results = core::mem::take(&mut entry.last_results);
            let key_fn = entry.key_fn.clone();
            let changes = ChangeSet::from_diff(old_results, new_results.clone(), move |row| key_fn(row));
            entry.last_results = new_results;
            entry.last_materialised_version = version;

            if !changes.is_empty() {
                for (_, callback) in entry.subscribers.iter_mut() {
                    callback(&changes);
                }
            }
        }
    }
}

fn build_key_fn(schema: &velio_core::schema::Table) -> Rc<dyn Fn(&Row) -> Vec<Value>> {
    match schema.primary_key() {
        Some(pk) => {
            let indices: Vec<usize> = pk
                .columns()
                .iter()
                .filter_map(|c| schema.get_column_index(&c.name))
                .collect();
            Rc::new(move |row: &Row| indices.iter().filter_map(|&i| row.get(i).cloned()).collect())
        }
        None => Rc::new(|row: &Row| row.values().to_vec()),
    }
}

pub(crate) fn collect_scanned_tables(plan: &LogicalPlan) -> BTreeSet<String> {
    let mut tables = BTreeSet::new();
    collect_scanned_tables_into(plan, &mut tables);
    tables
}

fn collect_scanned_tables_into(plan: &LogicalPlan, tables: &mut BTreeSet<String>) {
    match plan {
        LogicalPlan::Scan { table }
        | LogicalPlan::IndexScan { table, .. }
        | LogicalPlan::IndexGet { table, .. }
        | LogicalPlan::IndexInGet { table, .. } => {
            tables.insert(table.clone());
        }
        LogicalPlan::Filter { input, .. }
        | LogicalPlan::Project { input, .. }
        | LogicalPlan::Aggregate { input, .. }
        | LogicalPlan::Sort { input, .. }
        | LogicalPlan::Limit { input, .. } => collect_scanned_tables_into(input, tables),
        LogicalPlan::Join { left, right, .. }
        | LogicalPlan::CrossProduct { left, right }
        | LogicalPlan::Union { left, right, .. } => {
            collect_scanned_tables_into(left, tables);
            collect_scanned_tables_into(right, tables);
        }
        LogicalPlan::Empty => {}
    }
}
