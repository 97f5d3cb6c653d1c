//! FIFO task queue with table-scope admission control.
//!
//! The Runner is the serialisation point for every read and write against
//! the engine's cache: a task declares the tables it touches and whether
//! it writes, and only runs once no conflicting task is mid-flight. The
//! engine assumes a single-threaded host, so in this reference
//! implementation that collapses to strict FIFO order — [`run_pending`]
//! drains one task to completion before starting the next — but the
//! admission rule itself ([`can_run_concurrently`]) is independent of that
//! and is what a multi-worker or truly-async back store would have to
//! honor.
//!
//! [`run_pending`]: Runner::run_pending

use alloc::boxed::Box;
use alloc::collections::{BTreeSet, VecDeque};
use alloc::rc::Rc;
use alloc::string::String;
use alloc::vec::Vec;
use core::cell::RefCell;
use velio_core::schema::ConstraintTiming;
use velio_core::{Error, Result as CoreResult, Row, RowId};
use velio_storage::{ConstraintChecker, Journal, TableCache, Transaction};

use crate::back_store::{BackStore, TxMode};

pub type TaskId = u64;

/// A task's declared table scope and read/write mode.
#[derive(Clone, Debug)]
pub struct TaskDescriptor {
    pub scope: BTreeSet<String>,
    pub mode: TxMode,
}

impl TaskDescriptor {
    pub fn read(scope: impl IntoIterator<Item = String>) -> Self {
        Self {
            scope: scope.into_iter().collect(),
            mode: TxMode::ReadOnly,
        }
    }

    pub fn write(scope: impl IntoIterator<Item = String>) -> Self {
        Self {
            scope: scope.into_iter().collect(),
            mode: TxMode::ReadWrite,
        }
    }
}

/// The Runner's scheduling rule: a task may run alongside another iff
/// their scopes are disjoint, or both are read-only.
pub fn can_run_concurrently(a: &TaskDescriptor, b: &TaskDescriptor) -> bool {
    if a.scope.is_disjoint(&b.scope) {
        return true;
    }
    a.mode == TxMode::ReadOnly && b.mode == TxMode::ReadOnly
}

struct QueuedTask {
    id: TaskId,
    descriptor: TaskDescriptor,
    job: Option<Box<dyn FnOnce()>>,
}

/// FIFO queue of tasks plus the engine's commit-version counter.
///
/// Owns the shared `TableCache` and `BackStore` handles so that
/// [`run_read`]/[`run_write`] can schedule a unit of work against them
/// without the caller having to thread the handles through manually.
///
/// [`run_read`]: Runner::run_read
/// [`run_write`]: Runner::run_write
pub struct Runner {
    queue: VecDeque<QueuedTask>,
    next_task_id: TaskId,
    draining: bool,
    commit_version: u64,
    cache: Rc<RefCell<TableCache>>,
    back_store: Rc<RefCell<dyn BackStore>>,
    #[allow(clippy::type_complexity)]
    on_commit: Option<Box<dyn FnMut(u64, &BTreeSet<String>)>>,
}

impl Runner {
    pub fn new(cache: Rc<RefCell<TableCache>>, back_store: Rc<RefCell<dyn BackStore>>) -> Self {
        Self {
            queue: VecDeque::new(),
            next_task_id: 0,
            draining: false,
            commit_version: 0,
            cache,
            back_store,
            on_commit: None,
        }
    }

    pub fn cache(&self) -> Rc<RefCell<TableCache>> {
        self.cache.clone()
    }

    pub fn back_store(&self) -> Rc<RefCell<dyn BackStore>> {
        self.back_store.clone()
    }

    pub fn commit_version(&self) -> u64 {
        self.commit_version
    }

    /// Installs the callback invoked after every successful commit with
    /// the new commit version and the set of tables it mutated. The
    /// observer registry (the re-run-and-diff step) hangs off this hook.
    pub fn set_on_commit(&mut self, callback: impl FnMut(u64, &BTreeSet<String>) + 'static) {
        self.on_commit = Some(Box::new(callback));
    }

    fn enqueue(&mut self, descriptor: TaskDescriptor, job: Box<dyn FnOnce()>) -> TaskId {
        let id = self.next_task_id;
        self.next_task_id += 1;
        self.queue.push_back(QueuedTask {
            id,
            descriptor,
            job: Some(job),
        });
        id
    }

    /// Cancels a task that has not started running yet. Returns `false`
    /// if the id is unknown or the task already ran.
    pub fn cancel(&mut self, id: TaskId) -> bool {
        let before = self.queue.len();
        self.queue.retain(|t| t.id != id);
        self.queue.len() != before
    }

    /// Drains every queued task, FIFO. Reentrant: a job that itself
    /// enqueues a task (the observer registry re-running a query from
    /// inside a commit notification) just appends to the same queue,
    /// which the outermost call keeps draining — an inner call returns
    /// immediately and leaves draining to its caller.
    #[tracing::instrument(level = "debug", skip(self))]
    pub fn run_pending(&mut self) {
        if self.draining {
            return;
        }
        self.draining = true;
        while let Some(mut task) = self.queue.pop_front() {
            let span = tracing::debug_span!(
                "task_admission",
                task_id = task.id,
                mode = ?task.descriptor.mode,
                scope_len = task.descriptor.scope.len(),
            );
            let _enter = span.enter();
            if let Some(job) = task.job.take() {
                job();
            }
        }
        self.draining = false;
    }

    fn submit(&mut self, descriptor: TaskDescriptor, job: impl FnOnce() + 'static) -> TaskId {
        let id = self.enqueue(descriptor, Box::new(job));
        self.run_pending();
        id
    }

    /// Runs `f` as a read-only task against the cache.
    pub fn run_read<F, R>(&mut self, scope: impl IntoIterator<Item = String>, f: F) -> R
    where
        F: FnOnce(&TableCache) -> R + 'static,
        R: 'static,
    {
        let descriptor = TaskDescriptor::read(scope);
        let cache = self.cache.clone();
        let outcome: Rc<RefCell<Option<R>>> = Rc::new(RefCell::new(None));
        let cell = outcome.clone();

        self.submit(descriptor, move || {
            let value = f(&cache.borrow());
            *cell.borrow_mut() = Some(value);
        });

        outcome
            .borrow_mut()
            .take()
            .expect("read task runs synchronously before submit returns")
    }

    /// Runs `f` as an atomic read-write task: `f` stages writes into `tx`
    /// (never touching the cache directly), and on success those writes
    /// are constraint-checked, flushed to the back store, and only then
    /// applied to the cache and indices in one step — bumping the commit
    /// version and notifying observers. Any error, from `f` itself or
    /// from constraint validation, discards `tx` without mutating
    /// anything.
    #[tracing::instrument(level = "debug", skip_all)]
    pub fn run_write<F, R>(&mut self, scope: impl IntoIterator<Item = String>, f: F) -> CoreResult<R>
    where
        F: FnOnce(&TableCache, &mut Transaction) -> CoreResult<R> + 'static,
        R: 'static,
    {
        let scope: BTreeSet<String> = scope.into_iter().collect();
        let descriptor = TaskDescriptor::write(scope.clone());
        let cache = self.cache.clone();
        let back_store = self.back_store.clone();

        let outcome: Rc<RefCell<Option<CoreResult<(R, BTreeSet<String>)>>>> = Rc::new(RefCell::new(None));
        let cell = outcome.clone();

        self.submit(descriptor, move || {
            let mut tx = Transaction::begin();

            let attempt = (|| -> CoreResult<(R, BTreeSet<String>)> {
                let value = {
                    let cache_ref = cache.borrow();
                    f(&cache_ref, &mut tx)?
                };

                validate_constraints(&cache.borrow(), tx.journal())?;

                let mutated: BTreeSet<String> = tx.journal().get_all_diffs().keys().cloned().collect();
                if !mutated.is_empty() {
                    flush_to_back_store(&back_store, &mutated, tx.journal())?;
                }

                tx.commit(&mut cache.borrow_mut())?;
                Ok((value, mutated))
            })();

            if let Err(ref err) = attempt {
                tracing::warn!(error = %err, "write task aborted, no side effects");
            }

            *cell.borrow_mut() = Some(attempt);
        });

        let attempt = outcome
            .borrow_mut()
            .take()
            .expect("write task runs synchronously before submit returns");

        match attempt {
            Ok((value, mutated)) => {
                self.commit_version += 1;
                let version = self.commit_version;
                tracing::debug!(version, tables = mutated.len(), "committed");
                if let Some(on_commit) = self.on_commit.as_mut() {
                    on_commit(version, &mutated);
                }
                Ok(value)
            }
            Err(err) => Err(err),
        }
    }
}

fn validate_constraints(cache: &TableCache, journal: &Journal) -> CoreResult<()> {
    for (table_name, diff) in journal.get_all_diffs() {
        let store = cache
            .get_table(table_name)
            .ok_or_else(|| Error::table_not_found(table_name))?;
        let schema = store.schema();

        let inserted: Vec<Row> = diff.get_added().values().cloned().collect();
        let modifications: Vec<(Row, Row)> = diff.get_modified().values().cloned().collect();
        let deleted: Vec<Row> = diff.get_deleted().values().cloned().collect();
        let updated_new: Vec<Row> = modifications.iter().map(|(_, new)| new.clone()).collect();

        ConstraintChecker::check_not_null_rows(schema, &inserted)?;
        ConstraintChecker::check_not_null_rows(schema, &updated_new)?;

        if !inserted.is_empty() {
            ConstraintChecker::check_foreign_keys_for_insert(
                cache,
                schema,
                &inserted,
                ConstraintTiming::Immediate,
            )?;
        }
        if !modifications.is_empty() {
            ConstraintChecker::check_foreign_keys_for_update(
                cache,
                schema,
                &modifications,
                ConstraintTiming::Immediate,
            )?;
        }
        if !deleted.is_empty() {
            ConstraintChecker::check_foreign_keys_for_delete(
                cache,
                schema,
                &deleted,
                ConstraintTiming::Immediate,
            )?;
        }

        check_unique_constraints(store, schema, diff)?;
    }
    Ok(())
}

/// Journal entries are applied to the cache (and its indices) one at a time
/// by [`Journal::apply`], with no rollback of earlier entries if a later
/// one fails. Uniqueness violations must therefore be caught here, against
/// the post-diff row set, before `commit` ever touches the cache — a
/// violation discovered mid-`apply` would leave the transaction half
/// written.
fn check_unique_constraints(
    store: &velio_storage::RowStore,
    schema: &velio_core::schema::Table,
    diff: &velio_storage::TableDiff,
) -> CoreResult<()> {
    let mut unique_defs: Vec<&velio_core::schema::IndexDef> =
        schema.indices().iter().filter(|idx| idx.is_unique()).collect();
    if let Some(pk) = schema.primary_key() {
        unique_defs.push(pk);
    }
    if unique_defs.is_empty() {
        return Ok(());
    }

    let deleted: BTreeSet<RowId> = diff.get_deleted().keys().cloned().collect();
    let mut final_rows: Vec<Row> = store
        .scan()
        .filter(|r| !deleted.contains(&r.id()))
        .map(|r| {
            diff.get_modified()
                .get(&r.id())
                .map(|(_, new)| new.clone())
                .unwrap_or_else(|| (*r).clone())
        })
        .collect();
    final_rows.extend(diff.get_added().values().cloned());

    for idx in unique_defs {
        let col_indices: Vec<usize> = idx
            .columns()
            .iter()
            .filter_map(|c| schema.get_column_index(&c.name))
            .collect();
        let mut seen: BTreeSet<Vec<velio_core::Value>> = BTreeSet::new();
        for row in &final_rows {
            let key: Vec<velio_core::Value> = col_indices.iter().map(|&i| row.values()[i].clone()).collect();
            if key.iter().any(|v| matches!(v, velio_core::Value::Null)) {
                continue;
            }
            if !seen.insert(key.clone()) {
                let value = key
                    .into_iter()
                    .next()
                    .unwrap_or(velio_core::Value::Null);
                return Err(Error::unique_constraint(idx.name(), value));
            }
        }
    }
    Ok(())
}

fn flush_to_back_store(
    back_store: &Rc<RefCell<dyn BackStore>>,
    tables: &BTreeSet<String>,
    journal: &Journal,
) -> CoreResult<()> {
    let mut store = back_store.borrow_mut();
    let table_list: Vec<String> = tables.iter().cloned().collect();
    let tx = store.create_tx(TxMode::ReadWrite, &table_list)?;

    for table in tables {
        let Some(diff) = journal.get_table_diff(table) else {
            continue;
        };
        for (row_id, row) in diff.get_added() {
            store.put(tx, table, *row_id, row.clone())?;
        }
        for (row_id, (_, new)) in diff.get_modified() {
            store.put(tx, table, *row_id, new.clone())?;
        }
        for row_id in diff.get_deleted().keys() {
            store.delete(tx, table, *row_id)?;
        }
    }

    store.commit(tx)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::back_store::InMemoryBackStore;
    use velio_core::schema::Column;
    use velio_core::schema::Table;
    use velio_core::{DataType, Value};

    fn users_table() -> Table {
        Table::new(
            "users",
            alloc::vec![
                Column::new("id", DataType::Int64),
                Column::new("name", DataType::String),
            ],
        )
    }

    fn make_runner() -> Runner {
        let mut cache = TableCache::new();
        cache.create_table(users_table()).unwrap();
        let mut back_store = InMemoryBackStore::new();
        back_store.open(&[users_table()]).unwrap();
        Runner::new(Rc::new(RefCell::new(cache)), Rc::new(RefCell::new(back_store)))
    }

    #[test]
    fn test_can_run_concurrently_disjoint_scopes() {
        let a = TaskDescriptor::write(["users".to_string()]);
        let b = TaskDescriptor::read(["orders".to_string()]);
        assert!(can_run_concurrently(&a, &b));
    }

    #[test]
    fn test_can_run_concurrently_two_reads_same_table() {
        let a = TaskDescriptor::read(["users".to_string()]);
        let b = TaskDescriptor::read(["users".to_string()]);
        assert!(can_run_concurrently(&a, &b));
    }

    #[test]
    fn test_cannot_run_concurrently_write_overlaps_read() {
        let a = TaskDescriptor::write(["users".to_string()]);
        let b = TaskDescriptor::read(["users".to_string()]);
        assert!(!can_run_concurrently(&a, &b));
    }

    #[test]
    fn test_cannot_run_concurrently_two_writes_same_table() {
        let a = TaskDescriptor::write(["users".to_string()]);
        let b = TaskDescriptor::write(["users".to_string()]);
        assert!(!can_run_concurrently(&a, &b));
    }

    #[test]
    fn test_run_write_commits_and_bumps_version() {
        let mut runner = make_runner();
        assert_eq!(runner.commit_version(), 0);

        let result = runner.run_write(["users".to_string()], |_cache, tx| {
            tx.insert("users", Row::new(1, alloc::vec![Value::Int64(1), Value::String("a".into())]))?;
            Ok(())
        });

        assert!(result.is_ok());
        assert_eq!(runner.commit_version(), 1);
        assert_eq!(runner.cache().borrow().get_table("users").unwrap().len(), 1);
    }

    #[test]
    fn test_run_write_failure_leaves_cache_untouched() {
        let mut runner = make_runner();

        let result: CoreResult<()> = runner.run_write(["users".to_string()], |_cache, tx| {
            tx.insert("users", Row::new(1, alloc::vec![Value::Int64(1), Value::Null]))?;
            Err(Error::invalid_operation("caller aborted"))
        });

        assert!(result.is_err());
        assert_eq!(runner.commit_version(), 0);
        assert_eq!(runner.cache().borrow().get_table("users").unwrap().len(), 0);
    }

    #[test]
    fn test_run_write_rejects_null_in_not_null_column() {
        let mut cache = TableCache::new();
        let schema = velio_core::schema::TableBuilder::new("users")
            .unwrap()
            .add_column("id", DataType::Int64)
            .unwrap()
            .add_column("name", DataType::String)
            .unwrap()
            .build()
            .unwrap();
        cache.create_table(schema.clone()).unwrap();
        let mut back_store = InMemoryBackStore::new();
        back_store.open(&[schema]).unwrap();
        let mut runner = Runner::new(Rc::new(RefCell::new(cache)), Rc::new(RefCell::new(back_store)));

        let result: CoreResult<()> = runner.run_write(["users".to_string()], |_cache, tx| {
            tx.insert("users", Row::new(1, alloc::vec![Value::Int64(1), Value::Null]))?;
            Ok(())
        });

        assert!(result.is_err());
        assert_eq!(runner.cache().borrow().get_table("users").unwrap().len(), 0);
    }

    #[test]
    fn test_run_read_sees_committed_writes() {
        let mut runner = make_runner();
        runner
            .run_write(["users".to_string()], |_cache, tx| {
                tx.insert("users", Row::new(1, alloc::vec![Value::Int64(1), Value::String("a".into())]))?;
                Ok(())
            })
            .unwrap();

        let count = runner.run_read(["users".to_string()], |cache| {
            cache.get_table("users").unwrap().len()
        });
        assert_eq!(count, 1);
    }

    #[test]
    fn test_on_commit_hook_receives_mutated_tables() {
        let mut runner = make_runner();
        let seen: Rc<RefCell<Vec<(u64, BTreeSet<String>)>>> = Rc::new(RefCell::new(Vec::new()));
        let seen_clone = seen.clone();
        runner.set_on_commit(move |version, tables| {
            seen_clone.borrow_mut().push((version, tables.clone()));
        });

        runner
            .run_write(["users".to_string()], |_cache, tx| {
                tx.insert("users", Row::new(1, alloc::vec![Value::Int64(1), Value::String("a".into())]))?;
                Ok(())
            })
            .unwrap();

        let log = seen.borrow();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].0, 1);
        assert!(log[0].1.contains("users"));
    }

    #[test]
    fn test_cancel_before_run_pending_skips_task() {
        let mut runner = make_runner();
        runner.draining = true; // prevent submit's auto-drain from racing the manual enqueue below
        let ran = Rc::new(RefCell::new(false));
        let ran_clone = ran.clone();
        let id = runner.enqueue(
            TaskDescriptor::read(["users".to_string()]),
            Box::new(move || {
                *ran_clone.borrow_mut() = true;
            }),
        );
        assert!(runner.cancel(id));
        runner.draining = false;
        runner.run_pending();
        assert!(!*ran.borrow());
    }

    #[test]
    fn test_reentrant_submit_during_write_drains_in_order() {
        let mut runner = make_runner();
        let order: Rc<RefCell<Vec<&'static str>>> = Rc::new(RefCell::new(Vec::new()));

        let order_for_notify = order.clone();
        let cache_for_notify = runner.cache();
        runner.set_on_commit(move |_version, _tables| {
            order_for_notify.borrow_mut().push("notify_start");
            let _ = cache_for_notify.borrow().get_table("users").unwrap().len();
            order_for_notify.borrow_mut().push("notify_end");
        });

        let order_for_write = order.clone();
        runner
            .run_write(["users".to_string()], move |_cache, tx| {
                order_for_write.borrow_mut().push("write");
                tx.insert("users", Row::new(1, alloc::vec![Value::Int64(1), Value::String("a".into())]))?;
                Ok(())
            })
            .unwrap();

        assert_eq!(*order.borrow(), alloc::vec!["write", "notify_start", "notify_end"]);
    }
}
