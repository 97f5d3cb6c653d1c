//! Observable query implementation.
//!
//! This module provides `ObservableQuery` which wraps a dataflow and maintains
//! the current result set, notifying subscribers when changes occur.
//!
//! The key feature is the `changes()` method which returns an iterator/stream
//! that yields the initial result followed by incremental changes.

use crate::change_set::ChangeSet;
use crate::subscription::{SubscriptionId, SubscriptionManager};
use alloc::vec::Vec;
use velio_core::{Row, Value};
use velio_incremental::{DataflowNode, Delta, MaterializedView, TableId};

/// An observable query that tracks changes and notifies subscribers.
///
/// This struct wraps a `MaterializedView` and adds subscription management.
/// Subscribers receive `ChangeSet` notifications when the underlying data changes.
///
/// # Example
///
/// ```ignore
/// use velio_reactive::ObservableQuery;
/// use velio_incremental::DataflowNode;
///
/// let dataflow = DataflowNode::filter(
///     DataflowNode::source(1),
///     |row| row.get(1).and_then(|v| v.as_i64()).map(|age| age > 18).unwrap_or(false)
/// );
///
/// let mut query = ObservableQuery::new(dataflow);
///
/// // Subscribe to changes
/// let sub_id = query.subscribe(|changes| {
///     println!("Added: {}, Removed: {}", changes.added.len(), changes.removed.len());
/// });
///
/// // When table changes occur, subscribers are notified
/// query.on_table_change(1, deltas);
/// ```
pub struct ObservableQuery {
    /// The underlying materialized view
    view: MaterializedView,
    /// Subscription manager for change notifications
    subscriptions: SubscriptionManager,
    /// Whether initial value has been emitted
    initialized: bool,
}

impl ObservableQuery {
    /// Creates a new observable query from a dataflow node.
    pub fn new(dataflow: DataflowNode) -> Self {
        Self {
            view: MaterializedView::new(dataflow),
            subscriptions: SubscriptionManager::new(),
            initialized: false,
        }
    }

    /// Creates an observable query with an initial result set.
    pub fn with_initial(dataflow: DataflowNode, initial: Vec<Row>) -> Self {
        Self {
            view: MaterializedView::with_initial(dataflow, initial),
            subscriptions: SubscriptionManager::new(),
            initialized: true,
        }
    }

    /// Initializes join state from source data.
    /// This must be called for join queries to properly track incremental changes.
    pub fn initialize_join_state(
        &mut self,
        left_rows: &[Row],
        right_rows: &[Row],
        left_key_fn: impl Fn(&Row) -> Vec<Value>,
        right_key_fn: impl Fn(&Row) -> Vec<Value>,
    ) {
        self.view.initialize_join_state(left_rows, right_rows, left_key_fn, right_key_fn);
    }

    /// Returns the current result as a Vec.
    #[inline]
    pub fn result(&self) -> Vec<Row> {
        self.view.result()
    }

    /// Returns the number of rows in the result.
    #[inline]
    pub fn len(&self) -> usize {
        self.view.len()
    }

    /// Returns true if the result is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.view.is_empty()
    }

    /// Returns the tables this query depends on.
    #[inline]
    pub fn dependencies(&self) -> &[TableId] {
        self.view.dependencies()
    }

    /// Checks if this query depends on the given table.
    #[inline]
    pub fn depends_on(&self, table_id: TableId) -> bool {
        self.view.depends_on(table_id)
    }

    /// Subscribes to changes with the given callback.
    ///
    /// The callback will be invoked whenever the query result changes.
    /// Returns a subscription ID that can be used to unsubscribe.
    pub fn subscribe<F>(&mut self, callback: F) -> SubscriptionId
    where
        F: Fn(&ChangeSet) + 'static,
    {
        self.subscriptions.subscribe(callback)
    }

    /// Unsubscribes by ID.
    ///
    /// Returns true if the subscription was found and removed.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.subscriptions.unsubscribe(id)
    }

    /// Returns the number of active subscriptions.
    #[inline]
    pub fn subscription_count(&self) -> usize {
        self.subscriptions.len()
    }

    /// Handles changes to a source table.
    ///
    /// Propagates the deltas through the dataflow, updates the result,
    /// and notifies all subscribers of the changes.
    pub fn on_table_change(&mut self, table_id: TableId, deltas: Vec<Delta<Row>>) {
        let output_deltas = self.view.on_table_change(table_id, deltas);

        if !output_deltas.is_empty() {
            // Get current result AFTER applying changes
            let current_result = self.view.result();
            let changes = ChangeSet::from_deltas(&output_deltas, current_result);
            self.subscriptions.notify_all(&changes);
        }
    }

    /// Initializes the query with the given rows and notifies subscribers.
    ///
    /// This should be called once after creating the query to set the initial
    /// result and notify subscribers of the initial state.
    pub fn initialize(&mut self, rows: Vec<Row>) {
        if !self.initialized {
            self.view.set_result(rows.clone());
            self.initialized = true;

            if !rows.is_empty() {
                let changes = ChangeSet::initial(rows);
                self.subscriptions.notify_all(&changes);
            }
        }
    }

    /// Returns whether the query has been initialized.
    #[inline]
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Creates a `Changes` iterator that yields the initial result followed by changes.
    ///
    /// This is the key API for reactive queries. The first value pushed is the
    /// initial result set (as additions), and subsequent values are incremental
    /// changes after applying diffs.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let query = ObservableQuery::new(dataflow);
    /// let changes = query.changes();
    ///
    /// // First call returns initial result
    /// // Subsequent calls return incremental changes
    /// ```
    pub fn changes(&mut self) -> Changes<'_> {
        Changes {
            query: self,
            emitted_initial: false,
        }
    }

    /// Clears the result and resets the query.
    pub fn clear(&mut self) {
        self.view.clear();
        self.initialized = false;
    }
}

/// An iterator-like struct for observing query changes.
///
/// The first call to `next()` returns the initial result set (as a ChangeSet
/// with all rows as additions). Subsequent changes are returned as they occur.
pub struct Changes<'a> {
    query: &'a mut ObservableQuery,
    emitted_initial: bool,
}

impl<'a> Changes<'a> {
    /// Gets the initial change set (all current rows as additions).
    ///
    /// This should be called first to get the initial state.
    pub fn initial(&mut self) -> ChangeSet {
        if !self.emitted_initial {
            self.emitted_initial = true;
            ChangeSet::initial(self.query.result())
        } else {
            ChangeSet::new()
        }
    }

    /// Processes table changes and returns the resulting change set.
    ///
    /// This method propagates the deltas through the dataflow and returns
    /// the changes to the query result.
    pub fn process(&mut self, table_id: TableId, deltas: Vec<Delta<Row>>) -> ChangeSet {
        let output_deltas = self.query.view.on_table_change(table_id, deltas);
        let current_result = self.query.view.result();
        ChangeSet::from_deltas(&output_deltas, current_result)
    }

    /// Returns the current result as a Vec.
    #[inline]
    pub fn result(&self) -> Vec<Row> {
        self.query.result()
    }
}
