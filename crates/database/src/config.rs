//! Engine-wide configuration knobs.
//!
//! Groups together the constants the component design leaves as
//! implementation-defined: the planner's index-vs-scan cost threshold and
//! join enumeration limit, plus which [`BackStore`] implementation a fresh
//! engine opens against.

use alloc::boxed::Box;
use alloc::rc::Rc;
use core::cell::RefCell;

use crate::back_store::{BackStore, InMemoryBackStore};
use crate::error::EngineResult;

/// A one-shot schema migration: runs with a raw handle to the back store
/// when the stored schema version is behind the declared one.
pub type UpgradeCallback = Box<dyn FnOnce(&mut dyn BackStore) -> EngineResult<()>>;

/// Tunable knobs for planning and storage. Constructed via [`Default`] or
/// built up field-by-field; `Engine::open_with_config` takes one directly.
pub struct EngineConfig {
    /// Reserved for a future cost-based index-vs-scan comparison: an index
    /// scan would be chosen over a full scan whenever its estimated cost is
    /// below `full_scan_cost * index_scan_threshold_ratio`. The current
    /// planner's index selection pass substitutes an index scan whenever a
    /// matching index exists, regardless of this value — it does not yet
    /// estimate or compare costs.
    pub index_scan_threshold_ratio: f64,

    /// Reserved for a future join-ordering cost model: the number of tables
    /// a join plan would exhaustively enumerate orderings for before
    /// falling back to a greedy left-deep plan. The current join reordering
    /// pass doesn't read this value.
    pub join_enumeration_limit: usize,

    /// Back store the engine opens against. Defaults to the in-memory
    /// reference implementation.
    pub back_store: Rc<RefCell<dyn BackStore>>,

    /// Schema version this engine declares. If the store's recorded
    /// version is lower, `upgrade` runs once and the store is then marked
    /// at this version.
    pub schema_version: u32,

    /// Migration run once at `open` when the store's version is behind
    /// `schema_version`. Not invoked on a fresh store opening at version 0.
    pub upgrade: Option<UpgradeCallback>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            index_scan_threshold_ratio: 1.0,
            join_enumeration_limit: 3,
            back_store: Rc::new(RefCell::new(InMemoryBackStore::new())),
            schema_version: 0,
            upgrade: None,
        }
    }
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_index_scan_threshold_ratio(mut self, ratio: f64) -> Self {
        self.index_scan_threshold_ratio = ratio;
        self
    }

    pub fn with_join_enumeration_limit(mut self, limit: usize) -> Self {
        self.join_enumeration_limit = limit;
        self
    }

    pub fn with_back_store(mut self, back_store: Rc<RefCell<dyn BackStore>>) -> Self {
        self.back_store = back_store;
        self
    }

    pub fn with_schema_version(mut self, version: u32) -> Self {
        self.schema_version = version;
        self
    }

    pub fn with_upgrade(mut self, upgrade: impl FnOnce(&mut dyn BackStore) -> EngineResult<()> + 'static) -> Self {
        self.upgrade = Some(Box::new(upgrade));
        self
    }
}
