//! Velio database crate - the in-process query engine's public API.
//!
//! This crate ties the planner, storage, and reactive layers together
//! behind a single `Engine` handle with fluent builders for queries,
//! writes, and transactions.
//!
//! # Core Components
//!
//! - `Engine`: entry point for opening tables, running queries and writes,
//!   and subscribing to live query results.
//! - `Select`, `Insert`, `Update`, `Delete`: fluent builders for DML/DQL.
//! - `TransactionBuilder`: groups several writes into one atomic commit.
//! - `predicate::col`/`param`: build filter predicates for `Select::filter`.
//!
//! # Example
//!
//! ```ignore
//! let engine = Engine::open_with_config(config)?;
//! let rows = engine
//!     .select(vec!["id".into(), "name".into()])
//!     .from("users")
//!     .where_(col("age").gt(25))
//!     .exec()?;
//! ```

extern crate alloc;

pub mod back_store;
pub mod binary_protocol;
pub mod config;
pub mod dataflow_compiler;
pub mod engine;
pub mod error;
pub mod observer_registry;
pub mod predicate;
pub mod query_engine;
pub mod runner;

pub use back_store::{BackStore, BackStoreError, BackStoreResult, BackStoreTxId, Cursor, InMemoryBackStore, TxMode};
pub use binary_protocol::{BinaryResult, SchemaLayout};
pub use config::EngineConfig;
pub use engine::{Delete, Engine, Insert, Select, TransactionBuilder, Update};
pub use error::{EngineError, EngineResult};
pub use observer_registry::{ObserverRegistry, QueryId as ObserverQueryId, SubscriberId};
pub use predicate::{col, param, Col, Operand, Predicate};
pub use runner::{can_run_concurrently, Runner, TaskDescriptor, TaskId};
