#![forbid(unsafe_code)]

//! Quire Undo
//!
//! Event-sourced undo/redo for namespaced state modules. Every tracked
//! commit is appended to a per-module log; undo reconstructs the previous
//! position by restoring the nearest cached snapshot and replaying the
//! commits after it.
//!
//! # Key Components
//!
//! - [`MutationRecord`] - One commit plus its undo metadata and hooks
//! - [`Sequence`] - The unit undone or redone in one step
//! - [`UndoHistory`] - Ordered sequences with a cursor and checkpoint
//! - [`StateCache`] - Periodic deep-copied snapshots of module state
//! - [`UndoContext`] - History and cache bound to one module
//! - [`UndoRegistry`] - Contexts keyed by namespace; the interception point
//! - [`Store`] - Live module state, observers and the registry together
//!
//! # Architecture
//!
//! ```text
//!  commit(ns, op)
//!       │
//!       ▼
//!  ┌─────────┐  apply + notify   ┌──────────────┐
//!  │  Store  │ ────────────────► │ module state │
//!  └────┬────┘                   └──────────────┘
//!       │ intercept                    ▲
//!       ▼                              │ set_state + replay
//!  ┌──────────────┐   ┌─────────────┐  │
//!  │ UndoRegistry │──►│ UndoContext │──┘
//!  └──────────────┘   │  history    │
//!                     │  cache      │
//!                     └─────────────┘
//! ```
//!
//! Modules are plain reducers: implement [`UndoModule`] with a closed
//! operation enum and a whole-state replacement operation. Nothing has to
//! know how to invert an operation.

pub mod config;
pub mod context;
pub mod error;
pub mod history;
pub mod module;
pub mod mutation;
pub mod registry;
pub mod sequence;
pub mod state_cache;
pub mod store;

pub use config::UndoSettings;
pub use context::{GroupOutcome, GroupScope, PushOutcome, ReplayReport, UndoContext};
pub use error::{Result, SettingsError, UndoError};
pub use history::{UndoHistory, UndoStep};
pub use module::{CommitEvent, ModuleHost, Observer, Observers, UndoModule};
pub use mutation::{Hook, MutationRecord, Operation, UndoMeta};
pub use registry::{Interception, UndoRegistry};
pub use sequence::{Sequence, SequenceId};
pub use state_cache::{CacheEntry, StateCache};
pub use store::Store;
