#![forbid(unsafe_code)]

//! Mutation records: the atomic unit of the undo log.
//!
//! A [`MutationRecord`] pairs an operation value with its [`UndoMeta`].
//! Operations are variants of a module's closed operation enum, so the
//! payload travels inside the variant and the operation name is derived
//! from it rather than parsed out of a string.
//!
//! # Invariants
//!
//! - A record is immutable once committed.
//! - `is_replay` is only ever set by the replay path inside this crate.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::sequence::SequenceId;

/// A module operation.
///
/// Implemented by each module's operation enum. `name` must be stable per
/// variant; ignore lists and the set-state check compare against it.
pub trait Operation: Clone + fmt::Debug + 'static {
    /// Operation identifier, e.g. `"CREATE"`.
    fn name(&self) -> &'static str;
}

/// Callback invoked when a recorded mutation is undone or redone.
pub type Hook<Op> = Arc<dyn Fn(&MutationRecord<Op>) + Send + Sync>;

/// Undo bookkeeping attached to every mutation.
pub struct UndoMeta<Op> {
    ignore: bool,
    is_replay: bool,
    group_id: Option<SequenceId>,
    cache: BTreeMap<String, serde_json::Value>,
    on_undo: Option<Hook<Op>>,
    on_redo: Option<Hook<Op>>,
}

impl<Op> Default for UndoMeta<Op> {
    fn default() -> Self {
        Self {
            ignore: false,
            is_replay: false,
            group_id: None,
            cache: BTreeMap::new(),
            on_undo: None,
            on_redo: None,
        }
    }
}

impl<Op> Clone for UndoMeta<Op> {
    fn clone(&self) -> Self {
        Self {
            ignore: self.ignore,
            is_replay: self.is_replay,
            group_id: self.group_id,
            cache: self.cache.clone(),
            on_undo: self.on_undo.clone(),
            on_redo: self.on_redo.clone(),
        }
    }
}

impl<Op> fmt::Debug for UndoMeta<Op> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UndoMeta")
            .field("ignore", &self.ignore)
            .field("is_replay", &self.is_replay)
            .field("group_id", &self.group_id)
            .field("cache", &self.cache)
            .field("on_undo", &self.on_undo.is_some())
            .field("on_redo", &self.on_redo.is_some())
            .finish()
    }
}

impl<Op> UndoMeta<Op> {
    #[must_use]
    pub fn ignore(&self) -> bool {
        self.ignore
    }

    #[must_use]
    pub fn is_replay(&self) -> bool {
        self.is_replay
    }

    /// Id of the group this record was folded into, if any.
    #[must_use]
    pub fn group_id(&self) -> Option<SequenceId> {
        self.group_id
    }

    #[must_use]
    pub fn cache(&self) -> &BTreeMap<String, serde_json::Value> {
        &self.cache
    }
}

/// An operation committed to a module, plus its undo metadata.
pub struct MutationRecord<Op> {
    op: Op,
    meta: UndoMeta<Op>,
}

impl<Op: Clone> Clone for MutationRecord<Op> {
    fn clone(&self) -> Self {
        Self {
            op: self.op.clone(),
            meta: self.meta.clone(),
        }
    }
}

impl<Op: fmt::Debug> fmt::Debug for MutationRecord<Op> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MutationRecord")
            .field("op", &self.op)
            .field("meta", &self.meta)
            .finish()
    }
}

impl<Op: Operation> From<Op> for MutationRecord<Op> {
    fn from(op: Op) -> Self {
        Self::new(op)
    }
}

impl<Op: Operation> MutationRecord<Op> {
    /// Wrap an operation with default metadata.
    #[must_use]
    pub fn new(op: Op) -> Self {
        Self {
            op,
            meta: UndoMeta::default(),
        }
    }

    /// Mark the record as never undo-tracked.
    #[must_use]
    pub fn ignored(mut self) -> Self {
        self.meta.ignore = true;
        self
    }

    /// Attach a callback run after this record's sequence is undone.
    #[must_use]
    pub fn on_undo(mut self, hook: impl Fn(&MutationRecord<Op>) + Send + Sync + 'static) -> Self {
        self.meta.on_undo = Some(Arc::new(hook));
        self
    }

    /// Attach a callback run after this record's sequence is redone.
    #[must_use]
    pub fn on_redo(mut self, hook: impl Fn(&MutationRecord<Op>) + Send + Sync + 'static) -> Self {
        self.meta.on_redo = Some(Arc::new(hook));
        self
    }

    /// Stash a value for hooks to read back.
    #[must_use]
    pub fn with_cache(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.meta.cache.insert(key.into(), value);
        self
    }

    #[must_use]
    pub fn op(&self) -> &Op {
        &self.op
    }

    /// Operation name of the wrapped op.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        self.op.name()
    }

    #[must_use]
    pub fn meta(&self) -> &UndoMeta<Op> {
        &self.meta
    }

    /// Copy of this record flagged as replayed history.
    pub(crate) fn to_replay(&self) -> Self {
        let mut record = self.clone();
        record.meta.is_replay = true;
        record
    }

    /// Whole-state restore record; never tracked.
    pub(crate) fn restore(op: Op) -> Self {
        let mut record = Self::new(op);
        record.meta.ignore = true;
        record.meta.is_replay = true;
        record
    }

    pub(crate) fn set_group(&mut self, id: SequenceId) {
        self.meta.group_id = Some(id);
    }

    pub(crate) fn fire_undo(&self) {
        if let Some(hook) = &self.meta.on_undo {
            hook(self);
        }
    }

    pub(crate) fn fire_redo(&self) {
        if let Some(hook) = &self.meta.on_redo {
            hook(self);
        }
    }
}
