#![forbid(unsafe_code)]

//! Sequences: ordered batches of mutations undone and redone as one unit.
//!
//! A sequence is growable only while it is open as a group. Once it is
//! handed to [`UndoHistory::push`](crate::UndoHistory::push) it occupies a
//! single history slot and is never modified again.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::mutation::{MutationRecord, Operation};

static NEXT_SEQUENCE_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique sequence identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SequenceId(u64);

impl SequenceId {
    /// Allocate a fresh id.
    #[must_use]
    pub fn next() -> Self {
        Self(NEXT_SEQUENCE_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Rebuild an id from a raw value (for diagnostics and tests).
    #[must_use]
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SequenceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// An ordered batch of mutation records.
pub struct Sequence<Op> {
    id: SequenceId,
    mutations: Vec<MutationRecord<Op>>,
}

impl<Op: Operation> Clone for Sequence<Op> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            mutations: self.mutations.clone(),
        }
    }
}

impl<Op: fmt::Debug> fmt::Debug for Sequence<Op> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sequence")
            .field("id", &self.id)
            .field("mutations", &self.mutations)
            .finish()
    }
}

impl<Op: Operation> Default for Sequence<Op> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Op: Operation> Sequence<Op> {
    /// Create an empty sequence with a fresh id.
    #[must_use]
    pub fn new() -> Self {
        Self {
            id: SequenceId::next(),
            mutations: Vec::new(),
        }
    }

    /// Create a sequence holding a single record.
    #[must_use]
    pub fn single(record: MutationRecord<Op>) -> Self {
        let mut sequence = Self::new();
        sequence.push(record);
        sequence
    }

    #[must_use]
    pub fn id(&self) -> SequenceId {
        self.id
    }

    #[must_use]
    pub fn mutations(&self) -> &[MutationRecord<Op>] {
        &self.mutations
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.mutations.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.mutations.is_empty()
    }

    /// True when every record was re-emitted by replay.
    ///
    /// Empty sequences are never replay sequences.
    #[must_use]
    pub fn is_replay(&self) -> bool {
        !self.mutations.is_empty() && self.mutations.iter().all(|m| m.meta().is_replay())
    }

    /// Operation names in recorded order.
    pub fn kinds(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.mutations.iter().map(MutationRecord::kind)
    }

    pub(crate) fn push(&mut self, mut record: MutationRecord<Op>) {
        record.set_group(self.id);
        self.mutations.push(record);
    }

    /// Replay copies of every record, in recorded order.
    pub(crate) fn replay_records(&self) -> Vec<MutationRecord<Op>> {
        self.mutations.iter().map(MutationRecord::to_replay).collect()
    }
}
