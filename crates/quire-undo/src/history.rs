#![forbid(unsafe_code)]

//! Append-only sequence log with a movable cursor.
//!
//! [`UndoHistory`] stores every committed [`Sequence`] and a `current_index`
//! marking the present. Sequences before the cursor are done, sequences at
//! or after it are undone and available for redo.
//!
//! # Invariants
//!
//! 1. `0 <= current_index <= len`
//! 2. A non-replay push while `current_index < len` truncates the future
//! 3. A replay push never changes the log shape, only the cursor
//! 4. Undo never moves the cursor below the checkpoint (hard limit)
//!
//! ```text
//! push(s5)
//! ┌──────────────────────────────────────┐
//! │ [s1, s2, s3, s4, s5]   current = 5   │
//! └──────────────────────────────────────┘
//!
//! undo() x2
//! ┌──────────────────────────────────────┐
//! │ [s1, s2, s3 | s4, s5]  current = 3   │
//! └──────────────────────────────────────┘
//!
//! push(s6)  <-- new branch, drops s4 and s5
//! ┌──────────────────────────────────────┐
//! │ [s1, s2, s3, s6]       current = 4   │
//! └──────────────────────────────────────┘
//! ```

use std::fmt;

use crate::error::{Result, UndoError};
use crate::mutation::Operation;
use crate::sequence::Sequence;

/// Sequences to replay plus the sequence being rolled back.
#[derive(Debug)]
pub struct UndoStep<'a, Op> {
    /// `sequences[replay_from..stop_at]`, re-applied after a snapshot restore.
    pub to_replay: &'a [Sequence<Op>],
    /// `sequences[stop_at]`; only its hooks run.
    pub undone: &'a Sequence<Op>,
}

/// Log of committed sequences.
pub struct UndoHistory<Op> {
    sequences: Vec<Sequence<Op>>,
    current_index: usize,
    hard_limit: Option<usize>,
}

impl<Op> fmt::Debug for UndoHistory<Op> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UndoHistory")
            .field("len", &self.sequences.len())
            .field("current_index", &self.current_index)
            .field("hard_limit", &self.hard_limit)
            .finish()
    }
}

impl<Op> Default for UndoHistory<Op> {
    fn default() -> Self {
        Self {
            sequences: Vec::new(),
            current_index: 0,
            hard_limit: None,
        }
    }
}

impl<Op: Operation> UndoHistory<Op> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // ========================================================================
    // Core Operations
    // ========================================================================

    /// Allocate an empty sequence. It is not part of the log until pushed.
    #[must_use]
    pub fn create_sequence(&self) -> Sequence<Op> {
        Sequence::new()
    }

    /// Append a sequence at the cursor.
    ///
    /// Replay sequences only advance the cursor. Returns how many future
    /// sequences were truncated to make room.
    pub fn push(&mut self, sequence: Sequence<Op>) -> usize {
        if sequence.is_replay() {
            self.current_index = (self.current_index + 1).min(self.sequences.len());
            return 0;
        }

        let truncated = self.sequences.len() - self.current_index;
        self.sequences.truncate(self.current_index);
        self.sequences.push(sequence);
        self.current_index = self.sequences.len();
        truncated
    }

    /// Move the cursor back to `stop_at`.
    ///
    /// `replay_from` is the position of the snapshot the caller restored;
    /// the returned [`UndoStep`] lists what to re-apply on top of it.
    pub fn undo(&mut self, replay_from: usize, stop_at: usize) -> Result<UndoStep<'_, Op>> {
        if !self.can_undo() {
            return Err(UndoError::NothingToUndo);
        }
        if replay_from > stop_at || stop_at >= self.current_index {
            return Err(UndoError::InvalidReplayRange {
                replay_from,
                stop_at,
                current: self.current_index,
            });
        }
        if self.hard_limit.is_some_and(|limit| stop_at < limit) {
            return Err(UndoError::NothingToUndo);
        }

        self.current_index = stop_at;
        Ok(UndoStep {
            to_replay: &self.sequences[replay_from..stop_at],
            undone: &self.sequences[stop_at],
        })
    }

    /// Advance the cursor over the next undone sequence and return it.
    pub fn redo(&mut self) -> Result<&Sequence<Op>> {
        if !self.can_redo() {
            return Err(UndoError::NothingToRedo);
        }
        let sequence = &self.sequences[self.current_index];
        self.current_index += 1;
        Ok(sequence)
    }

    #[must_use]
    pub fn can_undo(&self) -> bool {
        self.current_index > 0
            && self
                .hard_limit
                .is_none_or(|limit| limit < self.current_index)
    }

    #[must_use]
    pub fn can_redo(&self) -> bool {
        self.current_index < self.sequences.len()
    }

    // ========================================================================
    // Checkpoints
    // ========================================================================

    /// Forbid undoing past the current position.
    pub fn set_checkpoint(&mut self) {
        self.hard_limit = Some(self.current_index);
    }

    /// Clear the checkpoint. Returns false if none was set.
    pub fn release_checkpoint(&mut self) -> bool {
        self.hard_limit.take().is_some()
    }

    /// Drop everything after the checkpoint and move the cursor onto it.
    ///
    /// Returns the discarded sequences in log order. The checkpoint is
    /// cleared.
    pub fn truncate_to_checkpoint(&mut self) -> Result<Vec<Sequence<Op>>> {
        let limit = self.hard_limit.take().ok_or(UndoError::NoCheckpoint)?;
        let limit = limit.min(self.sequences.len());
        let discarded = self.sequences.split_off(limit);
        self.current_index = limit;
        Ok(discarded)
    }

    // ========================================================================
    // Info
    // ========================================================================

    #[must_use]
    pub fn current_index(&self) -> usize {
        self.current_index
    }

    #[must_use]
    pub fn hard_limit(&self) -> Option<usize> {
        self.hard_limit
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.sequences.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sequences.is_empty()
    }

    #[must_use]
    pub fn sequences(&self) -> &[Sequence<Op>] {
        &self.sequences
    }

    /// Number of sequences that can be undone before hitting the start or
    /// the checkpoint.
    #[must_use]
    pub fn undo_depth(&self) -> usize {
        self.current_index - self.hard_limit.unwrap_or(0).min(self.current_index)
    }

    #[must_use]
    pub fn redo_depth(&self) -> usize {
        self.sequences.len() - self.current_index
    }
}

// ============================================================================
// Tests
// ============================================================================
