#![forbid(unsafe_code)]

//! Per-module undo context.
//!
//! An [`UndoContext`] binds one [`UndoHistory`] and one [`StateCache`] to a
//! named module. It records every tracked commit, folds commits issued
//! inside a group into one sequence, and reconstructs earlier positions by
//! restoring the nearest snapshot and replaying the sequences after it.
//!
//! # Undo procedure
//!
//! ```text
//! current = 7, interval = 3, target = 6
//!
//! 1. snapshot  = cache.get_last(6)        -> [6]
//! 2. commit      set_state(snapshot)
//! 3. replay      sequences[6..6]          -> nothing
//! 4. hooks       on_undo for sequences[6]
//! ```
//!
//! # Contracts
//!
//! - At most one group is open per context. Starting a second one, or
//!   undoing/redoing while one is open, fails with
//!   [`UndoError::GroupInProgress`].
//! - A group that recorded nothing leaves no history entry.
//! - An aborted group leaves no history entry and live state is rebuilt to
//!   the current history position.
//! - Replayed and ignored records are never recorded.

use std::fmt;

use crate::config::UndoSettings;
use crate::error::{Result, SettingsError, UndoError};
use crate::history::UndoHistory;
use crate::module::{ModuleHost, UndoModule};
use crate::mutation::MutationRecord;
use crate::sequence::{Sequence, SequenceId};
use crate::state_cache::StateCache;

/// What [`UndoContext::push`] did with a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    /// Flagged ignore/replay, or the operation is on the ignore list.
    Ignored,
    /// Recorded as its own sequence; `index` is the new history position.
    Recorded { index: usize },
    /// Folded into the open group.
    Grouped { id: SequenceId },
}

/// Result of closing a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupOutcome {
    /// The group became one history entry.
    Committed {
        id: SequenceId,
        index: usize,
        mutations: usize,
    },
    /// The group recorded nothing and was dropped.
    Discarded { id: SequenceId },
}

/// Summary of a restore or replay pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplayReport {
    /// History position after the operation.
    pub position: usize,
    /// Position of the snapshot restored first, if any.
    pub snapshot_index: Option<usize>,
    /// Number of records re-applied after the restore.
    pub replayed: usize,
}

/// Commit handle passed to [`UndoContext::group`] callbacks.
pub struct GroupScope<'a, M: UndoModule, H> {
    context: &'a mut UndoContext<M>,
    host: &'a mut H,
}

impl<M: UndoModule, H: ModuleHost<M>> GroupScope<'_, M, H> {
    /// Apply `op` to the host and fold it into the open group.
    pub fn commit(&mut self, op: M::Op) -> PushOutcome {
        self.commit_record(MutationRecord::new(op))
    }

    pub fn commit_record(&mut self, record: MutationRecord<M::Op>) -> PushOutcome {
        self.host.apply(&record);
        self.context.push(record, self.host.state())
    }

    #[must_use]
    pub fn state(&self) -> &M::State {
        self.host.state()
    }
}

/// Undo state for one named module.
pub struct UndoContext<M: UndoModule> {
    settings: UndoSettings,
    history: UndoHistory<M::Op>,
    cache: StateCache<M::State>,
    open_group: Option<Sequence<M::Op>>,
}

impl<M: UndoModule> fmt::Debug for UndoContext<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UndoContext")
            .field("namespace", &self.settings.namespace)
            .field("history", &self.history)
            .field("cache", &self.cache)
            .field("open_group", &self.open_group.as_ref().map(Sequence::id))
            .finish()
    }
}

impl<M: UndoModule> UndoContext<M> {
    /// Create a context and seed its cache with `initial_state`.
    ///
    /// `initial_state` must be the module state before any tracked commit.
    pub fn new(settings: UndoSettings, initial_state: &M::State) -> Result<Self> {
        let errors = settings.validate();
        if !errors.is_empty() {
            return Err(UndoError::InvalidSettings(SettingsError::Validation(errors)));
        }

        let mut context = Self {
            settings,
            history: UndoHistory::new(),
            cache: StateCache::new(),
            open_group: None,
        };
        context.set_initial_state(initial_state)?;
        Ok(context)
    }

    /// Seed the position-0 snapshot. Fails once already seeded.
    pub fn set_initial_state(&mut self, state: &M::State) -> Result<()> {
        self.cache.set_initial_state(state)
    }

    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.settings.namespace
    }

    #[must_use]
    pub fn settings(&self) -> &UndoSettings {
        &self.settings
    }

    #[must_use]
    pub fn history(&self) -> &UndoHistory<M::Op> {
        &self.history
    }

    #[must_use]
    pub fn cache(&self) -> &StateCache<M::State> {
        &self.cache
    }

    /// Id of the open group, if any.
    #[must_use]
    pub fn open_group(&self) -> Option<SequenceId> {
        self.open_group.as_ref().map(Sequence::id)
    }

    #[must_use]
    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    #[must_use]
    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    // ========================================================================
    // Recording
    // ========================================================================

    /// Record a commit that has already been applied to `live_state`.
    pub fn push(&mut self, record: MutationRecord<M::Op>, live_state: &M::State) -> PushOutcome {
        let meta = record.meta();
        if meta.ignore() || meta.is_replay() || self.settings.ignores(record.kind()) {
            tracing::trace!(
                namespace = %self.settings.namespace,
                op = record.kind(),
                replay = meta.is_replay(),
                "skipped untracked mutation"
            );
            return PushOutcome::Ignored;
        }

        if let Some(group) = &mut self.open_group {
            let id = group.id();
            tracing::debug!(
                namespace = %self.settings.namespace,
                op = record.kind(),
                group = %id,
                "grouped mutation"
            );
            group.push(record);
            return PushOutcome::Grouped { id };
        }

        let op = record.kind();
        let index = self.commit_sequence(Sequence::single(record), live_state);
        tracing::debug!(
            namespace = %self.settings.namespace,
            op,
            index,
            "recorded mutation"
        );
        PushOutcome::Recorded { index }
    }

    /// Append a finished sequence and snapshot on interval boundaries.
    fn commit_sequence(&mut self, sequence: Sequence<M::Op>, live_state: &M::State) -> usize {
        let truncated = self.history.push(sequence);
        let index = self.history.current_index();

        if truncated > 0 {
            let dropped = self.cache.discard_after(index - 1);
            tracing::debug!(
                namespace = %self.settings.namespace,
                truncated,
                dropped_snapshots = dropped,
                "discarded redo future"
            );
        }

        if index % self.settings.state_cache_interval == 0 {
            self.cache.push(index, live_state);
            tracing::debug!(
                namespace = %self.settings.namespace,
                index,
                "cached state snapshot"
            );
        }

        index
    }

    // ========================================================================
    // Groups
    // ========================================================================

    /// Open a group; every recorded commit until [`stop_group`](Self::stop_group)
    /// lands in one sequence.
    pub fn start_group(&mut self) -> Result<SequenceId> {
        if let Some(open) = &self.open_group {
            return Err(UndoError::GroupInProgress {
                namespace: self.settings.namespace.clone(),
                id: open.id(),
            });
        }
        let sequence = self.history.create_sequence();
        let id = sequence.id();
        self.open_group = Some(sequence);
        tracing::debug!(namespace = %self.settings.namespace, group = %id, "group started");
        Ok(id)
    }

    /// Close group `id` and insert it into history as one entry.
    pub fn stop_group(&mut self, id: SequenceId, live_state: &M::State) -> Result<GroupOutcome> {
        let sequence = self.take_group(id)?;
        if sequence.is_empty() {
            tracing::debug!(namespace = %self.settings.namespace, group = %id, "empty group discarded");
            return Ok(GroupOutcome::Discarded { id });
        }

        let mutations = sequence.len();
        let index = self.commit_sequence(sequence, live_state);
        tracing::debug!(
            namespace = %self.settings.namespace,
            group = %id,
            mutations,
            index,
            "group committed"
        );
        Ok(GroupOutcome::Committed {
            id,
            index,
            mutations,
        })
    }

    /// Drop group `id` and rebuild live state at the current history position.
    ///
    /// Returns how many recorded mutations were thrown away.
    pub fn abort_group(&mut self, id: SequenceId, host: &mut impl ModuleHost<M>) -> Result<usize> {
        let sequence = self.take_group(id)?;
        let discarded = sequence.len();
        tracing::warn!(
            namespace = %self.settings.namespace,
            group = %id,
            discarded,
            "group aborted"
        );
        if discarded > 0 {
            self.rebuild(self.history.current_index(), host)?;
        }
        Ok(discarded)
    }

    /// Run `f` inside a group against `host`: one history entry on `Ok`,
    /// none on `Err`.
    pub fn group<H, T, E>(
        &mut self,
        host: &mut H,
        f: impl FnOnce(&mut GroupScope<'_, M, H>) -> std::result::Result<T, E>,
    ) -> std::result::Result<T, E>
    where
        H: ModuleHost<M>,
        E: From<UndoError>,
    {
        let id = self.start_group()?;
        let result = f(&mut GroupScope {
            context: &mut *self,
            host: &mut *host,
        });
        match result {
            Ok(value) => {
                self.stop_group(id, host.state())?;
                Ok(value)
            }
            Err(err) => {
                if let Err(abort) = self.abort_group(id, host) {
                    tracing::warn!(namespace = %self.settings.namespace, error = %abort, "failed to abort group");
                }
                Err(err)
            }
        }
    }

    fn take_group(&mut self, id: SequenceId) -> Result<Sequence<M::Op>> {
        match self.open_group.take() {
            Some(sequence) if sequence.id() == id => Ok(sequence),
            other => {
                self.open_group = other;
                Err(UndoError::NoSuchGroup { id })
            }
        }
    }

    fn ensure_no_group(&self) -> Result<()> {
        match &self.open_group {
            Some(open) => Err(UndoError::GroupInProgress {
                namespace: self.settings.namespace.clone(),
                id: open.id(),
            }),
            None => Ok(()),
        }
    }

    // ========================================================================
    // Undo / Redo
    // ========================================================================

    /// Step back one sequence.
    pub fn undo(&mut self, host: &mut impl ModuleHost<M>) -> Result<ReplayReport> {
        self.ensure_no_group()?;
        if !self.history.can_undo() {
            return Err(UndoError::NothingToUndo);
        }

        let target = self.history.current_index() - 1;
        let snapshot = self.cache.get_last(target)?;
        let snapshot_index = snapshot.index;
        let snapshot = snapshot.state.clone();

        let step = self.history.undo(snapshot_index, target)?;
        let replay: Vec<_> = step
            .to_replay
            .iter()
            .flat_map(Sequence::replay_records)
            .collect();
        let undone = step.undone.clone();

        host.apply(&MutationRecord::restore(M::set_state(snapshot)));
        for record in &replay {
            host.apply(record);
        }
        for record in undone.mutations() {
            record.fire_undo();
        }

        tracing::debug!(
            namespace = %self.settings.namespace,
            position = target,
            snapshot_index,
            replayed = replay.len(),
            "undo"
        );
        Ok(ReplayReport {
            position: target,
            snapshot_index: Some(snapshot_index),
            replayed: replay.len(),
        })
    }

    /// Re-apply the next undone sequence.
    pub fn redo(&mut self, host: &mut impl ModuleHost<M>) -> Result<ReplayReport> {
        self.ensure_no_group()?;
        let sequence = self.history.redo()?.clone();

        let replay = sequence.replay_records();
        for record in &replay {
            host.apply(record);
        }
        for record in sequence.mutations() {
            record.fire_redo();
        }

        let position = self.history.current_index();
        tracing::debug!(
            namespace = %self.settings.namespace,
            position,
            replayed = replay.len(),
            "redo"
        );
        Ok(ReplayReport {
            position,
            snapshot_index: None,
            replayed: replay.len(),
        })
    }

    /// Restore the snapshot nearest `target` and replay up to it.
    fn rebuild(&self, target: usize, host: &mut impl ModuleHost<M>) -> Result<ReplayReport> {
        let snapshot = self.cache.get_last(target)?;
        let snapshot_index = snapshot.index;
        host.apply(&MutationRecord::restore(M::set_state(snapshot.state.clone())));

        let mut replayed = 0;
        for sequence in &self.history.sequences()[snapshot_index..target] {
            for record in sequence.replay_records() {
                host.apply(&record);
                replayed += 1;
            }
        }

        Ok(ReplayReport {
            position: target,
            snapshot_index: Some(snapshot_index),
            replayed,
        })
    }

    // ========================================================================
    // Checkpoints
    // ========================================================================

    /// Forbid undoing past the current position until released or rolled back.
    pub fn set_checkpoint(&mut self) {
        self.history.set_checkpoint();
        tracing::debug!(
            namespace = %self.settings.namespace,
            index = self.history.current_index(),
            "checkpoint set"
        );
    }

    /// Keep everything recorded since the checkpoint. False if none was set.
    pub fn release_checkpoint(&mut self) -> bool {
        self.history.release_checkpoint()
    }

    /// Discard everything recorded since the checkpoint.
    ///
    /// Live state is rebuilt to exactly the checkpoint position, `on_undo`
    /// hooks run for each discarded record (newest first), and the discarded
    /// sequences leave history entirely, so they cannot be redone.
    pub fn rollback_to_checkpoint(&mut self, host: &mut impl ModuleHost<M>) -> Result<ReplayReport> {
        self.ensure_no_group()?;
        let before = self.history.current_index();
        let discarded = self.history.truncate_to_checkpoint()?;
        let limit = self.history.current_index();
        self.cache.discard_after(limit);

        let done = before.saturating_sub(limit);
        let report = if done > 0 {
            self.rebuild(limit, host)?
        } else {
            ReplayReport {
                position: limit,
                snapshot_index: None,
                replayed: 0,
            }
        };

        for sequence in discarded[..done].iter().rev() {
            for record in sequence.mutations().iter().rev() {
                record.fire_undo();
            }
        }

        tracing::info!(
            namespace = %self.settings.namespace,
            position = limit,
            discarded = discarded.len(),
            "rolled back to checkpoint"
        );
        Ok(report)
    }
}

// ============================================================================
// Tests
// ============================================================================
