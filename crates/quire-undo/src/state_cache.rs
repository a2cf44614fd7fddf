#![forbid(unsafe_code)]

//! Periodic deep snapshots of one module's state.
//!
//! [`StateCache`] keeps the state at history position 0 plus a snapshot
//! every `state_cache_interval` positions, so undo restores the nearest
//! snapshot at or before its target and replays only the short suffix in
//! between.
//!
//! ```text
//! interval = 3
//! history:  s1 s2 s3 s4 s5 s6 s7
//! cache:   [0]      [3]      [6]
//!
//! undo to 5: restore [3], replay s4 s5
//! ```
//!
//! # Invariants
//!
//! 1. Entry indices are strictly increasing.
//! 2. Every stored state is an owned clone; nothing aliases live state.
//! 3. Entries past a history truncation point are dropped with
//!    [`discard_after`](StateCache::discard_after).

use std::fmt;

use crate::error::{Result, UndoError};

/// A snapshot tagged with the history position it represents.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry<S> {
    pub index: usize,
    pub state: S,
}

/// Snapshot cache indexed by history position.
pub struct StateCache<S> {
    initial: Option<S>,
    entries: Vec<CacheEntry<S>>,
}

impl<S> fmt::Debug for StateCache<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateCache")
            .field("initialized", &self.initial.is_some())
            .field("indices", &self.entries.iter().map(|e| e.index).collect::<Vec<_>>())
            .finish()
    }
}

impl<S> Default for StateCache<S> {
    fn default() -> Self {
        Self {
            initial: None,
            entries: Vec::new(),
        }
    }
}

impl<S: Clone> StateCache<S> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the snapshot for position 0.
    ///
    /// Fails with [`UndoError::AlreadyInitialized`] on a second call.
    pub fn set_initial_state(&mut self, state: &S) -> Result<()> {
        if self.initial.is_some() {
            return Err(UndoError::AlreadyInitialized);
        }
        self.initial = Some(state.clone());
        Ok(())
    }

    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.initial.is_some()
    }

    /// Deep-clone `state` as the snapshot for history position `index`.
    ///
    /// Any existing entry at or after `index` is replaced.
    pub fn push(&mut self, index: usize, state: &S) {
        let keep = self.entries.partition_point(|e| e.index < index);
        self.entries.truncate(keep);
        self.entries.push(CacheEntry {
            index,
            state: state.clone(),
        });
    }

    /// Nearest snapshot at or before `upto`, falling back to position 0.
    pub fn get_last(&self, upto: usize) -> Result<CacheEntry<&S>> {
        let found = self.entries.partition_point(|e| e.index <= upto);
        if let Some(entry) = found.checked_sub(1).map(|i| &self.entries[i]) {
            return Ok(CacheEntry {
                index: entry.index,
                state: &entry.state,
            });
        }
        self.initial
            .as_ref()
            .map(|state| CacheEntry { index: 0, state })
            .ok_or(UndoError::NoCacheAvailable)
    }

    /// Drop snapshots of positions after `index`.
    ///
    /// Returns how many were dropped.
    pub fn discard_after(&mut self, index: usize) -> usize {
        let keep = self.entries.partition_point(|e| e.index <= index);
        let dropped = self.entries.len() - keep;
        self.entries.truncate(keep);
        dropped
    }

    /// Number of periodic snapshots (the initial state is not counted).
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Positions of the periodic snapshots, ascending.
    pub fn indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.entries.iter().map(|e| e.index)
    }
}
