#![forbid(unsafe_code)]

//! Namespaced state store with undo interception.
//!
//! [`Store`] owns the live state of every module, the observers that watch
//! commits, and the [`UndoRegistry`]. Every commit goes through
//! [`Store::commit`]: the reducer runs, observers are notified, and the
//! registry decides whether the record enters history.
//!
//! Undo, redo and rollback only need a namespace. They re-enter the same
//! apply-and-notify path, so observers see restores and replays the same
//! way they see user commits (with `replay` set).
//!
//! # Example
//!
//! ```ignore
//! let mut store = Store::new();
//! store.register_module::<Counter>(0, UndoSettings::new("counter", "SET", 100))?;
//! store.commit::<Counter>("counter", CounterOp::Add(2))?;
//! store.undo("counter")?;
//! assert_eq!(*store.state::<Counter>("counter")?, 0);
//! ```

use std::any::{Any, type_name};
use std::collections::BTreeMap;
use std::fmt;

use crate::config::UndoSettings;
use crate::context::{GroupOutcome, ReplayReport};
use crate::error::{Result, UndoError};
use crate::module::{CommitEvent, Observers, UndoModule, apply_and_notify};
use crate::mutation::MutationRecord;
use crate::registry::{ContextEntry, Interception, UndoRegistry, mismatch};
use crate::sequence::SequenceId;

/// Live module state plus undo tracking.
#[derive(Default)]
pub struct Store {
    slots: BTreeMap<String, Box<dyn Any>>,
    registry: UndoRegistry,
    observers: Observers,
}

impl fmt::Debug for Store {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store")
            .field("modules", &self.slots.keys().collect::<Vec<_>>())
            .field("registry", &self.registry)
            .field("observers", &self.observers)
            .finish()
    }
}

impl Store {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an undo-tracked module with its initial state.
    pub fn register_module<M: UndoModule>(
        &mut self,
        initial_state: M::State,
        settings: UndoSettings,
    ) -> Result<()> {
        let namespace = settings.namespace.clone();
        if self.slots.contains_key(&namespace) {
            return Err(UndoError::DuplicateNamespace { namespace });
        }
        self.registry.register_module::<M>(&initial_state, settings)?;
        self.slots.insert(namespace, Box::new(initial_state));
        Ok(())
    }

    /// Add a module whose commits are never recorded.
    pub fn add_module<M: UndoModule>(
        &mut self,
        namespace: impl Into<String>,
        initial_state: M::State,
    ) -> Result<()> {
        let namespace = namespace.into();
        if self.slots.contains_key(&namespace) {
            return Err(UndoError::DuplicateNamespace { namespace });
        }
        tracing::debug!(
            namespace = %namespace,
            module = type_name::<M>(),
            "added untracked module"
        );
        self.slots.insert(namespace, Box::new(initial_state));
        Ok(())
    }

    pub fn state<M: UndoModule>(&self, namespace: &str) -> Result<&M::State> {
        self.slots
            .get(namespace)
            .ok_or_else(|| no_such_module(namespace))?
            .downcast_ref::<M::State>()
            .ok_or_else(|| mismatch::<M>(namespace))
    }

    #[must_use]
    pub fn contains(&self, namespace: &str) -> bool {
        self.slots.contains_key(namespace)
    }

    /// Call `observer` after every applied commit, including replays.
    pub fn subscribe(&mut self, observer: impl FnMut(&CommitEvent<'_>) + 'static) {
        self.observers.push(Box::new(observer));
    }

    #[must_use]
    pub fn registry(&self) -> &UndoRegistry {
        &self.registry
    }

    // ========================================================================
    // Commits
    // ========================================================================

    /// Apply `op` to a module and hand it to the registry.
    pub fn commit<M: UndoModule>(&mut self, namespace: &str, op: M::Op) -> Result<Interception> {
        self.commit_record::<M>(namespace, MutationRecord::new(op))
    }

    /// Like [`commit`](Self::commit) for a record carrying hooks or flags.
    pub fn commit_record<M: UndoModule>(
        &mut self,
        namespace: &str,
        record: MutationRecord<M::Op>,
    ) -> Result<Interception> {
        let slot = self
            .slots
            .get_mut(namespace)
            .ok_or_else(|| no_such_module(namespace))?;
        let state = (**slot)
            .downcast_mut::<M::State>()
            .ok_or_else(|| mismatch::<M>(namespace))?;

        apply_and_notify::<M>(namespace, state, &mut self.observers, &record);
        self.registry.intercept::<M>(namespace, record, state)
    }

    // ========================================================================
    // Groups
    // ========================================================================

    pub fn start_group(&mut self, namespace: &str) -> Result<SequenceId> {
        self.registry.start_group(namespace)
    }

    pub fn stop_group(&mut self, namespace: &str, id: SequenceId) -> Result<GroupOutcome> {
        let state = self
            .slots
            .get(namespace)
            .ok_or_else(|| no_such_module(namespace))?;
        self.registry
            .entry_mut(namespace)?
            .stop_group_in(id, &**state)
    }

    /// Drop the open group and rebuild live state without it.
    pub fn abort_group(&mut self, namespace: &str, id: SequenceId) -> Result<usize> {
        let (entry, state, observers) = self.parts(namespace)?;
        entry.abort_group_in(id, state, observers)
    }

    /// Run `f` inside a group: one history entry on `Ok`, none on `Err`.
    ///
    /// On `Err` the commits `f` made are rolled back before the error is
    /// returned.
    pub fn group<T, E>(
        &mut self,
        namespace: &str,
        f: impl FnOnce(&mut Self) -> std::result::Result<T, E>,
    ) -> std::result::Result<T, E>
    where
        E: From<UndoError>,
    {
        let id = self.start_group(namespace)?;
        match f(self) {
            Ok(value) => {
                self.stop_group(namespace, id)?;
                Ok(value)
            }
            Err(err) => {
                if let Err(abort) = self.abort_group(namespace, id) {
                    tracing::warn!(namespace, error = %abort, "failed to abort group");
                }
                Err(err)
            }
        }
    }

    // ========================================================================
    // History navigation
    // ========================================================================

    #[must_use]
    pub fn can_undo(&self, namespace: &str) -> bool {
        self.registry.can_undo(namespace)
    }

    #[must_use]
    pub fn can_redo(&self, namespace: &str) -> bool {
        self.registry.can_redo(namespace)
    }

    pub fn undo(&mut self, namespace: &str) -> Result<ReplayReport> {
        let (entry, state, observers) = self.parts(namespace)?;
        entry.undo_in(state, observers)
    }

    pub fn redo(&mut self, namespace: &str) -> Result<ReplayReport> {
        let (entry, state, observers) = self.parts(namespace)?;
        entry.redo_in(state, observers)
    }

    pub fn set_checkpoint(&mut self, namespace: &str) -> Result<()> {
        self.registry.set_checkpoint(namespace)
    }

    pub fn release_checkpoint(&mut self, namespace: &str) -> Result<bool> {
        self.registry.release_checkpoint(namespace)
    }

    pub fn rollback_to_checkpoint(&mut self, namespace: &str) -> Result<ReplayReport> {
        let (entry, state, observers) = self.parts(namespace)?;
        entry.rollback_in(state, observers)
    }

    fn parts(
        &mut self,
        namespace: &str,
    ) -> Result<(&mut (dyn ContextEntry + 'static), &mut dyn Any, &mut Observers)> {
        let entry = self.registry.entry_mut(namespace)?;
        let slot = self
            .slots
            .get_mut(namespace)
            .ok_or_else(|| no_such_module(namespace))?;
        Ok((entry, &mut **slot, &mut self.observers))
    }
}

fn no_such_module(namespace: &str) -> UndoError {
    UndoError::NoSuchModule {
        namespace: namespace.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mutation::Operation;
    use std::cell::RefCell;
    use std::rc::Rc;

    struct Counter;

    #[derive(Debug, Clone)]
    enum CounterOp {
        Set(i64),
        Add(i64),
    }

    impl Operation for CounterOp {
        fn name(&self) -> &'static str {
            match self {
                Self::Set(_) => "SET",
                Self::Add(_) => "ADD",
            }
        }
    }

    impl UndoModule for Counter {
        type State = i64;
        type Op = CounterOp;
        const SET_STATE: &'static str = "SET";

        fn apply(state: &mut i64, op: &CounterOp) {
            match op {
                CounterOp::Set(v) => *state = *v,
                CounterOp::Add(v) => *state += v,
            }
        }

        fn set_state(state: i64) -> CounterOp {
            CounterOp::Set(state)
        }
    }

    fn store() -> Store {
        let mut store = Store::new();
        store
            .register_module::<Counter>(0, UndoSettings::new("counter", "SET", 4))
            .unwrap();
        store
    }

    fn value(store: &Store) -> i64 {
        *store.state::<Counter>("counter").unwrap()
    }

    #[test]
    fn commit_applies_and_records() {
        let mut store = store();
        let outcome = store.commit::<Counter>("counter", CounterOp::Add(5)).unwrap();
        assert_eq!(outcome, Interception::Recorded { index: 1 });
        assert_eq!(value(&store), 5);
        assert!(store.can_undo("counter"));

        store.undo("counter").unwrap();
        assert_eq!(value(&store), 0);
        store.redo("counter").unwrap();
        assert_eq!(value(&store), 5);
    }

    #[test]
    fn untracked_module_commits_but_never_records() {
        let mut store = store();
        store.add_module::<Counter>("hover", 0).unwrap();
        let outcome = store.commit::<Counter>("hover", CounterOp::Add(1)).unwrap();
        assert_eq!(outcome, Interception::Untracked);
        assert_eq!(*store.state::<Counter>("hover").unwrap(), 1);
        assert!(!store.can_undo("hover"));
        assert!(matches!(
            store.undo("hover"),
            Err(UndoError::NoSuchModule { .. })
        ));
    }

    #[test]
    fn duplicate_slot_rejected() {
        let mut store = store();
        assert!(matches!(
            store.add_module::<Counter>("counter", 1),
            Err(UndoError::DuplicateNamespace { .. })
        ));
        assert_eq!(value(&store), 0);
    }

    #[test]
    fn observers_see_user_commits_and_replays() {
        let mut store = store();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        store.subscribe(move |event| sink.borrow_mut().push((event.operation, event.replay)));

        store.commit::<Counter>("counter", CounterOp::Add(1)).unwrap();
        store.commit::<Counter>("counter", CounterOp::Add(2)).unwrap();
        store.undo("counter").unwrap();

        assert_eq!(
            *seen.borrow(),
            vec![("ADD", false), ("ADD", false), ("SET", true), ("ADD", true)]
        );
    }

    #[test]
    fn group_closure_commits_once() {
        let mut store = store();
        let total = store
            .group("counter", |store| -> Result<i64> {
                store.commit::<Counter>("counter", CounterOp::Add(1))?;
                store.commit::<Counter>("counter", CounterOp::Add(2))?;
                Ok(value(store))
            })
            .unwrap();
        assert_eq!(total, 3);
        assert_eq!(
            store
                .registry()
                .context::<Counter>("counter")
                .unwrap()
                .history()
                .len(),
            1
        );

        store.undo("counter").unwrap();
        assert_eq!(value(&store), 0);
    }

    #[test]
    fn group_closure_error_rolls_back() {
        let mut store = store();
        store.commit::<Counter>("counter", CounterOp::Add(10)).unwrap();

        let result = store.group("counter", |store| -> Result<()> {
            store.commit::<Counter>("counter", CounterOp::Add(1))?;
            Err(UndoError::NothingToRedo)
        });
        assert!(matches!(result, Err(UndoError::NothingToRedo)));
        assert_eq!(value(&store), 10);
        let context = store.registry().context::<Counter>("counter").unwrap();
        assert_eq!(context.history().len(), 1);
        assert!(context.open_group().is_none());
    }

    #[test]
    fn wrong_module_type_is_reported() {
        struct Other;
        #[derive(Debug, Clone)]
        struct Rename;
        impl Operation for Rename {
            fn name(&self) -> &'static str {
                "RENAME"
            }
        }
        impl UndoModule for Other {
            type State = String;
            type Op = Rename;
            const SET_STATE: &'static str = "RENAME";
            fn apply(_: &mut String, _: &Rename) {}
            fn set_state(_: String) -> Rename {
                Rename
            }
        }

        let mut store = store();
        let err = store.commit::<Other>("counter", Rename).unwrap_err();
        assert!(matches!(err, UndoError::ModuleTypeMismatch { .. }));
        assert!(store.state::<Other>("counter").is_err());
        assert_eq!(value(&store), 0);
    }

    #[test]
    fn checkpoint_rollback_restores_state() {
        let mut store = store();
        store.commit::<Counter>("counter", CounterOp::Add(1)).unwrap();
        store.set_checkpoint("counter").unwrap();
        for _ in 0..6 {
            store.commit::<Counter>("counter", CounterOp::Add(1)).unwrap();
        }
        store.rollback_to_checkpoint("counter").unwrap();
        assert_eq!(value(&store), 1);
        assert!(!store.can_redo("counter"));
        assert!(matches!(
            store.rollback_to_checkpoint("counter"),
            Err(UndoError::NoCheckpoint)
        ));
    }
}
