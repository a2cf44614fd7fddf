#![forbid(unsafe_code)]

//! Module contract and the commit-issuing interface.
//!
//! A module is one independently undo-tracked slice of application state.
//! It declares its state type, a closed operation enum, a reducer, and the
//! distinguished operation that replaces the whole state. Contexts never
//! touch module state directly: they read it to snapshot and replace it via
//! [`UndoModule::set_state`] through a [`ModuleHost`].

use std::fmt;
use std::marker::PhantomData;

use crate::mutation::{MutationRecord, Operation};

/// An undo-trackable state module.
pub trait UndoModule: 'static {
    /// Module state. `Clone` must produce a structural deep copy.
    type State: Clone + fmt::Debug + 'static;
    /// Closed set of operations on [`Self::State`].
    type Op: Operation;

    /// Name reported by the whole-state replacement operation.
    const SET_STATE: &'static str;

    /// Apply one operation to live state.
    fn apply(state: &mut Self::State, op: &Self::Op);

    /// Build the whole-state replacement operation.
    fn set_state(state: Self::State) -> Self::Op;
}

/// Commit path a context drives while restoring and replaying.
pub trait ModuleHost<M: UndoModule> {
    /// Apply a record through the module's normal commit path.
    fn apply(&mut self, record: &MutationRecord<M::Op>);

    /// Current live state.
    fn state(&self) -> &M::State;
}

/// What observers see for every applied commit.
#[derive(Clone, Copy)]
pub struct CommitEvent<'a> {
    pub namespace: &'a str,
    pub operation: &'static str,
    /// True for restores and replayed records.
    pub replay: bool,
    pub payload: &'a dyn fmt::Debug,
}

impl fmt::Debug for CommitEvent<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommitEvent")
            .field("namespace", &self.namespace)
            .field("operation", &self.operation)
            .field("replay", &self.replay)
            .field("payload", self.payload)
            .finish()
    }
}

/// Observer callback.
pub type Observer = Box<dyn FnMut(&CommitEvent<'_>)>;

/// Subscribers notified after every applied commit.
#[derive(Default)]
pub struct Observers {
    observers: Vec<Observer>,
}

impl fmt::Debug for Observers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observers")
            .field("count", &self.observers.len())
            .finish()
    }
}

impl Observers {
    pub fn push(&mut self, observer: Observer) {
        self.observers.push(observer);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.observers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }

    pub fn notify(&mut self, event: &CommitEvent<'_>) {
        for observer in &mut self.observers {
            observer(event);
        }
    }
}

/// Apply `record` to `state` and tell observers about it.
pub(crate) fn apply_and_notify<M: UndoModule>(
    namespace: &str,
    state: &mut M::State,
    observers: &mut Observers,
    record: &MutationRecord<M::Op>,
) {
    M::apply(state, record.op());
    observers.notify(&CommitEvent {
        namespace,
        operation: record.kind(),
        replay: record.meta().is_replay(),
        payload: record.op(),
    });
}

/// [`ModuleHost`] over a borrowed state slot and the store's observers.
pub(crate) struct SlotHost<'a, M: UndoModule> {
    namespace: &'a str,
    state: &'a mut M::State,
    observers: &'a mut Observers,
    _module: PhantomData<M>,
}

impl<'a, M: UndoModule> SlotHost<'a, M> {
    pub(crate) fn new(
        namespace: &'a str,
        state: &'a mut M::State,
        observers: &'a mut Observers,
    ) -> Self {
        Self {
            namespace,
            state,
            observers,
            _module: PhantomData,
        }
    }
}

impl<M: UndoModule> ModuleHost<M> for SlotHost<'_, M> {
    fn apply(&mut self, record: &MutationRecord<M::Op>) {
        apply_and_notify::<M>(self.namespace, self.state, self.observers, record);
    }

    fn state(&self) -> &M::State {
        self.state
    }
}
