#![forbid(unsafe_code)]

//! Registry of undo contexts keyed by namespace.
//!
//! The registry is the single interception point for tracked commits: every
//! commit applied by the store is handed to [`UndoRegistry::intercept`],
//! which routes it to the context registered under the commit's namespace.
//! Commits to namespaces nobody registered (focus state, hover state) are
//! passed over silently.
//!
//! Contexts of different module types live side by side. Typed access goes
//! through [`context`](UndoRegistry::context) and friends; namespace-only
//! callers (UI buttons, the store) use the erased entry points.

use std::any::{Any, type_name};
use std::collections::BTreeMap;
use std::fmt;

use crate::config::UndoSettings;
use crate::context::{GroupOutcome, GroupScope, PushOutcome, ReplayReport, UndoContext};
use crate::error::{Result, SettingsError, UndoError};
use crate::module::{ModuleHost, Observers, SlotHost, UndoModule};
use crate::mutation::MutationRecord;
use crate::sequence::SequenceId;

/// What the registry did with an intercepted commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interception {
    /// No context is registered for the namespace.
    Untracked,
    /// The context skipped the record.
    Ignored,
    /// Recorded as its own history entry.
    Recorded { index: usize },
    /// Folded into the open group.
    Grouped { id: SequenceId },
}

impl From<PushOutcome> for Interception {
    fn from(outcome: PushOutcome) -> Self {
        match outcome {
            PushOutcome::Ignored => Self::Ignored,
            PushOutcome::Recorded { index } => Self::Recorded { index },
            PushOutcome::Grouped { id } => Self::Grouped { id },
        }
    }
}

/// Object-safe view of an [`UndoContext`] with its module type erased.
pub(crate) trait ContextEntry {
    fn settings(&self) -> &UndoSettings;
    fn can_undo(&self) -> bool;
    fn can_redo(&self) -> bool;
    fn history_len(&self) -> usize;
    fn current_index(&self) -> usize;
    fn start_group(&mut self) -> Result<SequenceId>;
    fn stop_group_in(&mut self, id: SequenceId, state: &dyn Any) -> Result<GroupOutcome>;
    fn abort_group_in(
        &mut self,
        id: SequenceId,
        state: &mut dyn Any,
        observers: &mut Observers,
    ) -> Result<usize>;
    fn undo_in(&mut self, state: &mut dyn Any, observers: &mut Observers) -> Result<ReplayReport>;
    fn redo_in(&mut self, state: &mut dyn Any, observers: &mut Observers) -> Result<ReplayReport>;
    fn rollback_in(
        &mut self,
        state: &mut dyn Any,
        observers: &mut Observers,
    ) -> Result<ReplayReport>;
    fn set_checkpoint(&mut self);
    fn release_checkpoint(&mut self) -> bool;
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

fn state_ref<'a, M: UndoModule>(namespace: &str, state: &'a dyn Any) -> Result<&'a M::State> {
    state
        .downcast_ref::<M::State>()
        .ok_or_else(|| mismatch::<M>(namespace))
}

fn state_mut<'a, M: UndoModule>(namespace: &str, state: &'a mut dyn Any) -> Result<&'a mut M::State> {
    state
        .downcast_mut::<M::State>()
        .ok_or_else(|| mismatch::<M>(namespace))
}

pub(crate) fn mismatch<M: UndoModule>(namespace: &str) -> UndoError {
    UndoError::ModuleTypeMismatch {
        namespace: namespace.to_string(),
        expected: type_name::<M::State>(),
    }
}

impl<M: UndoModule> UndoContext<M> {
    /// Run `f` against a host built over an erased state slot.
    fn with_slot<T>(
        &mut self,
        state: &mut dyn Any,
        observers: &mut Observers,
        f: impl FnOnce(&mut Self, &mut SlotHost<'_, M>) -> Result<T>,
    ) -> Result<T> {
        let namespace = self.namespace().to_string();
        let state = state_mut::<M>(&namespace, state)?;
        let mut host = SlotHost::<M>::new(&namespace, state, observers);
        f(self, &mut host)
    }
}

impl<M: UndoModule> ContextEntry for UndoContext<M> {
    fn settings(&self) -> &UndoSettings {
        UndoContext::settings(self)
    }

    fn can_undo(&self) -> bool {
        UndoContext::can_undo(self)
    }

    fn can_redo(&self) -> bool {
        UndoContext::can_redo(self)
    }

    fn history_len(&self) -> usize {
        self.history().len()
    }

    fn current_index(&self) -> usize {
        self.history().current_index()
    }

    fn start_group(&mut self) -> Result<SequenceId> {
        UndoContext::start_group(self)
    }

    fn stop_group_in(&mut self, id: SequenceId, state: &dyn Any) -> Result<GroupOutcome> {
        let state = state_ref::<M>(self.namespace(), state)?;
        self.stop_group(id, state)
    }

    fn abort_group_in(
        &mut self,
        id: SequenceId,
        state: &mut dyn Any,
        observers: &mut Observers,
    ) -> Result<usize> {
        self.with_slot(state, observers, |ctx, host| ctx.abort_group(id, host))
    }

    fn undo_in(&mut self, state: &mut dyn Any, observers: &mut Observers) -> Result<ReplayReport> {
        self.with_slot(state, observers, |ctx, host| ctx.undo(host))
    }

    fn redo_in(&mut self, state: &mut dyn Any, observers: &mut Observers) -> Result<ReplayReport> {
        self.with_slot(state, observers, |ctx, host| ctx.redo(host))
    }

    fn rollback_in(
        &mut self,
        state: &mut dyn Any,
        observers: &mut Observers,
    ) -> Result<ReplayReport> {
        self.with_slot(state, observers, |ctx, host| ctx.rollback_to_checkpoint(host))
    }

    fn set_checkpoint(&mut self) {
        UndoContext::set_checkpoint(self);
    }

    fn release_checkpoint(&mut self) -> bool {
        UndoContext::release_checkpoint(self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// All registered undo contexts.
#[derive(Default)]
pub struct UndoRegistry {
    contexts: BTreeMap<String, Box<dyn ContextEntry>>,
}

impl fmt::Debug for UndoRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for (namespace, entry) in &self.contexts {
            map.entry(
                namespace,
                &format_args!(
                    "{}/{} sequences",
                    entry.current_index(),
                    entry.history_len()
                ),
            );
        }
        map.finish()
    }
}

impl UndoRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register module `M` under `settings.namespace`.
    ///
    /// `initial_state` must be captured before the module's first tracked
    /// commit. The set-state operation is added to the ignore list so
    /// restores are never recorded.
    pub fn register_module<M: UndoModule>(
        &mut self,
        initial_state: &M::State,
        mut settings: UndoSettings,
    ) -> Result<()> {
        let mut errors = settings.validate();
        if settings.set_state_mutation != M::SET_STATE {
            errors.push(format!(
                "{}: set_state_mutation {:?} does not match the module's {:?}",
                settings.namespace,
                settings.set_state_mutation,
                M::SET_STATE
            ));
        }
        if !errors.is_empty() {
            return Err(UndoError::InvalidSettings(SettingsError::Validation(errors)));
        }
        if self.contexts.contains_key(&settings.namespace) {
            return Err(UndoError::DuplicateNamespace {
                namespace: settings.namespace,
            });
        }

        settings.ignore.insert(settings.set_state_mutation.clone());
        let namespace = settings.namespace.clone();
        let interval = settings.state_cache_interval;
        let context = UndoContext::<M>::new(settings, initial_state)?;
        self.contexts.insert(namespace.clone(), Box::new(context));

        tracing::info!(
            namespace = %namespace,
            state_cache_interval = interval,
            module = type_name::<M>(),
            "registered undo module"
        );
        Ok(())
    }

    /// Route an applied commit to its context.
    pub fn intercept<M: UndoModule>(
        &mut self,
        namespace: &str,
        record: MutationRecord<M::Op>,
        live_state: &M::State,
    ) -> Result<Interception> {
        let Some(entry) = self.contexts.get_mut(namespace) else {
            tracing::trace!(namespace, op = record.kind(), "untracked commit");
            return Ok(Interception::Untracked);
        };
        let context = entry
            .as_any_mut()
            .downcast_mut::<UndoContext<M>>()
            .ok_or_else(|| mismatch::<M>(namespace))?;
        Ok(context.push(record, live_state).into())
    }

    // ========================================================================
    // Lookup
    // ========================================================================

    #[must_use]
    pub fn contains(&self, namespace: &str) -> bool {
        self.contexts.contains_key(namespace)
    }

    /// Registered namespaces, sorted.
    pub fn namespaces(&self) -> impl Iterator<Item = &str> + '_ {
        self.contexts.keys().map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.contexts.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.contexts.is_empty()
    }

    pub fn context<M: UndoModule>(&self, namespace: &str) -> Result<&UndoContext<M>> {
        self.entry(namespace)?
            .as_any()
            .downcast_ref::<UndoContext<M>>()
            .ok_or_else(|| mismatch::<M>(namespace))
    }

    pub fn context_mut<M: UndoModule>(&mut self, namespace: &str) -> Result<&mut UndoContext<M>> {
        self.entry_mut(namespace)?
            .as_any_mut()
            .downcast_mut::<UndoContext<M>>()
            .ok_or_else(|| mismatch::<M>(namespace))
    }

    pub fn settings(&self, namespace: &str) -> Result<&UndoSettings> {
        Ok(self.entry(namespace)?.settings())
    }

    /// False for unknown namespaces.
    #[must_use]
    pub fn can_undo(&self, namespace: &str) -> bool {
        self.contexts
            .get(namespace)
            .is_some_and(|entry| entry.can_undo())
    }

    /// False for unknown namespaces.
    #[must_use]
    pub fn can_redo(&self, namespace: &str) -> bool {
        self.contexts
            .get(namespace)
            .is_some_and(|entry| entry.can_redo())
    }

    fn entry(&self, namespace: &str) -> Result<&(dyn ContextEntry + 'static)> {
        self.contexts
            .get(namespace)
            .map(Box::as_ref)
            .ok_or_else(|| no_such_module(namespace))
    }

    pub(crate) fn entry_mut(
        &mut self,
        namespace: &str,
    ) -> Result<&mut (dyn ContextEntry + 'static)> {
        match self.contexts.get_mut(namespace) {
            Some(entry) => Ok(entry.as_mut()),
            None => Err(no_such_module(namespace)),
        }
    }

    // ========================================================================
    // Groups and history navigation
    // ========================================================================

    pub fn start_group(&mut self, namespace: &str) -> Result<SequenceId> {
        self.entry_mut(namespace)?.start_group()
    }

    pub fn stop_group<M: UndoModule>(
        &mut self,
        namespace: &str,
        id: SequenceId,
        live_state: &M::State,
    ) -> Result<GroupOutcome> {
        self.context_mut::<M>(namespace)?.stop_group(id, live_state)
    }

    pub fn abort_group<M: UndoModule>(
        &mut self,
        namespace: &str,
        id: SequenceId,
        host: &mut impl ModuleHost<M>,
    ) -> Result<usize> {
        self.context_mut::<M>(namespace)?.abort_group(id, host)
    }

    /// Run `f` inside a group of the context at `namespace`.
    ///
    /// Fails with [`UndoError::NoSuchModule`] before `f` runs when nothing is
    /// registered there.
    pub fn group<M, H, T, E>(
        &mut self,
        namespace: &str,
        host: &mut H,
        f: impl FnOnce(&mut GroupScope<'_, M, H>) -> std::result::Result<T, E>,
    ) -> std::result::Result<T, E>
    where
        M: UndoModule,
        H: ModuleHost<M>,
        E: From<UndoError>,
    {
        self.context_mut::<M>(namespace)?.group(host, f)
    }

    pub fn undo<M: UndoModule>(
        &mut self,
        namespace: &str,
        host: &mut impl ModuleHost<M>,
    ) -> Result<ReplayReport> {
        self.context_mut::<M>(namespace)?.undo(host)
    }

    pub fn redo<M: UndoModule>(
        &mut self,
        namespace: &str,
        host: &mut impl ModuleHost<M>,
    ) -> Result<ReplayReport> {
        self.context_mut::<M>(namespace)?.redo(host)
    }

    pub fn set_checkpoint(&mut self, namespace: &str) -> Result<()> {
        self.entry_mut(namespace)?.set_checkpoint();
        Ok(())
    }

    pub fn release_checkpoint(&mut self, namespace: &str) -> Result<bool> {
        Ok(self.entry_mut(namespace)?.release_checkpoint())
    }

    pub fn rollback_to_checkpoint<M: UndoModule>(
        &mut self,
        namespace: &str,
        host: &mut impl ModuleHost<M>,
    ) -> Result<ReplayReport> {
        self.context_mut::<M>(namespace)?.rollback_to_checkpoint(host)
    }
}

fn no_such_module(namespace: &str) -> UndoError {
    UndoError::NoSuchModule {
        namespace: namespace.to_string(),
    }
}

// ============================================================================
// Tests
// ============================================================================
