//! Undo-tracked note workspace.
//!
//! [`Workspace`] wraps a [`Store`] with the notebook, tag, note, navigation
//! and focus modules registered. Every method validates ids against live
//! state first and only then commits, so a failed call leaves no trace in
//! state or history.
//!
//! Cross-module cascades (deleting a notebook files its notes elsewhere)
//! commit to each module separately. Each module's part is one group, so a
//! single undo per module reverts it.

use quire_undo::{CommitEvent, ReplayReport, Store, UndoError, UndoModule};

use crate::config::WorkspaceConfig;
use crate::error::{NotesError, Result};
use crate::focus::{self, Focus, FocusOp, FocusState};
use crate::navigation::{self, NavTarget, Navigation, NavigationOp, NavigationState};
use crate::notebooks::{self, Notebook, NotebookId, NotebookOp, Notebooks, NotebooksState};
use crate::notes::{self, Note, NoteId, NoteOp, Notes, NotesState};
use crate::tags::{self, Tag, TagId, TagOp, Tags, TagsState};

#[derive(Debug)]
pub struct Workspace {
    store: Store,
    config: WorkspaceConfig,
    next_id: u64,
}

impl Workspace {
    /// Empty workspace with every module registered.
    pub fn new(config: WorkspaceConfig) -> Result<Self> {
        let config = config.validated()?;
        let mut store = Store::new();

        store.register_module::<Notebooks>(
            NotebooksState::default(),
            config.notebooks.settings(notebooks::NAMESPACE),
        )?;
        store.register_module::<Tags>(TagsState::default(), config.tags.settings(tags::NAMESPACE))?;
        store.register_module::<Notes>(
            NotesState::default(),
            config.notes.settings(notes::NAMESPACE),
        )?;
        for pane in &config.panes {
            store.register_module::<Navigation>(
                NavigationState::default(),
                config.navigation.settings(navigation::namespace(pane)),
            )?;
        }
        store.add_module::<Focus>(focus::NAMESPACE, FocusState::default())?;

        tracing::info!(panes = config.panes.len(), "workspace ready");
        Ok(Self {
            store,
            config,
            next_id: 1,
        })
    }

    #[must_use]
    pub fn config(&self) -> &WorkspaceConfig {
        &self.config
    }

    #[must_use]
    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn subscribe(&mut self, observer: impl FnMut(&CommitEvent<'_>) + 'static) {
        self.store.subscribe(observer);
    }

    fn allocate(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn state<M: UndoModule>(&self, namespace: &str) -> Result<&M::State> {
        Ok(self.store.state::<M>(namespace)?)
    }

    pub fn notebooks(&self) -> Result<&NotebooksState> {
        self.state::<Notebooks>(notebooks::NAMESPACE)
    }

    pub fn tags(&self) -> Result<&TagsState> {
        self.state::<Tags>(tags::NAMESPACE)
    }

    pub fn notes(&self) -> Result<&NotesState> {
        self.state::<Notes>(notes::NAMESPACE)
    }

    pub fn navigation(&self, pane: &str) -> Result<&NavigationState> {
        let namespace = self.pane_namespace(pane)?;
        self.state::<Navigation>(&namespace)
    }

    pub fn focused(&self) -> Result<Option<&str>> {
        Ok(self.state::<Focus>(focus::NAMESPACE)?.pane.as_deref())
    }

    // ========================================================================
    // Lookups
    // ========================================================================

    fn notebook(&self, id: NotebookId) -> Result<&Notebook> {
        self.notebooks()?
            .get(id)
            .ok_or(NotesError::UnknownNotebook(id))
    }

    fn ensure_notebook(&self, id: Option<NotebookId>) -> Result<()> {
        match id {
            Some(id) => self.notebook(id).map(|_| ()),
            None => Ok(()),
        }
    }

    fn tag(&self, id: TagId) -> Result<&Tag> {
        self.tags()?.get(id).ok_or(NotesError::UnknownTag(id))
    }

    fn note(&self, id: NoteId) -> Result<&Note> {
        self.notes()?.get(id).ok_or(NotesError::UnknownNote(id))
    }

    fn pane_namespace(&self, pane: &str) -> Result<String> {
        if self.config.panes.iter().any(|p| p == pane) {
            Ok(navigation::namespace(pane))
        } else {
            Err(NotesError::UnknownPane {
                pane: pane.to_string(),
            })
        }
    }

    /// Fails with `GroupInProgress` while `namespace` has an open group.
    fn ensure_no_open_group<M: UndoModule>(&self, namespace: &str) -> Result<()> {
        match self.store.registry().context::<M>(namespace)?.open_group() {
            Some(id) => Err(UndoError::GroupInProgress {
                namespace: namespace.to_string(),
                id,
            }
            .into()),
            None => Ok(()),
        }
    }

    fn clean_name(name: &str, what: &'static str) -> Result<String> {
        let name = name.trim();
        if name.is_empty() {
            return Err(NotesError::empty_name(what));
        }
        Ok(name.to_string())
    }

    // ========================================================================
    // Notebooks
    // ========================================================================

    pub fn create_notebook(&mut self, name: &str, parent: Option<NotebookId>) -> Result<NotebookId> {
        let name = Self::clean_name(name, "notebook")?;
        self.ensure_notebook(parent)?;
        let id = NotebookId::from_raw(self.allocate());
        self.store.commit::<Notebooks>(
            notebooks::NAMESPACE,
            NotebookOp::Create(Notebook::new(id, name, parent)),
        )?;
        Ok(id)
    }

    pub fn rename_notebook(&mut self, id: NotebookId, name: &str) -> Result<()> {
        let name = Self::clean_name(name, "notebook")?;
        self.notebook(id)?;
        self.store
            .commit::<Notebooks>(notebooks::NAMESPACE, NotebookOp::Rename { id, name })?;
        Ok(())
    }

    pub fn set_notebook_expanded(&mut self, id: NotebookId, expanded: bool) -> Result<()> {
        self.notebook(id)?;
        self.store.commit::<Notebooks>(
            notebooks::NAMESPACE,
            NotebookOp::SetExpanded { id, expanded },
        )?;
        Ok(())
    }

    /// Re-parent `id`. Moving a notebook under its own subtree fails.
    pub fn move_notebook(&mut self, id: NotebookId, parent: Option<NotebookId>) -> Result<()> {
        self.notebook(id)?;
        if let Some(parent) = parent {
            self.notebook(parent)?;
            if self.notebooks()?.subtree(id).contains(&parent) {
                return Err(NotesError::InvalidParent {
                    notebook: id,
                    parent,
                });
            }
        }
        self.store
            .commit::<Notebooks>(notebooks::NAMESPACE, NotebookOp::Move { id, parent })?;
        Ok(())
    }

    /// Delete `id` and its descendants.
    ///
    /// Notes filed in the removed notebooks move to no notebook first, as
    /// one group on the notes module. The notebooks are then removed
    /// children-first as one group on the notebooks module.
    pub fn delete_notebook(&mut self, id: NotebookId) -> Result<usize> {
        self.notebook(id)?;
        self.ensure_no_open_group::<Notes>(notes::NAMESPACE)?;
        self.ensure_no_open_group::<Notebooks>(notebooks::NAMESPACE)?;
        let subtree = self.notebooks()?.subtree(id);
        let orphaned: Vec<NoteId> = {
            let notes = self.notes()?;
            subtree
                .iter()
                .flat_map(|nb| notes.in_notebook(*nb).map(|note| note.id))
                .collect()
        };

        if !orphaned.is_empty() {
            self.store.group(notes::NAMESPACE, |store| -> Result<()> {
                for note in &orphaned {
                    store.commit::<Notes>(
                        notes::NAMESPACE,
                        NoteOp::Move {
                            id: *note,
                            notebook: None,
                        },
                    )?;
                }
                Ok(())
            })?;
        }

        self.store.group(notebooks::NAMESPACE, |store| -> Result<()> {
            for notebook in subtree.iter().rev() {
                store.commit::<Notebooks>(notebooks::NAMESPACE, NotebookOp::Delete(*notebook))?;
            }
            Ok(())
        })?;

        tracing::debug!(
            notebook = %id,
            removed = subtree.len(),
            orphaned_notes = orphaned.len(),
            "deleted notebook"
        );
        Ok(subtree.len())
    }

    pub fn select_notebook(&mut self, id: Option<NotebookId>) -> Result<()> {
        self.ensure_notebook(id)?;
        self.store
            .commit::<Notebooks>(notebooks::NAMESPACE, NotebookOp::Select(id))?;
        Ok(())
    }

    // ========================================================================
    // Tags
    // ========================================================================

    pub fn create_tag(&mut self, name: &str) -> Result<TagId> {
        let name = Self::clean_name(name, "tag")?;
        let id = TagId::from_raw(self.allocate());
        self.store.commit::<Tags>(
            tags::NAMESPACE,
            TagOp::Create(Tag {
                id,
                name,
                expanded: false,
            }),
        )?;
        Ok(id)
    }

    pub fn rename_tag(&mut self, id: TagId, name: &str) -> Result<()> {
        let name = Self::clean_name(name, "tag")?;
        self.tag(id)?;
        self.store
            .commit::<Tags>(tags::NAMESPACE, TagOp::Rename { id, name })?;
        Ok(())
    }

    pub fn set_tag_expanded(&mut self, id: TagId, expanded: bool) -> Result<()> {
        self.tag(id)?;
        self.store
            .commit::<Tags>(tags::NAMESPACE, TagOp::SetExpanded { id, expanded })?;
        Ok(())
    }

    /// Delete a tag, removing it from every note first.
    pub fn delete_tag(&mut self, id: TagId) -> Result<()> {
        self.tag(id)?;
        self.ensure_no_open_group::<Notes>(notes::NAMESPACE)?;
        self.ensure_no_open_group::<Tags>(tags::NAMESPACE)?;
        let tagged: Vec<NoteId> = self.notes()?.tagged(id).map(|note| note.id).collect();

        if !tagged.is_empty() {
            self.store.group(notes::NAMESPACE, |store| -> Result<()> {
                for note in &tagged {
                    store.commit::<Notes>(
                        notes::NAMESPACE,
                        NoteOp::RemoveTag { id: *note, tag: id },
                    )?;
                }
                Ok(())
            })?;
        }

        self.store.group(tags::NAMESPACE, |store| -> Result<()> {
            store.commit::<Tags>(tags::NAMESPACE, TagOp::Delete(id))?;
            Ok(())
        })?;

        tracing::debug!(tag = %id, untagged_notes = tagged.len(), "deleted tag");
        Ok(())
    }

    pub fn select_tag(&mut self, id: Option<TagId>) -> Result<()> {
        if let Some(id) = id {
            self.tag(id)?;
        }
        self.store.commit::<Tags>(tags::NAMESPACE, TagOp::Select(id))?;
        Ok(())
    }

    // ========================================================================
    // Notes
    // ========================================================================

    pub fn create_note(&mut self, title: &str, notebook: Option<NotebookId>) -> Result<NoteId> {
        self.ensure_notebook(notebook)?;
        let id = NoteId::from_raw(self.allocate());
        self.store.commit::<Notes>(
            notes::NAMESPACE,
            NoteOp::Create(Note {
                id,
                title: title.to_string(),
                notebook,
                tags: Default::default(),
                trashed: false,
            }),
        )?;
        Ok(id)
    }

    pub fn retitle_note(&mut self, id: NoteId, title: &str) -> Result<()> {
        self.note(id)?;
        self.store.commit::<Notes>(
            notes::NAMESPACE,
            NoteOp::Retitle {
                id,
                title: title.to_string(),
            },
        )?;
        Ok(())
    }

    pub fn move_note(&mut self, id: NoteId, notebook: Option<NotebookId>) -> Result<()> {
        self.note(id)?;
        self.ensure_notebook(notebook)?;
        self.store
            .commit::<Notes>(notes::NAMESPACE, NoteOp::Move { id, notebook })?;
        Ok(())
    }

    pub fn tag_note(&mut self, id: NoteId, tag: TagId) -> Result<()> {
        self.note(id)?;
        self.tag(tag)?;
        self.store
            .commit::<Notes>(notes::NAMESPACE, NoteOp::AddTag { id, tag })?;
        Ok(())
    }

    pub fn untag_note(&mut self, id: NoteId, tag: TagId) -> Result<()> {
        self.note(id)?;
        self.store
            .commit::<Notes>(notes::NAMESPACE, NoteOp::RemoveTag { id, tag })?;
        Ok(())
    }

    pub fn trash_note(&mut self, id: NoteId) -> Result<()> {
        self.note(id)?;
        self.store.commit::<Notes>(notes::NAMESPACE, NoteOp::Trash(id))?;
        Ok(())
    }

    pub fn restore_note(&mut self, id: NoteId) -> Result<()> {
        self.note(id)?;
        self.store
            .commit::<Notes>(notes::NAMESPACE, NoteOp::Restore(id))?;
        Ok(())
    }

    // ========================================================================
    // Navigation and focus
    // ========================================================================

    pub fn navigate(&mut self, pane: &str, target: NavTarget) -> Result<()> {
        let namespace = self.pane_namespace(pane)?;
        match target {
            NavTarget::Notebook(id) => {
                self.notebook(id)?;
            }
            NavTarget::Tag(id) => {
                self.tag(id)?;
            }
            NavTarget::Note(id) => {
                self.note(id)?;
            }
            NavTarget::AllNotes | NavTarget::Trash => {}
        }
        self.store
            .commit::<Navigation>(&namespace, NavigationOp::Navigate(target))?;
        Ok(())
    }

    /// Move keyboard focus to a configured pane. Never recorded.
    pub fn focus(&mut self, pane: Option<&str>) -> Result<()> {
        if let Some(pane) = pane {
            self.pane_namespace(pane)?;
        }
        self.store.commit::<Focus>(
            focus::NAMESPACE,
            FocusOp::Focus(pane.map(str::to_string)),
        )?;
        Ok(())
    }

    // ========================================================================
    // Provisional edits
    // ========================================================================

    /// Start an edit session that can be thrown away as a whole.
    pub fn begin_provisional(&mut self, namespace: &str) -> Result<()> {
        self.store.set_checkpoint(namespace)?;
        Ok(())
    }

    /// Keep the session's edits. Returns false if none was open.
    pub fn commit_provisional(&mut self, namespace: &str) -> Result<bool> {
        Ok(self.store.release_checkpoint(namespace)?)
    }

    /// Revert everything since [`begin_provisional`](Self::begin_provisional).
    pub fn discard_provisional(&mut self, namespace: &str) -> Result<ReplayReport> {
        Ok(self.store.rollback_to_checkpoint(namespace)?)
    }

    // ========================================================================
    // History
    // ========================================================================

    /// Run several edits on one module as a single undo step.
    ///
    /// On `Err` the edits `f` made to `namespace` are reverted. Cascading
    /// deletes open their own groups, so inside a group on any module they
    /// touch they fail before committing anything.
    pub fn group<T>(
        &mut self,
        namespace: &str,
        f: impl FnOnce(&mut Self) -> Result<T>,
    ) -> Result<T> {
        let id = self.store.start_group(namespace)?;
        match f(self) {
            Ok(value) => {
                self.store.stop_group(namespace, id)?;
                Ok(value)
            }
            Err(err) => {
                if let Err(abort) = self.store.abort_group(namespace, id) {
                    tracing::warn!(namespace, error = %abort, "failed to abort group");
                }
                Err(err)
            }
        }
    }

    pub fn undo(&mut self, namespace: &str) -> Result<ReplayReport> {
        Ok(self.store.undo(namespace)?)
    }

    pub fn redo(&mut self, namespace: &str) -> Result<ReplayReport> {
        Ok(self.store.redo(namespace)?)
    }

    #[must_use]
    pub fn can_undo(&self, namespace: &str) -> bool {
        self.store.can_undo(namespace)
    }

    #[must_use]
    pub fn can_redo(&self, namespace: &str) -> bool {
        self.store.can_redo(namespace)
    }
}
