//! Note module.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use quire_undo::{Operation, UndoModule};

use crate::notebooks::NotebookId;
use crate::tags::TagId;

pub const NAMESPACE: &str = "notes";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NoteId(u64);

impl NoteId {
    #[must_use]
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for NoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "note-{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub id: NoteId,
    pub title: String,
    pub notebook: Option<NotebookId>,
    pub tags: BTreeSet<TagId>,
    pub trashed: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotesState {
    pub notes: Vec<Note>,
}

impl NotesState {
    #[must_use]
    pub fn get(&self, id: NoteId) -> Option<&Note> {
        self.notes.iter().find(|note| note.id == id)
    }

    fn get_mut(&mut self, id: NoteId) -> Option<&mut Note> {
        self.notes.iter_mut().find(|note| note.id == id)
    }

    #[must_use]
    pub fn contains(&self, id: NoteId) -> bool {
        self.get(id).is_some()
    }

    /// Notes filed directly in `notebook`, trashed ones included.
    pub fn in_notebook(&self, notebook: NotebookId) -> impl Iterator<Item = &Note> + '_ {
        self.notes
            .iter()
            .filter(move |note| note.notebook == Some(notebook))
    }

    pub fn tagged(&self, tag: TagId) -> impl Iterator<Item = &Note> + '_ {
        self.notes.iter().filter(move |note| note.tags.contains(&tag))
    }

    pub fn trashed(&self) -> impl Iterator<Item = &Note> + '_ {
        self.notes.iter().filter(|note| note.trashed)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NoteOp {
    SetState(NotesState),
    Create(Note),
    Retitle {
        id: NoteId,
        title: String,
    },
    Move {
        id: NoteId,
        notebook: Option<NotebookId>,
    },
    AddTag {
        id: NoteId,
        tag: TagId,
    },
    RemoveTag {
        id: NoteId,
        tag: TagId,
    },
    Trash(NoteId),
    Restore(NoteId),
}

impl Operation for NoteOp {
    fn name(&self) -> &'static str {
        match self {
            Self::SetState(_) => "SET_STATE",
            Self::Create(_) => "CREATE",
            Self::Retitle { .. } => "RETITLE",
            Self::Move { .. } => "MOVE",
            Self::AddTag { .. } => "ADD_TAG",
            Self::RemoveTag { .. } => "REMOVE_TAG",
            Self::Trash(_) => "TRASH",
            Self::Restore(_) => "RESTORE",
        }
    }
}

pub struct Notes;

impl UndoModule for Notes {
    type State = NotesState;
    type Op = NoteOp;
    const SET_STATE: &'static str = "SET_STATE";

    fn apply(state: &mut NotesState, op: &NoteOp) {
        match op {
            NoteOp::SetState(next) => state.clone_from(next),
            NoteOp::Create(note) => state.notes.push(note.clone()),
            NoteOp::Retitle { id, title } => {
                if let Some(note) = state.get_mut(*id) {
                    note.title.clone_from(title);
                }
            }
            NoteOp::Move { id, notebook } => {
                if let Some(note) = state.get_mut(*id) {
                    note.notebook = *notebook;
                }
            }
            NoteOp::AddTag { id, tag } => {
                if let Some(note) = state.get_mut(*id) {
                    note.tags.insert(*tag);
                }
            }
            NoteOp::RemoveTag { id, tag } => {
                if let Some(note) = state.get_mut(*id) {
                    note.tags.remove(tag);
                }
            }
            NoteOp::Trash(id) => {
                if let Some(note) = state.get_mut(*id) {
                    note.trashed = true;
                }
            }
            NoteOp::Restore(id) => {
                if let Some(note) = state.get_mut(*id) {
                    note.trashed = false;
                }
            }
        }
    }

    fn set_state(state: NotesState) -> NoteOp {
        NoteOp::SetState(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn note(raw: u64, notebook: Option<u64>) -> Note {
        Note {
            id: NoteId::from_raw(raw),
            title: format!("note {raw}"),
            notebook: notebook.map(NotebookId::from_raw),
            tags: BTreeSet::new(),
            trashed: false,
        }
    }

    #[test]
    fn filters_by_notebook_and_tag() {
        let mut state = NotesState::default();
        for op in [
            NoteOp::Create(note(1, Some(10))),
            NoteOp::Create(note(2, Some(10))),
            NoteOp::Create(note(3, None)),
            NoteOp::AddTag {
                id: NoteId::from_raw(3),
                tag: TagId::from_raw(5),
            },
        ] {
            Notes::apply(&mut state, &op);
        }
        assert_eq!(state.in_notebook(NotebookId::from_raw(10)).count(), 2);
        let tagged: Vec<_> = state.tagged(TagId::from_raw(5)).map(|n| n.id).collect();
        assert_eq!(tagged, vec![NoteId::from_raw(3)]);
    }

    #[test]
    fn trash_and_restore() {
        let mut state = NotesState::default();
        Notes::apply(&mut state, &NoteOp::Create(note(1, None)));
        Notes::apply(&mut state, &NoteOp::Trash(NoteId::from_raw(1)));
        assert_eq!(state.trashed().count(), 1);
        Notes::apply(&mut state, &NoteOp::Restore(NoteId::from_raw(1)));
        assert_eq!(state.trashed().count(), 0);
    }

    #[test]
    fn tag_set_has_no_duplicates() {
        let mut state = NotesState::default();
        Notes::apply(&mut state, &NoteOp::Create(note(1, None)));
        let add = NoteOp::AddTag {
            id: NoteId::from_raw(1),
            tag: TagId::from_raw(2),
        };
        Notes::apply(&mut state, &add);
        Notes::apply(&mut state, &add);
        assert_eq!(state.get(NoteId::from_raw(1)).unwrap().tags.len(), 1);
        Notes::apply(
            &mut state,
            &NoteOp::RemoveTag {
                id: NoteId::from_raw(1),
                tag: TagId::from_raw(2),
            },
        );
        assert!(state.get(NoteId::from_raw(1)).unwrap().tags.is_empty());
    }
}
