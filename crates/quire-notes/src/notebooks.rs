//! Notebook tree module.
//!
//! Notebooks form a forest through `parent`. The reducer never validates
//! ids: the workspace checks them before committing, and replay must apply
//! recorded operations verbatim.

use std::fmt;

use serde::{Deserialize, Serialize};

use quire_undo::{Operation, UndoModule};

pub const NAMESPACE: &str = "notebooks";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NotebookId(u64);

impl NotebookId {
    #[must_use]
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for NotebookId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "notebook-{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notebook {
    pub id: NotebookId,
    pub name: String,
    pub parent: Option<NotebookId>,
    pub expanded: bool,
}

impl Notebook {
    #[must_use]
    pub fn new(id: NotebookId, name: impl Into<String>, parent: Option<NotebookId>) -> Self {
        Self {
            id,
            name: name.into(),
            parent,
            expanded: false,
        }
    }
}

/// All notebooks in creation order, plus the sidebar selection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotebooksState {
    pub notebooks: Vec<Notebook>,
    pub selected: Option<NotebookId>,
}

impl NotebooksState {
    #[must_use]
    pub fn get(&self, id: NotebookId) -> Option<&Notebook> {
        self.notebooks.iter().find(|nb| nb.id == id)
    }

    fn get_mut(&mut self, id: NotebookId) -> Option<&mut Notebook> {
        self.notebooks.iter_mut().find(|nb| nb.id == id)
    }

    #[must_use]
    pub fn contains(&self, id: NotebookId) -> bool {
        self.get(id).is_some()
    }

    pub fn children(&self, id: NotebookId) -> impl Iterator<Item = &Notebook> + '_ {
        self.notebooks
            .iter()
            .filter(move |nb| nb.parent == Some(id))
    }

    pub fn roots(&self) -> impl Iterator<Item = &Notebook> + '_ {
        self.notebooks.iter().filter(|nb| nb.parent.is_none())
    }

    /// `id` and everything below it, parents before children.
    #[must_use]
    pub fn subtree(&self, id: NotebookId) -> Vec<NotebookId> {
        let mut out = Vec::new();
        if !self.contains(id) {
            return out;
        }
        out.push(id);
        let mut cursor = 0;
        while cursor < out.len() {
            let parent = out[cursor];
            out.extend(self.children(parent).map(|nb| nb.id));
            cursor += 1;
        }
        out
    }

    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.notebooks.iter().map(|nb| nb.name.as_str()).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotebookOp {
    SetState(NotebooksState),
    Create(Notebook),
    Rename {
        id: NotebookId,
        name: String,
    },
    SetExpanded {
        id: NotebookId,
        expanded: bool,
    },
    Move {
        id: NotebookId,
        parent: Option<NotebookId>,
    },
    /// Removes one notebook. Callers delete children first.
    Delete(NotebookId),
    Select(Option<NotebookId>),
}

impl Operation for NotebookOp {
    fn name(&self) -> &'static str {
        match self {
            Self::SetState(_) => "SET_STATE",
            Self::Create(_) => "CREATE",
            Self::Rename { .. } => "RENAME",
            Self::SetExpanded { .. } => "SET_EXPANDED",
            Self::Move { .. } => "MOVE",
            Self::Delete(_) => "DELETE",
            Self::Select(_) => "SELECT",
        }
    }
}

pub struct Notebooks;

impl UndoModule for Notebooks {
    type State = NotebooksState;
    type Op = NotebookOp;
    const SET_STATE: &'static str = "SET_STATE";

    fn apply(state: &mut NotebooksState, op: &NotebookOp) {
        match op {
            NotebookOp::SetState(next) => state.clone_from(next),
            NotebookOp::Create(notebook) => state.notebooks.push(notebook.clone()),
            NotebookOp::Rename { id, name } => {
                if let Some(nb) = state.get_mut(*id) {
                    nb.name.clone_from(name);
                }
            }
            NotebookOp::SetExpanded { id, expanded } => {
                if let Some(nb) = state.get_mut(*id) {
                    nb.expanded = *expanded;
                }
            }
            NotebookOp::Move { id, parent } => {
                if let Some(nb) = state.get_mut(*id) {
                    nb.parent = *parent;
                }
            }
            NotebookOp::Delete(id) => {
                state.notebooks.retain(|nb| nb.id != *id);
                if state.selected == Some(*id) {
                    state.selected = None;
                }
            }
            NotebookOp::Select(id) => state.selected = *id,
        }
    }

    fn set_state(state: NotebooksState) -> NotebookOp {
        NotebookOp::SetState(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(raw: u64) -> NotebookId {
        NotebookId::from_raw(raw)
    }

    fn tree() -> NotebooksState {
        let mut state = NotebooksState::default();
        for op in [
            NotebookOp::Create(Notebook::new(id(1), "Work", None)),
            NotebookOp::Create(Notebook::new(id(2), "Projects", Some(id(1)))),
            NotebookOp::Create(Notebook::new(id(3), "Archive", Some(id(2)))),
            NotebookOp::Create(Notebook::new(id(4), "Home", None)),
        ] {
            Notebooks::apply(&mut state, &op);
        }
        state
    }

    #[test]
    fn subtree_lists_parents_first() {
        let state = tree();
        assert_eq!(state.subtree(id(1)), vec![id(1), id(2), id(3)]);
        assert_eq!(state.subtree(id(4)), vec![id(4)]);
        assert!(state.subtree(id(99)).is_empty());
        assert_eq!(state.roots().count(), 2);
    }

    #[test]
    fn rename_expand_move() {
        let mut state = tree();
        Notebooks::apply(
            &mut state,
            &NotebookOp::Rename {
                id: id(4),
                name: "Personal".into(),
            },
        );
        Notebooks::apply(
            &mut state,
            &NotebookOp::SetExpanded {
                id: id(1),
                expanded: true,
            },
        );
        Notebooks::apply(
            &mut state,
            &NotebookOp::Move {
                id: id(3),
                parent: None,
            },
        );
        assert_eq!(state.get(id(4)).unwrap().name, "Personal");
        assert!(state.get(id(1)).unwrap().expanded);
        assert_eq!(state.get(id(3)).unwrap().parent, None);
    }

    #[test]
    fn delete_clears_selection() {
        let mut state = tree();
        Notebooks::apply(&mut state, &NotebookOp::Select(Some(id(4))));
        Notebooks::apply(&mut state, &NotebookOp::Delete(id(4)));
        assert_eq!(state.selected, None);
        assert_eq!(state.names(), vec!["Work", "Projects", "Archive"]);
    }

    #[test]
    fn set_state_replaces_everything() {
        let mut state = tree();
        Notebooks::apply(&mut state, &Notebooks::set_state(NotebooksState::default()));
        assert_eq!(state, NotebooksState::default());
    }

    #[test]
    fn operation_names_are_stable() {
        assert_eq!(NotebookOp::Select(None).name(), "SELECT");
        assert_eq!(NotebookOp::Delete(id(1)).name(), "DELETE");
        assert_eq!(Notebooks::set_state(NotebooksState::default()).name(), Notebooks::SET_STATE);
    }
}
