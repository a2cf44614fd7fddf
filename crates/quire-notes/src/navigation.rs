//! Per-pane local navigation.
//!
//! Each pane registers its own module under `localNavigation:<pane>`, so
//! back/forward in one pane never disturbs another.

use serde::{Deserialize, Serialize};

use quire_undo::{Operation, UndoModule};

use crate::notebooks::NotebookId;
use crate::notes::NoteId;
use crate::tags::TagId;

pub const NAMESPACE_PREFIX: &str = "localNavigation:";

#[must_use]
pub fn namespace(pane: &str) -> String {
    format!("{NAMESPACE_PREFIX}{pane}")
}

/// What a pane is showing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum NavTarget {
    #[default]
    AllNotes,
    Trash,
    Notebook(NotebookId),
    Tag(TagId),
    Note(NoteId),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavigationState {
    pub active: NavTarget,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavigationOp {
    SetState(NavigationState),
    Navigate(NavTarget),
}

impl Operation for NavigationOp {
    fn name(&self) -> &'static str {
        match self {
            Self::SetState(_) => "SET_STATE",
            Self::Navigate(_) => "NAVIGATE",
        }
    }
}

pub struct Navigation;

impl UndoModule for Navigation {
    type State = NavigationState;
    type Op = NavigationOp;
    const SET_STATE: &'static str = "SET_STATE";

    fn apply(state: &mut NavigationState, op: &NavigationOp) {
        match op {
            NavigationOp::SetState(next) => *state = *next,
            NavigationOp::Navigate(target) => state.active = *target,
        }
    }

    fn set_state(state: NavigationState) -> NavigationOp {
        NavigationOp::SetState(state)
    }
}
