//! Keyboard focus. Registered without an undo context.

use serde::{Deserialize, Serialize};

use quire_undo::{Operation, UndoModule};

pub const NAMESPACE: &str = "focus";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FocusState {
    pub pane: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FocusOp {
    Focus(Option<String>),
}

impl Operation for FocusOp {
    fn name(&self) -> &'static str {
        "FOCUS"
    }
}

pub struct Focus;

impl UndoModule for Focus {
    type State = FocusState;
    type Op = FocusOp;
    // FOCUS already replaces the whole state.
    const SET_STATE: &'static str = "FOCUS";

    fn apply(state: &mut FocusState, op: &FocusOp) {
        let FocusOp::Focus(pane) = op;
        state.pane.clone_from(pane);
    }

    fn set_state(state: FocusState) -> FocusOp {
        FocusOp::Focus(state.pane)
    }
}
