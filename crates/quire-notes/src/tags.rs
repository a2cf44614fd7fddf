//! Tag list module.

use std::fmt;

use serde::{Deserialize, Serialize};

use quire_undo::{Operation, UndoModule};

pub const NAMESPACE: &str = "tags";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TagId(u64);

impl TagId {
    #[must_use]
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TagId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tag-{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub id: TagId,
    pub name: String,
    pub expanded: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagsState {
    pub tags: Vec<Tag>,
    pub selected: Option<TagId>,
}

impl TagsState {
    #[must_use]
    pub fn get(&self, id: TagId) -> Option<&Tag> {
        self.tags.iter().find(|tag| tag.id == id)
    }

    #[must_use]
    pub fn contains(&self, id: TagId) -> bool {
        self.get(id).is_some()
    }

    /// Case-insensitive lookup by name.
    #[must_use]
    pub fn find_by_name(&self, name: &str) -> Option<&Tag> {
        self.tags
            .iter()
            .find(|tag| tag.name.eq_ignore_ascii_case(name))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagOp {
    SetState(TagsState),
    Create(Tag),
    Rename { id: TagId, name: String },
    SetExpanded { id: TagId, expanded: bool },
    Delete(TagId),
    Select(Option<TagId>),
}

impl Operation for TagOp {
    fn name(&self) -> &'static str {
        match self {
            Self::SetState(_) => "SET_STATE",
            Self::Create(_) => "CREATE",
            Self::Rename { .. } => "RENAME",
            Self::SetExpanded { .. } => "SET_EXPANDED",
            Self::Delete(_) => "DELETE",
            Self::Select(_) => "SELECT",
        }
    }
}

pub struct Tags;

impl UndoModule for Tags {
    type State = TagsState;
    type Op = TagOp;
    const SET_STATE: &'static str = "SET_STATE";

    fn apply(state: &mut TagsState, op: &TagOp) {
        match op {
            TagOp::SetState(next) => state.clone_from(next),
            TagOp::Create(tag) => state.tags.push(tag.clone()),
            TagOp::Rename { id, name } => {
                if let Some(tag) = state.tags.iter_mut().find(|tag| tag.id == *id) {
                    tag.name.clone_from(name);
                }
            }
            TagOp::SetExpanded { id, expanded } => {
                if let Some(tag) = state.tags.iter_mut().find(|tag| tag.id == *id) {
                    tag.expanded = *expanded;
                }
            }
            TagOp::Delete(id) => {
                state.tags.retain(|tag| tag.id != *id);
                if state.selected == Some(*id) {
                    state.selected = None;
                }
            }
            TagOp::Select(id) => state.selected = *id,
        }
    }

    fn set_state(state: TagsState) -> TagOp {
        TagOp::SetState(state)
    }
}
