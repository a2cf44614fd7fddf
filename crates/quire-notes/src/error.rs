use thiserror::Error;

use quire_undo::{SettingsError, UndoError};

use crate::notebooks::NotebookId;
use crate::notes::NoteId;
use crate::tags::TagId;

pub type Result<T> = std::result::Result<T, NotesError>;

#[derive(Debug, Error)]
pub enum NotesError {
    #[error(transparent)]
    Undo(#[from] UndoError),

    #[error("invalid configuration: {0}")]
    Settings(#[from] SettingsError),

    #[error("unknown notebook: {0}")]
    UnknownNotebook(NotebookId),

    #[error("unknown tag: {0}")]
    UnknownTag(TagId),

    #[error("unknown note: {0}")]
    UnknownNote(NoteId),

    #[error("unknown navigation pane: {pane}")]
    UnknownPane { pane: String },

    #[error("{what} name must not be empty")]
    EmptyName { what: &'static str },

    #[error("cannot move notebook {notebook} under its own subtree ({parent})")]
    InvalidParent {
        notebook: NotebookId,
        parent: NotebookId,
    },
}

impl NotesError {
    /// Errors caused by stale or bad user input rather than a wiring bug.
    #[must_use]
    pub fn is_user_error(&self) -> bool {
        match self {
            Self::Undo(err) => err.is_recoverable(),
            Self::Settings(_) => false,
            Self::UnknownNotebook(_)
            | Self::UnknownTag(_)
            | Self::UnknownNote(_)
            | Self::UnknownPane { .. }
            | Self::EmptyName { .. }
            | Self::InvalidParent { .. } => true,
        }
    }

    #[must_use]
    pub fn empty_name(what: &'static str) -> Self {
        Self::EmptyName { what }
    }
}
