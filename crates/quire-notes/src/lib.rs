#![forbid(unsafe_code)]

//! Quire Notes
//!
//! The note-taking workspace: notebooks, tags, notes, per-pane navigation
//! and focus, each an independent [`quire_undo`] module with its own
//! history.
//!
//! # Key Components
//!
//! - [`Workspace`] - Validated entry point for every user-facing edit
//! - [`WorkspaceConfig`] - Per-module cache intervals, ignore lists and panes
//! - [`notebooks`], [`tags`], [`notes`], [`navigation`], [`focus`] - Modules
//!
//! # Example
//!
//! ```ignore
//! let mut ws = Workspace::new(WorkspaceConfig::default())?;
//! let nb = ws.create_notebook("A", None)?;
//! ws.rename_notebook(nb, "B")?;
//! ws.undo(quire_notes::notebooks::NAMESPACE)?;
//! ```

pub mod config;
pub mod error;
pub mod focus;
pub mod navigation;
pub mod notebooks;
pub mod notes;
pub mod tags;
pub mod workspace;

pub use config::{ModuleConfig, WorkspaceConfig};
pub use error::{NotesError, Result};
pub use navigation::NavTarget;
pub use notebooks::{Notebook, NotebookId};
pub use notes::{Note, NoteId};
pub use tags::{Tag, TagId};
pub use workspace::Workspace;
