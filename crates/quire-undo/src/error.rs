#![forbid(unsafe_code)]

//! Error taxonomy for the undo engine.
//!
//! Errors fall into two classes:
//!
//! - **Programmer errors**: the engine was wired up incorrectly (a namespace
//!   registered twice, a group stopped that was never started, a cache seeded
//!   twice). Callers should treat these as fatal.
//! - **Expected empty-state conditions**: nothing to undo, nothing to redo, no
//!   checkpoint to roll back to. UI layers map these to disabled buttons.

use std::path::PathBuf;

use thiserror::Error;

use crate::sequence::SequenceId;

pub type Result<T> = std::result::Result<T, UndoError>;

#[derive(Debug, Error)]
pub enum UndoError {
    #[error("namespace already registered: {namespace}")]
    DuplicateNamespace { namespace: String },

    #[error("no undo module registered under namespace: {namespace}")]
    NoSuchModule { namespace: String },

    #[error("module {namespace} does not hold state of type {expected}")]
    ModuleTypeMismatch {
        namespace: String,
        expected: &'static str,
    },

    #[error("no open group with id {id}")]
    NoSuchGroup { id: SequenceId },

    #[error("group {id} is still open on {namespace}")]
    GroupInProgress { namespace: String, id: SequenceId },

    #[error("state cache already holds an initial state")]
    AlreadyInitialized,

    #[error("state cache was never given an initial state")]
    NoCacheAvailable,

    #[error("replay range {replay_from}..{stop_at} is outside history (current index {current})")]
    InvalidReplayRange {
        replay_from: usize,
        stop_at: usize,
        current: usize,
    },

    #[error("invalid undo settings: {0}")]
    InvalidSettings(#[from] SettingsError),

    #[error("nothing to undo")]
    NothingToUndo,

    #[error("nothing to redo")]
    NothingToRedo,

    #[error("no checkpoint set")]
    NoCheckpoint,
}

impl UndoError {
    /// True for conditions a UI simply reflects as a disabled action.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::NothingToUndo | Self::NothingToRedo | Self::NoCheckpoint
        )
    }

    /// True for wiring mistakes that should abort the caller.
    #[must_use]
    pub fn is_programmer_error(&self) -> bool {
        !self.is_recoverable()
    }
}

/// Errors raised while loading or validating [`UndoSettings`](crate::UndoSettings).
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{}", .0.join("; "))]
    Validation(Vec<String>),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_state_conditions_are_recoverable() {
        assert!(UndoError::NothingToUndo.is_recoverable());
        assert!(UndoError::NothingToRedo.is_recoverable());
        assert!(UndoError::NoCheckpoint.is_recoverable());
    }

    #[test]
    fn wiring_mistakes_are_programmer_errors() {
        let dup = UndoError::DuplicateNamespace {
            namespace: "tags".into(),
        };
        assert!(dup.is_programmer_error());
        assert!(UndoError::AlreadyInitialized.is_programmer_error());
        assert!(
            UndoError::NoSuchGroup {
                id: SequenceId::from_raw(7)
            }
            .is_programmer_error()
        );
    }

    #[test]
    fn validation_message_joins_reasons() {
        let err = SettingsError::Validation(vec!["a".into(), "b".into()]);
        assert_eq!(err.to_string(), "a; b");
    }

    #[test]
    fn display_names_namespace() {
        let err = UndoError::NoSuchModule {
            namespace: "notebooks".into(),
        };
        assert!(err.to_string().contains("notebooks"));
    }
}
