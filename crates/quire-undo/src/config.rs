#![forbid(unsafe_code)]

//! Per-module undo settings.
//!
//! [`UndoSettings`] carries everything a context needs to know about the
//! module it tracks. Settings can be built in code or loaded from TOML or
//! JSON at startup:
//!
//! ```toml
//! namespace = "notebooks"
//! set_state_mutation = "SET_STATE"
//! state_cache_interval = 1000
//! ignore = ["SELECT"]
//! ```
//!
//! `state_cache_interval` bounds replay cost: an undo replays at most
//! `state_cache_interval - 1` sequences after restoring a snapshot. Smaller
//! values trade memory for faster undo.

use std::collections::BTreeSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::SettingsError;

/// Settings for one undo-tracked module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UndoSettings {
    /// Unique registry key.
    pub namespace: String,
    /// Name of the operation that replaces the module's whole state.
    pub set_state_mutation: String,
    /// Snapshot every this many history positions. Must be > 0.
    pub state_cache_interval: usize,
    /// Operation names never recorded.
    #[serde(default)]
    pub ignore: BTreeSet<String>,
}

impl UndoSettings {
    #[must_use]
    pub fn new(
        namespace: impl Into<String>,
        set_state_mutation: impl Into<String>,
        state_cache_interval: usize,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            set_state_mutation: set_state_mutation.into(),
            state_cache_interval,
            ignore: BTreeSet::new(),
        }
    }

    /// Add operation names to the ignore list.
    #[must_use]
    pub fn with_ignore<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ignore.extend(names.into_iter().map(Into::into));
        self
    }

    /// Whether an operation name is excluded from history.
    #[must_use]
    pub fn ignores(&self, operation: &str) -> bool {
        self.ignore.contains(operation)
    }

    pub fn from_toml_str(s: &str) -> Result<Self, SettingsError> {
        let settings: Self = toml::from_str(s)?;
        settings.validated()
    }

    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| SettingsError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_json_str(s: &str) -> Result<Self, SettingsError> {
        let settings: Self = serde_json::from_str(s)?;
        settings.validated()
    }

    /// Validate all fields.
    ///
    /// Returns a list of problems; empty means valid.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.namespace.trim().is_empty() {
            errors.push("namespace must not be empty".into());
        }
        if self.set_state_mutation.trim().is_empty() {
            errors.push("set_state_mutation must not be empty".into());
        }
        if self.state_cache_interval == 0 {
            errors.push(format!(
                "{}: state_cache_interval must be > 0",
                self.namespace
            ));
        }
        if self.ignore.iter().any(|name| name.trim().is_empty()) {
            errors.push(format!("{}: ignore entries must not be empty", self.namespace));
        }

        errors
    }

    /// Consume `self`, returning it only if [`validate`](Self::validate) is clean.
    pub fn validated(self) -> Result<Self, SettingsError> {
        let errors = self.validate();
        if errors.is_empty() {
            Ok(self)
        } else {
            Err(SettingsError::Validation(errors))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_collects_ignore_names() {
        let settings = UndoSettings::new("tags", "SET_STATE", 100).with_ignore(["SELECT", "HOVER"]);
        assert!(settings.ignores("SELECT"));
        assert!(settings.ignores("HOVER"));
        assert!(!settings.ignores("CREATE"));
        assert!(settings.validate().is_empty());
    }

    #[test]
    fn toml_round_trip_fields() {
        let settings = UndoSettings::from_toml_str(
            r#"
            namespace = "notebooks"
            set_state_mutation = "SET_STATE"
            state_cache_interval = 1000
            ignore = ["SELECT"]
            "#,
        )
        .unwrap();
        assert_eq!(settings.namespace, "notebooks");
        assert_eq!(settings.state_cache_interval, 1000);
        assert!(settings.ignores("SELECT"));
    }

    #[test]
    fn ignore_is_optional() {
        let settings = UndoSettings::from_json_str(
            r#"{"namespace":"tags","set_state_mutation":"SET_STATE","state_cache_interval":5}"#,
        )
        .unwrap();
        assert!(settings.ignore.is_empty());
    }

    #[test]
    fn missing_required_field_is_rejected() {
        let err = UndoSettings::from_toml_str(
            r#"
            namespace = "notebooks"
            state_cache_interval = 10
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, SettingsError::Toml(_)));
        assert!(err.to_string().contains("set_state_mutation"));
    }

    #[test]
    fn unknown_field_is_rejected() {
        let err = UndoSettings::from_json_str(
            r#"{"namespace":"a","set_state_mutation":"S","state_cache_interval":1,"intervl":2}"#,
        )
        .unwrap_err();
        assert!(matches!(err, SettingsError::Json(_)));
    }

    #[test]
    fn zero_interval_fails_validation() {
        let err = UndoSettings::new("tags", "SET_STATE", 0)
            .validated()
            .unwrap_err();
        match err {
            SettingsError::Validation(errors) => {
                assert_eq!(errors.len(), 1);
                assert!(errors[0].contains("state_cache_interval"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn blank_names_fail_validation() {
        let errors = UndoSettings::new(" ", "", 3).with_ignore([""]).validate();
        assert_eq!(errors.len(), 3);
    }

    #[test]
    fn loads_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("undo.toml");
        std::fs::write(
            &path,
            "namespace = \"notes\"\nset_state_mutation = \"SET_STATE\"\nstate_cache_interval = 100\n",
        )
        .unwrap();
        let settings = UndoSettings::from_toml_file(&path).unwrap();
        assert_eq!(settings.namespace, "notes");

        let missing = UndoSettings::from_toml_file(dir.path().join("nope.toml")).unwrap_err();
        assert!(matches!(missing, SettingsError::Io { .. }));
    }
}
