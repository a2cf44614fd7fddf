//! Workspace undo configuration.
//!
//! Every field has a default, so an empty file is a valid configuration.
//! A field set in a module section overrides only that field of the
//! module's default:
//!
//! ```toml
//! panes = ["main", "sidebar"]
//!
//! [notes]
//! state_cache_interval = 50
//!
//! [tags]
//! ignore = ["SELECT", "SET_EXPANDED"]
//! ```

use std::collections::BTreeSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use quire_undo::{SettingsError, UndoSettings};

use crate::{navigation, notebooks, notes, tags};

/// Name of the whole-state operation shared by every workspace module.
pub const SET_STATE: &str = "SET_STATE";

// ---------------------------------------------------------------------------
// Per-module settings
// ---------------------------------------------------------------------------

/// Undo tunables for one workspace module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ModuleConfig {
    pub state_cache_interval: usize,
    /// Extra operation names to keep out of history.
    pub ignore: BTreeSet<String>,
}

impl ModuleConfig {
    #[must_use]
    pub fn new(state_cache_interval: usize) -> Self {
        Self {
            state_cache_interval,
            ignore: BTreeSet::new(),
        }
    }

    #[must_use]
    pub fn ignoring(mut self, names: &[&str]) -> Self {
        self.ignore.extend(names.iter().map(|name| (*name).to_string()));
        self
    }

    /// Undo settings for this module under `namespace`.
    #[must_use]
    pub fn settings(&self, namespace: impl Into<String>) -> UndoSettings {
        UndoSettings::new(namespace, SET_STATE, self.state_cache_interval)
            .with_ignore(self.ignore.iter().cloned())
    }
}

impl Default for ModuleConfig {
    fn default() -> Self {
        Self::new(100)
    }
}

// ---------------------------------------------------------------------------
// WorkspaceConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "WorkspaceConfigFile")]
pub struct WorkspaceConfig {
    pub notebooks: ModuleConfig,
    pub tags: ModuleConfig,
    pub notes: ModuleConfig,
    /// Shared by every navigation pane.
    pub navigation: ModuleConfig,
    /// Panes that get their own navigation history.
    pub panes: Vec<String>,
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            notebooks: ModuleConfig::new(1000).ignoring(&["SELECT"]),
            tags: ModuleConfig::new(1000).ignoring(&["SELECT"]),
            notes: ModuleConfig::new(100),
            navigation: ModuleConfig::new(100),
            panes: vec!["main".to_string()],
        }
    }
}

/// On-disk module section; unset fields keep the module's default.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct ModuleOverride {
    state_cache_interval: Option<usize>,
    ignore: Option<BTreeSet<String>>,
}

impl ModuleOverride {
    fn over(self, mut base: ModuleConfig) -> ModuleConfig {
        if let Some(interval) = self.state_cache_interval {
            base.state_cache_interval = interval;
        }
        if let Some(ignore) = self.ignore {
            base.ignore = ignore;
        }
        base
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct WorkspaceConfigFile {
    notebooks: ModuleOverride,
    tags: ModuleOverride,
    notes: ModuleOverride,
    navigation: ModuleOverride,
    panes: Option<Vec<String>>,
}

impl From<WorkspaceConfigFile> for WorkspaceConfig {
    fn from(file: WorkspaceConfigFile) -> Self {
        let defaults = Self::default();
        Self {
            notebooks: file.notebooks.over(defaults.notebooks),
            tags: file.tags.over(defaults.tags),
            notes: file.notes.over(defaults.notes),
            navigation: file.navigation.over(defaults.navigation),
            panes: file.panes.unwrap_or(defaults.panes),
        }
    }
}

impl WorkspaceConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, SettingsError> {
        let config: Self = toml::from_str(s)?;
        config.validated()
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
        let config: Self = serde_json::from_str(s)?;
        config.validated()
    }

    /// Settings for every tracked module, in registration order.
    #[must_use]
    pub fn module_settings(&self) -> Vec<UndoSettings> {
        let mut all = vec![
            self.notebooks.settings(notebooks::NAMESPACE),
            self.tags.settings(tags::NAMESPACE),
            self.notes.settings(notes::NAMESPACE),
        ];
        all.extend(
            self.panes
                .iter()
                .map(|pane| self.navigation.settings(navigation::namespace(pane))),
        );
        all
    }

    /// Returns a list of problems; empty means valid.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let mut errors: Vec<String> = self
            .module_settings()
            .iter()
            .flat_map(UndoSettings::validate)
            .collect();

        if self.panes.is_empty() {
            errors.push("panes must list at least one pane".into());
        }
        let mut seen = BTreeSet::new();
        for pane in &self.panes {
            if pane.trim().is_empty() {
                errors.push("pane names must not be empty".into());
            } else if !seen.insert(pane.as_str()) {
                errors.push(format!("duplicate pane: {pane}"));
            }
        }
        if self
            .module_settings()
            .iter()
            .any(|settings| settings.ignores(SET_STATE))
        {
            errors.push(format!("{SET_STATE} must not be listed in ignore"));
        }

        errors
    }

    pub fn validated(self) -> Result<Self, SettingsError> {
        let errors = self.validate();
        if errors.is_empty() {
            Ok(self)
        } else {
            Err(SettingsError::Validation(errors))
        }
    }
}
