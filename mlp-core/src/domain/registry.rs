//! Pipeline registry domain type
//!
//! The registry is persisted as one flat JSON object: every key except the
//! reserved [`DEFAULT_KEY`] is a pipeline name mapped to its raw notebook list
//! string, and [`DEFAULT_KEY`] holds the name of the default pipeline (or an
//! empty string when none is selected).

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::domain::notebooks::NotebookList;
use crate::error::RegistryError;

/// Name reserved for the root project
pub const MAIN_PIPELINE: &str = "main";

/// Registry key holding the default pipeline name
pub const DEFAULT_KEY: &str = "default";

/// Mapping of pipeline names to notebook lists plus the default selection
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineRegistry {
    #[serde(flatten)]
    pipelines: IndexMap<String, String>,

    #[serde(rename = "default", default)]
    default: String,
}

impl PipelineRegistry {
    /// Creates an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Checks that `name` can be used as a pipeline name
    ///
    /// The name becomes a folder under `pipelines/`, so path separators and
    /// `.`/`..` are rejected.
    pub fn validate_name(name: &str) -> Result<(), RegistryError> {
        if name.trim().is_empty() {
            return Err(RegistryError::EmptyName);
        }
        if name == "." || name == ".." || name.contains(['/', '\\']) {
            return Err(RegistryError::InvalidPath(name.to_string()));
        }
        if name == MAIN_PIPELINE || name == DEFAULT_KEY {
            return Err(RegistryError::ReservedName(name.to_string()));
        }
        Ok(())
    }

    /// Registers a new, unlinked pipeline and makes it the default
    pub fn create(&mut self, name: &str) -> Result<(), RegistryError> {
        if name == MAIN_PIPELINE {
            return Err(RegistryError::ReservedName(name.to_string()));
        }
        if self.pipelines.contains_key(name) {
            return Err(RegistryError::AlreadyExists(name.to_string()));
        }
        Self::validate_name(name)?;

        self.pipelines.insert(name.to_string(), String::new());
        self.default = name.to_string();
        Ok(())
    }

    /// Replaces the notebook list of an existing pipeline
    ///
    /// The raw string is stored as given; it is decoded lazily on use.
    pub fn link(&mut self, name: &str, notebooks: &str) -> Result<(), RegistryError> {
        let entry = self
            .pipelines
            .get_mut(name)
            .ok_or_else(|| RegistryError::NotFound(name.to_string()))?;
        *entry = notebooks.to_string();
        Ok(())
    }

    /// Removes a pipeline
    ///
    /// Clears the default selection when the removed pipeline was the default.
    /// Returns whether it was.
    pub fn remove(&mut self, name: &str) -> Result<bool, RegistryError> {
        if self.pipelines.shift_remove(name).is_none() {
            return Err(RegistryError::NotFound(name.to_string()));
        }

        let was_default = self.default == name;
        if was_default {
            self.default.clear();
        }
        Ok(was_default)
    }

    /// Selects the default pipeline
    pub fn set_default(&mut self, name: &str) -> Result<(), RegistryError> {
        if !self.pipelines.contains_key(name) {
            return Err(RegistryError::NotFound(name.to_string()));
        }
        self.default = name.to_string();
        Ok(())
    }

    /// Clears the default selection
    pub fn clear_default(&mut self) {
        self.default.clear();
    }

    /// Name of the default pipeline, if one is selected
    pub fn default_pipeline(&self) -> Option<&str> {
        if self.default.is_empty() {
            None
        } else {
            Some(&self.default)
        }
    }

    /// Whether `name` is the selected default
    pub fn is_default(&self, name: &str) -> bool {
        !self.default.is_empty() && self.default == name
    }

    /// Whether `name` is registered
    pub fn contains(&self, name: &str) -> bool {
        self.pipelines.contains_key(name)
    }

    /// Raw notebook list string of a pipeline
    pub fn raw_notebooks(&self, name: &str) -> Option<&str> {
        self.pipelines.get(name).map(String::as_str)
    }

    /// Decoded notebook list of a pipeline
    pub fn notebooks(&self, name: &str) -> Option<NotebookList> {
        self.raw_notebooks(name).map(NotebookList::decode)
    }

    /// Pipeline names in registry order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.pipelines.keys().map(String::as_str)
    }

    /// `(name, raw notebook list)` pairs in registry order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pipelines
            .iter()
            .map(|(name, notebooks)| (name.as_str(), notebooks.as_str()))
    }

    /// Number of registered pipelines
    pub fn len(&self) -> usize {
        self.pipelines.len()
    }

    /// Whether no pipeline is registered
    pub fn is_empty(&self) -> bool {
        self.pipelines.is_empty()
    }

    /// Order in which `sync --all` processes pipelines
    ///
    /// Registry order with the default pipeline moved to the end, so the
    /// root `params.yaml` ends up reflecting the default pipeline.
    pub fn sync_order(&self) -> Vec<String> {
        let mut order: Vec<String> = self
            .names()
            .filter(|name| !self.is_default(name))
            .map(str::to_string)
            .collect();
        if let Some(default) = self.default_pipeline() {
            if self.contains(default) {
                order.push(default.to_string());
            }
        }
        order
    }
}
