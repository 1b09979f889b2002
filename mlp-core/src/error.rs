//! Error types for the core domain

use thiserror::Error;

/// Errors raised by pipeline registry mutations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// Pipeline is not registered
    #[error("Pipeline {0} not found")]
    NotFound(String),

    /// Pipeline name already registered
    #[error("Pipeline {0} already exists")]
    AlreadyExists(String),

    /// Name collides with `main` or the registry's default key
    #[error("Pipeline name cannot be {0}")]
    ReservedName(String),

    /// Name is empty or whitespace
    #[error("Pipeline name cannot be empty")]
    EmptyName,

    /// Name is not a single folder name
    #[error("Pipeline name '{0}' must be a plain folder name")]
    InvalidPath(String),
}

/// Errors raised while classifying a stage dependency
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DependencyError {
    /// Path climbs more than one level above the notebooks folder
    #[error("Unsupported dependency path '{0}': only one leading '../' is allowed")]
    UnsupportedPath(String),

    /// Path has no file or folder name
    #[error("Empty dependency path")]
    EmptyPath,
}
