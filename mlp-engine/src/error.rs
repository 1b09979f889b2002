//! Engine error type

use std::path::{Path, PathBuf};

use mlp_core::{DependencyError, RegistryError};
use mlp_notebook::NotebookError;
use thiserror::Error;

/// Errors raised by project operations
#[derive(Debug, Error)]
pub enum EngineError {
    /// A pipeline, notebook or project file is missing
    #[error("{0} not found")]
    NotFound(String),

    /// Duplicate pipeline name
    #[error("Pipeline {0} already exists")]
    AlreadyExists(String),

    /// Pipeline name cannot be used
    #[error("{0}")]
    InvalidName(String),

    /// Neither `requirements.txt` nor `setup_env/` exists
    #[error("No requirements.txt or setup_env folder found")]
    MissingDependency,

    /// An external program could not produce a required value
    #[error("{program} failed: {message}")]
    ExternalToolFailure { program: String, message: String },

    #[error(transparent)]
    UnsupportedDependency(#[from] DependencyError),

    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid JSON in {}: {source}", .path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid YAML in {}: {source}", .path.display())]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// A workflow document lacks a key the generator edits
    #[error("Invalid workflow {name}: {message}")]
    InvalidWorkflow { name: String, message: String },

    #[error(transparent)]
    Notebook(#[from] NotebookError),
}

impl EngineError {
    pub(crate) fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    pub(crate) fn json(path: &Path, source: serde_json::Error) -> Self {
        Self::Json {
            path: path.to_path_buf(),
            source,
        }
    }

    pub(crate) fn yaml(path: &Path, source: serde_yaml::Error) -> Self {
        Self::Yaml {
            path: path.to_path_buf(),
            source,
        }
    }

    pub(crate) fn tool(program: &str, message: impl Into<String>) -> Self {
        Self::ExternalToolFailure {
            program: program.to_string(),
            message: message.into(),
        }
    }
}

impl From<RegistryError> for EngineError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::NotFound(name) => Self::NotFound(format!("Pipeline {}", name)),
            RegistryError::AlreadyExists(name) => Self::AlreadyExists(name),
            other => Self::InvalidName(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;
