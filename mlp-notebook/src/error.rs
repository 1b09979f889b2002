//! Error types for notebook reading and directive parsing

use std::path::PathBuf;
use thiserror::Error;

/// Error in a declaration cell
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("line {line}: {message}")]
pub struct ParseError {
    /// 1-based line inside the cell
    pub line: usize,
    pub message: String,
}

impl ParseError {
    pub fn new(line: usize, message: impl Into<String>) -> Self {
        Self {
            line,
            message: message.into(),
        }
    }
}

/// Errors that can occur while loading a notebook
#[derive(Debug, Error)]
pub enum NotebookError {
    /// Notebook file does not exist
    #[error("File {} not found", .path.display())]
    NotFound { path: PathBuf },

    /// Notebook could not be read
    #[error("Failed to read notebook {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Notebook is not valid nbformat JSON
    #[error("Notebook {} is not a valid notebook: {source}", .path.display())]
    Format {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// A declaration cell could not be parsed
    #[error("Notebook {} cell {cell}, {source}", .path.display())]
    Directive {
        path: PathBuf,
        cell: usize,
        #[source]
        source: ParseError,
    },
}
