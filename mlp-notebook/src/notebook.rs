//! Jupyter notebook reader
//!
//! Only the parts of nbformat 4 needed to find declaration cells are
//! modelled; everything else in the document is ignored.

use std::fs;
use std::path::Path;

use serde::Deserialize;
use tracing::debug;

use crate::directive::Directive;
use crate::error::NotebookError;
use crate::parser::{RECEIVERS, parse_directives};

/// A notebook document
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Notebook {
    #[serde(default)]
    pub cells: Vec<Cell>,
}

/// One notebook cell
#[derive(Debug, Clone, Deserialize)]
pub struct Cell {
    pub cell_type: String,
    #[serde(default)]
    source: CellSource,
}

/// nbformat allows the source as one string or as a list of lines
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum CellSource {
    Text(String),
    Lines(Vec<String>),
}

impl Default for CellSource {
    fn default() -> Self {
        Self::Text(String::new())
    }
}

impl Cell {
    pub fn source(&self) -> String {
        match &self.source {
            CellSource::Text(text) => text.clone(),
            CellSource::Lines(lines) => lines.concat(),
        }
    }

    pub fn is_code(&self) -> bool {
        self.cell_type == "code"
    }

    /// Whether the cell holds pipeline or report declarations
    pub fn is_declaration(&self) -> bool {
        if !self.is_code() {
            return false;
        }
        let source = self.source();
        RECEIVERS
            .iter()
            .any(|receiver| source.contains(&format!("{}.", receiver)))
    }
}

impl Notebook {
    pub fn from_json(source: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(source)
    }

    /// Parses the declarations of every code cell, in cell order
    ///
    /// The error carries the index of the failing cell; the caller adds the
    /// notebook path.
    pub fn directives(&self) -> Result<Vec<Directive>, (usize, crate::ParseError)> {
        let mut directives = Vec::new();
        for (index, cell) in self.cells.iter().enumerate() {
            if !cell.is_declaration() {
                continue;
            }
            let parsed = parse_directives(&cell.source()).map_err(|e| (index, e))?;
            directives.extend(parsed);
        }
        Ok(directives)
    }
}

/// Reads and decodes a notebook file
pub fn read_notebook(path: &Path) -> Result<Notebook, NotebookError> {
    if !path.is_file() {
        return Err(NotebookError::NotFound {
            path: path.to_path_buf(),
        });
    }

    let content = fs::read_to_string(path).map_err(|source| NotebookError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    Notebook::from_json(&content).map_err(|source| NotebookError::Format {
        path: path.to_path_buf(),
        source,
    })
}

/// Reads a notebook and returns its declarations
pub fn load_directives(path: &Path) -> Result<Vec<Directive>, NotebookError> {
    let notebook = read_notebook(path)?;
    let directives = notebook
        .directives()
        .map_err(|(cell, source)| NotebookError::Directive {
            path: path.to_path_buf(),
            cell,
            source,
        })?;

    debug!(
        "Loaded {} directive(s) from {}",
        directives.len(),
        path.display()
    );
    Ok(directives)
}
