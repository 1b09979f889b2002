//! Notebook list codec
//!
//! Pipelines store their notebooks as one bracketed, comma separated string,
//! e.g. `[notebooks/prep.ipynb, notebooks/train.ipynb]`.

use std::fmt;

/// Ordered list of notebook paths, relative to the project root
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NotebookList(Vec<String>);

impl NotebookList {
    /// Parses a bracketed list
    ///
    /// Strips one leading `[` and one trailing `]`, splits on `,`, trims each
    /// element and drops empty ones. Blank input decodes to an empty list.
    pub fn decode(raw: &str) -> Self {
        let trimmed = raw.trim();
        let inner = trimmed.strip_prefix('[').unwrap_or(trimmed);
        let inner = inner.strip_suffix(']').unwrap_or(inner);

        Self(
            inner
                .split(',')
                .map(str::trim)
                .filter(|item| !item.is_empty())
                .map(str::to_string)
                .collect(),
        )
    }

    /// Renders the list in the bracketed form accepted by [`decode`](Self::decode)
    pub fn encode(&self) -> String {
        format!("[{}]", self.0.join(", "))
    }

    /// Whether the list is empty, i.e. the pipeline is unlinked
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }
}

impl From<Vec<String>> for NotebookList {
    fn from(notebooks: Vec<String>) -> Self {
        Self(notebooks)
    }
}

impl IntoIterator for NotebookList {
    type Item = String;
    type IntoIter = std::vec::IntoIter<String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl fmt::Display for NotebookList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.encode())
    }
}
