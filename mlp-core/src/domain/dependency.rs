//! Dependency classifier
//!
//! Stage dependencies in `dvc.yaml` are written relative to the stage working
//! directory (`notebooks/`). A path either stays inside the notebooks tree or
//! climbs exactly one level to the project root with a leading `../`.

use std::path::{Path, PathBuf};

use crate::error::DependencyError;

/// Stage working directory, relative to the project root
pub const NOTEBOOKS_DIR: &str = "notebooks";

/// Folder mirrored in bulk, never copied dependency by dependency
pub const DATA_DIR: &str = "data";

const PARENT_PREFIX: &str = "../";

/// Where a dependency lives, split into its folder and its final segment
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dependency {
    /// Lives under `<root>/notebooks/`
    NotebookRelative { dir: String, name: String },
    /// Lives under `<root>/` (written with a leading `../`)
    RootRelative { dir: String, name: String },
}

impl Dependency {
    /// Classifies a dependency path taken from a stage's `deps` list
    pub fn classify(raw: &str) -> Result<Self, DependencyError> {
        let path = raw.trim().trim_end_matches('/');

        if path.starts_with("..") {
            let stripped = path
                .strip_prefix(PARENT_PREFIX)
                .ok_or_else(|| DependencyError::UnsupportedPath(raw.to_string()))?;
            if stripped.starts_with("..") {
                return Err(DependencyError::UnsupportedPath(raw.to_string()));
            }
            let (dir, name) = split_name(stripped)?;
            Ok(Self::RootRelative { dir, name })
        } else {
            let (dir, name) = split_name(path)?;
            Ok(Self::NotebookRelative { dir, name })
        }
    }

    /// Folder part of the path, relative to the dependency's base
    pub fn dir(&self) -> &str {
        match self {
            Self::NotebookRelative { dir, .. } | Self::RootRelative { dir, .. } => dir,
        }
    }

    /// Final path segment
    pub fn name(&self) -> &str {
        match self {
            Self::NotebookRelative { name, .. } | Self::RootRelative { name, .. } => name,
        }
    }

    /// Path relative to the project root
    pub fn root_path(&self) -> PathBuf {
        let base = match self {
            Self::NotebookRelative { .. } => PathBuf::from(NOTEBOOKS_DIR),
            Self::RootRelative { .. } => PathBuf::new(),
        };
        base.join(self.dir()).join(self.name())
    }

    /// Actual location in the root project
    pub fn source(&self, root: &Path) -> PathBuf {
        root.join(self.root_path())
    }

    /// Mirrored location inside a pipeline subfolder
    pub fn destination(&self, pipeline_dir: &Path) -> PathBuf {
        pipeline_dir.join(self.root_path())
    }
}

/// Whether a dependency belongs to the bulk data mirror
///
/// True when any path segment is exactly `data`.
pub fn is_data_dependency(path: &str) -> bool {
    path.split('/').any(|segment| segment == DATA_DIR)
}

fn split_name(path: &str) -> Result<(String, String), DependencyError> {
    let (dir, name) = match path.rsplit_once('/') {
        Some((dir, name)) => (dir, name),
        None => ("", path),
    };
    if name.is_empty() {
        return Err(DependencyError::EmptyPath);
    }
    Ok((dir.to_string(), name.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notebook_relative() {
        let dep = Dependency::classify("helpers/util.py").unwrap();
        assert_eq!(
            dep,
            Dependency::NotebookRelative {
                dir: "helpers".to_string(),
                name: "util.py".to_string()
            }
        );
        assert_eq!(
            dep.source(Path::new(".")),
            PathBuf::from("./notebooks/helpers/util.py")
        );
        assert_eq!(
            dep.destination(Path::new("pipelines/p")),
            PathBuf::from("pipelines/p/notebooks/helpers/util.py")
        );
    }

    #[test]
    fn test_root_relative() {
        let dep = Dependency::classify("../shared/lib.py").unwrap();
        assert_eq!(
            dep,
            Dependency::RootRelative {
                dir: "shared".to_string(),
                name: "lib.py".to_string()
            }
        );
        assert_eq!(dep.source(Path::new(".")), PathBuf::from("./shared/lib.py"));
        assert_eq!(
            dep.destination(Path::new("pipelines/p")),
            PathBuf::from("pipelines/p/shared/lib.py")
        );
    }

    #[test]
    fn test_file_at_base() {
        let dep = Dependency::classify("utils.py").unwrap();
        assert_eq!(dep.dir(), "");
        assert_eq!(dep.root_path(), PathBuf::from("notebooks/utils.py"));

        let dep = Dependency::classify("../config.json").unwrap();
        assert_eq!(dep.root_path(), PathBuf::from("config.json"));
    }

    #[test]
    fn test_folder_with_trailing_slash() {
        let dep = Dependency::classify("../src/models/").unwrap();
        assert_eq!(dep.dir(), "src");
        assert_eq!(dep.name(), "models");
    }

    #[test]
    fn test_multiple_parent_markers_rejected() {
        assert_eq!(
            Dependency::classify("../../outside.py").unwrap_err(),
            DependencyError::UnsupportedPath("../../outside.py".to_string())
        );
        assert!(Dependency::classify("..hidden/x.py").is_err());
        assert_eq!(
            Dependency::classify("../").unwrap_err(),
            DependencyError::UnsupportedPath("../".to_string())
        );
        assert_eq!(
            Dependency::classify("").unwrap_err(),
            DependencyError::EmptyPath
        );
    }

    #[test]
    fn test_data_segment_detection() {
        assert!(is_data_dependency("../data/train.csv"));
        assert!(is_data_dependency("data"));
        assert!(!is_data_dependency("../metadata/schema.json"));
        assert!(!is_data_dependency("helpers/data_utils.py"));
    }
}
