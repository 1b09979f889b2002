//! Manifest Store
//!
//! Persists the pipeline registry as `pipelines/pipelines.json`. Every
//! mutation is a whole-file read-modify-write; there is no locking, the last
//! writer wins. The file is deleted when the last pipeline is removed.

use mlp_core::domain::registry::PipelineRegistry;
use tracing::debug;

use crate::error::{EngineError, Result};
use crate::files;
use crate::layout::ProjectLayout;

/// Loads the registry, `None` when the file does not exist
pub fn load(layout: &ProjectLayout) -> Result<Option<PipelineRegistry>> {
    let path = layout.registry_file();
    if !path.is_file() {
        return Ok(None);
    }

    let content = files::read_to_string(&path)?;
    let registry = serde_json::from_str(&content).map_err(|e| EngineError::json(&path, e))?;
    Ok(Some(registry))
}

/// Writes the registry, or deletes the file when it holds no pipeline
pub fn save(layout: &ProjectLayout, registry: &PipelineRegistry) -> Result<()> {
    let path = layout.registry_file();
    if registry.is_empty() {
        files::remove_file_if_exists(&path)?;
        debug!("Registry empty, removed {}", path.display());
        return Ok(());
    }

    let content = serde_json::to_string(registry).map_err(|e| EngineError::json(&path, e))?;
    files::write(&path, content)?;
    debug!("Saved registry with {} pipeline(s)", registry.len());
    Ok(())
}

/// Registers a new unlinked pipeline and makes it the default
pub fn create_entry(layout: &ProjectLayout, name: &str) -> Result<PipelineRegistry> {
    let mut registry = load(layout)?.unwrap_or_default();
    registry.create(name)?;
    save(layout, &registry)?;
    Ok(registry)
}

/// Replaces the raw notebook list of a pipeline
pub fn set_notebooks(layout: &ProjectLayout, name: &str, notebooks: &str) -> Result<()> {
    let mut registry = require(layout)?;
    registry.link(name, notebooks)?;
    save(layout, &registry)
}

/// Removes a pipeline; returns whether it was the default
pub fn remove(layout: &ProjectLayout, name: &str) -> Result<bool> {
    let mut registry = require(layout)?;
    let was_default = registry.remove(name)?;
    save(layout, &registry)?;
    Ok(was_default)
}

/// Selects the default pipeline
pub fn set_default(layout: &ProjectLayout, name: &str) -> Result<()> {
    let mut registry = require(layout)?;
    registry.set_default(name)?;
    save(layout, &registry)
}

/// Name of the default pipeline, if a registry exists and one is selected
pub fn default_pipeline(layout: &ProjectLayout) -> Result<Option<String>> {
    Ok(load(layout)?.and_then(|r| r.default_pipeline().map(str::to_string)))
}

/// Deletes the registry file
pub fn clear(layout: &ProjectLayout) -> Result<bool> {
    files::remove_file_if_exists(&layout.registry_file())
}

fn require(layout: &ProjectLayout) -> Result<PipelineRegistry> {
    load(layout)?.ok_or_else(|| EngineError::NotFound("Pipelines".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn layout() -> (TempDir, ProjectLayout) {
        let dir = TempDir::new().unwrap();
        let layout = ProjectLayout::new(dir.path());
        (dir, layout)
    }

    #[test]
    fn test_create_then_load() {
        let (_dir, layout) = layout();
        assert!(load(&layout).unwrap().is_none());

        create_entry(&layout, "train").unwrap();

        let registry = load(&layout).unwrap().unwrap();
        assert!(registry.contains("train"));
        assert!(registry.notebooks("train").unwrap().is_empty());
        assert_eq!(registry.default_pipeline(), Some("train"));
    }

    #[test]
    fn test_file_format() {
        let (_dir, layout) = layout();
        create_entry(&layout, "a").unwrap();
        set_notebooks(&layout, "a", "[notebooks/x.ipynb, notebooks/y.ipynb]").unwrap();

        let raw = files::read_to_string(&layout.registry_file()).unwrap();
        let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"a": "[notebooks/x.ipynb, notebooks/y.ipynb]", "default": "a"})
        );
    }

    #[test]
    fn test_reads_registry_written_by_hand() {
        let (_dir, layout) = layout();
        files::write(
            &layout.registry_file(),
            r#"{"b": "", "a": "[n.ipynb]", "default": ""}"#,
        )
        .unwrap();

        let registry = load(&layout).unwrap().unwrap();
        assert_eq!(registry.names().collect::<Vec<_>>(), vec!["b", "a"]);
        assert_eq!(registry.default_pipeline(), None);
    }

    #[test]
    fn test_duplicate_create_fails() {
        let (_dir, layout) = layout();
        create_entry(&layout, "a").unwrap();
        let before = files::read_to_string(&layout.registry_file()).unwrap();

        let err = create_entry(&layout, "a").unwrap_err();
        assert!(matches!(err, EngineError::AlreadyExists(name) if name == "a"));
        assert_eq!(files::read_to_string(&layout.registry_file()).unwrap(), before);
    }

    #[test]
    fn test_main_is_reserved() {
        let (_dir, layout) = layout();
        assert!(matches!(
            create_entry(&layout, "main").unwrap_err(),
            EngineError::InvalidName(_)
        ));
        assert!(!layout.registry_file().exists());
    }

    #[test]
    fn test_remove_default_clears_it() {
        let (_dir, layout) = layout();
        create_entry(&layout, "a").unwrap();
        create_entry(&layout, "b").unwrap();

        assert!(!remove(&layout, "a").unwrap());
        assert_eq!(default_pipeline(&layout).unwrap().as_deref(), Some("b"));

        create_entry(&layout, "c").unwrap();
        set_default(&layout, "b").unwrap();
        assert!(remove(&layout, "b").unwrap());
        assert_eq!(default_pipeline(&layout).unwrap(), None);
    }

    #[test]
    fn test_removing_last_pipeline_deletes_file() {
        let (_dir, layout) = layout();
        create_entry(&layout, "only").unwrap();
        remove(&layout, "only").unwrap();
        assert!(!layout.registry_file().exists());
    }

    #[test]
    fn test_mutations_without_registry() {
        let (_dir, layout) = layout();
        assert!(matches!(
            set_notebooks(&layout, "x", "[a.ipynb]").unwrap_err(),
            EngineError::NotFound(_)
        ));
        assert!(matches!(
            set_default(&layout, "x").unwrap_err(),
            EngineError::NotFound(_)
        ));
    }

    #[test]
    fn test_set_default_unknown_pipeline() {
        let (_dir, layout) = layout();
        create_entry(&layout, "a").unwrap();
        let err = set_default(&layout, "ghost").unwrap_err();
        assert_eq!(err.to_string(), "Pipeline ghost not found");
    }
}
