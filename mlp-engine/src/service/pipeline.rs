//! Pipeline Service
//!
//! Registry-level commands: create, link, delete, list and default
//! selection. Each returns an outcome describing what happened so the caller
//! can explain expected states instead of failing.

use mlp_core::domain::notebooks::NotebookList;
use mlp_core::domain::registry::{MAIN_PIPELINE, PipelineRegistry};
use tracing::{info, warn};

use crate::error::{EngineError, Result};
use crate::files;
use crate::layout::ProjectLayout;
use crate::repository::registry_repository;
use crate::service::workflow;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreateOutcome {
    Created { name: String, linked: Option<NotebookList> },
    AlreadyExists(String),
    InvalidName(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkOutcome {
    Linked { name: String, notebooks: String },
    NotFound(String),
    NoPipelines,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted { name: String, was_default: bool },
    NotFound(String),
    InvalidName(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteAllOutcome {
    Deleted(Vec<String>),
    NoPipelines,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DefaultOutcome {
    Set(String),
    NotFound(String),
}

/// Which pipeline a command targets
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// The root project
    Main,
    Pipeline(String),
    /// No name given and no default selected
    NoDefault,
}

/// One line of `list`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineSummary {
    pub name: String,
    /// Raw notebook list as stored
    pub notebooks: String,
    pub is_default: bool,
}

/// Registers a pipeline, creates its folder and optionally links notebooks
pub fn create(root: &ProjectLayout, name: &str, notebooks: Option<&str>) -> Result<CreateOutcome> {
    match registry_repository::create_entry(root, name) {
        Ok(_) => {}
        Err(EngineError::AlreadyExists(name)) => return Ok(CreateOutcome::AlreadyExists(name)),
        Err(EngineError::InvalidName(message)) => return Ok(CreateOutcome::InvalidName(message)),
        Err(e) => return Err(e),
    }
    files::create_dir_all(root.pipeline(name).root())?;
    info!("Pipeline created: {}", name);

    let linked = match notebooks {
        Some(raw) if !NotebookList::decode(raw).is_empty() => {
            registry_repository::set_notebooks(root, name, raw)?;
            Some(NotebookList::decode(raw))
        }
        _ => None,
    };

    Ok(CreateOutcome::Created {
        name: name.to_string(),
        linked,
    })
}

/// Replaces the notebook list of a pipeline
pub fn link(root: &ProjectLayout, name: &str, notebooks: &str) -> Result<LinkOutcome> {
    let Some(registry) = registry_repository::load(root)? else {
        return Ok(LinkOutcome::NoPipelines);
    };
    if !registry.contains(name) {
        return Ok(LinkOutcome::NotFound(name.to_string()));
    }

    registry_repository::set_notebooks(root, name, notebooks)?;
    Ok(LinkOutcome::Linked {
        name: name.to_string(),
        notebooks: notebooks.to_string(),
    })
}

/// Deletes a pipeline's folder, workflow files and registry entry
pub fn delete(root: &ProjectLayout, name: &str) -> Result<DeleteOutcome> {
    if name == MAIN_PIPELINE {
        return Ok(DeleteOutcome::NotFound(name.to_string()));
    }
    if let Err(e) = PipelineRegistry::validate_name(name) {
        return Ok(DeleteOutcome::InvalidName(e.to_string()));
    }

    let registry = registry_repository::load(root)?.unwrap_or_default();
    let folder = root.pipeline(name);
    let registered = registry.contains(name);

    if !registered && !folder.root().is_dir() {
        return Ok(DeleteOutcome::NotFound(name.to_string()));
    }
    if !root.is_pipeline_folder(folder.root()) {
        return Err(EngineError::InvalidName(format!(
            "Pipeline folder {} is outside {}",
            folder.root().display(),
            root.pipelines_dir().display()
        )));
    }

    files::remove_dir_if_exists(folder.root())?;
    workflow::unregister_pipeline(root, name)?;

    let was_default = if registered {
        registry_repository::remove(root, name)?
    } else {
        false
    };

    info!("Pipeline deleted: {}", name);
    Ok(DeleteOutcome::Deleted {
        name: name.to_string(),
        was_default,
    })
}

/// Deletes every pipeline, the registry and the root parameter files
pub fn delete_all(root: &ProjectLayout) -> Result<DeleteAllOutcome> {
    let Some(registry) = registry_repository::load(root)? else {
        return Ok(DeleteAllOutcome::NoPipelines);
    };

    let names: Vec<String> = registry.names().map(str::to_string).collect();
    for name in &names {
        let folder = root.pipeline(name);
        if PipelineRegistry::validate_name(name).is_err() || !root.is_pipeline_folder(folder.root()) {
            warn!("Skipping files of invalid pipeline name '{}'", name);
            continue;
        }
        files::remove_dir_if_exists(folder.root())?;
        workflow::unregister_pipeline(root, name)?;
    }
    registry_repository::clear(root)?;
    files::remove_file_if_exists(&root.params_file())?;
    files::remove_file_if_exists(&root.working_params_file())?;

    info!("All pipelines deleted");
    Ok(DeleteAllOutcome::Deleted(names))
}

/// Registered pipelines in registry order, `None` without a registry
pub fn list(root: &ProjectLayout) -> Result<Option<Vec<PipelineSummary>>> {
    Ok(registry_repository::load(root)?.map(|registry| summaries(&registry)))
}

fn summaries(registry: &PipelineRegistry) -> Vec<PipelineSummary> {
    registry
        .iter()
        .map(|(name, notebooks)| PipelineSummary {
            name: name.to_string(),
            notebooks: notebooks.to_string(),
            is_default: registry.is_default(name),
        })
        .collect()
}

/// Selects the default pipeline
pub fn set_default(root: &ProjectLayout, name: &str) -> Result<DefaultOutcome> {
    match registry_repository::set_default(root, name) {
        Ok(()) => Ok(DefaultOutcome::Set(name.to_string())),
        Err(EngineError::NotFound(_)) => Ok(DefaultOutcome::NotFound(name.to_string())),
        Err(e) => Err(e),
    }
}

/// Resolves an optional pipeline argument, falling back to the default
pub fn resolve(root: &ProjectLayout, pipeline: Option<&str>) -> Result<Target> {
    match pipeline {
        Some(MAIN_PIPELINE) => Ok(Target::Main),
        Some(name) => Ok(Target::Pipeline(name.to_string())),
        None => Ok(registry_repository::default_pipeline(root)?
            .map(Target::Pipeline)
            .unwrap_or(Target::NoDefault)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn root() -> (TempDir, ProjectLayout) {
        let dir = TempDir::new().unwrap();
        let root = ProjectLayout::new(dir.path());
        (dir, root)
    }

    #[test]
    fn test_create_and_list() {
        let (_dir, root) = root();
        assert_eq!(list(&root).unwrap(), None);

        for name in ["a", "b", "c"] {
            create(&root, name, None).unwrap();
        }
        let summaries = list(&root).unwrap().unwrap();
        let defaults: Vec<_> = summaries.iter().filter(|s| s.is_default).collect();
        assert_eq!(defaults.len(), 1);
        assert_eq!(defaults[0].name, "c");
        assert!(root.pipeline("a").root().is_dir());
    }

    #[test]
    fn test_create_with_notebooks_links_them() {
        let (_dir, root) = root();
        let outcome = create(&root, "p", Some("[notebooks/a.ipynb, notebooks/b.ipynb]")).unwrap();
        let CreateOutcome::Created { linked: Some(linked), .. } = outcome else {
            panic!("expected linked notebooks");
        };
        assert_eq!(linked.len(), 2);

        let summaries = list(&root).unwrap().unwrap();
        assert_eq!(summaries[0].notebooks, "[notebooks/a.ipynb, notebooks/b.ipynb]");
    }

    #[test]
    fn test_create_expected_failures() {
        let (_dir, root) = root();
        create(&root, "p", None).unwrap();
        assert_eq!(
            create(&root, "p", None).unwrap(),
            CreateOutcome::AlreadyExists("p".to_string())
        );
        assert!(matches!(
            create(&root, "main", None).unwrap(),
            CreateOutcome::InvalidName(_)
        ));
    }

    #[test]
    fn test_link_outcomes() {
        let (_dir, root) = root();
        assert_eq!(link(&root, "p", "[a.ipynb]").unwrap(), LinkOutcome::NoPipelines);
        create(&root, "p", None).unwrap();
        assert_eq!(
            link(&root, "q", "[a.ipynb]").unwrap(),
            LinkOutcome::NotFound("q".to_string())
        );
        assert!(matches!(
            link(&root, "p", "[a.ipynb]").unwrap(),
            LinkOutcome::Linked { .. }
        ));
    }

    #[test]
    fn test_delete_default_clears_selection() {
        let (_dir, root) = root();
        create(&root, "a", None).unwrap();
        create(&root, "b", None).unwrap();
        workflow::register_pipeline(&root, "b").unwrap();
        files::write(&root.workflow_file("b-self-hosted-runner.yaml"), "x").unwrap();

        assert_eq!(
            delete(&root, "b").unwrap(),
            DeleteOutcome::Deleted {
                name: "b".to_string(),
                was_default: true
            }
        );
        assert!(!root.pipeline("b").root().exists());
        assert!(!root.workflow_file("b-self-hosted-runner.yaml").exists());
        assert_eq!(registry_repository::default_pipeline(&root).unwrap(), None);

        assert_eq!(
            delete(&root, "ghost").unwrap(),
            DeleteOutcome::NotFound("ghost".to_string())
        );
    }

    #[test]
    fn test_delete_non_default_keeps_default() {
        let (_dir, root) = root();
        create(&root, "a", None).unwrap();
        create(&root, "b", None).unwrap();
        delete(&root, "a").unwrap();
        assert_eq!(
            registry_repository::default_pipeline(&root).unwrap().as_deref(),
            Some("b")
        );
    }

    /// Project with a notebook, one pipeline with a job file and a registry
    fn populated_root() -> (TempDir, ProjectLayout) {
        let (dir, root) = root();
        files::write(&root.notebooks_dir().join("a.ipynb"), "{}").unwrap();
        create(&root, "keep", None).unwrap();
        workflow::register_pipeline(&root, "keep").unwrap();
        files::write(&root.workflow_file("keep-self-hosted-runner.yaml"), "x").unwrap();
        (dir, root)
    }

    fn assert_untouched(root: &ProjectLayout) {
        assert!(root.notebooks_dir().join("a.ipynb").exists());
        assert!(root.registry_file().exists());
        assert!(root.pipeline("keep").root().is_dir());
        assert!(root.workflow_file("keep-self-hosted-runner.yaml").exists());
        assert_eq!(
            registry_repository::default_pipeline(&root).unwrap().as_deref(),
            Some("keep")
        );
    }

    #[test]
    fn test_delete_rejects_path_like_names() {
        let (_dir, root) = populated_root();
        for name in ["", "  ", ".", "..", "../notebooks", "keep/..", "a\\b", "default"] {
            assert!(
                matches!(delete(&root, name).unwrap(), DeleteOutcome::InvalidName(_)),
                "name {:?}",
                name
            );
            assert_untouched(&root);
        }
    }

    #[test]
    fn test_create_rejects_path_like_names() {
        let (_dir, root) = populated_root();
        for name in ["", ".", "..", "../escape", "a/b"] {
            assert!(
                matches!(create(&root, name, None).unwrap(), CreateOutcome::InvalidName(_)),
                "name {:?}",
                name
            );
            assert_untouched(&root);
        }
        assert!(!root.join("escape").exists());
        assert!(!root.pipelines_dir().join("a").exists());
        assert_eq!(list(&root).unwrap().unwrap().len(), 1);
    }

    #[test]
    fn test_delete_prefix_named_pipeline_keeps_the_other() {
        let (_dir, root) = root();
        for name in ["train", "training"] {
            create(&root, name, None).unwrap();
            workflow::register_pipeline(&root, name).unwrap();
            files::write(&root.workflow_file(&format!("{}-self-hosted-runner.yaml", name)), "x")
                .unwrap();
        }

        delete(&root, "train").unwrap();

        assert!(!root.workflow_file("train-self-hosted-runner.yaml").exists());
        assert!(root.workflow_file("training-self-hosted-runner.yaml").exists());
        assert!(root.pipeline("training").root().is_dir());
        let names: Vec<_> = list(&root).unwrap().unwrap().into_iter().map(|s| s.name).collect();
        assert_eq!(names, vec!["training"]);
    }

    #[test]
    fn test_delete_all() {
        let (_dir, root) = root();
        assert_eq!(delete_all(&root).unwrap(), DeleteAllOutcome::NoPipelines);

        create(&root, "a", None).unwrap();
        create(&root, "b", None).unwrap();
        files::write(&root.params_file(), "a: {}\n").unwrap();
        files::write(&root.working_params_file(), "a: {}\n").unwrap();

        assert_eq!(
            delete_all(&root).unwrap(),
            DeleteAllOutcome::Deleted(vec!["a".to_string(), "b".to_string()])
        );
        assert!(!root.registry_file().exists());
        assert!(!root.params_file().exists());
        assert!(!root.working_params_file().exists());
        assert_eq!(list(&root).unwrap(), None);
    }

    #[test]
    fn test_set_default_and_resolve() {
        let (_dir, root) = root();
        assert_eq!(resolve(&root, None).unwrap(), Target::NoDefault);

        create(&root, "a", None).unwrap();
        create(&root, "b", None).unwrap();
        assert_eq!(
            set_default(&root, "a").unwrap(),
            DefaultOutcome::Set("a".to_string())
        );
        assert_eq!(
            set_default(&root, "zzz").unwrap(),
            DefaultOutcome::NotFound("zzz".to_string())
        );
        assert_eq!(resolve(&root, None).unwrap(), Target::Pipeline("a".to_string()));
        assert_eq!(resolve(&root, Some("main")).unwrap(), Target::Main);
        assert_eq!(resolve(&root, Some("b")).unwrap(), Target::Pipeline("b".to_string()));
    }
}
