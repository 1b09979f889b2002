//! Sync orchestration
//!
//! A sync regenerates the root project's manifests and job file from a
//! notebook list. Syncing a pipeline additionally packages it into its
//! subfolder, projects the subfolder and registers it in the shared CI
//! documents. Expected states (unknown pipeline, nothing linked) are returned
//! as outcomes, not errors.

use std::fs;

use mlp_core::domain::notebooks::NotebookList;
use mlp_core::domain::stage::StageManifest;
use tracing::info;

use crate::error::{EngineError, Result};
use crate::files;
use crate::layout::ProjectLayout;
use crate::repository::registry_repository;
use crate::service::projector::{self, NotebookDirectives};
use crate::service::propagator::{PackageBuilder, file_name};
use crate::service::report::{ReportBuilder, Requirements, render_job};
use crate::service::workflow;
use crate::tools::CommandRunner;

/// Arguments of the `sync` command
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncRequest {
    /// Raw notebook list for the root project
    pub notebooks: Option<String>,
    pub pipeline: Option<String>,
    /// Regenerate `params.yaml`
    pub force: bool,
    /// Sync every registered pipeline
    pub all: bool,
}

/// Result of syncing one pipeline
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineSync {
    Synced {
        pipeline: String,
        notebooks: Vec<String>,
    },
    NotFound(String),
    NoNotebooks(String),
    NoPipelines,
}

/// Result of a `sync` invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    Pipeline(PipelineSync),
    Main { notebooks: Vec<String> },
    All(Vec<PipelineSync>),
    /// No pipeline, no notebooks and no default pipeline
    NothingToSync,
}

/// Dispatches a `sync` request
pub fn sync(root: &ProjectLayout, runner: &dyn CommandRunner, request: &SyncRequest) -> Result<SyncOutcome> {
    if request.all {
        return sync_all(root, runner, request.force);
    }

    if let Some(pipeline) = &request.pipeline {
        if request.force {
            discard_params(root, Some(pipeline.as_str()))?;
        }
        return Ok(SyncOutcome::Pipeline(sync_pipeline(root, runner, pipeline)?));
    }

    if let Some(raw) = &request.notebooks {
        let notebooks = NotebookList::decode(raw);
        if notebooks.is_empty() {
            return Ok(SyncOutcome::NothingToSync);
        }
        if request.force {
            discard_params(root, None)?;
        }
        info!("Syncing notebooks on main project {} ...", notebooks);
        let notebooks = notebooks.as_slice().to_vec();
        sync_main(root, &notebooks)?;
        return Ok(SyncOutcome::Main { notebooks });
    }

    match registry_repository::default_pipeline(root)? {
        Some(default) => {
            if request.force {
                discard_params(root, Some(default.as_str()))?;
            }
            Ok(SyncOutcome::Pipeline(sync_pipeline(root, runner, &default)?))
        }
        None => Ok(SyncOutcome::NothingToSync),
    }
}

/// Syncs every pipeline, the default one last
///
/// Each pipeline is synced with a fresh `params.yaml`, so the root file ends
/// up generated from the default pipeline's notebooks.
pub fn sync_all(root: &ProjectLayout, runner: &dyn CommandRunner, force: bool) -> Result<SyncOutcome> {
    if force {
        remove_pipeline_folders(root)?;
    }

    let Some(registry) = registry_repository::load(root)? else {
        return Ok(SyncOutcome::All(vec![PipelineSync::NoPipelines]));
    };

    let mut results = Vec::new();
    for pipeline in registry.sync_order() {
        discard_params(root, Some(pipeline.as_str()))?;
        results.push(sync_pipeline(root, runner, &pipeline)?);
    }
    Ok(SyncOutcome::All(results))
}

/// Syncs one registered pipeline
pub fn sync_pipeline(root: &ProjectLayout, runner: &dyn CommandRunner, name: &str) -> Result<PipelineSync> {
    info!("Syncing pipeline {} ...", name);

    let Some(registry) = registry_repository::load(root)? else {
        return Ok(PipelineSync::NoPipelines);
    };
    let Some(notebooks) = registry.notebooks(name) else {
        return Ok(PipelineSync::NotFound(name.to_string()));
    };
    if notebooks.is_empty() {
        return Ok(PipelineSync::NoNotebooks(name.to_string()));
    }

    let notebooks = notebooks.as_slice().to_vec();
    sync_pipeline_project(root, runner, name, &notebooks)?;

    info!("Pipeline {} synced", name);
    Ok(PipelineSync::Synced {
        pipeline: name.to_string(),
        notebooks,
    })
}

/// Regenerates the root project's `dvc.yaml`, `params.yaml` and job file
///
/// Returns the stage manifest that was written.
pub fn sync_main(root: &ProjectLayout, notebooks: &[String]) -> Result<StageManifest> {
    let loaded = projector::load_notebooks(root, notebooks)?;
    let stages = write_project(root, None, &loaded)?;
    render_and_write_job(root, None, &loaded)?;
    info!("Main project synced");
    Ok(stages)
}

/// Syncs the root project, then packages and projects the pipeline subfolder
pub fn sync_pipeline_project(
    root: &ProjectLayout,
    runner: &dyn CommandRunner,
    name: &str,
    notebooks: &[String],
) -> Result<()> {
    let root_stages = sync_main(root, notebooks)?;

    let package = PackageBuilder::new(root, name, runner);
    package.package(&root_stages, notebooks)?;

    let pipeline = package.pipeline();
    let copied: Vec<String> = notebooks
        .iter()
        .map(|nb| format!("notebooks/{}", file_name(nb)))
        .collect();
    let loaded = projector::load_notebooks(pipeline, &copied)?;
    write_project(root, Some(pipeline), &loaded)?;
    render_and_write_job(root, Some(name), &loaded)?;
    workflow::register_pipeline(root, name)?;
    Ok(())
}

fn write_project(
    root: &ProjectLayout,
    subfolder: Option<&ProjectLayout>,
    loaded: &[NotebookDirectives],
) -> Result<StageManifest> {
    let (stages, params) = projector::project(loaded);
    projector::write_stage_manifest(subfolder.unwrap_or(root), &stages)?;
    projector::write_params(root, subfolder, &params)?;
    Ok(stages)
}

fn render_and_write_job(root: &ProjectLayout, pipeline: Option<&str>, loaded: &[NotebookDirectives]) -> Result<()> {
    let mut report = ReportBuilder::new();
    for entry in loaded {
        report.add_directives(&entry.directives);
    }
    let job = render_job(pipeline, Requirements::detect(root), &report.finish())?;
    workflow::write_job_files(root, pipeline, &job)
}

/// Deletes the root `params.yaml` and, for a pipeline, the subfolder's copy
fn discard_params(root: &ProjectLayout, pipeline: Option<&str>) -> Result<()> {
    projector::discard_params(root)?;
    if let Some(name) = pipeline {
        projector::discard_params(&root.pipeline(name))?;
    }
    Ok(())
}

fn remove_pipeline_folders(root: &ProjectLayout) -> Result<()> {
    let dir = root.pipelines_dir();
    if !dir.is_dir() {
        return Ok(());
    }
    let entries = fs::read_dir(&dir).map_err(|e| EngineError::io(&dir, e))?;
    for entry in entries {
        let entry = entry.map_err(|e| EngineError::io(&dir, e))?;
        files::remove_dir_if_exists(&entry.path())?;
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use crate::tools::recording::RecordingRunner;
    use tempfile::TempDir;

    /// Notebook JSON with one code cell
    pub fn notebook(source: &str) -> String {
        serde_json::json!({
            "cells": [
                {"cell_type": "markdown", "metadata": {}, "source": ["# Notebook"]},
                {"cell_type": "code", "metadata": {}, "outputs": [], "source": source}
            ],
            "metadata": {},
            "nbformat": 4,
            "nbformat_minor": 5
        })
        .to_string()
    }

    /// A minimal initialized project with two notebooks
    pub fn project() -> (TempDir, ProjectLayout, RecordingRunner) {
        let dir = TempDir::new().unwrap();
        let root = ProjectLayout::new(dir.path());
        files::write(&root.requirements_file(), "pandas\n").unwrap();
        files::write(&root.join(".dvc/config"), "").unwrap();
        files::write(&root.dvc_ignore(), "").unwrap();
        files::write(&root.join("data/raw.csv"), "a\n1\n").unwrap();
        files::write(&root.join("notebooks/utils/helpers.py"), "").unwrap();
        files::write(
            &root.join("notebooks/prep.ipynb"),
            notebook(
                "from mlpipeline.pipelinebuilder import pipeline\n\
                 pipeline.add_deps_to_stage('prep', '../data/raw.csv', 'utils/helpers.py')\n\
                 pipeline.add_outs_to_stage('prep', '../outputs/clean.csv')\n\
                 pipeline.add_params_to_stage('prep', {'split': 0.2})\n",
            ),
        )
        .unwrap();
        files::write(
            &root.join("notebooks/train.ipynb"),
            notebook(
                "pipeline.add_deps_to_stage('train', '../outputs/clean.csv')\n\
                 pipeline.add_params_to_stage('train', {'epochs': 10, 'layers': [32, 16]})\n\
                 report.add_text_to_report('## Training')\n",
            ),
        )
        .unwrap();
        (dir, root, RecordingRunner::new())
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::project;
    use super::*;
    use mlp_core::dto::github::MATRIX_WORKFLOW;

    fn link(root: &ProjectLayout, name: &str, notebooks: &str) {
        registry_repository::create_entry(root, name).unwrap();
        registry_repository::set_notebooks(root, name, notebooks).unwrap();
    }

    #[test]
    fn test_sync_main_writes_manifests() {
        let (_dir, root, runner) = project();
        let request = SyncRequest {
            notebooks: Some("[notebooks/prep.ipynb, notebooks/train.ipynb]".to_string()),
            ..Default::default()
        };

        let outcome = sync(&root, &runner, &request).unwrap();
        assert!(matches!(outcome, SyncOutcome::Main { ref notebooks } if notebooks.len() == 2));

        let stages = StageManifest::from_yaml(&files::read_to_string(&root.stage_manifest()).unwrap()).unwrap();
        assert_eq!(stages.stages.keys().collect::<Vec<_>>(), vec!["prep", "train"]);

        let params: serde_yaml::Value =
            serde_yaml::from_str(&files::read_to_string(&root.params_file()).unwrap()).unwrap();
        assert_eq!(params["prep"]["split"].as_f64(), Some(0.2));
        assert_eq!(params["train"]["layers"]["list"]["layers"][0].as_i64(), Some(32));
        assert!(root.working_params_file().is_file());

        let job = files::read_to_string(&root.workflow_file("self-hosted-runner.yaml")).unwrap();
        assert!(job.contains("echo '## Training' >> report.md"));
        assert!(runner.commands().is_empty());
    }

    #[test]
    fn test_sync_pipeline_packages_subfolder() {
        let (_dir, root, runner) = project();
        link(&root, "p", "[notebooks/prep.ipynb, notebooks/train.ipynb]");

        let outcome = sync_pipeline(&root, &runner, "p").unwrap();
        assert!(matches!(outcome, PipelineSync::Synced { .. }));

        let sub = root.pipeline("p");
        assert!(sub.stage_manifest().is_file());
        assert_eq!(
            files::read_to_string(&sub.params_file()).unwrap(),
            files::read_to_string(&root.params_file()).unwrap()
        );
        assert!(sub.working_params_file().is_file());
        assert!(sub.join("notebooks/prep.ipynb").is_file());
        assert!(sub.join("notebooks/utils/helpers.py").is_file());
        assert!(sub.join("data/raw.csv").is_file());
        assert!(sub.workflow_file("p-self-hosted-runner.yaml").is_file());
        assert!(root.workflow_file("p-self-hosted-runner.yaml").is_file());
        assert!(root.workflow_file(MATRIX_WORKFLOW).is_file());
    }

    #[test]
    fn test_sync_twice_is_byte_identical() {
        let (_dir, root, runner) = project();
        link(&root, "p", "[notebooks/prep.ipynb, notebooks/train.ipynb]");
        let read_all = |root: &ProjectLayout| {
            [
                root.stage_manifest(),
                root.pipeline("p").stage_manifest(),
                root.workflow_file("p-self-hosted-runner.yaml"),
                root.workflow_file(MATRIX_WORKFLOW),
                root.workflow_file("single-instance.yaml"),
            ]
            .map(|path| files::read_to_string(&path).unwrap())
        };

        sync_pipeline(&root, &runner, "p").unwrap();
        let first = read_all(&root);
        sync_pipeline(&root, &runner, "p").unwrap();
        assert_eq!(first, read_all(&root));
    }

    #[test]
    fn test_expected_states() {
        let (_dir, root, runner) = project();
        assert_eq!(sync_pipeline(&root, &runner, "x").unwrap(), PipelineSync::NoPipelines);

        registry_repository::create_entry(&root, "empty").unwrap();
        assert_eq!(
            sync_pipeline(&root, &runner, "x").unwrap(),
            PipelineSync::NotFound("x".to_string())
        );
        assert_eq!(
            sync_pipeline(&root, &runner, "empty").unwrap(),
            PipelineSync::NoNotebooks("empty".to_string())
        );
    }

    #[test]
    fn test_nothing_to_sync() {
        let (_dir, root, runner) = project();
        assert_eq!(
            sync(&root, &runner, &SyncRequest::default()).unwrap(),
            SyncOutcome::NothingToSync
        );
        let request = SyncRequest {
            notebooks: Some("  ".to_string()),
            ..Default::default()
        };
        assert_eq!(sync(&root, &runner, &request).unwrap(), SyncOutcome::NothingToSync);
    }

    #[test]
    fn test_sync_defaults_to_default_pipeline() {
        let (_dir, root, runner) = project();
        link(&root, "p", "[notebooks/prep.ipynb]");
        let outcome = sync(&root, &runner, &SyncRequest::default()).unwrap();
        assert!(matches!(
            outcome,
            SyncOutcome::Pipeline(PipelineSync::Synced { ref pipeline, .. }) if pipeline == "p"
        ));
    }

    #[test]
    fn test_root_params_preserved_without_force() {
        let (_dir, root, runner) = project();
        link(&root, "p", "[notebooks/prep.ipynb]");
        files::write(&root.params_file(), "prep:\n  split: 0.5\n").unwrap();

        sync_pipeline(&root, &runner, "p").unwrap();
        assert_eq!(
            files::read_to_string(&root.pipeline("p").params_file()).unwrap(),
            "prep:\n  split: 0.5\n"
        );

        let request = SyncRequest {
            pipeline: Some("p".to_string()),
            force: true,
            ..Default::default()
        };
        sync(&root, &runner, &request).unwrap();
        let params = files::read_to_string(&root.params_file()).unwrap();
        assert!(params.contains("split: 0.2"));
    }

    #[test]
    fn test_sync_all_processes_default_last() {
        let (_dir, root, runner) = project();
        link(&root, "a", "[notebooks/prep.ipynb, notebooks/train.ipynb]");
        link(&root, "b", "[notebooks/prep.ipynb]");
        registry_repository::set_default(&root, "a").unwrap();

        let outcome = sync(
            &root,
            &runner,
            &SyncRequest {
                all: true,
                force: true,
                ..Default::default()
            },
        )
        .unwrap();

        let SyncOutcome::All(results) = outcome else {
            panic!("expected all");
        };
        let order: Vec<&str> = results
            .iter()
            .filter_map(|r| match r {
                PipelineSync::Synced { pipeline, .. } => Some(pipeline.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(order, vec!["b", "a"]);

        // root params.yaml comes from the default pipeline, synced last
        let params = files::read_to_string(&root.params_file()).unwrap();
        assert!(params.contains("train:"));
    }

    #[test]
    fn test_missing_notebook_aborts() {
        let (_dir, root, runner) = project();
        link(&root, "p", "[notebooks/ghost.ipynb]");
        let err = sync_pipeline(&root, &runner, "p").unwrap_err();
        assert!(matches!(err, EngineError::NotFound(_)));
    }
}
