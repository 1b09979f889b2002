//! Project Service
//!
//! Commands that act on the project as a whole: scaffolding, showing the
//! stage graph, reproducing locally and publishing through git. External
//! tools run through [`CommandRunner`] and their failures are only logged.

use std::path::Path;

use mlp_core::domain::registry::MAIN_PIPELINE;
use serde::Deserialize;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::error::{EngineError, Result};
use crate::files;
use crate::layout::{self, ProjectLayout};
use crate::repository::registry_repository;
use crate::service::pipeline::{self, Target};
use crate::service::sync::{self, PipelineSync};
use crate::tools::CommandRunner;

const PROJECT_GITIGNORE: &str = include_str!("../../resources/project.gitignore");
const DATA_GITIGNORE: &str =
    "# Ignores all data files in the data folder\n# Except the .dvc extension files\n";
const GITKEEP: &str = ".gitkeep";

const REPRODUCE: [&str; 4] = ["repro", "-f", "--no-commit", "--no-run-cache"];

/// What `init` had to create
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InitReport {
    pub dvc_initialized: bool,
    /// Project-relative paths created
    pub created: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// Reproduced the root project (`main`) or the named pipeline
    Ran(String),
    /// The pipeline could not be synced, nothing was run
    NotSynced(PipelineSync),
    NoDefault,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishOutcome {
    Published {
        pipeline: Option<String>,
        commit_message: String,
    },
    NotSynced(PipelineSync),
}

/// Scaffolds the project folders, skipping whatever already exists
pub fn init(root: &ProjectLayout, runner: &dyn CommandRunner) -> Result<InitReport> {
    let mut report = InitReport::default();

    if !root.dvc_dir().exists() {
        report.dvc_initialized = runner.run("dvc", &["init"], root.root());
    }

    let mut create_file = |relative: &str, contents: &str| -> Result<()> {
        let path = root.join(relative);
        if !path.exists() {
            files::write(&path, contents)?;
            report.created.push(relative.to_string());
        }
        Ok(())
    };
    create_file(layout::GITIGNORE, PROJECT_GITIGNORE)?;
    create_file("data/.gitignore", DATA_GITIGNORE)?;
    create_file(&format!("{}/{}", layout::OUTPUTS_DIR, GITKEEP), "")?;

    let notebooks = root.notebooks_dir();
    if !notebooks.is_dir() {
        files::create_dir_all(&notebooks)?;
        report.created.push("notebooks".to_string());
    }

    info!("Project initialized at {}", root.root().display());
    Ok(report)
}

/// Output of `dvc dag` for the root project or a pipeline subfolder
pub fn show(root: &ProjectLayout, runner: &dyn CommandRunner, pipeline: Option<&str>) -> Result<String> {
    let project = match pipeline {
        Some(name) => {
            let sub = root.pipeline(name);
            if !sub.root().is_dir() {
                return Err(EngineError::NotFound(format!("Pipeline {}", name)));
            }
            sub
        }
        None => root.clone(),
    };
    runner.output("dvc", &["dag"], project.root())
}

/// Reproduces the root project or a pipeline with dvc
///
/// A pipeline is synced first. The `dvc.lock` written by the run is reset to
/// the committed version afterwards.
pub fn run_local(root: &ProjectLayout, runner: &dyn CommandRunner, pipeline: Option<&str>) -> Result<RunOutcome> {
    let name = match pipeline::resolve(root, pipeline)? {
        Target::Main => {
            info!("Running main project...");
            reproduce(root, runner)?;
            return Ok(RunOutcome::Ran(MAIN_PIPELINE.to_string()));
        }
        Target::Pipeline(name) => name,
        Target::NoDefault => return Ok(RunOutcome::NoDefault),
    };

    info!("Running pipeline {} ...", name);
    match sync::sync_pipeline(root, runner, &name)? {
        PipelineSync::Synced { .. } => {}
        other => return Ok(RunOutcome::NotSynced(other)),
    }
    reproduce(&root.pipeline(&name), runner)?;
    Ok(RunOutcome::Ran(name))
}

fn reproduce(project: &ProjectLayout, runner: &dyn CommandRunner) -> Result<()> {
    import_data(project, runner)?;
    runner.run("dvc", &REPRODUCE, project.root());

    debug!("Resetting dvc.lock to the last commit");
    runner.run("git", &["reset", "--", layout::STAGE_LOCK], project.root());
    runner.run("git", &["checkout", "--", layout::STAGE_LOCK], project.root());
    Ok(())
}

/// Imports every `data/**/*.dvc` file from the url it was created from
fn import_data(project: &ProjectLayout, runner: &dyn CommandRunner) -> Result<()> {
    let data = project.data_dir();
    if !data.is_dir() {
        return Ok(());
    }

    let mut dvc_files: Vec<_> = WalkDir::new(&data)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| path.extension().is_some_and(|ext| ext == "dvc"))
        .collect();
    dvc_files.sort();

    for dvc_file in dvc_files {
        let Some(source) = import_source(&dvc_file)? else {
            warn!("{} has no import source, skipping", dvc_file.display());
            continue;
        };
        let target = dvc_file.with_extension("");
        let relative = target.strip_prefix(project.root()).unwrap_or(&target);
        let relative = relative.to_string_lossy().replace('\\', "/");

        info!("Pulling {} to {}", source, relative);
        runner.run("dvc", &["import-url", &source, &relative], project.root());
    }
    Ok(())
}

/// The part of a `.dvc` file written by `dvc import-url`
#[derive(Debug, Deserialize)]
struct ImportedData {
    #[serde(default)]
    deps: Vec<ImportSource>,
}

#[derive(Debug, Deserialize)]
struct ImportSource {
    path: String,
}

/// `deps[0].path` of a `.dvc` file
fn import_source(dvc_file: &Path) -> Result<Option<String>> {
    let content = files::read_to_string(dvc_file)?;
    let data: ImportedData =
        serde_yaml::from_str(&content).map_err(|e| EngineError::yaml(dvc_file, e))?;
    Ok(data.deps.into_iter().next().map(|dep| dep.path))
}

/// Syncs, commits and pushes a pipeline, or the whole project
pub fn publish(
    root: &ProjectLayout,
    runner: &dyn CommandRunner,
    pipeline: Option<&str>,
    message: &str,
) -> Result<PublishOutcome> {
    let cwd = root.root();

    let commit_message = match pipeline {
        Some(name) => {
            info!("Publishing pipeline {} ...", name);
            match sync::sync_pipeline(root, runner, name)? {
                PipelineSync::Synced { .. } => {}
                other => return Ok(PublishOutcome::NotSynced(other)),
            }

            let folder = format!("{}/{}", layout::PIPELINES_DIR, name);
            let registry = format!("{}/{}", layout::PIPELINES_DIR, layout::REGISTRY_FILE);
            runner.run("git", &["add", &folder, &registry], cwd);
            let workflows = format!("{}/{}*", layout::WORKFLOWS_DIR, name);
            runner.run("git", &["add", &workflows], cwd);
            format!("Publishing pipeline {}: {}", name, message)
        }
        None => {
            info!("Publishing the project ...");
            if let Some(default) = registry_repository::default_pipeline(root)? {
                sync::sync_pipeline(root, runner, &default)?;
            }
            runner.run("git", &["add", "."], cwd);
            format!("Publishing project: {}", message)
        }
    };

    info!("Committing changes with message: {}", commit_message);
    runner.run("git", &["commit", "-m", &commit_message], cwd);
    runner.run("git", &["push"], cwd);

    Ok(PublishOutcome::Published {
        pipeline: pipeline.map(str::to_string),
        commit_message,
    })
}
