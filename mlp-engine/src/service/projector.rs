//! Pipeline Projector
//!
//! Turns an ordered notebook list and the directives declared in those
//! notebooks into `dvc.yaml` and `params.yaml`. A [`StageManifestBuilder`] is
//! created for every projection and discarded afterwards.

use std::path::Path;

use mlp_core::domain::dependency::NOTEBOOKS_DIR;
use mlp_core::domain::params::ParameterManifest;
use mlp_core::domain::stage::{StageManifest, papermill_command};
use mlp_notebook::{Directive, NotebookError, load_directives};
use tracing::{debug, info};

use crate::error::{EngineError, Result};
use crate::files;
use crate::layout::ProjectLayout;
use crate::service::propagator::file_name;

/// Directives of one notebook, keyed by its project-relative path
#[derive(Debug, Clone, PartialEq)]
pub struct NotebookDirectives {
    pub notebook: String,
    pub directives: Vec<Directive>,
}

/// Reads every notebook in order; the first missing one aborts the load
pub fn load_notebooks(project: &ProjectLayout, notebooks: &[String]) -> Result<Vec<NotebookDirectives>> {
    notebooks
        .iter()
        .map(|notebook| {
            let directives = load_directives(&project.join(notebook)).map_err(|e| match e {
                NotebookError::NotFound { path } => {
                    EngineError::NotFound(format!("File {}", path.display()))
                }
                other => EngineError::Notebook(other),
            })?;
            Ok(NotebookDirectives {
                notebook: notebook.clone(),
                directives,
            })
        })
        .collect()
}

/// A notebook stage whose command is filled in at build time
#[derive(Debug, Clone)]
struct NotebookStage {
    stage: String,
    file: String,
    linked_params: bool,
}

/// Accumulates stages and parameters for one projection
#[derive(Debug, Default)]
pub struct StageManifestBuilder {
    stages: StageManifest,
    params: ParameterManifest,
    notebook_stages: Vec<NotebookStage>,
}

impl StageManifestBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds the stage of one notebook and applies its directives
    ///
    /// `notebook` is relative to the project root.
    pub fn add_notebook(&mut self, notebook: &str, directives: &[Directive]) {
        let stage = directives
            .iter()
            .find_map(Directive::stage)
            .map(str::to_string)
            .unwrap_or_else(|| stage_id(notebook));
        let file = wdir_relative(notebook);

        self.stages.stage_mut(&stage).add_deps([file.clone()]);

        let mut linked_params = false;
        for directive in directives {
            if matches!(directive, Directive::LinkParams { stage: s, .. } if *s == stage) {
                linked_params = true;
            }
            self.apply(directive);
        }

        debug!("Notebook {} projected as stage {}", notebook, stage);
        self.notebook_stages.push(NotebookStage {
            stage,
            file,
            linked_params,
        });
    }

    fn apply(&mut self, directive: &Directive) {
        match directive {
            Directive::AddDeps { stage, deps } => {
                self.stages.stage_mut(stage).add_deps(deps.iter().cloned());
            }
            Directive::AddOuts { stage, outs } => {
                self.stages.stage_mut(stage).add_outs(outs.iter().cloned());
            }
            Directive::LinkParams { stage, params } => {
                self.stages.stage_mut(stage).params = params.clone();
            }
            Directive::SetWdir { stage, wdir } => {
                self.stages.stage_mut(stage).wdir = wdir.clone();
            }
            Directive::AddParams { stage, params } => {
                self.stages.stage_mut(stage);
                self.params.set_stage(stage, params.clone());
            }
            Directive::SetStage {
                stage,
                notebook,
                output,
                params,
            } => {
                self.stages.stage_mut(stage).cmd = Some(papermill_command(notebook, output, params));
            }
            Directive::ReportText(_) | Directive::ReportComment(_) | Directive::ReportImage { .. } => {}
        }
    }

    /// Fills default commands and parameter references, then returns both
    /// manifests
    pub fn build(mut self) -> (StageManifest, ParameterManifest) {
        for entry in &self.notebook_stages {
            let keys = self.params.keys(&entry.stage);
            let stage = self.stages.stage_mut(&entry.stage);

            if stage.cmd.is_none() {
                let refs: Vec<(String, String)> = keys
                    .iter()
                    .map(|key| (key.clone(), format!("{}.{}", entry.stage, key)))
                    .collect();
                stage.cmd = Some(papermill_command(&entry.file, file_name(&entry.file), &refs));
            }
            if !entry.linked_params && stage.params.is_empty() {
                stage.params = keys
                    .iter()
                    .map(|key| format!("{}.{}", entry.stage, key))
                    .collect();
            }
        }
        (self.stages, self.params)
    }
}

/// Stage identifier derived from a notebook path
pub fn stage_id(notebook: &str) -> String {
    Path::new(notebook)
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| notebook.to_string())
}

/// Notebook path as seen from the `notebooks/` working directory
pub fn wdir_relative(notebook: &str) -> String {
    let notebook = notebook.trim_start_matches("./");
    match notebook.strip_prefix(NOTEBOOKS_DIR).and_then(|rest| rest.strip_prefix('/')) {
        Some(inside) => inside.to_string(),
        None => format!("../{}", notebook),
    }
}

/// Builds both manifests from loaded notebooks
pub fn project(notebooks: &[NotebookDirectives]) -> (StageManifest, ParameterManifest) {
    let mut builder = StageManifestBuilder::new();
    for entry in notebooks {
        builder.add_notebook(&entry.notebook, &entry.directives);
    }
    builder.build()
}

/// Writes `dvc.yaml` into the project
pub fn write_stage_manifest(project: &ProjectLayout, manifest: &StageManifest) -> Result<()> {
    let path = project.stage_manifest();
    let yaml = manifest.to_yaml().map_err(|e| EngineError::yaml(&path, e))?;
    files::write(&path, yaml)?;
    info!("Wrote {} stage(s) to {}", manifest.stages.len(), path.display());
    Ok(())
}

/// Applies the `params.yaml` write policy
///
/// At the root an existing `params.yaml` is never regenerated, only copied to
/// the working directory. A pipeline subfolder takes the root's file when it
/// has none, then refreshes its own working copy.
pub fn write_params(
    root: &ProjectLayout,
    subfolder: Option<&ProjectLayout>,
    params: &ParameterManifest,
) -> Result<()> {
    match subfolder {
        None => {
            let path = root.params_file();
            if path.is_file() {
                debug!("Keeping existing {}", path.display());
                files::copy_file(&path, &root.working_params_file())
            } else {
                let yaml = params.to_yaml().map_err(|e| EngineError::yaml(&path, e))?;
                files::write(&path, &yaml)?;
                files::write(&root.working_params_file(), &yaml)
            }
        }
        Some(pipeline) => {
            let path = pipeline.params_file();
            if !path.is_file() {
                if root.params_file().is_file() {
                    files::copy_file(&root.params_file(), &path)?;
                } else {
                    let yaml = params.to_yaml().map_err(|e| EngineError::yaml(&path, e))?;
                    files::write(&path, yaml)?;
                }
            }
            files::copy_file(&path, &pipeline.working_params_file())
        }
    }
}

/// Removes `params.yaml` so the next projection regenerates it
pub fn discard_params(project: &ProjectLayout) -> Result<bool> {
    files::remove_file_if_exists(&project.params_file())
}
