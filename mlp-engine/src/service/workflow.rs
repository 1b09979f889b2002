//! CI Workflow Generator
//!
//! Maintains the shared dispatch documents (`matrix.yaml` and
//! `single-instance.yaml`) and writes the per-pipeline job files.

use std::fs;

use mlp_core::dto::github::{MATRIX_WORKFLOW, SINGLE_INSTANCE_WORKFLOW};
use serde_yaml::{Mapping, Value};
use tracing::{debug, info};

use crate::error::{EngineError, Result};
use crate::files;
use crate::layout::{ProjectLayout, ROOT_JOB_FILE, job_file_name};

/// Workflow input carrying the selected pipeline
pub const PIPELINE_INPUT: &str = "PIPELINE";

const MATRIX_TEMPLATE: &str = include_str!("../../resources/matrix.yaml");
const SINGLE_INSTANCE_TEMPLATE: &str = include_str!("../../resources/single-instance.yaml");

/// A shared dispatch document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SharedWorkflow {
    /// Fans out over a list of instance types
    Matrix,
    /// Runs on one instance type
    SingleInstance,
}

impl SharedWorkflow {
    pub const ALL: [SharedWorkflow; 2] = [SharedWorkflow::Matrix, SharedWorkflow::SingleInstance];

    pub fn file_name(&self) -> &'static str {
        match self {
            Self::Matrix => MATRIX_WORKFLOW,
            Self::SingleInstance => SINGLE_INSTANCE_WORKFLOW,
        }
    }

    fn template(&self) -> &'static str {
        match self {
            Self::Matrix => MATRIX_TEMPLATE,
            Self::SingleInstance => SINGLE_INSTANCE_TEMPLATE,
        }
    }

    /// Job entry that calls the pipeline's job file
    pub fn job_entry(&self, pipeline: &str) -> Mapping {
        let mut with = Mapping::new();
        let mut job = Mapping::new();
        job.insert(
            "if".into(),
            Value::String(format!(
                "${{{{ github.event.inputs.{} == '{}' }}}}",
                PIPELINE_INPUT, pipeline
            )),
        );

        match self {
            Self::Matrix => {
                let mut matrix = Mapping::new();
                matrix.insert(
                    "instance_type".into(),
                    "${{ fromJSON(github.event.inputs.EC2_INSTANCE_TYPE) }}".into(),
                );
                let mut strategy = Mapping::new();
                strategy.insert("matrix".into(), Value::Mapping(matrix));
                job.insert("strategy".into(), Value::Mapping(strategy));
                with.insert("EC2_INSTANCE_TYPE".into(), "${{ matrix.instance_type }}".into());
            }
            Self::SingleInstance => {
                with.insert(
                    "EC2_INSTANCE_TYPE".into(),
                    "${{ github.event.inputs.EC2_INSTANCE_TYPE }}".into(),
                );
            }
        }
        with.insert(
            "EC2_TARGET_SIZE".into(),
            "${{ github.event.inputs.EC2_TARGET_SIZE }}".into(),
        );

        job.insert(
            "uses".into(),
            Value::String(format!("./.github/workflows/{}", job_file_name(pipeline))),
        );
        job.insert("secrets".into(), "inherit".into());
        job.insert("with".into(), Value::Mapping(with));
        job
    }

    fn load(&self, root: &ProjectLayout) -> Result<Option<Value>> {
        let path = root.workflow_file(self.file_name());
        if !path.is_file() {
            return Ok(None);
        }
        let content = files::read_to_string(&path)?;
        let doc = serde_yaml::from_str(&content).map_err(|e| EngineError::yaml(&path, e))?;
        Ok(Some(doc))
    }

    fn load_or_template(&self, root: &ProjectLayout) -> Result<Value> {
        match self.load(root)? {
            Some(doc) => Ok(doc),
            None => serde_yaml::from_str(self.template())
                .map_err(|e| self.invalid(&e.to_string())),
        }
    }

    fn save(&self, root: &ProjectLayout, doc: &Value) -> Result<()> {
        write_yaml(root, self.file_name(), doc)
    }

    fn options_mut<'a>(&self, doc: &'a mut Value) -> Result<&'a mut Vec<Value>> {
        let input = doc
            .get_mut("on")
            .and_then(|on| on.get_mut("workflow_dispatch"))
            .and_then(|dispatch| dispatch.get_mut("inputs"))
            .and_then(|inputs| inputs.get_mut(PIPELINE_INPUT))
            .and_then(Value::as_mapping_mut)
            .ok_or_else(|| self.invalid("missing on.workflow_dispatch.inputs.PIPELINE"))?;

        let options = input
            .entry("options".into())
            .or_insert_with(|| Value::Sequence(Vec::new()));
        if options.is_null() {
            *options = Value::Sequence(Vec::new());
        }
        options
            .as_sequence_mut()
            .ok_or_else(|| self.invalid("PIPELINE options is not a list"))
    }

    fn jobs_mut<'a>(&self, doc: &'a mut Value) -> Result<&'a mut Mapping> {
        let root = doc
            .as_mapping_mut()
            .ok_or_else(|| self.invalid("document is not a mapping"))?;
        let jobs = root
            .entry("jobs".into())
            .or_insert_with(|| Value::Mapping(Mapping::new()));
        if jobs.is_null() {
            *jobs = Value::Mapping(Mapping::new());
        }
        jobs.as_mapping_mut()
            .ok_or_else(|| self.invalid("jobs is not a mapping"))
    }

    /// Adds the pipeline option (once) and (re)writes its job entry
    pub fn register(&self, doc: &mut Value, pipeline: &str) -> Result<()> {
        let options = self.options_mut(doc)?;
        let option = Value::String(pipeline.to_string());
        if !options.contains(&option) {
            options.push(option);
        }

        let entry = self.job_entry(pipeline);
        self.jobs_mut(doc)?
            .insert(pipeline.into(), Value::Mapping(entry));
        Ok(())
    }

    /// Removes the pipeline option and job entry
    pub fn unregister(&self, doc: &mut Value, pipeline: &str) -> Result<()> {
        let option = Value::String(pipeline.to_string());
        self.options_mut(doc)?.retain(|o| *o != option);
        self.jobs_mut(doc)?.shift_remove(pipeline);
        Ok(())
    }

    fn invalid(&self, message: &str) -> EngineError {
        EngineError::InvalidWorkflow {
            name: self.file_name().to_string(),
            message: message.to_string(),
        }
    }
}

/// Registers a pipeline in every shared document, creating missing ones
pub fn register_pipeline(root: &ProjectLayout, pipeline: &str) -> Result<()> {
    for workflow in SharedWorkflow::ALL {
        let mut doc = workflow.load_or_template(root)?;
        workflow.register(&mut doc, pipeline)?;
        workflow.save(root, &doc)?;
    }
    debug!("Registered {} in shared workflows", pipeline);
    Ok(())
}

/// Removes a pipeline from the shared documents and deletes its job files
///
/// Every workflow file whose name starts with `<pipeline>-` is removed,
/// except the shared documents themselves.
pub fn unregister_pipeline(root: &ProjectLayout, pipeline: &str) -> Result<Vec<String>> {
    for workflow in SharedWorkflow::ALL {
        if let Some(mut doc) = workflow.load(root)? {
            workflow.unregister(&mut doc, pipeline)?;
            workflow.save(root, &doc)?;
        }
    }

    let dir = root.workflows_dir();
    let mut removed = Vec::new();
    if !dir.is_dir() {
        return Ok(removed);
    }

    let shared: Vec<&str> = SharedWorkflow::ALL.iter().map(|w| w.file_name()).collect();
    let prefix = format!("{}-", pipeline);
    let entries = fs::read_dir(&dir).map_err(|e| EngineError::io(&dir, e))?;
    for entry in entries {
        let entry = entry.map_err(|e| EngineError::io(&dir, e))?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.starts_with(&prefix) && !shared.contains(&name.as_str()) && entry.path().is_file() {
            files::remove_file_if_exists(&entry.path())?;
            removed.push(name);
        }
    }
    removed.sort();
    info!("Removed workflow files of {}: {:?}", pipeline, removed);
    Ok(removed)
}

/// Writes the rendered job file
///
/// The root job goes to `.github/workflows/self-hosted-runner.yaml`. A
/// pipeline job is written into the pipeline subfolder and mirrored into the
/// root workflows folder, where the shared documents reference it.
pub fn write_job_files(root: &ProjectLayout, pipeline: Option<&str>, job: &Value) -> Result<()> {
    match pipeline {
        None => write_yaml(root, ROOT_JOB_FILE, job),
        Some(name) => {
            let file_name = job_file_name(name);
            write_yaml(&root.pipeline(name), &file_name, job)?;
            write_yaml(root, &file_name, job)
        }
    }
}

fn write_yaml(project: &ProjectLayout, file_name: &str, doc: &Value) -> Result<()> {
    let path = project.workflow_file(file_name);
    let yaml = serde_yaml::to_string(doc).map_err(|e| EngineError::yaml(&path, e))?;
    files::write(&path, yaml)
}
