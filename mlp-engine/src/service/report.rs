//! Report builder and self-hosted runner job rendering
//!
//! The job file runs the pipeline on a self-hosted runner and publishes a
//! CML report assembled from the notebooks' `report.*` declarations.

use mlp_core::domain::stage::KERNEL_NAME;
use mlp_notebook::Directive;
use serde_yaml::{Mapping, Value};

use crate::error::{EngineError, Result};
use crate::layout::{PIPELINES_DIR, ProjectLayout, ROOT_JOB_FILE};

/// Script every report starts with
pub const REPRODUCE_SCRIPT: &str = "# Reproduce pipeline if any changes detected in dependencies\n\
dvc pull --allow-missing\n\
dvc repro -f\n\
# Output experiment results\n\
dvc exp show\n\
\n\
# Output the hash commit into the report\n\
git log --pretty=format:'%h' -n 1 >> report.md\n\
\n";

/// Last line of every report script
pub const PUBLISH_REPORT: &str = "cml comment create report.md\n";

/// Name of the template step that installs the environment
pub const INSTALL_STEP: &str = "Install requirements";

const JOB_TEMPLATE: &str = include_str!("../../resources/self-hosted-runner.yaml");
const JOB_NAME: &str = "pipeline";

/// Accumulates report commands for one sync
#[derive(Debug, Clone)]
pub struct ReportBuilder {
    script: String,
}

impl Default for ReportBuilder {
    fn default() -> Self {
        Self {
            script: REPRODUCE_SCRIPT.to_string(),
        }
    }
}

impl ReportBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends the report declarations among `directives`
    pub fn add_directives(&mut self, directives: &[Directive]) {
        for directive in directives {
            match directive {
                Directive::ReportText(text) => self.add_text(text),
                Directive::ReportComment(text) => self.add_comment(text),
                Directive::ReportImage { link, alias } => self.add_image(link, alias),
                _ => {}
            }
        }
    }

    pub fn add_text(&mut self, text: &str) {
        self.script.push_str(&format!("echo '{}' >> report.md\n", text));
    }

    /// Adds a raw shell line
    pub fn add_comment(&mut self, text: &str) {
        self.script.push_str(text);
        self.script.push('\n');
    }

    pub fn add_image(&mut self, link: &str, alias: &str) {
        self.script
            .push_str(&format!("echo '![{}]({})' >> report.md\n", alias, link));
    }

    /// The complete script, ending with the CML publish command
    pub fn finish(mut self) -> String {
        self.script.push_str(PUBLISH_REPORT);
        self.script
    }
}

/// How the runner installs the Python environment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requirements {
    /// `requirements.txt`
    File,
    /// `setup_env/setup_env.sh`
    SetupScript,
}

impl Requirements {
    /// Detects the requirements kind of the root project
    pub fn detect(root: &ProjectLayout) -> Self {
        if root.setup_env_dir().exists() {
            Self::SetupScript
        } else {
            Self::File
        }
    }

    /// `run` body of the install step
    pub fn install_script(&self) -> String {
        let install = match self {
            Self::File => "pip install -r requirements.txt\n",
            Self::SetupScript => "source setup_env/setup_env.sh\n",
        };
        format!(
            "{}\n#to make papermill work on the created virtualenv\npython -m ipykernel install --user --name {} --display-name '{}'\n",
            install, KERNEL_NAME, KERNEL_NAME
        )
    }
}

/// Renders the self-hosted runner job for the root project (`None`) or a
/// pipeline
pub fn render_job(
    pipeline: Option<&str>,
    requirements: Requirements,
    report_script: &str,
) -> Result<Value> {
    let mut doc: Value = serde_yaml::from_str(JOB_TEMPLATE).map_err(|e| invalid(&e.to_string()))?;

    let job = doc
        .get_mut("jobs")
        .and_then(|jobs| jobs.get_mut(JOB_NAME))
        .and_then(Value::as_mapping_mut)
        .ok_or_else(|| invalid("missing jobs.pipeline"))?;

    let steps = job
        .get_mut("steps")
        .and_then(Value::as_sequence_mut)
        .ok_or_else(|| invalid("missing jobs.pipeline.steps"))?;
    if steps.len() < 2 {
        return Err(invalid("jobs.pipeline.steps needs at least two steps"));
    }

    let install = steps
        .iter_mut()
        .find(|step| step.get("name").and_then(Value::as_str) == Some(INSTALL_STEP))
        .ok_or_else(|| invalid("missing the Install requirements step"))?;
    set_key(install, "run", Value::String(requirements.install_script()))?;

    let report_index = steps.len() - 2;
    set_key(
        &mut steps[report_index],
        "run",
        Value::String(report_script.to_string()),
    )?;

    if let Some(pipeline) = pipeline {
        let mut run = Mapping::new();
        run.insert(
            "working-directory".into(),
            Value::String(format!("{}/{}", PIPELINES_DIR, pipeline)),
        );
        let mut defaults = Mapping::new();
        defaults.insert("run".into(), Value::Mapping(run));
        job.insert("defaults".into(), Value::Mapping(defaults));

        set_key(
            &mut doc,
            "name",
            Value::String(format!("{} Self Hosted Runner ML-pipeline", pipeline)),
        )?;
    }

    Ok(doc)
}

fn set_key(target: &mut Value, key: &str, value: Value) -> Result<()> {
    let mapping = target
        .as_mapping_mut()
        .ok_or_else(|| invalid(&format!("expected a mapping to set '{}'", key)))?;
    mapping.insert(key.into(), value);
    Ok(())
}

fn invalid(message: &str) -> EngineError {
    EngineError::InvalidWorkflow {
        name: ROOT_JOB_FILE.to_string(),
        message: message.to_string(),
    }
}
