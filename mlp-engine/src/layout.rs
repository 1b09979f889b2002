//! Project layout
//!
//! Every path the engine reads or writes, relative to the project root.

use std::path::{Path, PathBuf};

use mlp_core::domain::dependency::{DATA_DIR, NOTEBOOKS_DIR};

pub const PIPELINES_DIR: &str = "pipelines";
pub const REGISTRY_FILE: &str = "pipelines.json";
pub const OUTPUTS_DIR: &str = "outputs";
pub const STAGE_MANIFEST: &str = "dvc.yaml";
pub const STAGE_LOCK: &str = "dvc.lock";
pub const PARAMS_FILE: &str = "params.yaml";
pub const REQUIREMENTS_FILE: &str = "requirements.txt";
pub const SETUP_ENV_DIR: &str = "setup_env";
pub const SETUP_ENV_SCRIPT: &str = "setup_env/setup_env.sh";
pub const DVC_DIR: &str = ".dvc";
pub const DVC_IGNORE: &str = ".dvcignore";
pub const GITIGNORE: &str = ".gitignore";
pub const WORKFLOWS_DIR: &str = ".github/workflows";
pub const ROOT_JOB_FILE: &str = "self-hosted-runner.yaml";

/// File name of a pipeline's self-hosted runner job
pub fn job_file_name(pipeline: &str) -> String {
    format!("{}-{}", pipeline, ROOT_JOB_FILE)
}

/// Paths of one project (the root or a pipeline subfolder)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectLayout {
    root: PathBuf,
}

impl ProjectLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn join(&self, relative: impl AsRef<Path>) -> PathBuf {
        self.root.join(relative)
    }

    pub fn pipelines_dir(&self) -> PathBuf {
        self.root.join(PIPELINES_DIR)
    }

    pub fn registry_file(&self) -> PathBuf {
        self.pipelines_dir().join(REGISTRY_FILE)
    }

    /// Layout of a pipeline subfolder
    pub fn pipeline(&self, name: &str) -> ProjectLayout {
        ProjectLayout::new(self.pipelines_dir().join(name))
    }

    /// Whether `path` is a direct child of `pipelines/`
    pub fn is_pipeline_folder(&self, path: &Path) -> bool {
        path.file_name().is_some() && path.parent() == Some(self.pipelines_dir().as_path())
    }

    pub fn notebooks_dir(&self) -> PathBuf {
        self.root.join(NOTEBOOKS_DIR)
    }

    pub fn outputs_dir(&self) -> PathBuf {
        self.root.join(OUTPUTS_DIR)
    }

    pub fn data_dir(&self) -> PathBuf {
        self.root.join(DATA_DIR)
    }

    pub fn stage_manifest(&self) -> PathBuf {
        self.root.join(STAGE_MANIFEST)
    }

    pub fn stage_lock(&self) -> PathBuf {
        self.root.join(STAGE_LOCK)
    }

    pub fn params_file(&self) -> PathBuf {
        self.root.join(PARAMS_FILE)
    }

    /// Copy of `params.yaml` read by notebooks during execution
    pub fn working_params_file(&self) -> PathBuf {
        self.notebooks_dir().join(PARAMS_FILE)
    }

    pub fn requirements_file(&self) -> PathBuf {
        self.root.join(REQUIREMENTS_FILE)
    }

    pub fn setup_env_dir(&self) -> PathBuf {
        self.root.join(SETUP_ENV_DIR)
    }

    pub fn dvc_dir(&self) -> PathBuf {
        self.root.join(DVC_DIR)
    }

    pub fn dvc_ignore(&self) -> PathBuf {
        self.root.join(DVC_IGNORE)
    }

    pub fn gitignore(&self) -> PathBuf {
        self.root.join(GITIGNORE)
    }

    pub fn workflows_dir(&self) -> PathBuf {
        self.root.join(WORKFLOWS_DIR)
    }

    pub fn workflow_file(&self, file_name: &str) -> PathBuf {
        self.workflows_dir().join(file_name)
    }
}
