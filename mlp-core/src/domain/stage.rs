//! DVC stage manifest (`dvc.yaml`)

use std::collections::BTreeSet;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::domain::dependency::{NOTEBOOKS_DIR, is_data_dependency};

/// Kernel the notebooks are executed with
pub const KERNEL_NAME: &str = "venv";

/// The whole `dvc.yaml` document
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageManifest {
    #[serde(default)]
    pub stages: IndexMap<String, Stage>,
}

/// One dvc stage
///
/// Field order matches the order keys are written in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cmd: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub deps: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub outs: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub params: Vec<String>,

    #[serde(default = "default_wdir")]
    pub wdir: String,
}

fn default_wdir() -> String {
    NOTEBOOKS_DIR.to_string()
}

impl Default for Stage {
    fn default() -> Self {
        Self {
            cmd: None,
            deps: Vec::new(),
            outs: Vec::new(),
            params: Vec::new(),
            wdir: default_wdir(),
        }
    }
}

impl Stage {
    /// Appends dependencies, skipping ones already listed
    pub fn add_deps<I, S>(&mut self, deps: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        extend_unique(&mut self.deps, deps);
    }

    /// Appends outputs, skipping ones already listed
    pub fn add_outs<I, S>(&mut self, outs: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        extend_unique(&mut self.outs, outs);
    }
}

fn extend_unique<I, S>(target: &mut Vec<String>, items: I)
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    for item in items {
        let item = item.into();
        if !target.contains(&item) {
            target.push(item);
        }
    }
}

impl StageManifest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the stage, inserting an empty one with the default wdir first
    pub fn stage_mut(&mut self, name: &str) -> &mut Stage {
        self.stages.entry(name.to_string()).or_default()
    }

    pub fn from_yaml(source: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(source)
    }

    pub fn to_yaml(&self) -> Result<String, serde_yaml::Error> {
        serde_yaml::to_string(self)
    }

    /// Dependencies a pipeline subfolder must receive as copies
    ///
    /// Every stage dependency that is not under a `data` segment and is not
    /// produced as an output by any stage. Sorted for stable processing.
    pub fn copied_dependencies(&self) -> BTreeSet<String> {
        let outs: BTreeSet<&str> = self
            .stages
            .values()
            .flat_map(|stage| stage.outs.iter().map(String::as_str))
            .collect();

        self.stages
            .values()
            .flat_map(|stage| stage.deps.iter())
            .filter(|dep| !is_data_dependency(dep))
            .filter(|dep| !outs.contains(dep.as_str()))
            .cloned()
            .collect()
    }
}

/// Builds the papermill command line for a notebook stage
///
/// `params` pairs a notebook parameter name with the `params.yaml` reference
/// it is filled from. Whitespace is collapsed to single spaces.
pub fn papermill_command(notebook: &str, output: &str, params: &[(String, String)]) -> String {
    let mut cmd = format!("papermill ./{} ../outputs/{}", notebook, output);
    for (key, reference) in params {
        cmd.push_str(&format!(" -p {} ${{{}}} ", key, reference));
    }
    cmd.push_str(&format!(" -k {} ", KERNEL_NAME));

    cmd.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_papermill_command() {
        let cmd = papermill_command(
            "train.ipynb",
            "train.ipynb",
            &[
                ("epochs".to_string(), "train.epochs".to_string()),
                ("lr".to_string(), "train.lr".to_string()),
            ],
        );
        assert_eq!(
            cmd,
            "papermill ./train.ipynb ../outputs/train.ipynb -p epochs ${train.epochs} -p lr ${train.lr} -k venv"
        );
    }

    #[test]
    fn test_papermill_command_without_params() {
        assert_eq!(
            papermill_command("a.ipynb", "a_out.ipynb", &[]),
            "papermill ./a.ipynb ../outputs/a_out.ipynb -k venv"
        );
    }

    #[test]
    fn test_yaml_key_order_and_empty_lists() {
        let mut manifest = StageManifest::new();
        let stage = manifest.stage_mut("prep");
        stage.add_deps(["prep.ipynb", "../data/raw.csv"]);
        stage.cmd = Some("papermill ./prep.ipynb ../outputs/prep.ipynb -k venv".to_string());

        let yaml = manifest.to_yaml().unwrap();
        let cmd_at = yaml.find("cmd:").unwrap();
        let deps_at = yaml.find("deps:").unwrap();
        let wdir_at = yaml.find("wdir:").unwrap();
        assert!(cmd_at < deps_at && deps_at < wdir_at);
        assert!(!yaml.contains("outs:"));
        assert!(!yaml.contains("params:"));

        let parsed = StageManifest::from_yaml(&yaml).unwrap();
        assert_eq!(parsed, manifest);
    }

    #[test]
    fn test_add_deps_deduplicates() {
        let mut stage = Stage::default();
        stage.add_deps(["a.py", "b.py"]);
        stage.add_deps(["b.py", "c.py"]);
        assert_eq!(stage.deps, vec!["a.py", "b.py", "c.py"]);
    }

    #[test]
    fn test_copied_dependencies_excludes_data_and_outputs() {
        let source = r#"
stages:
  prep:
    cmd: papermill ./prep.ipynb ../outputs/prep.ipynb -k venv
    deps:
      - prep.ipynb
      - ../data/raw.csv
      - helpers/util.py
    outs:
      - ../outputs/clean.csv
    wdir: notebooks
  train:
    deps:
      - train.ipynb
      - ../outputs/clean.csv
      - ../shared/lib.py
      - helpers/util.py
    wdir: notebooks
"#;
        let manifest = StageManifest::from_yaml(source).unwrap();
        let deps: Vec<String> = manifest.copied_dependencies().into_iter().collect();
        assert_eq!(
            deps,
            vec![
                "../shared/lib.py",
                "helpers/util.py",
                "prep.ipynb",
                "train.ipynb"
            ]
        );
    }
}
