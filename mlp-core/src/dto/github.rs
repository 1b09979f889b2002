//! GitHub Actions DTOs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Workflow dispatched when several instance types are requested
pub const MATRIX_WORKFLOW: &str = "matrix.yaml";

/// Workflow dispatched for a single instance type
pub const SINGLE_INSTANCE_WORKFLOW: &str = "single-instance.yaml";

/// Default instance type selection for cloud runs
pub const DEFAULT_INSTANCE_TYPE: &str = "['t2.micro']";

/// Default EBS volume size (GiB) for cloud runs
pub const DEFAULT_TARGET_SIZE: u32 = 30;

/// Title given to workflow runs of a pipeline
pub fn run_display_title(pipeline: &str) -> String {
    format!("mlpipeline-{}", pipeline)
}

/// Body of `POST /repos/{owner}/{repo}/actions/workflows/{file}/dispatches`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchRequest {
    #[serde(rename = "ref")]
    pub git_ref: String,
    pub inputs: DispatchInputs,
}

/// `workflow_dispatch` inputs understood by the generated workflows
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchInputs {
    #[serde(rename = "EC2_INSTANCE_TYPE")]
    pub instance_type: String,
    #[serde(rename = "EC2_TARGET_SIZE")]
    pub target_size: String,
    #[serde(rename = "PIPELINE")]
    pub pipeline: String,
}

impl DispatchRequest {
    pub fn new(pipeline: &str, instance_type: &str, target_size: u32, git_ref: &str) -> Self {
        Self {
            git_ref: git_ref.to_string(),
            inputs: DispatchInputs {
                instance_type: instance_type.to_string(),
                target_size: target_size.to_string(),
                pipeline: pipeline.to_string(),
            },
        }
    }

    /// Workflow file this request targets, based on the instance selection
    pub fn workflow_file(&self) -> &'static str {
        InstanceSelection::parse(&self.inputs.instance_type).workflow_file()
    }
}

/// Requested instance types
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstanceSelection {
    /// Bracketed list, fanned out by the matrix workflow
    Matrix(Vec<String>),
    /// One instance type
    Single(String),
}

impl InstanceSelection {
    /// Parses `t2.micro` or `['t2.micro', 'm5.large']`
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        match trimmed
            .strip_prefix('[')
            .and_then(|inner| inner.strip_suffix(']'))
        {
            Some(inner) => Self::Matrix(
                inner
                    .split(',')
                    .map(|item| item.trim().trim_matches(|c: char| c == '\'' || c == '"').trim())
                    .filter(|item| !item.is_empty())
                    .map(str::to_string)
                    .collect(),
            ),
            None => Self::Single(trimmed.to_string()),
        }
    }

    pub fn workflow_file(&self) -> &'static str {
        match self {
            Self::Matrix(_) => MATRIX_WORKFLOW,
            Self::Single(_) => SINGLE_INSTANCE_WORKFLOW,
        }
    }
}

/// Subset of `GET /repos/{owner}/{repo}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepositoryInfo {
    pub default_branch: String,
    #[serde(default)]
    pub full_name: Option<String>,
}

/// Subset of `GET /repos/{owner}/{repo}/actions/runs`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkflowRuns {
    #[serde(default)]
    pub total_count: u64,
    #[serde(default)]
    pub workflow_runs: Vec<WorkflowRun>,
}

/// One workflow run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowRun {
    pub id: u64,
    #[serde(default)]
    pub display_title: String,
    #[serde(default)]
    pub head_branch: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub conclusion: Option<String>,
    #[serde(default)]
    pub actor: Option<Actor>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub html_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Actor {
    pub login: String,
}

impl WorkflowRuns {
    /// Runs of a pipeline, in the order the API returned them (newest first)
    pub fn for_pipeline(&self, pipeline: &str) -> Vec<&WorkflowRun> {
        let title = run_display_title(pipeline);
        self.workflow_runs
            .iter()
            .filter(|run| run.display_title == title)
            .collect()
    }
}

/// `owner/repo` identifier of a GitHub repository
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoSlug {
    pub owner: String,
    pub repo: String,
}

impl RepoSlug {
    /// Derives the slug from a git remote URL
    ///
    /// Accepts `https://github.com/owner/repo(.git)` and
    /// `git@github.com:owner/repo(.git)`.
    pub fn from_remote_url(url: &str) -> Option<Self> {
        let url = url.trim().trim_end_matches('/');
        let url = url.strip_suffix(".git").unwrap_or(url);

        let path = match url.split_once("://") {
            Some((_, rest)) => rest.split_once('/').map(|(_, path)| path)?,
            None => url.rsplit_once(':').map(|(_, path)| path)?,
        };

        let mut segments = path.rsplit('/');
        let repo = segments.next().filter(|s| !s.is_empty())?;
        let owner = segments.next().filter(|s| !s.is_empty())?;
        Some(Self {
            owner: owner.to_string(),
            repo: repo.to_string(),
        })
    }
}

impl fmt::Display for RepoSlug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.repo)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slug_from_https_url() {
        let slug = RepoSlug::from_remote_url("https://github.com/acme/ml-project.git\n").unwrap();
        assert_eq!(slug.to_string(), "acme/ml-project");
    }

    #[test]
    fn test_slug_from_scp_url() {
        let slug = RepoSlug::from_remote_url("git@github.com:acme/ml-project.git").unwrap();
        assert_eq!(slug.owner, "acme");
        assert_eq!(slug.repo, "ml-project");
    }

    #[test]
    fn test_slug_rejects_garbage() {
        assert!(RepoSlug::from_remote_url("").is_none());
        assert!(RepoSlug::from_remote_url("https://github.com/").is_none());
    }

    #[test]
    fn test_dispatch_payload_shape() {
        let req = DispatchRequest::new("training", DEFAULT_INSTANCE_TYPE, 30, "main");
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "ref": "main",
                "inputs": {
                    "EC2_INSTANCE_TYPE": "['t2.micro']",
                    "EC2_TARGET_SIZE": "30",
                    "PIPELINE": "training"
                }
            })
        );
        assert_eq!(req.workflow_file(), MATRIX_WORKFLOW);
    }

    #[test]
    fn test_instance_selection() {
        assert_eq!(
            InstanceSelection::parse("['t2.micro', \"m5.large\"]"),
            InstanceSelection::Matrix(vec!["t2.micro".to_string(), "m5.large".to_string()])
        );
        assert_eq!(
            InstanceSelection::parse("t2.micro"),
            InstanceSelection::Single("t2.micro".to_string())
        );
        assert_eq!(
            InstanceSelection::parse("g4dn.xlarge").workflow_file(),
            SINGLE_INSTANCE_WORKFLOW
        );
    }

    #[test]
    fn test_runs_filtered_by_title() {
        let runs: WorkflowRuns = serde_json::from_value(serde_json::json!({
            "total_count": 2,
            "workflow_runs": [
                {"id": 2, "display_title": "mlpipeline-other", "status": "queued"},
                {"id": 1, "display_title": "mlpipeline-train", "status": "completed",
                 "conclusion": "success", "actor": {"login": "octocat"},
                 "created_at": "2024-03-01T10:00:00Z"}
            ]
        }))
        .unwrap();

        let matching = runs.for_pipeline("train");
        assert_eq!(matching.len(), 1);
        assert_eq!(matching[0].id, 1);
        assert_eq!(matching[0].actor.as_ref().unwrap().login, "octocat");
    }
}
