//! Cloud runs
//!
//! Starting a pipeline in the cloud and looking up its runs, written against
//! the [`WorkflowDispatcher`] trait so the flow can be exercised without
//! network access.

use async_trait::async_trait;
use mlp_core::dto::github::{
    DEFAULT_INSTANCE_TYPE, DEFAULT_TARGET_SIZE, DispatchRequest, RepoSlug, WorkflowRun,
    WorkflowRuns,
};
use tracing::info;

use crate::GithubClient;
use crate::error::Result;

/// CI provider operations used by `run_cloud` and `cloud_status`
#[async_trait]
pub trait WorkflowDispatcher: Send + Sync {
    /// Default branch of the repository
    async fn default_branch(&self, slug: &RepoSlug) -> Result<String>;

    /// Triggers a workflow file with the given request
    async fn dispatch(&self, slug: &RepoSlug, workflow_file: &str, request: &DispatchRequest) -> Result<()>;

    /// Recent workflow runs of the repository
    async fn runs(&self, slug: &RepoSlug) -> Result<WorkflowRuns>;
}

#[async_trait]
impl WorkflowDispatcher for GithubClient {
    async fn default_branch(&self, slug: &RepoSlug) -> Result<String> {
        Ok(self.get_repository(slug).await?.default_branch)
    }

    async fn dispatch(&self, slug: &RepoSlug, workflow_file: &str, request: &DispatchRequest) -> Result<()> {
        self.dispatch_workflow(slug, workflow_file, request).await
    }

    async fn runs(&self, slug: &RepoSlug) -> Result<WorkflowRuns> {
        self.list_runs(slug).await
    }
}

/// Parameters of a cloud run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloudRun {
    pub pipeline: String,
    /// One type, or a bracketed list fanned out by the matrix workflow
    pub instance_type: String,
    /// EBS volume size in GiB
    pub target_size: u32,
    /// Branch to run on; the repository's default branch when `None`
    pub branch: Option<String>,
}

impl CloudRun {
    pub fn new(pipeline: impl Into<String>) -> Self {
        Self {
            pipeline: pipeline.into(),
            instance_type: DEFAULT_INSTANCE_TYPE.to_string(),
            target_size: DEFAULT_TARGET_SIZE,
            branch: None,
        }
    }
}

/// Dispatches the matrix or single-instance workflow for a pipeline
///
/// Returns the request that was sent.
pub async fn run_cloud(
    dispatcher: &dyn WorkflowDispatcher,
    slug: &RepoSlug,
    run: &CloudRun,
) -> Result<DispatchRequest> {
    let branch = match &run.branch {
        Some(branch) => branch.clone(),
        None => dispatcher.default_branch(slug).await?,
    };

    let request = DispatchRequest::new(&run.pipeline, &run.instance_type, run.target_size, &branch);
    let workflow_file = request.workflow_file();
    info!(
        "Running pipeline {} on {} with {} ({})",
        run.pipeline, branch, run.instance_type, workflow_file
    );

    dispatcher.dispatch(slug, workflow_file, &request).await?;
    Ok(request)
}

/// Most recent run of a pipeline, if any
pub async fn latest_run(
    dispatcher: &dyn WorkflowDispatcher,
    slug: &RepoSlug,
    pipeline: &str,
) -> Result<Option<WorkflowRun>> {
    let runs = dispatcher.runs(slug).await?;
    Ok(runs.for_pipeline(pipeline).first().map(|run| (*run).clone()))
}
