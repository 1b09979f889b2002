//! GitHub Actions endpoints

use crate::GithubClient;
use crate::error::Result;
use mlp_core::dto::github::{DispatchRequest, RepoSlug, WorkflowRuns};
use tracing::{debug, info};

/// Status GitHub answers an accepted dispatch with
const DISPATCH_ACCEPTED: u16 = 204;

impl GithubClient {
    // =============================================================================
    // Workflows
    // =============================================================================

    /// Trigger a `workflow_dispatch` event
    ///
    /// # Arguments
    /// * `slug` - The `owner/repo` identifier
    /// * `workflow_file` - File name under `.github/workflows/`
    /// * `request` - Branch and inputs of the run
    pub async fn dispatch_workflow(
        &self,
        slug: &RepoSlug,
        workflow_file: &str,
        request: &DispatchRequest,
    ) -> Result<()> {
        let url = format!(
            "{}/repos/{}/actions/workflows/{}/dispatches",
            self.base_url, slug, workflow_file
        );
        debug!("POST {}", url);
        let response = self.client.post(&url).json(request).send().await?;

        self.expect_status(response, DISPATCH_ACCEPTED).await?;
        info!(
            "Dispatched {} for pipeline {} on {}",
            workflow_file, request.inputs.pipeline, request.git_ref
        );
        Ok(())
    }

    /// List the repository's workflow runs, newest first
    ///
    /// # Arguments
    /// * `slug` - The `owner/repo` identifier
    pub async fn list_runs(&self, slug: &RepoSlug) -> Result<WorkflowRuns> {
        let url = format!("{}/repos/{}/actions/runs", self.base_url, slug);
        debug!("GET {}", url);
        let response = self.client.get(&url).send().await?;

        self.handle_response(response).await
    }
}
