//! Repository endpoints

use crate::GithubClient;
use crate::error::Result;
use mlp_core::dto::github::{RepoSlug, RepositoryInfo};
use tracing::debug;

impl GithubClient {
    /// Get repository metadata, including its default branch
    ///
    /// # Arguments
    /// * `slug` - The `owner/repo` identifier
    pub async fn get_repository(&self, slug: &RepoSlug) -> Result<RepositoryInfo> {
        let url = format!("{}/repos/{}", self.base_url, slug);
        debug!("GET {}", url);
        let response = self.client.get(&url).send().await?;

        self.handle_response(response).await
    }
}
