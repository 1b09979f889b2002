//! MLP GitHub Client
//!
//! A small, type-safe client for the parts of the GitHub REST API the `mlp`
//! CLI needs: dispatching the generated workflows, reading the repository's
//! default branch and listing workflow runs.
//!
//! # Example
//!
//! ```no_run
//! use mlp_client::GithubClient;
//! use mlp_core::dto::github::{DispatchRequest, RepoSlug};
//!
//! #[tokio::main]
//! async fn main() -> mlp_client::Result<()> {
//!     let client = GithubClient::new("https://api.github.com", "ghp_token")?;
//!     let slug = RepoSlug::from_remote_url("git@github.com:acme/ml.git").unwrap();
//!
//!     let branch = client.get_repository(&slug).await?.default_branch;
//!     let request = DispatchRequest::new("training", "t2.micro", 30, &branch);
//!     client.dispatch_workflow(&slug, request.workflow_file(), &request).await?;
//!     Ok(())
//! }
//! ```

mod dispatcher;
pub mod error;
mod repos;
mod workflows;

// Re-export commonly used types
pub use dispatcher::{CloudRun, WorkflowDispatcher, latest_run, run_cloud};
pub use error::{ClientError, Result};

use reqwest::Client;
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue, USER_AGENT};
use serde::de::DeserializeOwned;

/// Public GitHub API
pub const DEFAULT_API_URL: &str = "https://api.github.com";

const ACCEPT_GITHUB_JSON: &str = "application/vnd.github+json";
const API_VERSION_HEADER: &str = "X-GitHub-Api-Version";
const API_VERSION: &str = "2022-11-28";

/// HTTP client for the GitHub Actions API
#[derive(Debug, Clone)]
pub struct GithubClient {
    /// Base URL of the API (e.g., "https://api.github.com")
    base_url: String,
    /// HTTP client carrying the auth headers
    client: Client,
}

impl GithubClient {
    /// Create a client authenticated with a personal access token
    ///
    /// # Arguments
    /// * `base_url` - The base URL of the GitHub API
    /// * `token` - Token sent as `Authorization: Bearer <token>`
    pub fn new(base_url: impl Into<String>, token: &str) -> Result<Self> {
        if token.trim().is_empty() {
            return Err(ClientError::MissingToken);
        }

        let mut headers = HeaderMap::new();
        let auth = HeaderValue::from_str(&format!("Bearer {}", token.trim()))
            .map_err(|e| ClientError::InvalidRequest(format!("invalid token: {}", e)))?;
        headers.insert(AUTHORIZATION, auth);
        headers.insert(ACCEPT, HeaderValue::from_static(ACCEPT_GITHUB_JSON));
        headers.insert(API_VERSION_HEADER, HeaderValue::from_static(API_VERSION));
        headers.insert(
            USER_AGENT,
            HeaderValue::from_static(concat!("mlp/", env!("CARGO_PKG_VERSION"))),
        );

        let client = Client::builder().default_headers(headers).build()?;
        Ok(Self::with_client(base_url, client))
    }

    /// Create a client around a preconfigured reqwest Client
    ///
    /// The caller is responsible for the auth headers.
    pub fn with_client(base_url: impl Into<String>, client: Client) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        }
    }

    /// Get the base URL of the API
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    // =============================================================================
    // Response Handlers
    // =============================================================================

    /// Check the status code and deserialize the JSON body
    async fn handle_response<T: DeserializeOwned>(&self, response: reqwest::Response) -> Result<T> {
        let status = response.status();

        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ClientError::api_error(status.as_u16(), error_text));
        }

        response
            .json()
            .await
            .map_err(|e| ClientError::ParseError(format!("Failed to parse JSON response: {}", e)))
    }

    /// Check that the response carries exactly the expected status
    async fn expect_status(&self, response: reqwest::Response, expected: u16) -> Result<()> {
        let status = response.status();

        if status.as_u16() != expected {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ClientError::api_error(status.as_u16(), error_text));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let client = GithubClient::new(DEFAULT_API_URL, "token").unwrap();
        assert_eq!(client.base_url(), "https://api.github.com");
    }

    #[test]
    fn test_client_trims_trailing_slash() {
        let client = GithubClient::new("https://github.example.com/api/v3/", "token").unwrap();
        assert_eq!(client.base_url(), "https://github.example.com/api/v3");
    }

    #[test]
    fn test_client_requires_token() {
        assert!(matches!(
            GithubClient::new(DEFAULT_API_URL, "  "),
            Err(ClientError::MissingToken)
        ));
    }

    #[test]
    fn test_client_rejects_unprintable_token() {
        assert!(matches!(
            GithubClient::new(DEFAULT_API_URL, "abc\ndef"),
            Err(ClientError::InvalidRequest(_))
        ));
    }

    #[test]
    fn test_client_with_custom_client() {
        let client = GithubClient::with_client("http://localhost:8080", Client::new());
        assert_eq!(client.base_url(), "http://localhost:8080");
    }
}
