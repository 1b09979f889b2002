//! Configuration module
//!
//! Handles CLI configuration: the project directory, the GitHub API URL and
//! the personal access token, which comes from the environment or from the
//! project's `.env` file.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use mlp_engine::ProjectLayout;

/// Environment variable (and `.env` key) holding the GitHub token
pub const TOKEN_KEY: &str = "GITHUB_TOKEN";

/// File the token is stored in, relative to the project directory
pub const ENV_FILE: &str = ".env";

/// CLI configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Root of the mlp project
    pub project_dir: PathBuf,

    /// Base URL of the GitHub REST API
    pub github_api_url: String,

    /// Token taken from the environment, if any
    pub github_token: Option<String>,
}

impl Config {
    /// Checks the API URL scheme and that the project directory exists
    pub fn validate(&self) -> Result<()> {
        if !self.github_api_url.starts_with("http://") && !self.github_api_url.starts_with("https://") {
            anyhow::bail!(
                "Invalid GitHub API URL '{}': expected http:// or https://",
                self.github_api_url
            );
        }
        if !self.project_dir.is_dir() {
            anyhow::bail!("Project directory {} does not exist", self.project_dir.display());
        }
        Ok(())
    }

    pub fn layout(&self) -> ProjectLayout {
        ProjectLayout::new(&self.project_dir)
    }

    pub fn env_file(&self) -> PathBuf {
        self.project_dir.join(ENV_FILE)
    }

    /// Token from the environment, else from the project's `.env` file
    pub fn github_token(&self) -> Result<Option<String>> {
        if let Some(token) = self.github_token.as_deref().filter(|t| !t.trim().is_empty()) {
            return Ok(Some(token.trim().to_string()));
        }

        let path = self.env_file();
        if !path.is_file() {
            return Ok(None);
        }
        let content =
            fs::read_to_string(&path).with_context(|| format!("Failed to read {}", path.display()))?;
        Ok(env_value(&content, TOKEN_KEY).filter(|t| !t.is_empty()))
    }
}

/// Looks up `key` in dotenv-style `KEY=VALUE` lines
///
/// Blank lines and `#` comments are skipped; the first `=` splits.
pub fn env_value(content: &str, key: &str) -> Option<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| line.split_once('='))
        .find(|(k, _)| k.trim() == key)
        .map(|(_, v)| v.trim().to_string())
}

/// Replaces the `.env` file with a single token line
pub fn write_token(env_file: &Path, token: &str) -> Result<()> {
    fs::write(env_file, format!("{}={}\n", TOKEN_KEY, token))
        .with_context(|| format!("Failed to write {}", env_file.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn config(dir: &Path, token: Option<&str>) -> Config {
        Config {
            project_dir: dir.to_path_buf(),
            github_api_url: "https://api.github.com".to_string(),
            github_token: token.map(str::to_string),
        }
    }

    #[test]
    fn test_env_value_parsing() {
        let content = "# comment\n\nOTHER=1\nGITHUB_TOKEN=ghp_abc=def\n";
        assert_eq!(env_value(content, "GITHUB_TOKEN").as_deref(), Some("ghp_abc=def"));
        assert_eq!(env_value(content, "OTHER").as_deref(), Some("1"));
        assert_eq!(env_value(content, "MISSING"), None);
        assert_eq!(env_value("not a pair\n", "not a pair"), None);
    }

    #[test]
    fn test_token_prefers_environment() {
        let dir = TempDir::new().unwrap();
        write_token(&dir.path().join(ENV_FILE), "from_file").unwrap();

        assert_eq!(
            config(dir.path(), Some("from_env")).github_token().unwrap().as_deref(),
            Some("from_env")
        );
        assert_eq!(
            config(dir.path(), None).github_token().unwrap().as_deref(),
            Some("from_file")
        );
        assert_eq!(
            config(dir.path(), Some("  ")).github_token().unwrap().as_deref(),
            Some("from_file")
        );
    }

    #[test]
    fn test_token_missing() {
        let dir = TempDir::new().unwrap();
        assert_eq!(config(dir.path(), None).github_token().unwrap(), None);
    }

    #[test]
    fn test_write_token_replaces_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(ENV_FILE);
        fs::write(&path, "GITHUB_TOKEN=old\nOTHER=1\n").unwrap();

        write_token(&path, "new").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "GITHUB_TOKEN=new\n");
    }

    #[test]
    fn test_validate() {
        let dir = TempDir::new().unwrap();
        assert!(config(dir.path(), None).validate().is_ok());

        let mut bad_url = config(dir.path(), None);
        bad_url.github_api_url = "api.github.com".to_string();
        assert!(bad_url.validate().is_err());

        let missing = config(&dir.path().join("nope"), None);
        assert!(missing.validate().is_err());
    }
}
