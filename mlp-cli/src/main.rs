//! mlp CLI
//!
//! Command-line interface for building dvc pipelines out of Jupyter
//! notebooks and running them locally or on GitHub Actions.

mod commands;
mod config;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, handle_command};
use config::Config;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "mlp")]
#[command(about = "ML pipelines from Jupyter notebooks", long_about = None)]
struct Cli {
    /// Root of the project
    #[arg(long, global = true, env = "MLP_PROJECT_DIR", default_value = ".")]
    project_dir: String,

    /// GitHub API URL
    #[arg(
        long,
        global = true,
        env = "MLP_GITHUB_API_URL",
        default_value = mlp_client::DEFAULT_API_URL
    )]
    github_api_url: String,

    /// GitHub personal access token, read from .env when unset
    #[arg(long, global = true, env = "GITHUB_TOKEN", hide_env_values = true)]
    github_token: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mlp=warn,mlp_engine=warn,mlp_client=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let config = Config {
        project_dir: cli.project_dir.into(),
        github_api_url: cli.github_api_url,
        github_token: cli.github_token,
    };
    config.validate()?;

    handle_command(cli.command, &config).await
}
