//! Cloud command handlers
//!
//! Dispatching pipelines to GitHub Actions, checking their latest run and
//! storing the token used to do so.

use anyhow::{Context, Result};
use colored::*;
use mlp_client::{CloudRun, GithubClient, latest_run, run_cloud as dispatch_run};
use mlp_core::dto::github::{RepoSlug, WorkflowRun};
use mlp_engine::service::pipeline_service::{self as pipelines, Target};
use mlp_engine::{CommandRunner, SystemRunner};

use crate::config::{self, Config};

/// Dispatch a pipeline to GitHub Actions
pub async fn run_cloud(
    config: &Config,
    pipeline: Option<&str>,
    instance_type: String,
    size: u32,
    branch: Option<String>,
) -> Result<()> {
    let Some(pipeline) = cloud_pipeline(config, pipeline)? else {
        return Ok(());
    };
    let Some(client) = client(config)? else {
        return Ok(());
    };
    let slug = repo_slug(config)?;

    println!("Running pipeline {} ...", pipeline.bold());
    let run = CloudRun {
        pipeline,
        instance_type,
        target_size: size,
        branch,
    };
    match dispatch_run(&client, &slug, &run).await {
        Ok(request) => {
            println!(
                "{}",
                format!("✓ Pipeline {} dispatched to {}", run.pipeline, slug).green().bold()
            );
            println!("  Workflow: {}", request.workflow_file().cyan());
            println!("  Branch:   {}", request.git_ref);
            println!("  Instance: {}", request.inputs.instance_type);
            println!("  Size:     {} GiB", request.inputs.target_size);
        }
        Err(e) => {
            println!(
                "{}",
                format!("✗ Error running pipeline {} on the cloud", run.pipeline).red().bold()
            );
            return Err(e).context("Workflow dispatch failed");
        }
    }
    Ok(())
}

/// Show the most recent cloud run of a pipeline
pub async fn cloud_status(config: &Config, pipeline: Option<&str>) -> Result<()> {
    let Some(pipeline) = cloud_pipeline(config, pipeline)? else {
        return Ok(());
    };
    let Some(client) = client(config)? else {
        return Ok(());
    };
    let slug = repo_slug(config)?;

    match latest_run(&client, &slug, &pipeline)
        .await
        .context("Failed to list workflow runs")?
    {
        Some(run) => print_run_table(&run),
        None => println!("{}", "No runs found".yellow()),
    }
    Ok(())
}

/// Replace `.env` with the given token
pub fn set_token(config: &Config, token: &str) -> Result<()> {
    config::write_token(&config.env_file(), token)?;
    println!("{}", "✓ GitHub token saved to .env".green().bold());
    Ok(())
}

/// Pipeline to use in the cloud, falling back to the default
fn cloud_pipeline(config: &Config, pipeline: Option<&str>) -> Result<Option<String>> {
    match pipelines::resolve(&config.layout(), pipeline).context("Failed to read pipelines")? {
        Target::Pipeline(name) => Ok(Some(name)),
        Target::Main => {
            println!(
                "{}",
                "The main project cannot run in the cloud, create a pipeline for it".yellow()
            );
            Ok(None)
        }
        Target::NoDefault => {
            println!(
                "{}",
                "Please specify a pipeline name or set a default pipeline using the default command"
                    .yellow()
            );
            Ok(None)
        }
    }
}

fn client(config: &Config) -> Result<Option<GithubClient>> {
    let Some(token) = config.github_token()? else {
        println!(
            "{}",
            "Please set the GITHUB_TOKEN environment variable or run `mlp set_token -t <TOKEN>`"
                .yellow()
        );
        return Ok(None);
    };
    let client = GithubClient::new(&config.github_api_url, &token)
        .context("Failed to create GitHub client")?;
    Ok(Some(client))
}

/// `owner/repo` of the project's `origin` remote
fn repo_slug(config: &Config) -> Result<RepoSlug> {
    let url = SystemRunner
        .output("git", &["config", "--get", "remote.origin.url"], &config.project_dir)
        .context("Failed to read the origin remote")?;
    RepoSlug::from_remote_url(&url)
        .with_context(|| format!("Cannot derive owner/repo from remote url '{}'", url))
}

fn print_run_table(run: &WorkflowRun) {
    let row = [
        run.id.to_string(),
        run.head_branch.clone().unwrap_or_default(),
        run.actor.as_ref().map(|a| a.login.clone()).unwrap_or_default(),
        run.status.clone().unwrap_or_default(),
        run.conclusion.clone().unwrap_or_default(),
    ];
    let headers = ["Id", "Head_branch", "Actor", "Status", "Conclusion"];
    let widths: Vec<usize> = headers
        .iter()
        .zip(&row)
        .map(|(h, v)| h.len().max(v.chars().count()))
        .collect();

    let format_row = |cells: &[&str]| {
        cells
            .iter()
            .zip(&widths)
            .map(|(cell, width)| format!(" {:<width$} ", cell, width = *width))
            .collect::<Vec<_>>()
            .join("|")
    };

    println!("{}", format_row(&headers[..]).bold());
    println!(
        "{}",
        widths
            .iter()
            .map(|w| "-".repeat(w + 2))
            .collect::<Vec<_>>()
            .join("+")
            .dimmed()
    );
    let cells: Vec<&str> = row.iter().map(String::as_str).collect();
    println!("{}", format_row(&cells[..]));
    if let Some(url) = &run.html_url {
        println!("  {}", url.dimmed());
    }
}
