//! Project command handlers
//!
//! Commands that regenerate, run or ship the project: init, sync, show,
//! run_local, publish and upload.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::Utc;
use colored::*;
use mlp_engine::SystemRunner;
use mlp_engine::service::project_service::{self as project, PublishOutcome, RunOutcome};
use mlp_engine::service::sync_service::{self, PipelineSync, SyncOutcome, SyncRequest};
use mlp_engine::service::upload_service::{self, UploadTarget};

use crate::config::Config;

/// Scaffold the project folders
pub fn init(config: &Config) -> Result<()> {
    let report = project::init(&config.layout(), &SystemRunner).context("Failed to initialize project")?;

    if report.dvc_initialized {
        println!("  {}", "dvc initialized".dimmed());
    }
    for created in &report.created {
        println!("  Created {}", created.dimmed());
    }
    println!("{}", "✓ Project initialized".green().bold());
    Ok(())
}

/// Regenerate manifests and workflows from notebooks
pub fn sync(
    config: &Config,
    notebooks: Option<String>,
    pipeline: Option<String>,
    force: bool,
    all: bool,
) -> Result<()> {
    let request = SyncRequest {
        notebooks,
        pipeline,
        force,
        all,
    };
    let outcome = sync_service::sync(&config.layout(), &SystemRunner, &request).context("Sync failed")?;

    match outcome {
        SyncOutcome::Pipeline(result) => print_pipeline_sync(&result),
        SyncOutcome::All(results) => results.iter().for_each(print_pipeline_sync),
        SyncOutcome::Main { notebooks } => {
            println!(
                "{}",
                format!("✓ Main project synced with {}", notebooks.join(", ")).green().bold()
            );
        }
        SyncOutcome::NothingToSync => println!(
            "{}",
            "Please specify a pipeline name to sync or a list of notebooks".yellow()
        ),
    }
    Ok(())
}

fn print_pipeline_sync(result: &PipelineSync) {
    match result {
        PipelineSync::Synced { pipeline, notebooks } => {
            println!("{}", format!("✓ Pipeline {} synced", pipeline).green().bold());
            println!("  Notebooks: {}", notebooks.join(", ").dimmed());
        }
        PipelineSync::NotFound(name) => {
            println!("{}", format!("Pipeline {} not found", name).yellow())
        }
        PipelineSync::NoNotebooks(name) => println!(
            "{}",
            format!("No notebooks found for pipeline {}", name).yellow()
        ),
        PipelineSync::NoPipelines => println!("{}", "No pipelines found".yellow()),
    }
}

/// Print the dvc stage graph
pub fn show(config: &Config, pipeline: Option<&str>) -> Result<()> {
    let graph = project::show(&config.layout(), &SystemRunner, pipeline).context("Failed to show pipeline")?;
    println!("{}", graph);
    Ok(())
}

/// Reproduce the main project or a pipeline locally
pub fn run_local(config: &Config, pipeline: Option<&str>) -> Result<()> {
    let outcome = project::run_local(&config.layout(), &SystemRunner, pipeline).context("Local run failed")?;

    match outcome {
        RunOutcome::Ran(name) => {
            println!("{}", format!("✓ Pipeline {} ran", name).green().bold())
        }
        RunOutcome::NotSynced(result) => print_pipeline_sync(&result),
        RunOutcome::NoDefault => println!(
            "{}",
            "Please specify a pipeline name to run, set a default pipeline using the default command or use -p main to run the main project"
                .yellow()
        ),
    }
    Ok(())
}

/// Commit and push a pipeline or the whole project
pub fn publish(config: &Config, pipeline: Option<&str>, message: &str) -> Result<()> {
    let outcome =
        project::publish(&config.layout(), &SystemRunner, pipeline, message).context("Publish failed")?;

    match outcome {
        PublishOutcome::Published { commit_message, .. } => {
            println!("{}", "✓ Changes pushed".green().bold());
            println!("  Commit: {}", commit_message.cyan());
        }
        PublishOutcome::NotSynced(result) => print_pipeline_sync(&result),
    }
    Ok(())
}

/// Upload a folder to S3
pub fn upload(
    config: &Config,
    bucket: String,
    folder: String,
    path: &str,
    instance_type: Option<String>,
    experiment_id: Option<String>,
) -> Result<()> {
    let target = UploadTarget {
        bucket,
        folder,
        instance_type,
        experiment_id,
    };
    let local = Path::new(path);
    let local = if local.is_absolute() {
        local.to_path_buf()
    } else {
        config.project_dir.join(local)
    };

    println!("Uploading outputs to s3...");
    let report = upload_service::upload_folder(&SystemRunner, &target, &local, Utc::now())
        .with_context(|| format!("Failed to upload {}", local.display()))?;

    println!(
        "{}",
        format!(
            "✓ {} file(s) uploaded to s3://{}/{}",
            report.uploaded.len(),
            target.bucket,
            report.prefix
        )
        .green()
        .bold()
    );
    if !report.failed.is_empty() {
        println!(
            "{}",
            format!("✗ {} file(s) failed: {}", report.failed.len(), report.failed.join(", ")).red()
        );
    }
    Ok(())
}
