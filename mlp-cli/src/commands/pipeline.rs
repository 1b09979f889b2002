//! Pipeline command handlers
//!
//! Registry commands: create, link, delete, list and default.

use anyhow::{Context, Result};
use colored::*;
use mlp_engine::service::pipeline_service::{
    self as pipelines, CreateOutcome, DefaultOutcome, DeleteAllOutcome, DeleteOutcome,
    LinkOutcome,
};

use crate::config::Config;

/// Create a pipeline and optionally link notebooks to it
pub fn create(config: &Config, name: &str, notebooks: Option<&str>) -> Result<()> {
    let outcome = pipelines::create(&config.layout(), name, notebooks)
        .with_context(|| format!("Failed to create pipeline {}", name))?;

    match outcome {
        CreateOutcome::Created { name, linked } => {
            println!("{}", format!("✓ Pipeline {} created", name).green().bold());
            if let Some(linked) = linked {
                println!("  Notebooks {} linked to pipeline {}", linked.to_string().cyan(), name);
            }
        }
        CreateOutcome::AlreadyExists(name) => {
            println!("{}", format!("Pipeline {} already exists", name).yellow());
        }
        CreateOutcome::InvalidName(message) => {
            println!("{}", message.yellow());
        }
    }
    Ok(())
}

/// Replace the notebooks of a pipeline
pub fn link(config: &Config, name: &str, notebooks: &str) -> Result<()> {
    let outcome = pipelines::link(&config.layout(), name, notebooks)
        .with_context(|| format!("Failed to link notebooks to pipeline {}", name))?;

    match outcome {
        LinkOutcome::Linked { name, notebooks } => println!(
            "{}",
            format!("✓ Notebooks {} linked to pipeline {}", notebooks, name).green()
        ),
        LinkOutcome::NotFound(name) => {
            println!("{}", format!("Pipeline {} not found", name).yellow())
        }
        LinkOutcome::NoPipelines => println!("{}", "No pipelines found".yellow()),
    }
    Ok(())
}

/// Delete one pipeline or all of them
pub fn delete(config: &Config, name: Option<&str>, all: bool) -> Result<()> {
    let layout = config.layout();

    if all {
        match pipelines::delete_all(&layout).context("Failed to delete pipelines")? {
            DeleteAllOutcome::Deleted(names) => {
                for name in names {
                    println!("  Pipeline {} deleted", name);
                }
                println!("{}", "✓ All pipelines deleted".green().bold());
            }
            DeleteAllOutcome::NoPipelines => println!("{}", "No pipelines found".yellow()),
        }
        return Ok(());
    }

    let Some(name) = name else {
        println!(
            "{}",
            "Please specify a pipeline name using -p or use the --all or -a flag to delete all pipelines"
                .yellow()
        );
        return Ok(());
    };

    match pipelines::delete(&layout, name)
        .with_context(|| format!("Failed to delete pipeline {}", name))?
    {
        DeleteOutcome::Deleted { name, was_default } => {
            println!("{}", format!("✓ Pipeline {} deleted", name).green().bold());
            if was_default {
                println!("  {}", "Default pipeline removed".dimmed());
            }
        }
        DeleteOutcome::NotFound(name) => {
            println!("{}", format!("Pipeline {} not found", name).yellow())
        }
        DeleteOutcome::InvalidName(message) => println!("{}", message.yellow()),
    }
    Ok(())
}

/// List the registered pipelines
pub fn list(config: &Config) -> Result<()> {
    let Some(summaries) = pipelines::list(&config.layout()).context("Failed to read pipelines")?
    else {
        println!("{}", "No pipelines found".yellow());
        return Ok(());
    };

    for summary in summaries {
        let marker = if summary.is_default {
            "[Default] ".green().bold().to_string()
        } else {
            String::new()
        };
        println!(
            "{}Pipeline: {}, notebooks: {}",
            marker,
            summary.name.bold(),
            summary.notebooks.dimmed()
        );
    }
    Ok(())
}

/// Select the default pipeline
pub fn set_default(config: &Config, name: &str) -> Result<()> {
    match pipelines::set_default(&config.layout(), name)
        .with_context(|| format!("Failed to set default pipeline {}", name))?
    {
        DefaultOutcome::Set(name) => {
            println!("{}", format!("✓ Pipeline {} set as default", name).green())
        }
        DefaultOutcome::NotFound(name) => {
            println!("{}", format!("Pipeline {} does not exist", name).yellow())
        }
    }
    Ok(())
}
