//! Commands module
//!
//! Defines all CLI commands and their handlers.

mod cloud;
mod pipeline;
mod project;

use anyhow::Result;
use clap::Subcommand;

use crate::config::Config;

/// Top-level CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Initialize the project repository with the required folders and files
    Init,

    /// Create a pipeline
    Create {
        /// Name of the pipeline
        #[arg(short, long)]
        pipeline: String,

        /// List of notebooks in the pipeline, e.g. "[notebooks/a.ipynb, notebooks/b.ipynb]"
        #[arg(short, long)]
        notebooks: Option<String>,
    },

    /// Link notebooks to a pipeline
    Link {
        /// Name of the pipeline
        #[arg(short, long)]
        pipeline: String,

        /// List of notebooks in the pipeline
        #[arg(short, long)]
        notebooks: String,
    },

    /// Sync the notebooks with a pipeline or the main project
    Sync {
        /// List of notebooks to sync on the main project
        #[arg(short, long)]
        notebooks: Option<String>,

        /// Name of the pipeline
        #[arg(short, long)]
        pipeline: Option<String>,

        /// Forces creation of a new params.yaml file
        #[arg(short, long)]
        force: bool,

        /// Sync all the pipelines
        #[arg(short, long)]
        all: bool,
    },

    /// Delete a pipeline or all the pipelines
    Delete {
        /// Name of the pipeline
        #[arg(short, long)]
        pipeline: Option<String>,

        /// Remove all pipelines
        #[arg(short, long)]
        all: bool,
    },

    /// List the pipelines
    List,

    /// Set the pipeline used when none is specified
    #[command(name = "default")]
    SetDefault {
        /// Name of the pipeline
        #[arg(short, long)]
        pipeline: String,
    },

    /// Show the pipeline graph
    Show {
        /// Name of the pipeline
        #[arg(short, long)]
        pipeline: Option<String>,
    },

    /// Run a pipeline locally, or the main project with `-p main`
    #[command(name = "run_local")]
    RunLocal {
        /// Name of the pipeline
        #[arg(short, long)]
        pipeline: Option<String>,
    },

    /// Run a pipeline on GitHub Actions
    #[command(name = "run_cloud")]
    RunCloud {
        /// Name of the pipeline
        #[arg(short, long)]
        pipeline: Option<String>,

        /// EC2 instance type, or a list like "['t2.micro', 'm5.large']"
        #[arg(short, long = "instance_type", default_value = mlp_core::dto::github::DEFAULT_INSTANCE_TYPE)]
        instance_type: String,

        /// EBS volume size in GiB
        #[arg(short, long, default_value_t = mlp_core::dto::github::DEFAULT_TARGET_SIZE)]
        size: u32,

        /// Branch name, defaults to the repository's default branch
        #[arg(short, long)]
        branch: Option<String>,
    },

    /// Show the latest cloud run of a pipeline
    #[command(name = "cloud_status")]
    CloudStatus {
        /// Name of the pipeline
        #[arg(short, long)]
        pipeline: Option<String>,
    },

    /// Store a GitHub personal access token in .env
    #[command(name = "set_token")]
    SetToken {
        /// GitHub personal access token
        #[arg(short, long)]
        token: String,
    },

    /// Sync, commit and push a pipeline or the whole project
    Publish {
        /// Name of the pipeline
        #[arg(short, long)]
        pipeline: Option<String>,

        /// Commit message
        #[arg(short, long)]
        message: String,
    },

    /// Upload a folder of outputs to S3
    Upload {
        /// S3 bucket name
        #[arg(short, long)]
        bucket: String,

        /// Folder inside the bucket
        #[arg(short, long, default_value = "")]
        folder: String,

        /// Local folder to upload
        #[arg(short = 'd', long = "path", default_value = "outputs")]
        path: String,

        /// Instance type prefixed to the upload folder
        #[arg(long, env = "EC2_INSTANCE_TYPE")]
        instance_type: Option<String>,

        /// Experiment id prefixed to the upload folder
        #[arg(long, env = "EXPERIMENT_ID")]
        experiment_id: Option<String>,
    },
}

/// Handle a CLI command
///
/// Routes the command to the appropriate handler module.
pub async fn handle_command(command: Commands, config: &Config) -> Result<()> {
    match command {
        Commands::Init => project::init(config),
        Commands::Create {
            pipeline,
            notebooks,
        } => pipeline::create(config, &pipeline, notebooks.as_deref()),
        Commands::Link {
            pipeline,
            notebooks,
        } => pipeline::link(config, &pipeline, &notebooks),
        Commands::Sync {
            notebooks,
            pipeline,
            force,
            all,
        } => project::sync(config, notebooks, pipeline, force, all),
        Commands::Delete { pipeline, all } => pipeline::delete(config, pipeline.as_deref(), all),
        Commands::List => pipeline::list(config),
        Commands::SetDefault { pipeline } => pipeline::set_default(config, &pipeline),
        Commands::Show { pipeline } => project::show(config, pipeline.as_deref()),
        Commands::RunLocal { pipeline } => project::run_local(config, pipeline.as_deref()),
        Commands::RunCloud {
            pipeline,
            instance_type,
            size,
            branch,
        } => cloud::run_cloud(config, pipeline.as_deref(), instance_type, size, branch).await,
        Commands::CloudStatus { pipeline } => cloud::cloud_status(config, pipeline.as_deref()).await,
        Commands::SetToken { token } => cloud::set_token(config, &token),
        Commands::Publish { pipeline, message } => {
            project::publish(config, pipeline.as_deref(), &message)
        }
        Commands::Upload {
            bucket,
            folder,
            path,
            instance_type,
            experiment_id,
        } => project::upload(config, bucket, folder, &path, instance_type, experiment_id),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct TestCli {
        #[command(subcommand)]
        command: Commands,
    }

    fn parse(args: &[&str]) -> Commands {
        TestCli::try_parse_from(std::iter::once("mlp").chain(args.iter().copied()))
            .unwrap()
            .command
    }

    #[test]
    fn test_underscore_command_names() {
        assert!(matches!(parse(&["run_local", "-p", "main"]), Commands::RunLocal { pipeline: Some(p) } if p == "main"));
        assert!(matches!(parse(&["set_token", "-t", "abc"]), Commands::SetToken { .. }));
        assert!(matches!(parse(&["cloud_status"]), Commands::CloudStatus { pipeline: None }));
    }

    #[test]
    fn test_run_cloud_defaults() {
        let Commands::RunCloud {
            instance_type,
            size,
            branch,
            ..
        } = parse(&["run_cloud", "-p", "train"])
        else {
            panic!("expected run_cloud");
        };
        assert_eq!(instance_type, "['t2.micro']");
        assert_eq!(size, 30);
        assert_eq!(branch, None);
    }

    #[test]
    fn test_sync_flags() {
        let Commands::Sync {
            notebooks,
            force,
            all,
            ..
        } = parse(&["sync", "-n", "[notebooks/a.ipynb]", "-f", "-a"])
        else {
            panic!("expected sync");
        };
        assert_eq!(notebooks.as_deref(), Some("[notebooks/a.ipynb]"));
        assert!(force);
        assert!(all);
    }

    #[test]
    fn test_link_requires_notebooks() {
        assert!(TestCli::try_parse_from(["mlp", "link", "-p", "x"]).is_err());
    }

    #[test]
    fn test_upload_arguments() {
        let Commands::Upload {
            bucket,
            folder,
            path,
            ..
        } = parse(&["upload", "-b", "my-bucket", "-f", "runs"])
        else {
            panic!("expected upload");
        };
        assert_eq!(bucket, "my-bucket");
        assert_eq!(folder, "runs");
        assert_eq!(path, "outputs");
    }
}
