//! Object storage upload
//!
//! Copies a folder of run outputs to S3 with the `aws` CLI, under a prefix
//! made unique by the instance type, the experiment id and a UTC timestamp.

use std::path::Path;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::error::{EngineError, Result};
use crate::tools::CommandRunner;

const TIMESTAMP_FORMAT: &str = "%a_%B_%d_%Y_%H-%M-%S_UTC";

/// Where an upload goes and how its prefix is built
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadTarget {
    pub bucket: String,
    /// Folder inside the bucket, may be empty
    pub folder: String,
    pub instance_type: Option<String>,
    pub experiment_id: Option<String>,
}

/// Files sent and files whose copy failed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadReport {
    pub prefix: String,
    pub uploaded: Vec<String>,
    pub failed: Vec<String>,
}

impl UploadTarget {
    /// Key prefix, e.g. `runs/t2.micro_42_Mon_March_04_2024_10-00-00_UTC/`
    pub fn prefix(&self, now: DateTime<Utc>) -> String {
        let mut name = String::new();
        for part in [&self.instance_type, &self.experiment_id].into_iter().flatten() {
            if !part.is_empty() {
                name.push_str(part);
                name.push('_');
            }
        }
        name.push_str(&now.format(TIMESTAMP_FORMAT).to_string());

        if self.folder.is_empty() {
            format!("{}/", name)
        } else {
            format!("{}/{}/", self.folder.trim_end_matches('/'), name)
        }
    }
}

/// Uploads every file under `folder` except names starting with `.git`
pub fn upload_folder(
    runner: &dyn CommandRunner,
    target: &UploadTarget,
    folder: &Path,
    now: DateTime<Utc>,
) -> Result<UploadReport> {
    if !folder.is_dir() {
        return Err(EngineError::NotFound(format!("Folder {}", folder.display())));
    }

    let prefix = target.prefix(now);
    let mut report = UploadReport {
        prefix: prefix.clone(),
        ..Default::default()
    };
    info!("Uploading {} to s3://{}/{}", folder.display(), target.bucket, prefix);

    let mut entries: Vec<_> = WalkDir::new(folder)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| !entry.file_name().to_string_lossy().starts_with(".git"))
        .map(|entry| entry.into_path())
        .collect();
    entries.sort();

    for path in entries {
        let relative = path.strip_prefix(folder).unwrap_or(&path);
        let key = relative.to_string_lossy().replace('\\', "/");
        let destination = format!("s3://{}/{}{}", target.bucket, prefix, key);
        let source = path.to_string_lossy();

        if runner.run("aws", &["s3", "cp", &source, &destination], folder) {
            debug!("Uploaded {}", key);
            report.uploaded.push(key);
        } else {
            warn!("Failed to upload {}", key);
            report.failed.push(key);
        }
    }

    info!("Uploaded {} file(s)", report.uploaded.len());
    Ok(report)
}
