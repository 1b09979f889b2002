//! Filesystem helpers that attach the offending path to I/O errors

use std::fs;
use std::path::Path;

use tracing::debug;
use walkdir::WalkDir;

use crate::error::{EngineError, Result};

pub fn read_to_string(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|e| EngineError::io(path, e))
}

/// Writes a file, creating parent directories first
pub fn write(path: &Path, contents: impl AsRef<[u8]>) -> Result<()> {
    if let Some(parent) = path.parent() {
        create_dir_all(parent)?;
    }
    fs::write(path, contents).map_err(|e| EngineError::io(path, e))
}

pub fn create_dir_all(path: &Path) -> Result<()> {
    fs::create_dir_all(path).map_err(|e| EngineError::io(path, e))
}

pub fn remove_file_if_exists(path: &Path) -> Result<bool> {
    if !path.is_file() {
        return Ok(false);
    }
    fs::remove_file(path).map_err(|e| EngineError::io(path, e))?;
    Ok(true)
}

pub fn remove_dir_if_exists(path: &Path) -> Result<bool> {
    if !path.is_dir() {
        return Ok(false);
    }
    fs::remove_dir_all(path).map_err(|e| EngineError::io(path, e))?;
    Ok(true)
}

/// Copies one file, creating the destination's parent directories
pub fn copy_file(src: &Path, dst: &Path) -> Result<()> {
    if let Some(parent) = dst.parent() {
        create_dir_all(parent)?;
    }
    fs::copy(src, dst).map_err(|e| EngineError::io(src, e))?;
    debug!("Copied {} -> {}", src.display(), dst.display());
    Ok(())
}

/// Mirrors a directory tree onto `dst`, overwriting files already there
pub fn copy_dir(src: &Path, dst: &Path) -> Result<()> {
    create_dir_all(dst)?;
    for entry in WalkDir::new(src).follow_links(false) {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(src).to_path_buf();
            EngineError::io(&path, e.into())
        })?;
        let path = entry.path();
        let Ok(rel) = path.strip_prefix(src) else {
            continue;
        };
        if rel.as_os_str().is_empty() {
            continue;
        }
        let target = dst.join(rel);
        if entry.file_type().is_dir() {
            create_dir_all(&target)?;
        } else if entry.file_type().is_file() {
            copy_file(path, &target)?;
        }
    }
    Ok(())
}

/// Replaces `dst` with a fresh copy of the `src` tree
pub fn replace_dir(src: &Path, dst: &Path) -> Result<()> {
    remove_dir_if_exists(dst)?;
    copy_dir(src, dst)
}
