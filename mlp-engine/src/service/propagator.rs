//! File Propagator
//!
//! Packages a pipeline into `pipelines/<name>/` so it can be reproduced on
//! its own: requirements, data, stage dependencies, notebooks and dvc state
//! are mirrored from the root project. Each step overwrites what a previous
//! sync left behind.

use std::path::Path;

use mlp_core::domain::dependency::{DATA_DIR, Dependency};
use mlp_core::domain::stage::StageManifest;
use tracing::{debug, info, warn};

use crate::error::{EngineError, Result};
use crate::files;
use crate::layout::ProjectLayout;
use crate::tools::{CommandRunner, in_git_work_tree};

const PIPELINE_GITIGNORE: &str = include_str!("../../resources/pipeline.gitignore");

/// Copies the root project's files into one pipeline subfolder
pub struct PackageBuilder<'a> {
    root: &'a ProjectLayout,
    pipeline: ProjectLayout,
    runner: &'a dyn CommandRunner,
}

impl<'a> PackageBuilder<'a> {
    pub fn new(root: &'a ProjectLayout, name: &str, runner: &'a dyn CommandRunner) -> Self {
        Self {
            root,
            pipeline: root.pipeline(name),
            runner,
        }
    }

    pub fn pipeline(&self) -> &ProjectLayout {
        &self.pipeline
    }

    /// Runs every packaging step in order
    ///
    /// `manifest` is the root stage manifest, `notebooks` the pipeline's
    /// project-relative notebook paths.
    pub fn package(&self, manifest: &StageManifest, notebooks: &[String]) -> Result<()> {
        self.create_folders()?;
        self.copy_requirements()?;
        self.copy_data()?;
        self.copy_dependencies(manifest)?;
        self.copy_gitignore()?;
        self.copy_notebooks(notebooks)?;
        self.copy_dvc_state()?;
        info!("Packaged pipeline into {}", self.pipeline.root().display());
        Ok(())
    }

    pub fn create_folders(&self) -> Result<()> {
        files::create_dir_all(self.pipeline.root())?;
        files::create_dir_all(&self.pipeline.notebooks_dir())?;
        files::create_dir_all(&self.pipeline.outputs_dir())
    }

    /// Copies `setup_env/` or `requirements.txt`, preferring the folder
    pub fn copy_requirements(&self) -> Result<()> {
        files::remove_dir_if_exists(&self.pipeline.setup_env_dir())?;
        files::remove_file_if_exists(&self.pipeline.requirements_file())?;

        if self.root.setup_env_dir().is_dir() {
            files::copy_dir(&self.root.setup_env_dir(), &self.pipeline.setup_env_dir())
        } else if self.root.requirements_file().is_file() {
            files::copy_file(
                &self.root.requirements_file(),
                &self.pipeline.requirements_file(),
            )
        } else {
            Err(EngineError::MissingDependency)
        }
    }

    /// Mirrors `data/`
    ///
    /// Inside a git work tree only the files git reports (tracked or
    /// untracked but not ignored) are copied; otherwise the whole folder.
    pub fn copy_data(&self) -> Result<()> {
        let target = self.pipeline.data_dir();
        files::remove_dir_if_exists(&target)?;

        if in_git_work_tree(self.runner, self.root.root()) {
            let listing = self.runner.output(
                "git",
                &["ls-files", "--exclude-standard", "--cached", "--others", DATA_DIR],
                self.root.root(),
            )?;
            for file in listing.lines().map(str::trim).filter(|l| !l.is_empty()) {
                let src = self.root.join(file);
                if src.is_file() {
                    files::copy_file(&src, &self.pipeline.join(file))?;
                }
            }
            debug!("Mirrored git-listed data files");
        } else if self.root.data_dir().is_dir() {
            files::copy_dir(&self.root.data_dir(), &target)?;
        }
        Ok(())
    }

    /// Copies every non-data stage dependency that no stage produces
    pub fn copy_dependencies(&self, manifest: &StageManifest) -> Result<()> {
        for raw in manifest.copied_dependencies() {
            let dependency = Dependency::classify(&raw)?;
            let src = dependency.source(self.root.root());
            let dst = dependency.destination(self.pipeline.root());
            copy_path(&src, &dst)?;
        }
        Ok(())
    }

    pub fn copy_gitignore(&self) -> Result<()> {
        files::write(&self.pipeline.gitignore(), PIPELINE_GITIGNORE)
    }

    /// Copies each notebook into the subfolder's `notebooks/`
    pub fn copy_notebooks(&self, notebooks: &[String]) -> Result<()> {
        for notebook in notebooks {
            let src = self.root.join(notebook);
            if !src.is_file() {
                return Err(EngineError::NotFound(format!("File {}", src.display())));
            }
            files::copy_file(&src, &self.pipeline.notebooks_dir().join(file_name(notebook)))?;
            debug!("Copied notebook: {}", notebook);
        }
        Ok(())
    }

    /// Mirrors `.dvc/`, `outputs/`, `dvc.lock` and `.dvcignore`
    pub fn copy_dvc_state(&self) -> Result<()> {
        let dvc_dir = self.root.dvc_dir();
        if !dvc_dir.is_dir() {
            return Err(EngineError::NotFound(format!(
                "{} (run `mlp init` first)",
                dvc_dir.display()
            )));
        }
        files::replace_dir(&dvc_dir, &self.pipeline.dvc_dir())?;

        if self.root.outputs_dir().is_dir() {
            files::replace_dir(&self.root.outputs_dir(), &self.pipeline.outputs_dir())?;
        }
        for (src, dst) in [
            (self.root.stage_lock(), self.pipeline.stage_lock()),
            (self.root.dvc_ignore(), self.pipeline.dvc_ignore()),
        ] {
            if src.is_file() {
                files::copy_file(&src, &dst)?;
            }
        }
        Ok(())
    }
}

/// Copies a file, or mirrors a folder, to the destination
fn copy_path(src: &Path, dst: &Path) -> Result<()> {
    if src.is_file() {
        files::copy_file(src, dst)?;
    } else if src.is_dir() {
        files::copy_dir(src, dst)?;
    } else {
        warn!("Dependency {} does not exist, skipping", src.display());
        return Ok(());
    }
    debug!("Copied dependency: {}", src.display());
    Ok(())
}

/// Final segment of a project-relative path
pub fn file_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::recording::RecordingRunner;
    use tempfile::TempDir;

    fn project() -> (TempDir, ProjectLayout) {
        let dir = TempDir::new().unwrap();
        let root = ProjectLayout::new(dir.path());
        files::write(&root.requirements_file(), "pandas\n").unwrap();
        files::write(&root.join("data/raw.csv"), "a,b\n").unwrap();
        files::write(&root.join("notebooks/train.ipynb"), "{}").unwrap();
        files::write(&root.join("notebooks/helpers/util.py"), "x = 1\n").unwrap();
        files::write(&root.join("shared/lib/core.py"), "y = 2\n").unwrap();
        files::write(&root.join(".dvc/config"), "[core]\n").unwrap();
        files::write(&root.dvc_ignore(), "").unwrap();
        (dir, root)
    }

    fn manifest() -> StageManifest {
        StageManifest::from_yaml(
            r#"
stages:
  train:
    deps: [train.ipynb, helpers/util.py, ../shared/lib, ../data/raw.csv, ../outputs/clean.csv]
    outs: [../outputs/clean.csv]
    wdir: notebooks
"#,
        )
        .unwrap()
    }

    #[test]
    fn test_package_mirrors_project() {
        let (_dir, root) = project();
        let runner = RecordingRunner::new();
        let builder = PackageBuilder::new(&root, "p", &runner);

        builder
            .package(&manifest(), &["notebooks/train.ipynb".to_string()])
            .unwrap();

        let p = builder.pipeline();
        assert!(p.requirements_file().is_file());
        assert!(p.join("data/raw.csv").is_file());
        assert!(p.join("notebooks/helpers/util.py").is_file());
        assert!(p.join("shared/lib/core.py").is_file());
        assert!(p.join("notebooks/train.ipynb").is_file());
        assert!(p.gitignore().is_file());
        assert!(p.join(".dvc/config").is_file());
        assert!(p.dvc_ignore().is_file());
        assert!(p.outputs_dir().is_dir());
        assert!(!p.stage_lock().exists());
    }

    #[test]
    fn test_setup_env_preferred_over_requirements() {
        let (_dir, root) = project();
        files::write(&root.join("setup_env/setup_env.sh"), "pip install .\n").unwrap();
        let runner = RecordingRunner::new();
        let builder = PackageBuilder::new(&root, "p", &runner);
        files::write(&builder.pipeline().requirements_file(), "stale\n").unwrap();

        builder.copy_requirements().unwrap();

        assert!(builder.pipeline().join("setup_env/setup_env.sh").is_file());
        assert!(!builder.pipeline().requirements_file().exists());
    }

    #[test]
    fn test_missing_requirements() {
        let dir = TempDir::new().unwrap();
        let root = ProjectLayout::new(dir.path());
        let runner = RecordingRunner::new();
        let builder = PackageBuilder::new(&root, "p", &runner);
        assert!(matches!(
            builder.copy_requirements().unwrap_err(),
            EngineError::MissingDependency
        ));
    }

    #[test]
    fn test_data_from_git_listing() {
        let (_dir, root) = project();
        files::write(&root.join("data/ignored.bin"), "x").unwrap();
        let runner = RecordingRunner::new()
            .with_output("git rev-parse --is-inside-work-tree", "true")
            .with_output(
                "git ls-files --exclude-standard --cached --others data",
                "data/raw.csv\n",
            );
        let builder = PackageBuilder::new(&root, "p", &runner);

        builder.copy_data().unwrap();

        assert!(builder.pipeline().join("data/raw.csv").is_file());
        assert!(!builder.pipeline().join("data/ignored.bin").exists());
    }

    #[test]
    fn test_unsupported_dependency() {
        let (_dir, root) = project();
        let runner = RecordingRunner::new();
        let builder = PackageBuilder::new(&root, "p", &runner);
        let manifest = StageManifest::from_yaml(
            "stages:\n  s:\n    deps: [../../outside.py]\n    wdir: notebooks\n",
        )
        .unwrap();

        assert!(matches!(
            builder.copy_dependencies(&manifest).unwrap_err(),
            EngineError::UnsupportedDependency(_)
        ));
    }

    #[test]
    fn test_dvc_dir_required() {
        let dir = TempDir::new().unwrap();
        let root = ProjectLayout::new(dir.path());
        let runner = RecordingRunner::new();
        let builder = PackageBuilder::new(&root, "p", &runner);
        assert!(matches!(
            builder.copy_dvc_state().unwrap_err(),
            EngineError::NotFound(_)
        ));
    }

    #[test]
    fn test_missing_notebook() {
        let (_dir, root) = project();
        let runner = RecordingRunner::new();
        let builder = PackageBuilder::new(&root, "p", &runner);
        let err = builder
            .copy_notebooks(&["notebooks/ghost.ipynb".to_string()])
            .unwrap_err();
        assert!(err.to_string().contains("ghost.ipynb"));
    }
}
