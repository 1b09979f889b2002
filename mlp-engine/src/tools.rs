//! External tools (dvc, git, aws)
//!
//! Every subprocess goes through [`CommandRunner`]. Side-effect commands are
//! fire-and-forget: a non-zero exit is logged and the operation carries on.
//! Commands whose output is needed fail with
//! [`EngineError::ExternalToolFailure`].

use std::path::Path;
use std::process::{Command, Stdio};

use tracing::{debug, warn};

use crate::error::{EngineError, Result};

/// Subprocess seam
pub trait CommandRunner {
    /// Runs a command with inherited stdio; returns whether it succeeded
    fn run(&self, program: &str, args: &[&str], cwd: &Path) -> bool;

    /// Runs a command and returns its trimmed stdout
    fn output(&self, program: &str, args: &[&str], cwd: &Path) -> Result<String>;
}

/// Runs real processes
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, program: &str, args: &[&str], cwd: &Path) -> bool {
        debug!("Running {} {} in {}", program, args.join(" "), cwd.display());

        match Command::new(program).args(args).current_dir(cwd).status() {
            Ok(status) if status.success() => true,
            Ok(status) => {
                warn!("{} {} exited with {}", program, args.join(" "), status);
                false
            }
            Err(e) => {
                warn!("Failed to execute '{}': {}", program, e);
                false
            }
        }
    }

    fn output(&self, program: &str, args: &[&str], cwd: &Path) -> Result<String> {
        debug!("Capturing {} {} in {}", program, args.join(" "), cwd.display());

        let output = Command::new(program)
            .args(args)
            .current_dir(cwd)
            .stderr(Stdio::piped())
            .output()
            .map_err(|e| EngineError::tool(program, format!("failed to execute: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(EngineError::tool(
                program,
                format!("{} ({})", stderr.trim(), output.status),
            ));
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

/// Whether `cwd` is inside a git work tree
pub fn in_git_work_tree(runner: &dyn CommandRunner, cwd: &Path) -> bool {
    runner
        .output("git", &["rev-parse", "--is-inside-work-tree"], cwd)
        .map(|out| out == "true")
        .unwrap_or(false)
}

#[cfg(test)]
pub(crate) mod recording {
    use std::cell::RefCell;
    use std::collections::HashMap;
    use std::path::{Path, PathBuf};

    use super::CommandRunner;
    use crate::error::{EngineError, Result};

    /// One recorded invocation
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct Invocation {
        pub command: String,
        pub cwd: PathBuf,
    }

    /// Records commands instead of running them
    ///
    /// `output` answers from canned responses keyed by the full command line
    /// and fails for anything else.
    #[derive(Debug, Default)]
    pub struct RecordingRunner {
        pub calls: RefCell<Vec<Invocation>>,
        outputs: HashMap<String, String>,
    }

    impl RecordingRunner {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_output(mut self, command: &str, stdout: &str) -> Self {
            self.outputs.insert(command.to_string(), stdout.to_string());
            self
        }

        pub fn commands(&self) -> Vec<String> {
            self.calls.borrow().iter().map(|c| c.command.clone()).collect()
        }

        fn record(&self, program: &str, args: &[&str], cwd: &Path) -> String {
            let command = std::iter::once(program)
                .chain(args.iter().copied())
                .collect::<Vec<_>>()
                .join(" ");
            self.calls.borrow_mut().push(Invocation {
                command: command.clone(),
                cwd: cwd.to_path_buf(),
            });
            command
        }
    }

    impl CommandRunner for RecordingRunner {
        fn run(&self, program: &str, args: &[&str], cwd: &Path) -> bool {
            self.record(program, args, cwd);
            true
        }

        fn output(&self, program: &str, args: &[&str], cwd: &Path) -> Result<String> {
            let command = self.record(program, args, cwd);
            self.outputs
                .get(&command)
                .cloned()
                .ok_or_else(|| EngineError::tool(program, "not available in tests"))
        }
    }
}
