//! MLP Engine
//!
//! Filesystem side of the mlp pipeline tool: turns notebooks into dvc stage
//! and parameter manifests, packages pipelines into self-contained
//! subfolders and generates the CI workflow files that run them.
//!
//! All operations take the project root as a [`ProjectLayout`] and run
//! external programs (dvc, git, aws) through a [`CommandRunner`].

pub mod error;
pub mod files;
pub mod layout;
pub mod repository;
pub mod service;
pub mod tools;

pub use error::{EngineError, Result};
pub use layout::ProjectLayout;
pub use tools::{CommandRunner, SystemRunner};
