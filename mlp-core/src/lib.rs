//! MLP Core
//!
//! Core types and pure logic for the mlp pipeline tool.
//!
//! This crate contains:
//! - Domain types: the pipeline registry, notebook lists, dvc stage and
//!   parameter manifests, and the dependency classifier
//! - DTOs: payloads exchanged with the CI provider
//!
//! Nothing in here touches the filesystem; reading and writing the
//! manifests lives in `mlp-engine`.

pub mod domain;
pub mod dto;
pub mod error;

pub use error::{DependencyError, RegistryError};
