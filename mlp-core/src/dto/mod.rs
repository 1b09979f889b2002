//! Data Transfer Objects exchanged with the CI provider
//!
//! Payloads for the GitHub Actions REST API used by `mlp-client`, plus the
//! small value types needed to address a repository and pick a workflow.

pub mod github;
