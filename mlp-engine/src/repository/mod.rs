//! Repository Module
//!
//! File-backed data access for project state.

pub mod registry;

// Re-export for convenience
pub use registry as registry_repository;
