//! Core domain types
//!
//! This module contains the structures the engine reads, mutates and writes
//! back: the pipeline registry (`pipelines.json`), the dvc stage manifest
//! (`dvc.yaml`), the parameter manifest (`params.yaml`) and the helpers that
//! turn user input into them.

pub mod dependency;
pub mod notebooks;
pub mod params;
pub mod registry;
pub mod stage;
