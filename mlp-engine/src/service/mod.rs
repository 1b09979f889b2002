//! Service Module
//!
//! Project operations built on the layout, the registry repository and the
//! external tool runner.

pub mod pipeline;
pub mod project;
pub mod projector;
pub mod propagator;
pub mod report;
pub mod sync;
pub mod upload;
pub mod workflow;

pub use pipeline as pipeline_service;
pub use project as project_service;
pub use sync as sync_service;
pub use upload as upload_service;
