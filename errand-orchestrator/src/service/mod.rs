//! Service Module
//!
//! Business logic layer for the orchestrator.
//! Services sit between the HTTP handlers and the repository, executor and
//! workspace.

pub mod artifact;
pub mod job;

// Re-export for convenience
pub use artifact as artifact_service;
pub use job as job_service;
