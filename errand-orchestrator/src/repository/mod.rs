//! Repository Module
//!
//! Data access layer for the orchestrator.
//! Storage sits behind the [`JobRepository`] trait so the volatile in-memory
//! registry can be swapped for a durable backend without touching the
//! services or the executor.

pub mod job;

// Re-export for convenience
pub use job as job_repository;
pub use job::{InMemoryJobRepository, JobMutator, JobRepository, RepositoryError};
