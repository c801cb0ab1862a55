//! Scheduler layer
//!
//! Decouples request handling from long-running work: handlers hand jobs to
//! the executor, which runs them on background tasks and records outcomes
//! in the repository.

pub mod executor;

pub use executor::{COMPLETION_SUMMARY, ExecutionOutcome, JobExecutor};
