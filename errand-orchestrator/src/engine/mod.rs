//! Execution engine boundary
//!
//! The engine is the external agent that turns a prompt into side effects in
//! a job's workspace subdirectory. The orchestrator only creates an
//! instance, awaits a single `run`, and always calls `cleanup` once.

mod command;

pub use command::{CommandEngine, CommandEngineFactory};

use std::path::PathBuf;

use async_trait::async_trait;
use errand_core::domain::job::JobMode;
use uuid::Uuid;

/// Everything an engine instance is told about the job it serves
#[derive(Debug, Clone)]
pub struct EngineContext {
    pub job_id: Uuid,
    pub mode: JobMode,
    /// Directory the engine is expected to write its artifacts into
    pub workspace_dir: PathBuf,
}

/// A single-use engine instance
#[async_trait]
pub trait Engine: Send {
    /// Runs the prompt to completion
    ///
    /// May take an unbounded amount of time. Any error is recorded as the
    /// job's failure cause.
    async fn run(&mut self, prompt: &str) -> anyhow::Result<()>;

    /// Releases resources held by the instance
    ///
    /// Called exactly once per created instance, whatever `run` returned.
    async fn cleanup(&mut self) -> anyhow::Result<()>;
}

/// Creates engine instances, one per job
#[async_trait]
pub trait EngineFactory: Send + Sync {
    async fn create(&self, context: EngineContext) -> anyhow::Result<Box<dyn Engine>>;
}
