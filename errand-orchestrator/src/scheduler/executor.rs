//! Job executor
//!
//! Runs submitted jobs in the background, one tokio task per job, behind a
//! semaphore that caps how many engines run at once. Each task drives its
//! job through `pending -> running -> completed|failed` and always cleans up
//! the engine instance it created.
//!
//! There is no cancellation and no timeout: once submitted a job runs until
//! the engine returns. Deleting the tracking record does not stop it; the
//! outcome of a deleted job is dropped.

use std::any::Any;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use chrono::Utc;
use errand_core::domain::job::JobMode;
use errand_core::dto::service::ExecutorStats;
use tokio::sync::{Mutex, Semaphore};
use tokio::task::{JoinError, JoinHandle};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::engine::{Engine, EngineContext, EngineFactory};
use crate::repository::{JobMutator, JobRepository};
use crate::workspace::Workspace;

/// Summary recorded on every successful run
pub const COMPLETION_SUMMARY: &str = "Task completed successfully";

/// Result of running one job, applied to the registry in a single update
#[derive(Debug, Clone, PartialEq)]
pub enum ExecutionOutcome {
    Completed { summary: String, files: Vec<String> },
    Failed { error: String },
}

impl ExecutionOutcome {
    fn into_mutator(self) -> JobMutator {
        match self {
            ExecutionOutcome::Completed { summary, files } => {
                Box::new(move |job| job.complete(Utc::now(), summary, files))
            }
            ExecutionOutcome::Failed { error } => Box::new(move |job| job.fail(Utc::now(), error)),
        }
    }
}

/// Background executor shared by all request handlers
#[derive(Clone)]
pub struct JobExecutor {
    inner: Arc<ExecutorInner>,
}

struct ExecutorInner {
    jobs: Arc<dyn JobRepository>,
    engines: Arc<dyn EngineFactory>,
    workspace: Workspace,
    semaphore: Arc<Semaphore>,
    max_concurrent_jobs: usize,
    backlog: AtomicUsize,
    running: AtomicUsize,
}

impl JobExecutor {
    /// Creates an executor running at most `max_concurrent_jobs` engines at once
    pub fn new(
        jobs: Arc<dyn JobRepository>,
        engines: Arc<dyn EngineFactory>,
        workspace: Workspace,
        max_concurrent_jobs: usize,
    ) -> Self {
        let max_concurrent_jobs = max_concurrent_jobs.max(1);
        Self {
            inner: Arc::new(ExecutorInner {
                jobs,
                engines,
                workspace,
                semaphore: Arc::new(Semaphore::new(max_concurrent_jobs)),
                max_concurrent_jobs,
                backlog: AtomicUsize::new(0),
                running: AtomicUsize::new(0),
            }),
        }
    }

    /// Schedules a job and returns immediately
    ///
    /// The returned handle resolves once the job's outcome has been recorded;
    /// callers are free to drop it.
    pub fn submit(&self, job_id: Uuid, prompt: String, mode: JobMode) -> JoinHandle<()> {
        let inner = Arc::clone(&self.inner);
        inner.backlog.fetch_add(1, Ordering::SeqCst);

        tokio::spawn(async move {
            let permit = Arc::clone(&inner.semaphore).acquire_owned().await;
            inner.backlog.fetch_sub(1, Ordering::SeqCst);

            let Ok(_permit) = permit else {
                error!("Executor closed, job {} will not run", job_id);
                return;
            };

            inner.running.fetch_add(1, Ordering::SeqCst);
            inner.execute(job_id, &prompt, mode).await;
            inner.running.fetch_sub(1, Ordering::SeqCst);
            // Permit is released when dropped
        })
    }

    /// Current load of the concurrency gate
    pub fn stats(&self) -> ExecutorStats {
        ExecutorStats {
            max_concurrent_jobs: self.inner.max_concurrent_jobs,
            backlog: self.inner.backlog.load(Ordering::SeqCst),
            running: self.inner.running.load(Ordering::SeqCst),
        }
    }
}

impl ExecutorInner {
    async fn execute(&self, job_id: Uuid, prompt: &str, mode: JobMode) {
        match self
            .jobs
            .update(job_id, Box::new(|job| job.start(Utc::now())))
            .await
        {
            Ok(Some(_)) => info!("Starting job {} in {} mode", job_id, mode),
            Ok(None) => debug!(
                "Job {} was deleted before it started, running it untracked",
                job_id
            ),
            Err(e) => {
                error!("Failed to mark job {} as running: {}", job_id, e);
                return;
            }
        }

        let outcome = self.run_engine(job_id, prompt, mode).await;

        match &outcome {
            ExecutionOutcome::Completed { files, .. } => {
                info!("Job {} completed with {} file(s)", job_id, files.len())
            }
            ExecutionOutcome::Failed { error } => error!("Job {} failed: {}", job_id, error),
        }

        match self.jobs.update(job_id, outcome.into_mutator()).await {
            Ok(Some(_)) => {}
            Ok(None) => debug!("Job {} was deleted while running, dropping its outcome", job_id),
            Err(e) => error!("Failed to record outcome of job {}: {}", job_id, e),
        }
    }

    /// Creates the engine, runs it, lists artifacts and cleans up
    async fn run_engine(&self, job_id: Uuid, prompt: &str, mode: JobMode) -> ExecutionOutcome {
        let context = EngineContext {
            job_id,
            mode,
            workspace_dir: self.workspace.job_dir(job_id.to_string()),
        };

        let engine = match self.engines.create(context).await {
            Ok(engine) => Arc::new(Mutex::new(engine)),
            Err(e) => {
                return ExecutionOutcome::Failed {
                    error: format!("Failed to create engine: {:#}", e),
                };
            }
        };

        // The run happens on its own task so a panicking engine surfaces as
        // a JoinError instead of tearing down this one.
        let run = {
            let engine = Arc::clone(&engine);
            let prompt = prompt.to_string();
            tokio::spawn(async move { engine.lock().await.run(&prompt).await }).await
        };

        let outcome = match run {
            Ok(Ok(())) => match self.workspace.list_files(job_id.to_string()).await {
                Ok(files) => ExecutionOutcome::Completed {
                    summary: COMPLETION_SUMMARY.to_string(),
                    files,
                },
                Err(e) => ExecutionOutcome::Failed {
                    error: format!("Failed to enumerate artifacts: {}", e),
                },
            },
            Ok(Err(e)) => ExecutionOutcome::Failed {
                error: format!("{:#}", e),
            },
            Err(e) => ExecutionOutcome::Failed {
                error: describe_join_error(e),
            },
        };

        cleanup(job_id, &engine).await;

        outcome
    }
}

async fn cleanup(job_id: Uuid, engine: &Mutex<Box<dyn Engine>>) {
    if let Err(e) = engine.lock().await.cleanup().await {
        warn!("Failed to clean up engine for job {}: {:#}", job_id, e);
    }
}

fn describe_join_error(err: JoinError) -> String {
    if !err.is_panic() {
        return format!("Engine task aborted: {}", err);
    }
    format!("Engine panicked: {}", panic_message(err.into_panic()))
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
