//! External process engine
//!
//! Runs a configured program with the prompt appended as its last argument.
//! The process works inside the job's workspace subdirectory and learns
//! about the job through `ERRAND_*` environment variables.

use std::collections::VecDeque;
use std::process::Stdio;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::fs;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::{Engine, EngineContext, EngineFactory};

/// Number of trailing stderr lines kept for the failure message
const STDERR_TAIL_LINES: usize = 20;

/// How long output pipes may stay open after the engine process exited
///
/// Background processes started by the engine inherit the pipes and can
/// keep them open indefinitely.
const PIPE_DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

type StderrTail = Arc<Mutex<VecDeque<String>>>;

/// Builds [`CommandEngine`] instances for a fixed command line
#[derive(Debug, Clone)]
pub struct CommandEngineFactory {
    program: String,
    args: Vec<String>,
}

impl CommandEngineFactory {
    /// Creates a factory from `[program, args...]`
    pub fn new(command: Vec<String>) -> Result<Self> {
        let mut parts = command.into_iter();
        let program = parts
            .next()
            .filter(|program| !program.is_empty())
            .context("engine command cannot be empty")?;

        Ok(Self {
            program,
            args: parts.collect(),
        })
    }
}

#[async_trait]
impl EngineFactory for CommandEngineFactory {
    async fn create(&self, context: EngineContext) -> Result<Box<dyn Engine>> {
        Ok(Box::new(CommandEngine {
            context,
            program: self.program.clone(),
            args: self.args.clone(),
            child: None,
        }))
    }
}

/// Engine instance backed by one child process
pub struct CommandEngine {
    context: EngineContext,
    program: String,
    args: Vec<String>,
    child: Option<Child>,
}

#[async_trait]
impl Engine for CommandEngine {
    async fn run(&mut self, prompt: &str) -> Result<()> {
        let workspace_dir = &self.context.workspace_dir;
        fs::create_dir_all(workspace_dir).await.with_context(|| {
            format!(
                "Failed to create workspace directory {}",
                workspace_dir.display()
            )
        })?;

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .arg(prompt)
            .current_dir(workspace_dir)
            .env("ERRAND_JOB_ID", self.context.job_id.to_string())
            .env("ERRAND_JOB_MODE", self.context.mode.as_str())
            .env("ERRAND_WORKSPACE", workspace_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("Failed to start engine '{}'", self.program))?;

        info!(
            "Engine process {:?} started for job {}",
            child.id(),
            self.context.job_id
        );

        let job_id = self.context.job_id;
        let stdout_task = child
            .stdout
            .take()
            .map(|stdout| tokio::spawn(forward_stdout(job_id, stdout)));
        let stderr_tail: StderrTail = Arc::default();
        let stderr_task = child.stderr.take().map(|stderr| {
            tokio::spawn(collect_stderr(job_id, stderr, Arc::clone(&stderr_tail)))
        });

        let child = self.child.insert(child);
        let status = child
            .wait()
            .await
            .context("Failed to wait for engine process")?;

        drain(job_id, "stdout", stdout_task).await;
        drain(job_id, "stderr", stderr_task).await;
        let stderr_tail: Vec<String> = match stderr_tail.lock() {
            Ok(tail) => tail.iter().cloned().collect(),
            Err(poisoned) => poisoned.into_inner().iter().cloned().collect(),
        };

        if !status.success() {
            if stderr_tail.is_empty() {
                anyhow::bail!("engine exited with {}", status);
            }
            anyhow::bail!("engine exited with {}: {}", status, stderr_tail.join("\n"));
        }

        Ok(())
    }

    async fn cleanup(&mut self) -> Result<()> {
        let Some(mut child) = self.child.take() else {
            return Ok(());
        };

        if child.try_wait()?.is_none() {
            warn!(
                "Engine process for job {} still alive at cleanup, killing it",
                self.context.job_id
            );
            child
                .kill()
                .await
                .context("Failed to kill engine process")?;
        }

        Ok(())
    }
}

async fn forward_stdout(job_id: Uuid, stdout: impl AsyncRead + Unpin) {
    let mut lines = BufReader::new(stdout).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        debug!("[job {}] {}", job_id, line);
    }
}

async fn collect_stderr(job_id: Uuid, stderr: impl AsyncRead + Unpin, tail: StderrTail) {
    let mut lines = BufReader::new(stderr).lines();

    while let Ok(Some(line)) = lines.next_line().await {
        debug!("[job {}] stderr: {}", job_id, line);
        let Ok(mut lines_kept) = tail.lock() else {
            continue;
        };
        if lines_kept.len() == STDERR_TAIL_LINES {
            lines_kept.pop_front();
        }
        lines_kept.push_back(line);
    }
}

/// Waits for a pipe reader to hit end of stream, giving up after
/// [`PIPE_DRAIN_TIMEOUT`]
async fn drain(job_id: Uuid, pipe: &str, task: Option<JoinHandle<()>>) {
    let Some(mut task) = task else {
        return;
    };

    if tokio::time::timeout(PIPE_DRAIN_TIMEOUT, &mut task)
        .await
        .is_err()
    {
        warn!(
            "Engine {} for job {} still open after the process exited, detaching",
            pipe, job_id
        );
        task.abort();
    }
}
