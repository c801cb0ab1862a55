//! Job domain types
//!
//! A job moves through a one-directional state machine:
//!
//! ```text
//! pending -> running -> completed
//!                   \-> failed
//! ```
//!
//! The transition methods on [`Job`] are the only way the orchestrator
//! changes a record's lifecycle fields, so the invariants on `result`,
//! `error`, `files` and the timestamps are enforced in one place.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Job tracking record
///
/// Created on submission, mutated by the executor, read by API callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: Uuid,
    pub status: JobStatus,
    pub prompt: String,
    pub mode: JobMode,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    /// Human-readable summary, present only once completed
    pub result: Option<String>,
    /// Failure cause, present only once failed
    pub error: Option<String>,
    /// Artifacts relative to the workspace root, present only once completed
    pub files: Option<Vec<String>>,
    /// Caller-supplied data, never interpreted
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
}

/// Job lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

/// Execution mode selector, passed through to the engine untouched
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobMode {
    #[default]
    Direct,
    Flow,
    Mcp,
}

/// Rejected lifecycle transition
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid job transition from {from} to {to}")]
pub struct TransitionError {
    pub from: JobStatus,
    pub to: JobStatus,
}

impl Job {
    /// Creates a new pending job with a fresh identifier
    pub fn new(
        prompt: String,
        mode: JobMode,
        metadata: HashMap<String, serde_json::Value>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            status: JobStatus::Pending,
            prompt,
            mode,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
            result: None,
            error: None,
            files: None,
            metadata,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Moves a pending job to running
    pub fn start(&mut self, now: DateTime<Utc>) -> Result<(), TransitionError> {
        self.check_transition(JobStatus::Running)?;

        self.status = JobStatus::Running;
        self.started_at = Some(now.max(self.created_at));
        Ok(())
    }

    /// Moves a running job to completed with its summary and artifacts
    pub fn complete(
        &mut self,
        now: DateTime<Utc>,
        result: String,
        files: Vec<String>,
    ) -> Result<(), TransitionError> {
        self.check_transition(JobStatus::Completed)?;

        self.status = JobStatus::Completed;
        self.completed_at = Some(self.clamp_completion(now));
        self.result = Some(result);
        self.error = None;
        self.files = Some(files);
        Ok(())
    }

    /// Moves a running job to failed with the failure cause
    pub fn fail(&mut self, now: DateTime<Utc>, error: String) -> Result<(), TransitionError> {
        self.check_transition(JobStatus::Failed)?;

        self.status = JobStatus::Failed;
        self.completed_at = Some(self.clamp_completion(now));
        self.result = None;
        self.error = Some(error);
        self.files = None;
        Ok(())
    }

    fn check_transition(&self, to: JobStatus) -> Result<(), TransitionError> {
        if self.status.can_transition_to(to) {
            Ok(())
        } else {
            Err(TransitionError {
                from: self.status,
                to,
            })
        }
    }

    // Timestamps never go backwards, even if the wall clock does.
    fn clamp_completion(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now.max(self.started_at.unwrap_or(self.created_at))
    }
}

impl JobStatus {
    pub const ALL: [JobStatus; 4] = [
        JobStatus::Pending,
        JobStatus::Running,
        JobStatus::Completed,
        JobStatus::Failed,
    ];

    /// Whether no further transitions can happen from this status
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    pub fn can_transition_to(self, next: JobStatus) -> bool {
        matches!(
            (self, next),
            (JobStatus::Pending, JobStatus::Running)
                | (JobStatus::Running, JobStatus::Completed)
                | (JobStatus::Running, JobStatus::Failed)
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Running => "running",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pending" => Ok(JobStatus::Pending),
            "running" => Ok(JobStatus::Running),
            "completed" => Ok(JobStatus::Completed),
            "failed" => Ok(JobStatus::Failed),
            other => Err(format!(
                "unknown job status '{}' (expected pending, running, completed or failed)",
                other
            )),
        }
    }
}

impl JobMode {
    pub fn as_str(self) -> &'static str {
        match self {
            JobMode::Direct => "direct",
            JobMode::Flow => "flow",
            JobMode::Mcp => "mcp",
        }
    }
}

impl fmt::Display for JobMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "direct" => Ok(JobMode::Direct),
            "flow" => Ok(JobMode::Flow),
            "mcp" => Ok(JobMode::Mcp),
            other => Err(format!(
                "unknown execution mode '{}' (expected direct, flow or mcp)",
                other
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn pending_job() -> Job {
        Job::new("say hi".to_string(), JobMode::Direct, HashMap::new())
    }

    #[test]
    fn test_new_job_is_pending() {
        let job = pending_job();
        assert_eq!(job.status, JobStatus::Pending);
        assert!(job.started_at.is_none());
        assert!(job.completed_at.is_none());
        assert!(job.result.is_none());
        assert!(job.error.is_none());
        assert!(job.files.is_none());
    }

    #[test]
    fn test_new_jobs_have_distinct_ids() {
        assert_ne!(pending_job().id, pending_job().id);
    }

    #[test]
    fn test_successful_lifecycle() {
        let mut job = pending_job();
        let now = Utc::now();

        job.start(now).unwrap();
        assert_eq!(job.status, JobStatus::Running);
        assert!(job.started_at.unwrap() >= job.created_at);

        job.complete(now, "done".to_string(), vec!["a/b.txt".to_string()])
            .unwrap();
        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(job.result.as_deref(), Some("done"));
        assert_eq!(job.files, Some(vec!["a/b.txt".to_string()]));
        assert!(job.error.is_none());
        assert!(job.completed_at.unwrap() >= job.started_at.unwrap());
    }

    #[test]
    fn test_failed_lifecycle() {
        let mut job = pending_job();
        job.start(Utc::now()).unwrap();
        job.fail(Utc::now(), "boom".to_string()).unwrap();

        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(job.error.as_deref(), Some("boom"));
        assert!(job.result.is_none());
        assert!(job.files.is_none());
        assert!(job.completed_at.is_some());
    }

    #[test]
    fn test_cannot_finish_before_starting() {
        let mut job = pending_job();
        let err = job
            .complete(Utc::now(), "done".to_string(), vec![])
            .unwrap_err();
        assert_eq!(err.from, JobStatus::Pending);
        assert_eq!(err.to, JobStatus::Completed);
        assert!(job.fail(Utc::now(), "boom".to_string()).is_err());
        assert_eq!(job.status, JobStatus::Pending);
    }

    #[test]
    fn test_terminal_states_are_final() {
        let mut job = pending_job();
        job.start(Utc::now()).unwrap();
        job.fail(Utc::now(), "boom".to_string()).unwrap();
        let snapshot = job.clone();

        assert!(job.start(Utc::now()).is_err());
        assert!(job.complete(Utc::now(), "x".to_string(), vec![]).is_err());
        assert!(job.fail(Utc::now(), "again".to_string()).is_err());
        assert_eq!(job, snapshot);
    }

    #[test]
    fn test_cannot_start_twice() {
        let mut job = pending_job();
        job.start(Utc::now()).unwrap();
        let started_at = job.started_at;
        assert!(job.start(Utc::now()).is_err());
        assert_eq!(job.started_at, started_at);
    }

    #[test]
    fn test_timestamps_clamped_when_clock_steps_back() {
        let mut job = pending_job();
        let earlier = job.created_at - Duration::seconds(60);

        job.start(earlier).unwrap();
        assert_eq!(job.started_at, Some(job.created_at));

        job.complete(earlier, "done".to_string(), vec![]).unwrap();
        assert_eq!(job.completed_at, job.started_at);
    }

    #[test]
    fn test_transition_table() {
        use JobStatus::*;
        for from in JobStatus::ALL {
            for to in JobStatus::ALL {
                let expected = matches!(
                    (from, to),
                    (Pending, Running) | (Running, Completed) | (Running, Failed)
                );
                assert_eq!(from.can_transition_to(to), expected, "{from} -> {to}");
            }
        }
    }

    #[test]
    fn test_status_serializes_lowercase() {
        assert_eq!(
            serde_json::to_value(JobStatus::Completed).unwrap(),
            serde_json::json!("completed")
        );
        let status: JobStatus = serde_json::from_str("\"running\"").unwrap();
        assert_eq!(status, JobStatus::Running);
    }

    #[test]
    fn test_status_and_mode_from_str() {
        assert_eq!("FAILED".parse::<JobStatus>(), Ok(JobStatus::Failed));
        assert!("done".parse::<JobStatus>().is_err());
        assert_eq!("mcp".parse::<JobMode>(), Ok(JobMode::Mcp));
        assert!("turbo".parse::<JobMode>().is_err());
        assert_eq!(JobMode::default(), JobMode::Direct);
    }

    #[test]
    fn test_job_json_shape() {
        let job = pending_job();
        let value = serde_json::to_value(&job).unwrap();
        assert_eq!(value["status"], "pending");
        assert_eq!(value["mode"], "direct");
        assert!(value["files"].is_null());
        assert!(value["error"].is_null());
        assert_eq!(value["metadata"], serde_json::json!({}));
    }
}
