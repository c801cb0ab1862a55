//! Job Repository
//!
//! Handles storage of job records.
//!
//! The shipped implementation keeps everything in process memory: records do
//! not survive a restart. Each record is replaced wholesale on update, so a
//! concurrent reader sees either the old or the new version, never a mix.

use std::collections::HashMap;

use async_trait::async_trait;
use errand_core::domain::job::{Job, JobStatus, TransitionError};
use errand_core::dto::job::CreateJob;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Field-level mutation applied atomically by [`JobRepository::update`]
pub type JobMutator = Box<dyn FnOnce(&mut Job) -> Result<(), TransitionError> + Send>;

/// Repository error type
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error(transparent)]
    InvalidTransition(#[from] TransitionError),

    /// Backend failure (I/O, connection, serialization) reported by a durable
    /// store. The in-memory repository never produces it; the API answers
    /// it with `500`.
    #[error("storage error: {0}")]
    Storage(String),
}

/// Storage contract for job records
#[async_trait]
pub trait JobRepository: Send + Sync {
    /// Insert a new pending job with a fresh unique id
    async fn create(&self, req: CreateJob) -> Result<Job, RepositoryError>;

    /// Find a job by ID
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Job>, RepositoryError>;

    /// List jobs newest first, optionally filtered by status, truncated to `limit`
    async fn list(
        &self,
        status: Option<JobStatus>,
        limit: usize,
    ) -> Result<Vec<Job>, RepositoryError>;

    /// Apply `mutator` to a copy of the record and store the copy if it succeeds
    ///
    /// Returns `Ok(None)` when no record exists for `id`.
    async fn update(&self, id: Uuid, mutator: JobMutator) -> Result<Option<Job>, RepositoryError>;

    /// Remove a record, returning whether it existed
    async fn delete(&self, id: Uuid) -> Result<bool, RepositoryError>;

    /// Number of records currently in each status
    async fn count_by_status(&self) -> Result<HashMap<JobStatus, usize>, RepositoryError>;
}

/// Volatile registry backed by a `HashMap` behind a `RwLock`
#[derive(Default)]
pub struct InMemoryJobRepository {
    inner: RwLock<Registry>,
}

#[derive(Default)]
struct Registry {
    jobs: HashMap<Uuid, Entry>,
    next_seq: u64,
}

struct Entry {
    /// Insertion order, breaks ties between equal `created_at` values
    seq: u64,
    job: Job,
}

impl InMemoryJobRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl JobRepository for InMemoryJobRepository {
    async fn create(&self, req: CreateJob) -> Result<Job, RepositoryError> {
        let mut job = Job::new(req.prompt, req.mode, req.metadata.unwrap_or_default());

        let mut registry = self.inner.write().await;
        while registry.jobs.contains_key(&job.id) {
            job.id = Uuid::new_v4();
        }

        let seq = registry.next_seq;
        registry.next_seq += 1;
        registry.jobs.insert(
            job.id,
            Entry {
                seq,
                job: job.clone(),
            },
        );

        Ok(job)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Job>, RepositoryError> {
        let registry = self.inner.read().await;
        Ok(registry.jobs.get(&id).map(|entry| entry.job.clone()))
    }

    async fn list(
        &self,
        status: Option<JobStatus>,
        limit: usize,
    ) -> Result<Vec<Job>, RepositoryError> {
        let registry = self.inner.read().await;

        let mut entries: Vec<&Entry> = registry
            .jobs
            .values()
            .filter(|entry| status.is_none_or(|s| entry.job.status == s))
            .collect();

        entries.sort_by(|a, b| {
            b.job
                .created_at
                .cmp(&a.job.created_at)
                .then_with(|| b.seq.cmp(&a.seq))
        });

        Ok(entries
            .into_iter()
            .take(limit)
            .map(|entry| entry.job.clone())
            .collect())
    }

    async fn update(&self, id: Uuid, mutator: JobMutator) -> Result<Option<Job>, RepositoryError> {
        let mut registry = self.inner.write().await;

        let Some(entry) = registry.jobs.get_mut(&id) else {
            return Ok(None);
        };

        let mut updated = entry.job.clone();
        mutator(&mut updated)?;
        entry.job = updated.clone();

        Ok(Some(updated))
    }

    async fn delete(&self, id: Uuid) -> Result<bool, RepositoryError> {
        let mut registry = self.inner.write().await;
        Ok(registry.jobs.remove(&id).is_some())
    }

    async fn count_by_status(&self) -> Result<HashMap<JobStatus, usize>, RepositoryError> {
        let registry = self.inner.read().await;

        let mut counts: HashMap<JobStatus, usize> =
            JobStatus::ALL.iter().map(|status| (*status, 0)).collect();
        for entry in registry.jobs.values() {
            *counts.entry(entry.job.status).or_default() += 1;
        }

        Ok(counts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::sync::Arc;

    fn request(prompt: &str) -> CreateJob {
        CreateJob::new(prompt)
    }

    #[tokio::test]
    async fn test_create_inserts_pending_record() {
        let repo = InMemoryJobRepository::new();
        let job = repo.create(request("say hi")).await.unwrap();

        assert_eq!(job.status, JobStatus::Pending);
        assert!(job.metadata.is_empty());
        let stored = repo.find_by_id(job.id).await.unwrap().unwrap();
        assert_eq!(stored, job);
    }

    #[tokio::test]
    async fn test_find_unknown_id() {
        let repo = InMemoryJobRepository::new();
        assert!(repo.find_by_id(Uuid::new_v4()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_newest_first_and_limit() {
        let repo = InMemoryJobRepository::new();
        let first = repo.create(request("one")).await.unwrap();
        let second = repo.create(request("two")).await.unwrap();
        let third = repo.create(request("three")).await.unwrap();

        let all = repo.list(None, 100).await.unwrap();
        let ids: Vec<Uuid> = all.iter().map(|j| j.id).collect();
        assert_eq!(ids, vec![third.id, second.id, first.id]);

        let newest = repo.list(None, 1).await.unwrap();
        assert_eq!(newest.len(), 1);
        assert_eq!(newest[0].id, third.id);

        assert!(repo.list(None, 0).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_filters_by_status() {
        let repo = InMemoryJobRepository::new();
        let started = repo.create(request("one")).await.unwrap();
        repo.create(request("two")).await.unwrap();
        repo.update(started.id, Box::new(|job| job.start(Utc::now())))
            .await
            .unwrap();

        let running = repo.list(Some(JobStatus::Running), 100).await.unwrap();
        assert_eq!(running.len(), 1);
        assert_eq!(running[0].id, started.id);

        let pending = repo.list(Some(JobStatus::Pending), 100).await.unwrap();
        assert_eq!(pending.len(), 1);
        assert!(pending.iter().all(|j| j.status == JobStatus::Pending));

        assert!(
            repo.list(Some(JobStatus::Failed), 100)
                .await
                .unwrap()
                .is_empty()
        );
    }

    #[tokio::test]
    async fn test_update_applies_transition() {
        let repo = InMemoryJobRepository::new();
        let job = repo.create(request("x")).await.unwrap();

        let updated = repo
            .update(job.id, Box::new(|job| job.start(Utc::now())))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.status, JobStatus::Running);
        assert_eq!(
            repo.find_by_id(job.id).await.unwrap().unwrap().status,
            JobStatus::Running
        );
    }

    #[tokio::test]
    async fn test_rejected_update_leaves_record_untouched() {
        let repo = InMemoryJobRepository::new();
        let job = repo.create(request("x")).await.unwrap();

        let err = repo
            .update(
                job.id,
                Box::new(|job| job.complete(Utc::now(), "done".to_string(), vec![])),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::InvalidTransition(_)));

        let stored = repo.find_by_id(job.id).await.unwrap().unwrap();
        assert_eq!(stored, job);
    }

    #[tokio::test]
    async fn test_update_missing_record() {
        let repo = InMemoryJobRepository::new();
        let result = repo
            .update(Uuid::new_v4(), Box::new(|job| job.start(Utc::now())))
            .await
            .unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_delete() {
        let repo = InMemoryJobRepository::new();
        let job = repo.create(request("x")).await.unwrap();

        assert!(repo.delete(job.id).await.unwrap());
        assert!(!repo.delete(job.id).await.unwrap());
        assert!(repo.find_by_id(job.id).await.unwrap().is_none());
        assert!(repo.list(None, 100).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_count_by_status() {
        let repo = InMemoryJobRepository::new();
        let job = repo.create(request("one")).await.unwrap();
        repo.create(request("two")).await.unwrap();
        repo.update(job.id, Box::new(|job| job.start(Utc::now())))
            .await
            .unwrap();

        let counts = repo.count_by_status().await.unwrap();
        assert_eq!(counts[&JobStatus::Pending], 1);
        assert_eq!(counts[&JobStatus::Running], 1);
        assert_eq!(counts[&JobStatus::Completed], 0);
        assert_eq!(counts[&JobStatus::Failed], 0);
    }

    #[tokio::test]
    async fn test_concurrent_creates_are_unique() {
        let repo = Arc::new(InMemoryJobRepository::new());

        let handles: Vec<_> = (0..50)
            .map(|i| {
                let repo = Arc::clone(&repo);
                tokio::spawn(async move { repo.create(request(&format!("job {i}"))).await })
            })
            .collect();

        let mut ids = std::collections::HashSet::new();
        for handle in handles {
            let job = handle.await.unwrap().unwrap();
            assert!(ids.insert(job.id));
        }
        assert_eq!(repo.list(None, 100).await.unwrap().len(), 50);
    }
}
