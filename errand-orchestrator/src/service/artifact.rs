//! Artifact Service
//!
//! Resolves a caller-supplied artifact path to a file inside the owning
//! job's workspace subdirectory.
//!
//! Paths are relative to the workspace root, exactly as they appear in a
//! job's `files` list (`<job id>/report.md`). Containment is checked twice:
//! lexically before anything else, so traversal is refused even for unknown
//! job ids, and again on the canonical paths so symbolic links cannot point
//! outside the job's subdirectory, nor the subdirectory outside the root.

use std::io;
use std::path::PathBuf;

use tokio::fs;
use uuid::Uuid;

use crate::repository::{JobRepository, RepositoryError};
use crate::workspace::{Workspace, is_plain_component, is_strictly_within, normalize_path};

/// Artifact resolution error type
#[derive(Debug, thiserror::Error)]
pub enum ArtifactError {
    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Resolve `relative_path` for `job_id` to an absolute path of a regular file
pub async fn resolve_artifact(
    jobs: &dyn JobRepository,
    workspace: &Workspace,
    job_id: &str,
    relative_path: &str,
) -> Result<PathBuf, ArtifactError> {
    if !is_plain_component(job_id) {
        return Err(ArtifactError::Forbidden(format!("Invalid job id '{}'", job_id)));
    }

    let job_dir = workspace.job_dir(job_id);
    let candidate = normalize_path(&workspace.root().join(relative_path));
    if !is_strictly_within(&candidate, &job_dir) {
        tracing::warn!(
            "Rejected artifact path '{}' for job {}: outside job workspace",
            relative_path,
            job_id
        );
        return Err(forbidden(relative_path));
    }

    let id = Uuid::parse_str(job_id)
        .map_err(|_| ArtifactError::NotFound(format!("Job {} not found", job_id)))?;
    if jobs.find_by_id(id).await?.is_none() {
        return Err(ArtifactError::NotFound(format!("Job {} not found", job_id)));
    }

    let canonical = fs::canonicalize(&candidate)
        .await
        .map_err(|e| missing_or_io(e, relative_path))?;
    let canonical_dir = fs::canonicalize(&job_dir)
        .await
        .map_err(|e| missing_or_io(e, relative_path))?;
    let canonical_root = fs::canonicalize(workspace.root()).await?;
    if !is_strictly_within(&canonical_dir, &canonical_root)
        || !is_strictly_within(&canonical, &canonical_dir)
    {
        tracing::warn!(
            "Rejected artifact path '{}' for job {}: resolves outside job workspace",
            relative_path,
            job_id
        );
        return Err(forbidden(relative_path));
    }

    let metadata = fs::metadata(&canonical)
        .await
        .map_err(|e| missing_or_io(e, relative_path))?;
    if !metadata.is_file() {
        return Err(not_found(relative_path));
    }

    Ok(canonical)
}

fn forbidden(relative_path: &str) -> ArtifactError {
    ArtifactError::Forbidden(format!("Access denied to file {}", relative_path))
}

fn not_found(relative_path: &str) -> ArtifactError {
    ArtifactError::NotFound(format!("File {} not found", relative_path))
}

fn missing_or_io(err: io::Error, relative_path: &str) -> ArtifactError {
    if err.kind() == io::ErrorKind::NotFound {
        not_found(relative_path)
    } else {
        ArtifactError::Io(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::InMemoryJobRepository;
    use errand_core::dto::job::CreateJob;

    struct Fixture {
        repo: InMemoryJobRepository,
        workspace: Workspace,
        job_id: String,
        _tmp: tempfile::TempDir,
    }

    async fn fixture() -> Fixture {
        let tmp = tempfile::tempdir().unwrap();
        let workspace = Workspace::open(tmp.path().join("ws")).unwrap();
        let repo = InMemoryJobRepository::new();
        let job = repo.create(CreateJob::new("x")).await.unwrap();
        let job_id = job.id.to_string();

        let dir = workspace.job_dir(&job_id);
        std::fs::create_dir_all(dir.join("sub")).unwrap();
        std::fs::write(dir.join("report.md"), "# report").unwrap();
        std::fs::write(dir.join("sub/data.csv"), "a,b").unwrap();
        std::fs::write(tmp.path().join("outside.txt"), "secret").unwrap();

        Fixture {
            repo,
            workspace,
            job_id,
            _tmp: tmp,
        }
    }

    async fn resolve(f: &Fixture, job_id: &str, path: &str) -> Result<PathBuf, ArtifactError> {
        resolve_artifact(&f.repo, &f.workspace, job_id, path).await
    }

    #[tokio::test]
    async fn test_resolves_listed_files() {
        let f = fixture().await;

        let path = resolve(&f, &f.job_id, &format!("{}/report.md", f.job_id))
            .await
            .unwrap();
        assert_eq!(std::fs::read_to_string(path).unwrap(), "# report");

        let nested = resolve(&f, &f.job_id, &format!("{}/./sub/../sub/data.csv", f.job_id))
            .await
            .unwrap();
        assert!(nested.ends_with("sub/data.csv"));
    }

    #[tokio::test]
    async fn test_traversal_is_forbidden_for_any_job_id() {
        let f = fixture().await;
        let unknown = Uuid::new_v4().to_string();

        for job_id in [f.job_id.as_str(), unknown.as_str(), "not-a-uuid"] {
            let result = resolve(&f, job_id, "../../etc/passwd").await;
            assert!(
                matches!(result, Err(ArtifactError::Forbidden(_))),
                "{job_id}: {result:?}"
            );
        }
    }

    #[tokio::test]
    async fn test_escape_after_entering_job_dir_is_forbidden() {
        let f = fixture().await;

        for path in [
            format!("{}/../outside.txt", f.job_id),
            format!("{}/../../outside.txt", f.job_id),
            format!("{}/sub/../../{}/report.md", f.job_id, Uuid::new_v4()),
            "/etc/passwd".to_string(),
            f.job_id.clone(),
            format!("{}/.", f.job_id),
        ] {
            let result = resolve(&f, &f.job_id, &path).await;
            assert!(
                matches!(result, Err(ArtifactError::Forbidden(_))),
                "{path}: {result:?}"
            );
        }
    }

    #[tokio::test]
    async fn test_other_jobs_files_are_forbidden() {
        let f = fixture().await;
        let other = f.repo.create(CreateJob::new("y")).await.unwrap();

        let result = resolve(&f, &other.id.to_string(), &format!("{}/report.md", f.job_id)).await;
        assert!(matches!(result, Err(ArtifactError::Forbidden(_))));
    }

    #[tokio::test]
    async fn test_job_id_must_be_plain() {
        let f = fixture().await;

        for job_id in ["..", ".", "a/b"] {
            let result = resolve(&f, job_id, "x").await;
            assert!(matches!(result, Err(ArtifactError::Forbidden(_))), "{job_id}");
        }
    }

    #[tokio::test]
    async fn test_unknown_job_is_not_found() {
        let f = fixture().await;
        let unknown = Uuid::new_v4().to_string();

        let result = resolve(&f, &unknown, &format!("{}/report.md", unknown)).await;
        assert!(matches!(result, Err(ArtifactError::NotFound(_))));

        let result = resolve(&f, "not-a-uuid", "not-a-uuid/report.md").await;
        assert!(matches!(result, Err(ArtifactError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_missing_file_and_directories_are_not_found() {
        let f = fixture().await;

        let missing = resolve(&f, &f.job_id, &format!("{}/nope.txt", f.job_id)).await;
        assert!(matches!(missing, Err(ArtifactError::NotFound(_))));

        let dir = resolve(&f, &f.job_id, &format!("{}/sub", f.job_id)).await;
        assert!(matches!(dir, Err(ArtifactError::NotFound(_))));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_symlink_escape_is_forbidden() {
        let f = fixture().await;
        let dir = f.workspace.job_dir(&f.job_id);
        let outside = f.workspace.root().parent().unwrap().join("outside.txt");
        std::os::unix::fs::symlink(&outside, dir.join("link.txt")).unwrap();

        let result = resolve(&f, &f.job_id, &format!("{}/link.txt", f.job_id)).await;
        assert!(matches!(result, Err(ArtifactError::Forbidden(_))));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_symlink_inside_job_dir_is_allowed() {
        let f = fixture().await;
        let dir = f.workspace.job_dir(&f.job_id);
        std::os::unix::fs::symlink(dir.join("report.md"), dir.join("alias.md")).unwrap();

        let path = resolve(&f, &f.job_id, &format!("{}/alias.md", f.job_id))
            .await
            .unwrap();
        assert!(path.ends_with("report.md"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_symlinked_job_dir_is_forbidden() {
        let tmp = tempfile::tempdir().unwrap();
        let workspace = Workspace::open(tmp.path().join("ws")).unwrap();
        let repo = InMemoryJobRepository::new();
        let job = repo.create(CreateJob::new("x")).await.unwrap();
        let job_id = job.id.to_string();

        let outside = tmp.path().join("outside");
        std::fs::create_dir_all(&outside).unwrap();
        std::fs::write(outside.join("secret.txt"), "secret").unwrap();
        std::os::unix::fs::symlink(&outside, workspace.job_dir(&job_id)).unwrap();

        let result = resolve_artifact(
            &repo,
            &workspace,
            &job_id,
            &format!("{}/secret.txt", job_id),
        )
        .await;
        assert!(matches!(result, Err(ArtifactError::Forbidden(_))), "{result:?}");
    }
}
