//! Workspace store
//!
//! A root directory under which every job owns the subdirectory named after
//! its id. The engine materializes that subdirectory as it writes outputs;
//! this module only computes paths, enforces containment and enumerates
//! files.

use std::io;
use std::path::{Component, Path, PathBuf};

use tokio::fs;

/// Filesystem facade for job artifacts
#[derive(Debug, Clone)]
pub struct Workspace {
    root: PathBuf,
}

impl Workspace {
    /// Creates a workspace rooted at `root` without touching the filesystem
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Creates the root directory if absent and anchors the workspace at its
    /// canonical path
    pub fn open(root: impl AsRef<Path>) -> io::Result<Self> {
        let root = root.as_ref();
        std::fs::create_dir_all(root)?;
        Ok(Self::new(root.canonicalize()?))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Conventional subdirectory for a job (not necessarily present on disk)
    pub fn job_dir(&self, job_id: impl AsRef<str>) -> PathBuf {
        self.root.join(job_id.as_ref())
    }

    /// Lists regular files under a job's subdirectory, recursively
    ///
    /// Paths are relative to the workspace root (`<job id>/...`), use `/` as
    /// separator and are sorted. Symbolic links are not followed, including
    /// a job subdirectory that is itself a link. A missing subdirectory
    /// yields an empty list.
    pub async fn list_files(&self, job_id: impl AsRef<str>) -> io::Result<Vec<String>> {
        let job_dir = self.job_dir(job_id);
        let mut files = Vec::new();

        match fs::symlink_metadata(&job_dir).await {
            Ok(metadata) if metadata.is_dir() => {}
            Ok(_) => return Ok(files),
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(files),
            Err(e) => return Err(e),
        }

        let mut pending = vec![job_dir];

        while let Some(dir) = pending.pop() {
            let mut entries = match fs::read_dir(&dir).await {
                Ok(entries) => entries,
                Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
                Err(e) => return Err(e),
            };

            while let Some(entry) = entries.next_entry().await? {
                let file_type = entry.file_type().await?;
                let path = entry.path();
                if file_type.is_dir() {
                    pending.push(path);
                } else if file_type.is_file() {
                    files.push(self.relative_display(&path));
                }
            }
        }

        files.sort();
        Ok(files)
    }

    fn relative_display(&self, path: &Path) -> String {
        let relative = path.strip_prefix(&self.root).unwrap_or(path);
        relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/")
    }
}

/// Resolves `.` and `..` segments without consulting the filesystem
///
/// `..` never climbs above a root or prefix; on relative paths leading `..`
/// segments are preserved.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut parts: Vec<Component> = Vec::new();

    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match parts.last() {
                Some(Component::Normal(_)) => {
                    parts.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => parts.push(component),
            },
            other => parts.push(other),
        }
    }

    parts.iter().collect()
}

/// Whether `path` lies strictly below `dir` (component-wise, `dir` itself excluded)
pub fn is_strictly_within(path: &Path, dir: &Path) -> bool {
    path != dir && path.starts_with(dir)
}

/// Whether `name` is usable as a single directory name under the root
pub fn is_plain_component(name: &str) -> bool {
    let mut components = Path::new(name).components();
    !name.contains(['/', '\\'])
        && matches!(components.next(), Some(Component::Normal(_)))
        && components.next().is_none()
}
