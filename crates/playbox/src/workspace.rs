//! Per-execution scratch directories
//!
//! A [`ScratchRoot`] is created once per process. Every execution acquires
//! its own [`Workspace`] below it, named with a random UUID so concurrent
//! executions never collide, and releases it when done.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

/// Attempts at finding an unused workspace name before giving up
const MAX_ACQUIRE_ATTEMPTS: usize = 4;

const WORKSPACE_PREFIX: &str = "run-";

/// Errors that occur while managing scratch directories
#[derive(Debug, Error)]
pub enum WorkspaceError {
    #[error("failed to create scratch root {path}: {source}")]
    CreateRoot {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to create workspace under {root}: {source}")]
    Create {
        root: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid path: {0}")]
    InvalidPath(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Fixed directory holding all workspaces
///
/// Shared read-only between executions; uniqueness of workspace names makes
/// unsynchronized concurrent use safe.
#[derive(Debug, Clone)]
pub struct ScratchRoot {
    path: PathBuf,
}

impl ScratchRoot {
    /// Create the scratch root (and parents) if missing
    pub fn create(path: impl Into<PathBuf>) -> Result<Self, WorkspaceError> {
        let path = path.into();
        std::fs::create_dir_all(&path).map_err(|source| WorkspaceError::CreateRoot {
            path: path.clone(),
            source,
        })?;
        debug!(path = %path.display(), "scratch root ready");
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Create a fresh, uniquely named workspace
    #[instrument(skip(self), fields(root = %self.path.display()))]
    pub async fn acquire(&self) -> Result<Workspace, WorkspaceError> {
        let mut last_error = None;

        for _ in 0..MAX_ACQUIRE_ATTEMPTS {
            let id = Uuid::new_v4();
            let path = self.path.join(format!("{WORKSPACE_PREFIX}{id}"));

            // create_dir (not create_dir_all) fails if the name is taken
            match tokio::fs::create_dir(&path).await {
                Ok(()) => {
                    debug!(%id, "workspace acquired");
                    return Ok(Workspace {
                        id,
                        path,
                        released: false,
                    });
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    warn!(%id, "workspace name collision, retrying");
                    last_error = Some(e);
                }
                Err(source) => {
                    return Err(WorkspaceError::Create {
                        root: self.path.clone(),
                        source,
                    });
                }
            }
        }

        Err(WorkspaceError::Create {
            root: self.path.clone(),
            source: last_error.unwrap_or_else(|| ErrorKind::AlreadyExists.into()),
        })
    }
}

/// Scratch directory exclusively owned by one execution
///
/// # Cleanup
///
/// Call [`release()`](Self::release) when the execution is over. If a
/// workspace is dropped without being released (a panic, or the owning
/// future being cancelled) the directory is removed synchronously in `Drop`.
#[derive(Debug)]
pub struct Workspace {
    id: Uuid,
    path: PathBuf,
    released: bool,
}

impl Workspace {
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Absolute path of the workspace directory
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Get the path to a file inside the workspace
    ///
    /// Returns an error if the path contains path traversal attempts.
    pub fn file_path(&self, name: &str) -> Result<PathBuf, WorkspaceError> {
        if name.is_empty() || name.contains("..") || name.starts_with('/') {
            return Err(WorkspaceError::InvalidPath(format!(
                "path traversal not allowed: {name}"
            )));
        }
        Ok(self.path.join(name))
    }

    /// Write a file into the workspace
    #[instrument(skip(self, content), fields(workspace = %self.id))]
    pub async fn write_file(&self, name: &str, content: &[u8]) -> Result<PathBuf, WorkspaceError> {
        let path = self.file_path(name)?;
        tokio::fs::write(&path, content).await?;
        debug!(?path, len = content.len(), "wrote file to workspace");
        Ok(path)
    }

    /// Check if a file exists in the workspace
    pub async fn file_exists(&self, name: &str) -> Result<bool, WorkspaceError> {
        let path = self.file_path(name)?;
        Ok(tokio::fs::metadata(&path).await.is_ok())
    }

    /// Delete the workspace and everything in it
    ///
    /// Failures are logged, never returned: cleanup must not mask the
    /// execution outcome.
    #[instrument(skip(self), fields(workspace = %self.id))]
    pub async fn release(mut self) {
        self.released = true;
        match tokio::fs::remove_dir_all(&self.path).await {
            Ok(()) => debug!("workspace released"),
            Err(e) if e.kind() == ErrorKind::NotFound => debug!("workspace already gone"),
            Err(e) => warn!(path = %self.path.display(), error = %e, "failed to release workspace"),
        }
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        if self.released {
            return;
        }

        warn!(
            workspace = %self.id,
            path = %self.path.display(),
            "workspace dropped without release, removing synchronously"
        );

        match std::fs::remove_dir_all(&self.path) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => warn!(workspace = %self.id, error = %e, "best-effort cleanup failed"),
        }
    }
}
