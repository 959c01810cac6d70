use std::path::Path;
use std::path::PathBuf;

use log::debug;
use log::warn;

use crate::error::PrepError;
use crate::target::Repo;

/// Per-PR scratch directory holding one clone per [`Repo`].
///
/// The directory is removed when the value is dropped, unless it was
/// explicitly released with [`Workspace::remove`] or [`Workspace::keep`].
#[derive(Debug)]
pub struct Workspace {
    path: PathBuf,
    armed: bool,
}

impl Workspace {
    pub fn dir_name(pr_number: &str) -> String {
        format!("prep-waldo-workspace-{}", pr_number)
    }

    /// Create `root/prep-waldo-workspace-<pr>`; an existing directory is reused.
    pub async fn create(root: &Path, pr_number: &str) -> Result<Self, PrepError> {
        let path = root.join(Self::dir_name(pr_number));
        tokio::fs::create_dir_all(&path)
            .await
            .map_err(|err| PrepError::WorkspaceCreateFailed {
                path: path.clone(),
                detail: err.to_string(),
            })?;
        debug!("Created workspace {}", path.display());

        Ok(Self { path, armed: true })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn repo_dir(&self, repo: Repo) -> PathBuf {
        self.path.join(repo.name())
    }

    /// Remove the workspace now, reporting failure instead of only logging it.
    pub async fn remove(mut self) -> Result<(), PrepError> {
        self.armed = false;
        let result = match tokio::fs::remove_dir_all(&self.path).await {
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            result => result,
        };
        result.map_err(|err| PrepError::CleanupFailed {
            path: self.path.clone(),
            detail: err.to_string(),
        })
    }

    /// Leave the workspace on disk and return its path.
    pub fn keep(mut self) -> PathBuf {
        self.armed = false;
        std::mem::take(&mut self.path)
    }
}

// Drop cannot await, so this path blocks
impl Drop for Workspace {
    fn drop(&mut self) {
        if self.armed
            && let Err(err) = std::fs::remove_dir_all(&self.path)
            && err.kind() != std::io::ErrorKind::NotFound
        {
            warn!(
                "Warning: failed to cleanup workspace {}: {}",
                self.path.display(),
                err
            );
        }
    }
}
