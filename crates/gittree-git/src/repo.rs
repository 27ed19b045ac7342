//! Repository discovery using the gix crate.

use gittree_core::{GitTreeError, Result};
use std::path::{Path, PathBuf};
use tracing::debug;

/// A discovered git repository
#[derive(Debug, Clone)]
pub struct GitRepository {
    work_dir: PathBuf,
    git_dir: PathBuf,
    head: Option<String>,
}

impl GitRepository {
    /// Find the repository containing `path`.
    ///
    /// Fails for paths outside a repository and for bare repositories,
    /// which have no working tree to act on.
    pub fn discover(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let repo = gix::discover(path).map_err(|e| {
            GitTreeError::Repository(format!(
                "{} is not inside a git repository: {}",
                path.display(),
                e
            ))
        })?;

        let work_dir = repo
            .work_dir()
            .ok_or_else(|| GitTreeError::Repository("Repository has no working directory".to_string()))?
            .to_path_buf();
        let git_dir = repo.git_dir().to_path_buf();

        // Unborn or detached HEAD has no branch name
        let head = repo
            .head_name()
            .ok()
            .flatten()
            .map(|name| name.shorten().to_string());

        debug!("Opened git repository at: {}", work_dir.display());
        Ok(Self {
            work_dir,
            git_dir,
            head,
        })
    }

    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    pub fn git_dir(&self) -> &Path {
        &self.git_dir
    }

    /// Short name of the checked-out branch, if any
    pub fn head_branch(&self) -> Option<&str> {
        self.head.as_deref()
    }

    /// Directory name of the working tree, for the title bar
    pub fn name(&self) -> String {
        self.work_dir
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| self.work_dir.display().to_string())
    }
}
