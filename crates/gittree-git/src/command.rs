//! Git command execution abstraction

use async_trait::async_trait;
use gittree_core::{GitTreeError, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Output;
use std::sync::{Arc, Mutex};
use tokio::process::Command;
use tracing::{debug, instrument};

/// Output from a git command
#[derive(Debug, Clone, Default)]
pub struct GitOutput {
    pub stdout: String,
    pub stderr: String,
    pub success: bool,
}

impl GitOutput {
    /// Successful output with the given stdout
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: String::new(),
            success: true,
        }
    }

    /// Failed output with the given stderr
    pub fn failed(stderr: impl Into<String>) -> Self {
        Self {
            stdout: String::new(),
            stderr: stderr.into(),
            success: false,
        }
    }
}

impl From<Output> for GitOutput {
    fn from(output: Output) -> Self {
        Self {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            success: output.status.success(),
        }
    }
}

/// Trait for executing git commands (allows mocking in tests)
#[async_trait]
pub trait GitExecutor: Send + Sync {
    /// Execute a git command with the given arguments
    async fn exec(&self, args: &[&str]) -> Result<GitOutput>;

    /// Working tree the commands run in
    fn repo_root(&self) -> &Path;
}

/// Real git command executor
#[derive(Debug, Clone)]
pub struct GitCommand {
    repo_root: PathBuf,
}

impl GitCommand {
    pub fn new(repo_root: impl Into<PathBuf>) -> Self {
        Self {
            repo_root: repo_root.into(),
        }
    }
}

#[async_trait]
impl GitExecutor for GitCommand {
    #[instrument(skip(self), fields(repo = %self.repo_root.display()))]
    async fn exec(&self, args: &[&str]) -> Result<GitOutput> {
        debug!("Executing git {:?}", args);

        let output = Command::new("git")
            .args(args)
            .current_dir(&self.repo_root)
            // Never stop for an editor or a pager
            .env("GIT_TERMINAL_PROMPT", "0")
            .env("GIT_EDITOR", "true")
            .env("GIT_PAGER", "cat")
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| GitTreeError::GitCommand(format!("Failed to execute git: {}", e)))?;

        let git_output = GitOutput::from(output);

        if !git_output.success {
            debug!("git command failed: {}", git_output.stderr.trim());
        }

        Ok(git_output)
    }

    fn repo_root(&self) -> &Path {
        &self.repo_root
    }
}

/// Mock git executor for testing
///
/// Responses are keyed on the space-joined argument list. Every call is
/// recorded so tests can assert on what was run.
#[derive(Debug, Clone)]
pub struct MockGitExecutor {
    repo_root: PathBuf,
    responses: HashMap<String, GitOutput>,
    calls: Arc<Mutex<Vec<String>>>,
}

impl Default for MockGitExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl MockGitExecutor {
    pub fn new() -> Self {
        Self {
            repo_root: PathBuf::from("/mock/repo"),
            responses: HashMap::new(),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn with_response(mut self, command: &str, output: GitOutput) -> Self {
        self.responses.insert(command.to_string(), output);
        self
    }

    /// Commands executed so far, as space-joined argument lists
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl GitExecutor for MockGitExecutor {
    async fn exec(&self, args: &[&str]) -> Result<GitOutput> {
        let key = args.join(" ");
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(key.clone());
        }
        self.responses
            .get(&key)
            .cloned()
            .ok_or_else(|| GitTreeError::GitCommand(format!("No mock response for: {}", key)))
    }

    fn repo_root(&self) -> &Path {
        &self.repo_root
    }
}
