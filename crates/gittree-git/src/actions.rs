//! Mutating actions on the repository
//!
//! [`ActionDispatcher`] is the only way the navigator touches the working
//! tree. It runs at most one mutation at a time and turns backend failures
//! into typed [`MutationFailure`]s.

use async_trait::async_trait;
use gittree_core::{GitTreeError, MutationFailure, MutationRequest, Result};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, instrument, warn};

use crate::command::GitExecutor;
use crate::validate::{validate_ref_name, validate_revision};

/// Backend executing mutation requests
#[async_trait]
pub trait ActionBackend: Send + Sync {
    async fn execute(&self, request: &MutationRequest) -> Result<()>;
}

/// Runs mutations as git commands
pub struct GitActionBackend {
    executor: Arc<dyn GitExecutor>,
}

impl GitActionBackend {
    pub fn new(executor: Arc<dyn GitExecutor>) -> Self {
        Self { executor }
    }

    /// git arguments for a request
    pub fn command_for(request: &MutationRequest) -> Vec<&str> {
        match request {
            MutationRequest::Checkout { target } => vec!["checkout", target.as_str()],
            MutationRequest::ResetHard { target } => vec!["reset", "--hard", target.as_str()],
            MutationRequest::CherryPick { target } => vec!["cherry-pick", target.as_str()],
            MutationRequest::Revert { target } => vec!["revert", "--no-edit", target.as_str()],
            MutationRequest::CreateBranch { name, target } => {
                vec!["branch", name.as_str(), target.as_str()]
            }
            MutationRequest::CreateTag { name, target } => {
                vec!["tag", name.as_str(), target.as_str()]
            }
        }
    }
}

#[async_trait]
impl ActionBackend for GitActionBackend {
    #[instrument(skip(self), fields(action = request.kind().label()))]
    async fn execute(&self, request: &MutationRequest) -> Result<()> {
        validate_revision(request.target())?;
        if let MutationRequest::CreateBranch { name, .. } | MutationRequest::CreateTag { name, .. } =
            request
        {
            validate_ref_name(name)?;
        }

        let output = self.executor.exec(&Self::command_for(request)).await?;
        if output.success {
            return Ok(());
        }

        let reason = classify_failure(&output.stderr);
        let message = first_error_line(&output.stderr);
        warn!(%reason, "{} failed: {}", request.describe(), message);
        Err(GitTreeError::BackendMutationFailed { reason, message })
    }
}

/// Classify git's stderr into a failure reason
pub fn classify_failure(stderr: &str) -> MutationFailure {
    let text = stderr.to_lowercase();
    if text.contains("conflict") || text.contains("could not apply") || text.contains("could not revert") {
        MutationFailure::Conflict
    } else if text.contains("would be overwritten")
        || text.contains("local changes")
        || text.contains("your index file is unmerged")
        || text.contains("uncommitted changes")
    {
        MutationFailure::DirtyWorkingTree
    } else if text.contains("already exists") {
        MutationFailure::AlreadyExists
    } else if text.contains("unknown revision")
        || text.contains("did not match any")
        || text.contains("bad revision")
        || text.contains("not a valid object name")
        || text.contains("bad object")
    {
        MutationFailure::RefNotFound
    } else {
        MutationFailure::Other
    }
}

/// Most relevant line of git's stderr: the first `error:`/`fatal:` line,
/// else the first non-empty one
fn first_error_line(stderr: &str) -> String {
    let lines: Vec<&str> = stderr.lines().map(str::trim).filter(|l| !l.is_empty()).collect();
    lines
        .iter()
        .find(|l| l.starts_with("error:") || l.starts_with("fatal:"))
        .or_else(|| lines.first())
        .map(|l| l.to_string())
        .unwrap_or_else(|| "git exited with an error".to_string())
}

/// Serializes mutation requests: at most one is outstanding at a time
#[derive(Clone)]
pub struct ActionDispatcher {
    backend: Arc<dyn ActionBackend>,
    gate: Arc<Mutex<()>>,
}

impl ActionDispatcher {
    pub fn new(backend: Arc<dyn ActionBackend>) -> Self {
        Self {
            backend,
            gate: Arc::new(Mutex::new(())),
        }
    }

    /// Whether a mutation is currently running
    pub fn is_busy(&self) -> bool {
        self.gate.try_lock().is_err()
    }

    /// Run `request`, failing with `ActionInProgress` if another is running
    pub async fn dispatch(&self, request: MutationRequest) -> Result<()> {
        let _guard = self
            .gate
            .try_lock()
            .map_err(|_| GitTreeError::ActionInProgress)?;

        info!("Dispatching {}", request.describe());
        self.backend.execute(&request).await?;
        info!("Completed {}", request.describe());
        Ok(())
    }
}
