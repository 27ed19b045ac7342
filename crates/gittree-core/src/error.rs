//! Unified error types for gittree

use thiserror::Error;

/// Why the repository backend refused or failed a mutation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationFailure {
    /// The operation stopped on a merge conflict
    Conflict,
    /// Local modifications would be overwritten
    DirtyWorkingTree,
    /// The target revision or ref does not exist
    RefNotFound,
    /// A branch or tag with that name already exists
    AlreadyExists,
    /// Anything the backend reported that does not fit the above
    Other,
}

impl std::fmt::Display for MutationFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Conflict => write!(f, "conflict"),
            Self::DirtyWorkingTree => write!(f, "dirty working tree"),
            Self::RefNotFound => write!(f, "ref not found"),
            Self::AlreadyExists => write!(f, "already exists"),
            Self::Other => write!(f, "failed"),
        }
    }
}

/// Unified error type for all gittree operations
#[derive(Error, Debug)]
pub enum GitTreeError {
    // Graph construction
    #[error("Malformed commit record: {0}")]
    MalformedRecord(String),

    // Filtering
    #[error("Invalid filter: {0}")]
    InvalidFilter(String),

    // Mutations
    #[error("{reason}: {message}")]
    BackendMutationFailed {
        reason: MutationFailure,
        message: String,
    },

    #[error("Another action is still running")]
    ActionInProgress,

    #[error("Invalid ref name: {0}")]
    InvalidRefName(String),

    // Git plumbing
    #[error("Git command failed: {0}")]
    GitCommand(String),

    #[error("Repository error: {0}")]
    Repository(String),

    // Configuration
    #[error("Config error: {0}")]
    Config(String),

    // Terminal
    #[error("Terminal error: {0}")]
    Terminal(String),

    // I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Generic
    #[error("{0}")]
    Other(String),
}

impl GitTreeError {
    /// Whether this error only concerns one user request and leaves the
    /// session usable
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Self::Repository(_) | Self::Terminal(_))
    }
}

/// Result type alias using GitTreeError
pub type Result<T> = std::result::Result<T, GitTreeError>;
