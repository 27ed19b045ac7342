//! Core type definitions for gittree

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Full commit identifier (hex object id)
pub type CommitId = String;

/// Number of hex digits shown for abbreviated ids
pub const SHORT_ID_LEN: usize = 7;

/// Kind of ref decorating a commit
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefKind {
    /// `HEAD`, attached or detached
    Head,
    /// Local branch under `refs/heads/`
    Branch,
    /// Remote-tracking branch under `refs/remotes/`
    RemoteBranch,
    /// Tag under `refs/tags/`
    Tag,
}

/// A ref pointing at a commit, with its short display name
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RefName {
    pub kind: RefKind,
    pub name: String,
}

impl RefName {
    pub fn new(kind: RefKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
        }
    }

    /// Classify a fully-qualified ref (`refs/heads/main`, `refs/tags/v1`, ...)
    pub fn from_full_name(full: &str) -> Self {
        if full == "HEAD" {
            Self::new(RefKind::Head, "HEAD")
        } else if let Some(name) = full.strip_prefix("refs/heads/") {
            Self::new(RefKind::Branch, name)
        } else if let Some(name) = full.strip_prefix("refs/remotes/") {
            Self::new(RefKind::RemoteBranch, name)
        } else if let Some(name) = full.strip_prefix("refs/tags/") {
            Self::new(RefKind::Tag, name)
        } else {
            Self::new(RefKind::Branch, full.strip_prefix("refs/").unwrap_or(full))
        }
    }
}

impl std::fmt::Display for RefName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.kind {
            RefKind::Tag => write!(f, "tag: {}", self.name),
            _ => write!(f, "{}", self.name),
        }
    }
}

/// One commit as produced by a commit source. Immutable once emitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitRecord {
    /// Full object id, unique within one generation
    pub id: CommitId,
    /// Abbreviated id for display
    pub short_id: String,
    /// Parent ids: empty for a root, two or more for a merge
    pub parents: Vec<CommitId>,
    pub author_name: String,
    pub author_email: String,
    pub author_time: DateTime<Utc>,
    pub commit_time: DateTime<Utc>,
    /// First line of the message
    pub subject: String,
    /// Branch heads, tags and HEAD pointing here
    pub refs: Vec<RefName>,
}

impl CommitRecord {
    /// Minimal record with the given id and parents; other fields empty
    pub fn new(id: impl Into<CommitId>, parents: &[&str]) -> Self {
        let id = id.into();
        let epoch = DateTime::<Utc>::default();
        Self {
            short_id: abbreviate(&id),
            id,
            parents: parents.iter().map(|p| p.to_string()).collect(),
            author_name: String::new(),
            author_email: String::new(),
            author_time: epoch,
            commit_time: epoch,
            subject: String::new(),
            refs: Vec::new(),
        }
    }

    pub fn with_author(mut self, name: impl Into<String>, email: impl Into<String>) -> Self {
        self.author_name = name.into();
        self.author_email = email.into();
        self
    }

    /// Set both author and committer time
    pub fn with_time(mut self, time: DateTime<Utc>) -> Self {
        self.author_time = time;
        self.commit_time = time;
        self
    }

    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = subject.into();
        self
    }

    pub fn with_ref(mut self, r: RefName) -> Self {
        self.refs.push(r);
        self
    }

    pub fn is_merge(&self) -> bool {
        self.parents.len() > 1
    }

    pub fn is_root(&self) -> bool {
        self.parents.is_empty()
    }

    /// Whether HEAD points at this commit
    pub fn is_head(&self) -> bool {
        self.refs.iter().any(|r| r.kind == RefKind::Head)
    }
}

/// Abbreviate a full id to the display length
pub fn abbreviate(id: &str) -> String {
    id.chars().take(SHORT_ID_LEN).collect()
}

/// Id of one complete graph-construction run.
///
/// Incremented whenever a filter change or refresh replaces the commit
/// source. Results stamped with an older generation are discarded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Generation(pub u64);

impl Generation {
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl std::fmt::Display for Generation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "g{}", self.0)
    }
}

/// Filter parameters as entered by the user (flags or filter prompt).
///
/// Nothing here is validated; the filter engine turns it into a
/// [`SourceConfig`] or rejects it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterParams {
    /// Author pattern (regex)
    pub author: Option<String>,
    /// Commit message pattern (regex)
    pub message: Option<String>,
    /// Limit to commits touching these paths
    pub paths: Vec<String>,
    /// Absolute date or relative duration ("2w", "3d", "12h")
    pub since: Option<String>,
    pub until: Option<String>,
    /// Rev range such as `main..feature` or `v1.2..`
    pub range: Option<String>,
    /// Cap on the number of commits read; 0 or None means unlimited
    pub max_commits: Option<usize>,
    /// Follow renames of a single path
    pub follow: bool,
}

impl FilterParams {
    /// True when no filter narrows the history
    pub fn is_empty(&self) -> bool {
        self.author.is_none()
            && self.message.is_none()
            && self.paths.is_empty()
            && self.since.is_none()
            && self.until.is_none()
            && self.range.is_none()
            && self.max_commits.unwrap_or(0) == 0
    }
}

/// Validated description of which commits a source should produce
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceConfig {
    pub author: Option<String>,
    pub message: Option<String>,
    pub paths: Vec<String>,
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
    pub range: Option<String>,
    pub max_commits: Option<usize>,
    pub follow: bool,
}

/// Logical action the user can invoke on the selected commit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionKind {
    Checkout,
    Reset,
    CherryPick,
    Revert,
    NewBranch,
    NewTag,
}

impl ActionKind {
    /// Destructive actions may require confirmation
    pub fn is_destructive(&self) -> bool {
        matches!(self, Self::Reset)
    }

    /// Actions that need a name typed by the user
    pub fn needs_name(&self) -> bool {
        matches!(self, Self::NewBranch | Self::NewTag)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Checkout => "checkout",
            Self::Reset => "reset --hard",
            Self::CherryPick => "cherry-pick",
            Self::Revert => "revert",
            Self::NewBranch => "new branch",
            Self::NewTag => "new tag",
        }
    }
}

/// A mutation sent to the repository backend. Targets are full commit ids.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationRequest {
    Checkout { target: CommitId },
    ResetHard { target: CommitId },
    CherryPick { target: CommitId },
    Revert { target: CommitId },
    CreateBranch { name: String, target: CommitId },
    CreateTag { name: String, target: CommitId },
}

impl MutationRequest {
    /// Build the request for an action; `name` is required for branch/tag
    pub fn for_action(kind: ActionKind, target: CommitId, name: Option<String>) -> Option<Self> {
        Some(match kind {
            ActionKind::Checkout => Self::Checkout { target },
            ActionKind::Reset => Self::ResetHard { target },
            ActionKind::CherryPick => Self::CherryPick { target },
            ActionKind::Revert => Self::Revert { target },
            ActionKind::NewBranch => Self::CreateBranch { name: name?, target },
            ActionKind::NewTag => Self::CreateTag { name: name?, target },
        })
    }

    pub fn kind(&self) -> ActionKind {
        match self {
            Self::Checkout { .. } => ActionKind::Checkout,
            Self::ResetHard { .. } => ActionKind::Reset,
            Self::CherryPick { .. } => ActionKind::CherryPick,
            Self::Revert { .. } => ActionKind::Revert,
            Self::CreateBranch { .. } => ActionKind::NewBranch,
            Self::CreateTag { .. } => ActionKind::NewTag,
        }
    }

    pub fn target(&self) -> &str {
        match self {
            Self::Checkout { target }
            | Self::ResetHard { target }
            | Self::CherryPick { target }
            | Self::Revert { target }
            | Self::CreateBranch { target, .. }
            | Self::CreateTag { target, .. } => target,
        }
    }

    /// One-line description for status and confirmation messages
    pub fn describe(&self) -> String {
        let short = abbreviate(self.target());
        match self {
            Self::CreateBranch { name, .. } => format!("branch '{}' at {}", name, short),
            Self::CreateTag { name, .. } => format!("tag '{}' at {}", name, short),
            other => format!("{} {}", other.kind().label(), short),
        }
    }
}

/// One changed file in a commit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileChange {
    /// Status letter as reported by git (A, M, D, R, ...)
    pub status: char,
    pub path: String,
}

/// Extra information shown in the details pane
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommitDetails {
    pub id: CommitId,
    /// Full message body (subject excluded)
    pub body: String,
    pub files: Vec<FileChange>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ref_classification() {
        assert_eq!(
            RefName::from_full_name("refs/heads/main"),
            RefName::new(RefKind::Branch, "main")
        );
        assert_eq!(
            RefName::from_full_name("refs/remotes/origin/main"),
            RefName::new(RefKind::RemoteBranch, "origin/main")
        );
        assert_eq!(
            RefName::from_full_name("refs/tags/v1.0"),
            RefName::new(RefKind::Tag, "v1.0")
        );
        assert_eq!(RefName::from_full_name("HEAD").kind, RefKind::Head);
    }

    #[test]
    fn test_generation_is_monotonic() {
        let g = Generation::default();
        assert!(g.next() > g);
        assert_eq!(g.next().next(), Generation(2));
    }

    #[test]
    fn test_record_builder() {
        let record = CommitRecord::new("0123456789abcdef", &["aaaa", "bbbb"])
            .with_author("alice", "alice@example.com")
            .with_subject("Merge branch 'x'");
        assert_eq!(record.short_id, "0123456");
        assert!(record.is_merge());
        assert!(!record.is_root());
    }

    #[test]
    fn test_mutation_request_for_action() {
        let req = MutationRequest::for_action(ActionKind::Reset, "abcdef0123".into(), None);
        assert_eq!(
            req,
            Some(MutationRequest::ResetHard {
                target: "abcdef0123".into()
            })
        );
        assert!(MutationRequest::for_action(ActionKind::NewTag, "abc".into(), None).is_none());

        let branch = MutationRequest::for_action(
            ActionKind::NewBranch,
            "abcdef0123".into(),
            Some("feature".into()),
        )
        .unwrap();
        assert_eq!(branch.describe(), "branch 'feature' at abcdef0");
        assert_eq!(branch.kind(), ActionKind::NewBranch);
    }

    #[test]
    fn test_action_kind_flags() {
        assert!(ActionKind::Reset.is_destructive());
        assert!(!ActionKind::Checkout.is_destructive());
        assert!(ActionKind::NewTag.needs_name());
    }

    #[test]
    fn test_filter_params_empty() {
        let mut params = FilterParams::default();
        assert!(params.is_empty());
        params.max_commits = Some(0);
        assert!(params.is_empty());
        params.author = Some("alice".into());
        assert!(!params.is_empty());
    }
}
