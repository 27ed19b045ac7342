//! # gittree-git
//!
//! Git integration layer for gittree.
//!
//! This crate provides:
//! - Git command execution abstraction (mockable)
//! - Commit sources: `git log` backed and in-memory
//! - Filter validation and the filter query language
//! - Serialized mutating actions (checkout, reset, cherry-pick, ...)
//! - Repository discovery and ref watching

mod actions;
mod command;
mod filter;
mod memory;
mod repo;
mod source;
pub mod validate;
mod watcher;

pub use actions::{classify_failure, ActionBackend, ActionDispatcher, GitActionBackend};
pub use command::{GitCommand, GitExecutor, GitOutput, MockGitExecutor};
pub use filter::{parse_query, parse_time, to_query, FilterEngine};
pub use memory::{MemoryRepo, MemorySource, MemorySourceFactory};
pub use repo::GitRepository;
pub use source::{
    parse_decorations, parse_log, parse_name_status, parse_rev_list, simplify_parents, Batch,
    CommitSource, GitLogSource, GitSourceFactory, ParentMap, SourceFactory, LOG_FORMAT,
};
pub use watcher::{is_ref_event, RefWatcher, DEBOUNCE};
