//! In-memory commit source
//!
//! Holds a complete DAG and answers pulls from a precomputed, filtered
//! order. Used by tests and by anything that already has the history in
//! memory.

use async_trait::async_trait;
use gittree_core::{
    CommitDetails, CommitId, CommitRecord, FileChange, GitTreeError, RefKind, Result,
    SourceConfig,
};
use regex::Regex;
use std::cmp::{Ordering, Reverse};
use std::collections::{BinaryHeap, HashMap, HashSet};
use std::sync::Arc;
use tracing::debug;

use crate::source::{Batch, CommitSource, SourceFactory};

/// A complete in-memory history: records plus optional per-commit bodies
/// and changed files
#[derive(Debug, Clone, Default)]
pub struct MemoryRepo {
    records: Vec<CommitRecord>,
    bodies: HashMap<CommitId, String>,
    files: HashMap<CommitId, Vec<FileChange>>,
}

impl MemoryRepo {
    pub fn new(records: Vec<CommitRecord>) -> Self {
        Self {
            records,
            ..Default::default()
        }
    }

    pub fn with_body(mut self, id: &str, body: impl Into<String>) -> Self {
        self.bodies.insert(id.to_string(), body.into());
        self
    }

    pub fn with_files(mut self, id: &str, paths: &[&str]) -> Self {
        self.files.insert(
            id.to_string(),
            paths
                .iter()
                .map(|p| FileChange {
                    status: 'M',
                    path: p.to_string(),
                })
                .collect(),
        );
        self
    }

    pub fn records(&self) -> &[CommitRecord] {
        &self.records
    }

    /// Resolve a revision: full id, branch/tag name, `HEAD`, or a unique
    /// id prefix of at least four characters
    fn resolve(&self, rev: &str) -> Result<&CommitRecord> {
        if let Some(record) = self.records.iter().find(|r| r.id == rev) {
            return Ok(record);
        }
        if let Some(record) = self.records.iter().find(|r| {
            r.refs.iter().any(|n| match n.kind {
                RefKind::Head => rev == "HEAD",
                _ => n.name == rev,
            })
        }) {
            return Ok(record);
        }
        if rev.len() >= 4 {
            let mut matches = self.records.iter().filter(|r| r.id.starts_with(rev));
            if let (Some(record), None) = (matches.next(), matches.next()) {
                return Ok(record);
            }
        }
        Err(GitTreeError::GitCommand(format!("unknown revision '{}'", rev)))
    }

    fn reachable(&self, tip: &str, index: &HashMap<&str, &CommitRecord>) -> HashSet<CommitId> {
        let mut seen = HashSet::new();
        let mut stack = vec![tip.to_string()];
        while let Some(id) = stack.pop() {
            let Some(record) = index.get(id.as_str()) else {
                continue;
            };
            if seen.insert(id) {
                stack.extend(record.parents.iter().cloned());
            }
        }
        seen
    }

    /// Commits selected by a rev range, or all commits without one
    fn range_set(&self, range: Option<&str>) -> Result<HashSet<CommitId>> {
        let index: HashMap<&str, &CommitRecord> =
            self.records.iter().map(|r| (r.id.as_str(), r)).collect();
        let Some(range) = range else {
            return Ok(self.records.iter().map(|r| r.id.clone()).collect());
        };

        let side = |rev: &str| -> Result<HashSet<CommitId>> {
            let rev = if rev.is_empty() { "HEAD" } else { rev };
            let tip = self.resolve(rev)?;
            Ok(self.reachable(&tip.id, &index))
        };

        if let Some((left, right)) = range.split_once("...") {
            let (a, b) = (side(left)?, side(right)?);
            return Ok(a.symmetric_difference(&b).cloned().collect());
        }
        if let Some((left, right)) = range.split_once("..") {
            let (a, b) = (side(left)?, side(right)?);
            return Ok(b.difference(&a).cloned().collect());
        }
        side(range)
    }
}

/// Display-order key: newer commit time first, then smaller id
#[derive(PartialEq, Eq)]
struct ReadyKey<'a> {
    record: &'a CommitRecord,
}

impl Ord for ReadyKey<'_> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.record
            .commit_time
            .cmp(&other.record.commit_time)
            .then_with(|| Reverse(&self.record.id).cmp(&Reverse(&other.record.id)))
    }
}

impl PartialOrd for ReadyKey<'_> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Children-before-parents order over `ids`, ties broken by commit time
/// descending then id ascending
fn topo_order<'a>(
    ids: &HashSet<CommitId>,
    index: &HashMap<&str, &'a CommitRecord>,
) -> Vec<&'a CommitRecord> {
    let mut children: HashMap<&str, usize> = HashMap::new();
    for id in ids {
        if let Some(record) = index.get(id.as_str()) {
            for parent in &record.parents {
                if ids.contains(parent) {
                    *children.entry(parent.as_str()).or_default() += 1;
                }
            }
        }
    }

    let mut ready: BinaryHeap<ReadyKey> = ids
        .iter()
        .filter(|id| !children.contains_key(id.as_str()))
        .filter_map(|id| index.get(id.as_str()))
        .map(|record| ReadyKey { record: *record })
        .collect();

    let mut order = Vec::with_capacity(ids.len());
    while let Some(ReadyKey { record }) = ready.pop() {
        order.push(record);
        for parent in &record.parents {
            if let Some(count) = children.get_mut(parent.as_str()) {
                *count -= 1;
                if *count == 0 {
                    children.remove(parent.as_str());
                    if let Some(parent) = index.get(parent.as_str()) {
                        ready.push(ReadyKey { record: *parent });
                    }
                }
            }
        }
    }
    order
}

/// Compiled per-commit predicates of a [`SourceConfig`]
struct Matcher {
    author: Option<Regex>,
    message: Option<Regex>,
}

impl Matcher {
    fn new(config: &SourceConfig) -> Result<Self> {
        let compile = |pattern: &Option<String>| -> Result<Option<Regex>> {
            pattern
                .as_deref()
                .map(Regex::new)
                .transpose()
                .map_err(|e| GitTreeError::InvalidFilter(e.to_string()))
        };
        Ok(Self {
            author: compile(&config.author)?,
            message: compile(&config.message)?,
        })
    }

    fn matches(&self, repo: &MemoryRepo, config: &SourceConfig, record: &CommitRecord) -> bool {
        if let Some(author) = &self.author {
            let ident = format!("{} <{}>", record.author_name, record.author_email);
            if !author.is_match(&ident) {
                return false;
            }
        }
        if let Some(message) = &self.message {
            if !message.is_match(&record.subject) {
                return false;
            }
        }
        if config.since.is_some_and(|since| record.commit_time < since) {
            return false;
        }
        if config.until.is_some_and(|until| record.commit_time > until) {
            return false;
        }
        if !config.paths.is_empty() {
            let touched = repo.files.get(&record.id).is_some_and(|files| {
                files.iter().any(|f| {
                    config.paths.iter().any(|p| {
                        let p = p.trim_end_matches('/');
                        f.path == p || f.path.starts_with(&format!("{}/", p))
                    })
                })
            });
            if !touched {
                return false;
            }
        }
        true
    }
}

/// Commit source over a [`MemoryRepo`]
///
/// Kept commits get their parents rewritten to their nearest kept
/// ancestors, so a filtered layout has no lanes for excluded commits.
/// Parents outside the selected range are left as they are and show up
/// as boundaries.
#[derive(Debug)]
pub struct MemorySource {
    repo: Arc<MemoryRepo>,
    rows: Vec<CommitRecord>,
}

impl MemorySource {
    pub fn new(repo: Arc<MemoryRepo>, config: &SourceConfig) -> Result<Self> {
        let matcher = Matcher::new(config)?;
        let universe = repo.range_set(config.range.as_deref())?;
        let index: HashMap<&str, &CommitRecord> =
            repo.records.iter().map(|r| (r.id.as_str(), r)).collect();
        let order = topo_order(&universe, &index);

        let kept: HashSet<&str> = order
            .iter()
            .filter(|r| matcher.matches(&repo, config, r))
            .map(|r| r.id.as_str())
            .collect();

        // Nearest kept ancestors, computed parents first
        let mut nearest: HashMap<&str, Vec<CommitId>> = HashMap::new();
        let mut rows = Vec::new();
        for record in order.iter().rev() {
            let mut parents: Vec<CommitId> = Vec::new();
            for parent in &record.parents {
                let resolved = if !universe.contains(parent) {
                    // Outside the range: a boundary for kept commits only
                    if kept.contains(record.id.as_str()) {
                        vec![parent.clone()]
                    } else {
                        Vec::new()
                    }
                } else {
                    nearest.get(parent.as_str()).cloned().unwrap_or_default()
                };
                for id in resolved {
                    if !parents.contains(&id) {
                        parents.push(id);
                    }
                }
            }

            if kept.contains(record.id.as_str()) {
                nearest.insert(record.id.as_str(), vec![record.id.clone()]);
                let mut row = (*record).clone();
                row.parents = parents;
                rows.push(row);
            } else {
                nearest.insert(record.id.as_str(), parents);
            }
        }
        rows.reverse();
        if let Some(cap) = config.max_commits {
            rows.truncate(cap);
        }

        debug!(total = repo.records.len(), kept = rows.len(), "memory source ready");
        Ok(Self {
            repo: Arc::clone(&repo),
            rows,
        })
    }

    /// Every row this source will produce, in order
    pub fn rows(&self) -> &[CommitRecord] {
        &self.rows
    }
}

#[async_trait]
impl CommitSource for MemorySource {
    async fn pull(&self, offset: usize, count: usize) -> Result<Batch> {
        let start = offset.min(self.rows.len());
        let end = offset.saturating_add(count).min(self.rows.len());
        Ok(Batch {
            records: self.rows[start..end].to_vec(),
            exhausted: end >= self.rows.len(),
        })
    }

    async fn details(&self, id: &str) -> Result<CommitDetails> {
        if !self.repo.records.iter().any(|r| r.id == id) {
            return Err(GitTreeError::GitCommand(format!("unknown revision '{}'", id)));
        }
        Ok(CommitDetails {
            id: id.to_string(),
            body: self.repo.bodies.get(id).cloned().unwrap_or_default(),
            files: self.repo.files.get(id).cloned().unwrap_or_default(),
        })
    }
}

/// Factory producing [`MemorySource`]s over one shared repository
#[derive(Debug, Clone)]
pub struct MemorySourceFactory {
    repo: Arc<MemoryRepo>,
}

impl MemorySourceFactory {
    pub fn new(repo: MemoryRepo) -> Self {
        Self {
            repo: Arc::new(repo),
        }
    }
}

impl SourceFactory for MemorySourceFactory {
    fn create(&self, config: &SourceConfig) -> Result<Arc<dyn CommitSource>> {
        Ok(Arc::new(MemorySource::new(Arc::clone(&self.repo), config)?))
    }
}
