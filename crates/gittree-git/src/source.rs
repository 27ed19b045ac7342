//! Commit sources
//!
//! A [`CommitSource`] produces commits in display order (children before
//! parents) and supports resumable pulls: `pull(offset, count)` returns up
//! to `count` records starting after the first `offset`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use gittree_core::{
    abbreviate, CommitDetails, CommitId, CommitRecord, FileChange, GitTreeError, RefKind, RefName, Result,
    SourceConfig,
};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{debug, instrument, warn};

use crate::command::GitExecutor;
use crate::validate::validate_revision;

/// Field separator in `git log` output
const FIELD_SEP: char = '\x1f';
/// Record separator in `git log` output
const RECORD_SEP: char = '\x1e';

/// `--format` string matching [`parse_log`]
pub const LOG_FORMAT: &str = "%H%x1f%h%x1f%P%x1f%an%x1f%ae%x1f%at%x1f%ct%x1f%D%x1f%s%x1e";

/// One pull worth of records
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Batch {
    pub records: Vec<CommitRecord>,
    /// No records exist past this batch (end of history or cap reached)
    pub exhausted: bool,
}

/// Ordered, optionally bounded commit sequence
#[async_trait]
pub trait CommitSource: Send + Sync {
    /// Up to `count` records starting after the first `offset`
    async fn pull(&self, offset: usize, count: usize) -> Result<Batch>;

    /// Message body and changed files of one commit
    async fn details(&self, id: &str) -> Result<CommitDetails>;
}

/// Builds a fresh source for every graph generation
pub trait SourceFactory: Send + Sync {
    fn create(&self, config: &SourceConfig) -> Result<Arc<dyn CommitSource>>;
}

/// Clamp a pull to the commit cap. Returns the count to request, or `None`
/// when the cap is already reached.
pub(crate) fn capped_count(cap: Option<usize>, offset: usize, count: usize) -> Option<usize> {
    match cap {
        Some(cap) if offset >= cap => None,
        Some(cap) => Some(count.min(cap - offset)),
        None => Some(count),
    }
}

/// Parents of kept commits, rewritten to their nearest kept ancestors
pub type ParentMap = HashMap<CommitId, Vec<CommitId>>;

/// Rewrite parents so that excluded commits disappear from the graph.
///
/// `graph` is the unfiltered walk as `(id, parents)` in children-before-
/// parents order; `kept` are the commits that pass the filter. A kept
/// commit's parent outside the walk (below a range boundary) is left as
/// it is; an excluded commit contributes its own nearest kept ancestors.
pub fn simplify_parents(
    graph: &[(CommitId, Vec<CommitId>)],
    kept: &HashSet<CommitId>,
) -> ParentMap {
    let walked: HashSet<&str> = graph.iter().map(|(id, _)| id.as_str()).collect();
    let mut nearest: HashMap<&str, Vec<CommitId>> = HashMap::new();
    let mut simplified = ParentMap::new();

    for (id, parents) in graph.iter().rev() {
        let is_kept = kept.contains(id);
        let mut resolved: Vec<CommitId> = Vec::new();
        for parent in parents {
            let ancestors = if !walked.contains(parent.as_str()) {
                if is_kept {
                    vec![parent.clone()]
                } else {
                    Vec::new()
                }
            } else {
                nearest.get(parent.as_str()).cloned().unwrap_or_default()
            };
            for ancestor in ancestors {
                if !resolved.contains(&ancestor) {
                    resolved.push(ancestor);
                }
            }
        }

        if is_kept {
            nearest.insert(id.as_str(), vec![id.clone()]);
            simplified.insert(id.clone(), resolved);
        } else {
            nearest.insert(id.as_str(), resolved);
        }
    }
    simplified
}

/// Parse `git rev-list [--parents]` output into `(id, parents)` pairs
pub fn parse_rev_list(stdout: &str) -> Vec<(CommitId, Vec<CommitId>)> {
    stdout
        .lines()
        .filter_map(|line| {
            let mut ids = line.split_whitespace().map(String::from);
            let id = ids.next()?;
            Some((id, ids.collect()))
        })
        .collect()
}

/// Commit source backed by `git log`
///
/// Author, message and time filters make `git log` skip commits without
/// rewriting the parents of the ones it keeps. For those filters the
/// source walks the range once more without them and maps every kept
/// commit onto its nearest kept ancestors.
pub struct GitLogSource {
    executor: Arc<dyn GitExecutor>,
    config: SourceConfig,
    extra_args: Vec<String>,
    parents: OnceCell<ParentMap>,
}

impl GitLogSource {
    pub fn new(executor: Arc<dyn GitExecutor>, config: SourceConfig) -> Self {
        Self {
            executor,
            config,
            extra_args: Vec::new(),
            parents: OnceCell::new(),
        }
    }

    /// Arguments appended to every `git log` (from the config file)
    pub fn with_extra_args(mut self, args: Vec<String>) -> Self {
        self.extra_args = args;
        self
    }

    pub fn config(&self) -> &SourceConfig {
        &self.config
    }

    /// Full `git log` argument list for one pull
    pub fn log_args(&self, offset: usize, count: usize) -> Vec<String> {
        let mut args = vec![
            "log".to_string(),
            "--date-order".to_string(),
            "--decorate=full".to_string(),
            "--no-color".to_string(),
            format!("--format={}", LOG_FORMAT),
            format!("--skip={}", offset),
            "-n".to_string(),
            count.to_string(),
        ];

        let config = &self.config;
        if !config.paths.is_empty() {
            // Rewrite %P to the simplified history
            args.push("--parents".to_string());
        }
        if config.author.is_some() || config.message.is_some() {
            args.push("--extended-regexp".to_string());
        }
        if let Some(author) = &config.author {
            args.push(format!("--author={}", author));
        }
        if let Some(message) = &config.message {
            args.push(format!("--grep={}", message));
        }
        if let Some(since) = config.since {
            args.push(format!("--since={}", since.to_rfc3339()));
        }
        if let Some(until) = config.until {
            args.push(format!("--until={}", until.to_rfc3339()));
        }
        if config.follow {
            args.push("--follow".to_string());
        }
        args.extend(self.extra_args.iter().cloned());
        if let Some(range) = &config.range {
            args.push(range.clone());
        }
        if !config.paths.is_empty() {
            args.push("--".to_string());
            args.extend(config.paths.iter().cloned());
        }
        args
    }

    /// True when `git log` drops commits without rewriting parents
    fn needs_simplification(&self) -> bool {
        let config = &self.config;
        !config.follow
            && (config.author.is_some()
                || config.message.is_some()
                || config.since.is_some()
                || config.until.is_some())
    }

    /// `git rev-list` arguments over the configured range and paths.
    ///
    /// `filtered` adds the commit-limiting options and lists the kept
    /// commits; without it the walk prints every commit with its parents.
    pub fn rev_list_args(&self, filtered: bool) -> Vec<String> {
        let config = &self.config;
        let mut args = vec!["rev-list".to_string()];
        if filtered {
            if config.author.is_some() || config.message.is_some() {
                args.push("--extended-regexp".to_string());
            }
            if let Some(author) = &config.author {
                args.push(format!("--author={}", author));
            }
            if let Some(message) = &config.message {
                args.push(format!("--grep={}", message));
            }
            if let Some(since) = config.since {
                args.push(format!("--since={}", since.to_rfc3339()));
            }
            if let Some(until) = config.until {
                args.push(format!("--until={}", until.to_rfc3339()));
            }
        } else {
            args.push("--topo-order".to_string());
            args.push("--parents".to_string());
        }
        args.push(config.range.clone().unwrap_or_else(|| "HEAD".to_string()));
        if !config.paths.is_empty() {
            args.push("--".to_string());
            args.extend(config.paths.iter().cloned());
        }
        args
    }

    async fn rev_list(&self, filtered: bool) -> Result<String> {
        let args = self.rev_list_args(filtered);
        let arg_refs: Vec<&str> = args.iter().map(String::as_str).collect();
        let output = self.executor.exec(&arg_refs).await?;
        if !output.success {
            return Err(GitTreeError::GitCommand(format!(
                "git rev-list failed: {}",
                output.stderr.trim()
            )));
        }
        Ok(output.stdout)
    }

    async fn load_parent_map(&self) -> Result<ParentMap> {
        let kept: HashSet<CommitId> = self
            .rev_list(true)
            .await?
            .lines()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(String::from)
            .collect();
        let graph = parse_rev_list(&self.rev_list(false).await?);
        debug!(walked = graph.len(), kept = kept.len(), "simplified filtered history");
        Ok(simplify_parents(&graph, &kept))
    }

    /// Replace parents with the simplified ones where the filter needs it.
    /// A failed walk leaves the records untouched.
    async fn simplify(&self, records: &mut [CommitRecord]) {
        if records.is_empty() || !self.needs_simplification() {
            return;
        }
        let map = match self
            .parents
            .get_or_try_init(|| self.load_parent_map())
            .await
        {
            Ok(map) => map,
            Err(e) => {
                warn!("Could not simplify filtered history: {}", e);
                return;
            }
        };
        for record in records {
            if let Some(parents) = map.get(&record.id) {
                record.parents = parents.clone();
            }
        }
    }
}

#[async_trait]
impl CommitSource for GitLogSource {
    #[instrument(skip(self))]
    async fn pull(&self, offset: usize, count: usize) -> Result<Batch> {
        let Some(count) = capped_count(self.config.max_commits, offset, count) else {
            return Ok(Batch {
                records: Vec::new(),
                exhausted: true,
            });
        };
        if count == 0 {
            return Ok(Batch::default());
        }

        let args = self.log_args(offset, count);
        let arg_refs: Vec<&str> = args.iter().map(String::as_str).collect();
        let output = self.executor.exec(&arg_refs).await?;

        if !output.success {
            // An empty repository has no HEAD to log from
            if output.stderr.contains("does not have any commits yet") {
                return Ok(Batch {
                    records: Vec::new(),
                    exhausted: true,
                });
            }
            return Err(GitTreeError::GitCommand(format!(
                "git log failed: {}",
                output.stderr.trim()
            )));
        }

        let mut records = parse_log(&output.stdout);
        self.simplify(&mut records).await;
        let reached_cap = self
            .config
            .max_commits
            .is_some_and(|cap| offset + records.len() >= cap);
        let exhausted = records.len() < count || reached_cap;
        debug!(offset, received = records.len(), exhausted, "pulled commits");

        Ok(Batch { records, exhausted })
    }

    #[instrument(skip(self))]
    async fn details(&self, id: &str) -> Result<CommitDetails> {
        validate_revision(id)?;

        let body = self
            .executor
            .exec(&["show", "--no-patch", "--no-color", "--format=%b", id])
            .await?;
        if !body.success {
            return Err(GitTreeError::GitCommand(format!(
                "git show failed: {}",
                body.stderr.trim()
            )));
        }

        let files = self
            .executor
            .exec(&["show", "--no-color", "--name-status", "--format=", id])
            .await?;
        if !files.success {
            warn!("Could not list files of {}: {}", id, files.stderr.trim());
        }

        Ok(CommitDetails {
            id: id.to_string(),
            body: body.stdout.trim_end().to_string(),
            files: parse_name_status(&files.stdout),
        })
    }
}

/// Factory producing [`GitLogSource`]s over one executor
pub struct GitSourceFactory {
    executor: Arc<dyn GitExecutor>,
    default_range: Option<String>,
    extra_args: Vec<String>,
}

impl GitSourceFactory {
    pub fn new(executor: Arc<dyn GitExecutor>) -> Self {
        Self {
            executor,
            default_range: None,
            extra_args: Vec::new(),
        }
    }

    /// Range used when a configuration does not name one
    pub fn with_default_range(mut self, range: Option<String>) -> Self {
        self.default_range = range;
        self
    }

    pub fn with_extra_args(mut self, args: Vec<String>) -> Self {
        self.extra_args = args;
        self
    }
}

impl SourceFactory for GitSourceFactory {
    fn create(&self, config: &SourceConfig) -> Result<Arc<dyn CommitSource>> {
        let mut config = config.clone();
        if config.range.is_none() {
            config.range = self.default_range.clone();
        }
        Ok(Arc::new(
            GitLogSource::new(Arc::clone(&self.executor), config)
                .with_extra_args(self.extra_args.clone()),
        ))
    }
}

/// Parse `git log` output produced with [`LOG_FORMAT`].
///
/// Missing fields are left empty; a record without an id is passed on and
/// rejected later by the graph builder.
pub fn parse_log(stdout: &str) -> Vec<CommitRecord> {
    stdout
        .split(RECORD_SEP)
        .map(|chunk| chunk.trim_start_matches(['\n', '\r']))
        .filter(|chunk| !chunk.trim().is_empty())
        .map(parse_record)
        .collect()
}

fn parse_record(chunk: &str) -> CommitRecord {
    let mut fields = chunk.split(FIELD_SEP);
    let mut next = || fields.next().unwrap_or("").trim();

    let id = next().to_string();
    let short = next();
    let parents: Vec<String> = next().split_whitespace().map(String::from).collect();
    let author_name = next().to_string();
    let author_email = next().to_string();
    let author_time = parse_timestamp(next());
    let commit_time = parse_timestamp(next());
    let refs = parse_decorations(next());
    let subject = next().to_string();

    CommitRecord {
        short_id: if short.is_empty() {
            abbreviate(&id)
        } else {
            short.to_string()
        },
        id,
        parents,
        author_name,
        author_email,
        author_time,
        commit_time,
        subject,
        refs,
    }
}

fn parse_timestamp(field: &str) -> DateTime<Utc> {
    field
        .parse::<i64>()
        .ok()
        .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0))
        .unwrap_or_default()
}

/// Parse a `%D` decoration list produced with `--decorate=full`
pub fn parse_decorations(field: &str) -> Vec<RefName> {
    let mut refs = Vec::new();
    for item in field.split(", ").map(str::trim).filter(|s| !s.is_empty()) {
        if let Some(target) = item.strip_prefix("HEAD -> ") {
            refs.push(RefName::new(RefKind::Head, "HEAD"));
            refs.push(RefName::from_full_name(target));
        } else if let Some(tag) = item.strip_prefix("tag: ") {
            refs.push(RefName::from_full_name(tag));
        } else {
            refs.push(RefName::from_full_name(item));
        }
    }
    refs
}

/// Parse `git show --name-status` output
pub fn parse_name_status(stdout: &str) -> Vec<FileChange> {
    stdout
        .lines()
        .filter_map(|line| {
            let mut parts = line.split('\t');
            let status = parts.next()?.chars().next()?;
            let path = parts.last()?;
            Some(FileChange {
                status,
                path: path.to_string(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{GitOutput, MockGitExecutor};

    fn line(fields: &[&str]) -> String {
        format!("{}{}\n", fields.join("\x1f"), RECORD_SEP)
    }

    #[test]
    fn test_parse_log() {
        let stdout = [
            line(&[
                "c3c3c3c3c3", "c3c3c3c", "c2c2c2c2c2 c1c1c1c1c1", "Alice", "alice@example.com",
                "1700000000", "1700000100", "HEAD -> refs/heads/main, tag: refs/tags/v1.0",
                "Merge branch 'feature'",
            ]),
            line(&[
                "c1c1c1c1c1", "c1c1c1c", "", "Bob", "bob@example.com", "1600000000",
                "1600000000", "refs/remotes/origin/main", "Initial commit",
            ]),
        ]
        .concat();

        let records = parse_log(&stdout);
        assert_eq!(records.len(), 2);

        let merge = &records[0];
        assert_eq!(merge.id, "c3c3c3c3c3");
        assert_eq!(merge.parents, vec!["c2c2c2c2c2", "c1c1c1c1c1"]);
        assert_eq!(merge.author_time.timestamp(), 1_700_000_000);
        assert_eq!(merge.commit_time.timestamp(), 1_700_000_100);
        assert!(merge.is_head());
        assert_eq!(
            merge.refs,
            vec![
                RefName::new(RefKind::Head, "HEAD"),
                RefName::new(RefKind::Branch, "main"),
                RefName::new(RefKind::Tag, "v1.0"),
            ]
        );

        let root = &records[1];
        assert!(root.is_root());
        assert_eq!(root.refs, vec![RefName::new(RefKind::RemoteBranch, "origin/main")]);
    }

    #[test]
    fn test_parse_log_keeps_record_without_id() {
        let records = parse_log("\x1f\x1f\x1f\x1f\x1f\x1f\x1f\x1fno id\x1e\n");
        assert_eq!(records.len(), 1);
        assert!(records[0].id.is_empty());
        assert_eq!(records[0].subject, "no id");
    }

    #[test]
    fn test_parse_detached_head() {
        assert_eq!(parse_decorations("HEAD"), vec![RefName::new(RefKind::Head, "HEAD")]);
        assert!(parse_decorations("").is_empty());
    }

    #[test]
    fn test_parse_name_status() {
        let files = parse_name_status("M\tsrc/lib.rs\nA\tREADME.md\nR100\told.rs\tnew.rs\n");
        assert_eq!(files.len(), 3);
        assert_eq!(files[0].status, 'M');
        assert_eq!(files[2].status, 'R');
        assert_eq!(files[2].path, "new.rs");
    }

    #[test]
    fn test_capped_count() {
        assert_eq!(capped_count(None, 100, 10), Some(10));
        assert_eq!(capped_count(Some(5), 0, 10), Some(5));
        assert_eq!(capped_count(Some(5), 3, 10), Some(2));
        assert_eq!(capped_count(Some(5), 5, 10), None);
    }

    #[tokio::test]
    async fn test_pull_resumes_and_honours_cap() {
        let config = SourceConfig {
            max_commits: Some(3),
            author: Some("alice".into()),
            ..Default::default()
        };
        let keys = GitLogSource::new(Arc::new(MockGitExecutor::new()), config.clone());
        let first_key = keys.log_args(0, 2).join(" ");
        let second_key = keys.log_args(2, 1).join(" ");

        let executor = MockGitExecutor::new()
            .with_response(
                &keys.rev_list_args(true).join(" "),
                GitOutput::ok("a5\na4\na3\n"),
            )
            .with_response(
                &keys.rev_list_args(false).join(" "),
                GitOutput::ok("a5 a4\na4 a3\na3 a2\na2\n"),
            )
            .with_response(
                &first_key,
                GitOutput::ok(
                    [
                        line(&["a5", "a5", "a4", "alice", "", "5", "5", "", "five"]),
                        line(&["a4", "a4", "a3", "alice", "", "4", "4", "", "four"]),
                    ]
                    .concat(),
                ),
            )
            .with_response(
                &second_key,
                GitOutput::ok(line(&["a3", "a3", "a2", "alice", "", "3", "3", "", "three"])),
            );
        let source = GitLogSource::new(Arc::new(executor.clone()), config);

        let batch = source.pull(0, 2).await.unwrap();
        assert_eq!(batch.records.len(), 2);
        assert!(!batch.exhausted);

        let batch = source.pull(2, 10).await.unwrap();
        assert_eq!(batch.records.len(), 1);
        assert!(batch.exhausted);

        // a2 is by someone else and is the root
        assert!(batch.records[0].is_root());

        // Past the cap nothing is executed; the walks ran once
        let batch = source.pull(3, 10).await.unwrap();
        assert!(batch.records.is_empty());
        assert!(batch.exhausted);
        assert_eq!(executor.calls().len(), 4);

        assert!(first_key.contains("--skip=0 -n 2"));
        assert!(first_key.contains("--author=alice"));
    }

    fn walk(lines: &[&str]) -> Vec<(CommitId, Vec<CommitId>)> {
        parse_rev_list(&lines.join("\n"))
    }

    fn kept(ids: &[&str]) -> HashSet<CommitId> {
        ids.iter().map(|id| id.to_string()).collect()
    }

    #[test]
    fn test_simplify_skips_excluded_commits() {
        // a4 - b3 - a2 - b1, only the a commits are kept
        let graph = walk(&["a4 b3", "b3 a2", "a2 b1", "b1"]);
        let map = simplify_parents(&graph, &kept(&["a4", "a2"]));
        assert_eq!(map["a4"], vec!["a2"]);
        assert!(map["a2"].is_empty());
        assert!(!map.contains_key("b3"));
    }

    #[test]
    fn test_simplify_merges_and_range_boundary() {
        // m merges x (excluded, parent k) into k; k's parent is outside the walk
        let graph = walk(&["m k x", "x k", "k outside"]);
        let map = simplify_parents(&graph, &kept(&["m", "k"]));
        assert_eq!(map["m"], vec!["k"]);
        assert_eq!(map["k"], vec!["outside"]);
    }

    #[test]
    fn test_rev_list_args() {
        let source = GitLogSource::new(
            Arc::new(MockGitExecutor::new()),
            SourceConfig {
                author: Some("alice".into()),
                paths: vec!["src".into()],
                ..Default::default()
            },
        );
        assert_eq!(
            source.rev_list_args(true).join(" "),
            "rev-list --extended-regexp --author=alice HEAD -- src"
        );
        assert_eq!(
            source.rev_list_args(false).join(" "),
            "rev-list --topo-order --parents HEAD -- src"
        );
    }

    #[tokio::test]
    async fn test_unfiltered_pull_skips_walk() {
        let keys = GitLogSource::new(Arc::new(MockGitExecutor::new()), SourceConfig::default());
        let executor = MockGitExecutor::new().with_response(
            &keys.log_args(0, 10).join(" "),
            GitOutput::ok(line(&["c2", "c2", "c1", "alice", "", "2", "2", "", "two"])),
        );
        let source = GitLogSource::new(Arc::new(executor.clone()), SourceConfig::default());
        let batch = source.pull(0, 10).await.unwrap();
        assert_eq!(batch.records[0].parents, vec!["c1"]);
        assert_eq!(executor.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_pull_failure_is_error() {
        let source = GitLogSource::new(
            Arc::new(MockGitExecutor::new()),
            SourceConfig::default(),
        );
        let key = source.log_args(0, 10).join(" ");
        let executor = MockGitExecutor::new()
            .with_response(&key, GitOutput::failed("fatal: bad revision 'nope'"));
        let source = GitLogSource::new(Arc::new(executor), SourceConfig::default());

        let err = source.pull(0, 10).await.unwrap_err();
        assert!(matches!(err, GitTreeError::GitCommand(_)));
    }

    #[tokio::test]
    async fn test_details() {
        let executor = MockGitExecutor::new()
            .with_response(
                "show --no-patch --no-color --format=%b abc123",
                GitOutput::ok("Longer explanation.\n\n"),
            )
            .with_response(
                "show --no-color --name-status --format= abc123",
                GitOutput::ok("M\tsrc/main.rs\n"),
            );
        let source = GitLogSource::new(Arc::new(executor), SourceConfig::default());

        let details = source.details("abc123").await.unwrap();
        assert_eq!(details.body, "Longer explanation.");
        assert_eq!(details.files.len(), 1);

        assert!(source.details("--all").await.is_err());
    }

    #[test]
    fn test_factory_applies_default_range() {
        let executor: Arc<dyn GitExecutor> = Arc::new(MockGitExecutor::new());
        let factory = GitSourceFactory::new(executor).with_default_range(Some("main".into()));
        // Only checks that creation succeeds; range is applied inside the source
        assert!(factory.create(&SourceConfig::default()).is_ok());
    }
}
