//! gittree - browse a repository's commit graph in the terminal
//!
//! Usage:
//!   gittree                          Open the graph of the current repository
//!   gittree --author alice --since 2w
//!   gittree --range main..feature --unicode
//!   gittree --print --rows 20        Print the graph and exit

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use gittree_core::{FilterParams, GitTreeConfig, SourceConfig, Style};
use gittree_git::{
    ActionDispatcher, FilterEngine, GitActionBackend, GitCommand, GitExecutor, GitRepository,
    GitSourceFactory, SourceFactory,
};
use gittree_graph::{layout_all, render_row, DateStyle, GlyphSet, RenderOptions};
use gittree_tui::{App, Navigator, NavigatorConfig};
use std::io::Write;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "gittree")]
#[command(author, version, about = "Terminal commit graph browser")]
struct Cli {
    /// Repository path (defaults to current directory)
    #[arg(long, default_value = ".")]
    repo: PathBuf,

    /// Draw lanes with box-drawing characters
    #[arg(long)]
    unicode: bool,

    /// Disable colors
    #[arg(long)]
    no_color: bool,

    /// Only commits after this date or duration ("2w", "2024-01-31")
    #[arg(long, value_name = "TIME")]
    since: Option<String>,

    /// Only commits before this date or duration
    #[arg(long, value_name = "TIME")]
    until: Option<String>,

    /// Author pattern (regex)
    #[arg(short, long, value_name = "REGEX")]
    author: Option<String>,

    /// Commit message pattern (regex)
    #[arg(long, value_name = "REGEX")]
    grep: Option<String>,

    /// Only commits touching this path (repeatable)
    #[arg(long = "path", value_name = "PATH")]
    paths: Vec<String>,

    /// Revision range such as main..feature
    #[arg(long)]
    range: Option<String>,

    /// Stop after this many commits
    #[arg(long, value_name = "N")]
    max_commits: Option<usize>,

    /// Follow renames of the single --path
    #[arg(long)]
    follow: bool,

    /// Do not ask before destructive actions
    #[arg(short, long)]
    yes: bool,

    /// Color scheme: auto, light or dark
    #[arg(long)]
    style: Option<Style>,

    /// Config file (defaults to ~/.config/gittree/config.toml)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Print the graph to stdout instead of opening the navigator
    #[arg(long)]
    print: bool,

    /// Rows to print with --print
    #[arg(long, default_value = "50", requires = "print")]
    rows: usize,

    /// Write logs to this file
    #[arg(long, value_name = "FILE")]
    log_file: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn filter_params(&self) -> FilterParams {
        FilterParams {
            author: self.author.clone(),
            message: self.grep.clone(),
            paths: self.paths.clone(),
            since: self.since.clone(),
            until: self.until.clone(),
            range: self.range.clone(),
            max_commits: self.max_commits,
            follow: self.follow,
        }
    }

    /// Apply command-line overrides to the loaded configuration
    fn apply_overrides(&self, config: &mut GitTreeConfig) {
        if self.unicode {
            config.unicode = true;
        }
        if self.no_color {
            config.no_color = true;
        }
        if self.yes {
            config.confirm_dangerous = false;
        }
        if let Some(style) = self.style {
            config.style = style;
        }
    }
}

/// Install the tracing subscriber.
///
/// The navigator owns the terminal, so interactive runs only log when a
/// log file is given. `--print` runs log to stderr.
fn init_logging(cli: &Cli) -> Result<()> {
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_env("GITTREE_LOG").unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false);

    if let Some(path) = &cli.log_file {
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("Failed to open log file {}", path.display()))?;
        builder
            .with_ansi(false)
            .with_writer(Mutex::new(file))
            .try_init()
            .map_err(|e| anyhow::anyhow!(e))?;
    } else if cli.print {
        builder
            .with_writer(std::io::stderr)
            .try_init()
            .map_err(|e| anyhow::anyhow!(e))?;
    }
    Ok(())
}

fn load_config(cli: &Cli) -> GitTreeConfig {
    let path = cli.config.clone().or_else(GitTreeConfig::default_path);
    let mut config = match path.map(|p| GitTreeConfig::load_or_default(&p)) {
        Some(Ok(config)) => config,
        Some(Err(e)) => {
            warn!("{}; using defaults", e);
            GitTreeConfig::default()
        }
        None => GitTreeConfig::default(),
    };
    cli.apply_overrides(&mut config);
    config
}

/// Lay out the first `rows` commits (or the whole capped history) and print
/// them without colors
async fn print_graph(
    factory: &GitSourceFactory,
    source: &SourceConfig,
    config: &GitTreeConfig,
    rows: usize,
) -> Result<()> {
    let commits = factory.create(source)?;
    let count = source.max_commits.filter(|&n| n > 0).unwrap_or(rows);
    let batch = commits
        .pull(0, count)
        .await
        .context("Failed to read history")?;

    let layout = layout_all(Default::default(), batch.records);
    let options = RenderOptions {
        glyphs: if config.unicode {
            GlyphSet::Unicode
        } else {
            GlyphSet::Ascii
        },
        dates: if config.relative_dates {
            DateStyle::Relative
        } else {
            DateStyle::Absolute(config.date_format.clone())
        },
        width: 0,
        now: Utc::now(),
    };

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    for row in &layout.rows {
        let line = render_row(row, layout.max_lane_seen, &options);
        writeln!(out, "{}", line.plain().trim_end())?;
    }
    if !layout.skipped.is_empty() {
        warn!("{} malformed commits skipped", layout.skipped.len());
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli)?;

    let config = load_config(&cli);
    let repo = GitRepository::discover(&cli.repo).context("Cannot open repository")?;
    info!("Repository: {}", repo.work_dir().display());

    let params = cli.filter_params();
    let source = FilterEngine::build(&params, Utc::now()).context("Invalid filter")?;

    let executor: Arc<dyn GitExecutor> = Arc::new(GitCommand::new(repo.work_dir()));
    let factory = GitSourceFactory::new(Arc::clone(&executor))
        .with_default_range(config.git.default_range.clone())
        .with_extra_args(config.git.extra_args.clone());

    if cli.print {
        return print_graph(&factory, &source, &config, cli.rows).await;
    }

    let navigator = Navigator::new(
        Arc::new(factory),
        params,
        source,
        NavigatorConfig::from_config(&config),
    )
    .context("Cannot read history")?;

    let title = match repo.head_branch() {
        Some(branch) => format!("{} ({})", repo.name(), branch),
        None => repo.name(),
    };
    let app = App::new(navigator, &config, title);
    let dispatcher = ActionDispatcher::new(Arc::new(GitActionBackend::new(executor)));
    let watch = config.watch.then(|| repo.git_dir());

    gittree_tui::run(app, dispatcher, watch).await?;
    Ok(())
}
