//! Watches HEAD and refs for changes made outside gittree

use gittree_core::{GitTreeError, Result};
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::Path;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Quiet period before a burst of ref updates is reported
pub const DEBOUNCE: Duration = Duration::from_millis(500);

/// Keeps the filesystem watch alive; dropping it stops the events
pub struct RefWatcher {
    _watcher: RecommendedWatcher,
}

impl RefWatcher {
    /// Watch `git_dir` and return a receiver yielding one `()` per debounced
    /// burst of changes to `HEAD`, `packed-refs` or anything under `refs/`.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn(git_dir: &Path) -> Result<(Self, mpsc::Receiver<()>)> {
        let (raw_tx, raw_rx) = mpsc::unbounded_channel::<()>();
        let (out_tx, out_rx) = mpsc::channel(8);

        let root = git_dir.to_path_buf();
        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) if is_ref_event(&event, &root) => {
                    let _ = raw_tx.send(());
                }
                Ok(_) => {}
                Err(e) => warn!("watch error: {}", e),
            },
            Config::default(),
        )
        .map_err(watch_error)?;

        watcher
            .watch(git_dir, RecursiveMode::NonRecursive)
            .map_err(watch_error)?;
        let refs = git_dir.join("refs");
        if refs.is_dir() {
            watcher
                .watch(&refs, RecursiveMode::Recursive)
                .map_err(watch_error)?;
        }

        tokio::spawn(debounce(raw_rx, out_tx));
        info!("Watching refs in {}", git_dir.display());

        Ok((Self { _watcher: watcher }, out_rx))
    }
}

fn watch_error(e: notify::Error) -> GitTreeError {
    GitTreeError::Other(format!("Failed to watch repository: {}", e))
}

/// Whether `event` touches HEAD, packed-refs or refs/
pub fn is_ref_event(event: &Event, git_dir: &Path) -> bool {
    if !matches!(
        event.kind,
        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
    ) {
        return false;
    }
    event.paths.iter().any(|path| is_ref_path(path, git_dir))
}

fn is_ref_path(path: &Path, git_dir: &Path) -> bool {
    let Ok(relative) = path.strip_prefix(git_dir) else {
        return false;
    };
    // Lock files come and go around every update; the rename that follows
    // is what matters
    if relative.extension().is_some_and(|ext| ext == "lock") {
        return false;
    }
    relative == Path::new("HEAD")
        || relative == Path::new("packed-refs")
        || relative.starts_with("refs")
}

async fn debounce(mut raw: mpsc::UnboundedReceiver<()>, out: mpsc::Sender<()>) {
    while raw.recv().await.is_some() {
        // Swallow everything arriving within the quiet period
        loop {
            match tokio::time::timeout(DEBOUNCE, raw.recv()).await {
                Ok(Some(())) => continue,
                Ok(None) => return,
                Err(_) => break,
            }
        }
        debug!("refs changed");
        if out.send(()).await.is_err() {
            return;
        }
    }
}
