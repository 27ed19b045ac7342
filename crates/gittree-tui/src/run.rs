//! Main run loop for the navigator
//!
//! Handles terminal initialization, the event loop and cleanup. Each frame
//! drains the worker inbox, sizes the viewport, draws, then waits briefly
//! for a key.

use gittree_core::Result;
use gittree_git::{ActionDispatcher, RefWatcher};
use ratatui::layout::Rect;
use std::path::Path;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::{
    app::App,
    event::{self, map_key, AppEvent},
    navigator::Phase,
    terminal, ui,
    worker::{Worker, WorkerMessage},
};

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Forward debounced ref changes into the inbox
fn watch_refs(git_dir: &Path, inbox: mpsc::UnboundedSender<WorkerMessage>) -> Option<RefWatcher> {
    let (watcher, mut changes) = match RefWatcher::spawn(git_dir) {
        Ok(pair) => pair,
        Err(e) => {
            warn!("Not watching repository: {}", e);
            return None;
        }
    };
    tokio::spawn(async move {
        while changes.recv().await.is_some() {
            if inbox.send(WorkerMessage::RepositoryChanged).is_err() {
                break;
            }
        }
    });
    Some(watcher)
}

/// Run the navigator until the user quits.
///
/// `watch` is the git directory to watch for ref changes, if any.
pub async fn run(mut app: App, dispatcher: ActionDispatcher, watch: Option<&Path>) -> Result<()> {
    let (tx, mut inbox) = mpsc::unbounded_channel();
    let worker = Worker::new(tx.clone(), dispatcher);
    let _watcher = watch.and_then(|git_dir| watch_refs(git_dir, tx));

    let mut terminal = terminal::init()?;
    let _guard = terminal::TerminalGuard::new();

    loop {
        while let Ok(message) = inbox.try_recv() {
            app.navigator.handle_message(message);
        }

        let size = terminal.size()?;
        let screen = ui::layout(
            Rect::new(0, 0, size.width, size.height),
            app.navigator.details().is_some(),
        );
        app.navigator
            .set_viewport(screen.graph.height as usize, screen.graph.width as usize);
        worker.run_all(app.navigator.take_effects());

        terminal.draw(|frame| ui::draw(frame, &mut app))?;

        if app.navigator.phase() == Phase::Exiting {
            info!("Exiting");
            break;
        }

        match event::poll_event(POLL_INTERVAL)? {
            AppEvent::Key(key) => {
                if let Some(input) = map_key(key, app.navigator.key_context()) {
                    app.navigator.handle(input);
                }
            }
            AppEvent::Resize(_, _) | AppEvent::Tick => {
                // Redrawn on the next iteration
            }
        }
        worker.run_all(app.navigator.take_effects());
    }

    terminal::restore()?;
    Ok(())
}
