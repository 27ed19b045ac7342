//! Terminal setup and teardown utilities
//!
//! Handles entering/exiting raw mode and alternate screen.

use crossterm::{
    cursor, execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use gittree_core::{GitTreeError, Result};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io::{self, Stdout};

/// Terminal type for the navigator
pub type Tui = Terminal<CrosstermBackend<Stdout>>;

fn terminal_error(what: &str, e: io::Error) -> GitTreeError {
    GitTreeError::Terminal(format!("{}: {}", what, e))
}

/// Initialize the terminal for TUI rendering
pub fn init() -> Result<Tui> {
    enable_raw_mode().map_err(|e| terminal_error("Failed to enable raw mode", e))?;

    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, cursor::Hide)
        .map_err(|e| terminal_error("Failed to enter alternate screen", e))?;

    let backend = CrosstermBackend::new(stdout);
    Terminal::new(backend).map_err(|e| terminal_error("Failed to create terminal", e))
}

/// Restore the terminal to its original state
pub fn restore() -> Result<()> {
    execute!(io::stdout(), LeaveAlternateScreen, cursor::Show)
        .map_err(|e| terminal_error("Failed to leave alternate screen", e))?;
    disable_raw_mode().map_err(|e| terminal_error("Failed to disable raw mode", e))?;
    Ok(())
}

/// RAII guard for terminal state
///
/// Restores the terminal on drop, including when unwinding from a panic.
pub struct TerminalGuard;

impl TerminalGuard {
    pub fn new() -> Self {
        Self
    }
}

impl Default for TerminalGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        // Best effort; nothing useful to do with an error here
        let _ = restore();
    }
}
