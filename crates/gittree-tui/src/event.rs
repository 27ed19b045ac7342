//! Event handling for crossterm terminal events
//!
//! Polls for key and resize events and maps keys to navigator inputs.

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use gittree_core::Result;
use std::time::Duration;

use crate::command::{Command, Input, KeyContext};

/// Application events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEvent {
    /// Key press event
    Key(KeyEvent),
    /// Nothing happened within the poll timeout
    Tick,
    /// Terminal resize event
    Resize(u16, u16),
}

/// Poll for the next event with timeout
pub fn poll_event(timeout: Duration) -> Result<AppEvent> {
    if !event::poll(timeout)? {
        return Ok(AppEvent::Tick);
    }
    match event::read()? {
        Event::Key(key) if key.kind == KeyEventKind::Press => Ok(AppEvent::Key(key)),
        Event::Resize(width, height) => Ok(AppEvent::Resize(width, height)),
        _ => Ok(AppEvent::Tick),
    }
}

fn is_ctrl(key: &KeyEvent, c: char) -> bool {
    key.code == KeyCode::Char(c) && key.modifiers.contains(KeyModifiers::CONTROL)
}

/// Map a key to an input for the given context
pub fn map_key(key: KeyEvent, context: KeyContext) -> Option<Input> {
    match context {
        KeyContext::Normal => map_normal(key),
        KeyContext::Confirm => match key.code {
            _ if is_ctrl(&key, 'c') => Some(Input::Command(Command::Quit)),
            KeyCode::Char('y') | KeyCode::Char('Y') => Some(Input::Confirm),
            KeyCode::Char('q') => Some(Input::Command(Command::Quit)),
            // Anything else declines
            _ => Some(Input::Cancel),
        },
        KeyContext::Prompt => match key.code {
            _ if is_ctrl(&key, 'c') => Some(Input::Cancel),
            KeyCode::Enter => Some(Input::Submit),
            KeyCode::Esc => Some(Input::Cancel),
            KeyCode::Backspace => Some(Input::Backspace),
            KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
                Some(Input::Char(c))
            }
            _ => None,
        },
        KeyContext::Help => {
            if is_ctrl(&key, 'c') {
                Some(Input::Command(Command::Quit))
            } else {
                Some(Input::Cancel)
            }
        }
    }
}

fn map_normal(key: KeyEvent) -> Option<Input> {
    if is_ctrl(&key, 'c') {
        return Some(Input::Command(Command::Quit));
    }
    if is_ctrl(&key, 'f') {
        return Some(Input::Command(Command::PageDown));
    }
    if is_ctrl(&key, 'b') {
        return Some(Input::Command(Command::PageUp));
    }

    let command = match key.code {
        KeyCode::Up | KeyCode::Char('k') => Command::MoveUp,
        KeyCode::Down | KeyCode::Char('j') => Command::MoveDown,
        KeyCode::Left | KeyCode::Char('h') => Command::JumpToParent,
        KeyCode::Right | KeyCode::Char('l') => Command::JumpToChild,
        KeyCode::PageUp => Command::PageUp,
        KeyCode::PageDown | KeyCode::Char(' ') => Command::PageDown,
        KeyCode::Home | KeyCode::Char('g') => Command::Top,
        KeyCode::End | KeyCode::Char('G') => Command::Bottom,
        KeyCode::Enter => Command::OpenDetails,
        KeyCode::Char('c') => Command::Checkout,
        KeyCode::Char('x') => Command::Reset,
        KeyCode::Char('p') => Command::CherryPick,
        KeyCode::Char('r') => Command::Revert,
        KeyCode::Char('b') => Command::NewBranch,
        KeyCode::Char('t') => Command::NewTag,
        KeyCode::Char('/') => Command::StartFilter,
        KeyCode::Char('f') => Command::ToggleFollow,
        KeyCode::Char('u') => Command::ToggleUnicode,
        KeyCode::Char('?') => Command::Help,
        KeyCode::Char('q') => Command::Quit,
        KeyCode::Esc => return Some(Input::Cancel),
        _ => return None,
    };
    Some(Input::Command(command))
}

/// Keys shown on the help screen for each command
pub fn key_hint(command: Command) -> &'static str {
    match command {
        Command::MoveUp => "↑ k",
        Command::MoveDown => "↓ j",
        Command::JumpToParent => "← h",
        Command::JumpToChild => "→ l",
        Command::PageUp => "PgUp ^B",
        Command::PageDown => "PgDn ^F Space",
        Command::Top => "g Home",
        Command::Bottom => "G End",
        Command::OpenDetails => "Enter",
        Command::Checkout => "c",
        Command::Reset => "x",
        Command::CherryPick => "p",
        Command::Revert => "r",
        Command::NewBranch => "b",
        Command::NewTag => "t",
        Command::StartFilter => "/",
        Command::ToggleFollow => "f",
        Command::ToggleUnicode => "u",
        Command::Help => "?",
        Command::Quit => "q ^C",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn test_normal_keys() {
        let normal = KeyContext::Normal;
        assert_eq!(
            map_key(key(KeyCode::Char('j')), normal),
            Some(Input::Command(Command::MoveDown))
        );
        assert_eq!(
            map_key(key(KeyCode::Left), normal),
            Some(Input::Command(Command::JumpToParent))
        );
        assert_eq!(
            map_key(key(KeyCode::Char('x')), normal),
            Some(Input::Command(Command::Reset))
        );
        assert_eq!(
            map_key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL), normal),
            Some(Input::Command(Command::Quit))
        );
        assert_eq!(map_key(key(KeyCode::Esc), normal), Some(Input::Cancel));
        assert_eq!(map_key(key(KeyCode::F(5)), normal), None);
    }

    #[test]
    fn test_confirm_keys() {
        assert_eq!(map_key(key(KeyCode::Char('y')), KeyContext::Confirm), Some(Input::Confirm));
        assert_eq!(map_key(key(KeyCode::Char('n')), KeyContext::Confirm), Some(Input::Cancel));
        assert_eq!(map_key(key(KeyCode::Enter), KeyContext::Confirm), Some(Input::Cancel));
    }

    #[test]
    fn test_prompt_keys() {
        let prompt = KeyContext::Prompt;
        assert_eq!(map_key(key(KeyCode::Char('q')), prompt), Some(Input::Char('q')));
        assert_eq!(map_key(key(KeyCode::Enter), prompt), Some(Input::Submit));
        assert_eq!(map_key(key(KeyCode::Backspace), prompt), Some(Input::Backspace));
        assert_eq!(map_key(key(KeyCode::Esc), prompt), Some(Input::Cancel));
    }

    #[test]
    fn test_every_command_has_a_key() {
        for command in Command::ALL {
            assert!(!key_hint(command).is_empty());
        }
    }
}
