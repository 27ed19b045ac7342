//! Logical commands and inputs understood by the navigator

/// Everything the user can ask for in normal mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    MoveUp,
    MoveDown,
    JumpToParent,
    JumpToChild,
    PageUp,
    PageDown,
    Top,
    Bottom,
    OpenDetails,
    Checkout,
    Reset,
    CherryPick,
    Revert,
    NewBranch,
    NewTag,
    StartFilter,
    ToggleFollow,
    ToggleUnicode,
    Help,
    Quit,
}

impl Command {
    /// Every command, in help-screen order
    pub const ALL: [Command; 20] = [
        Command::MoveUp,
        Command::MoveDown,
        Command::JumpToParent,
        Command::JumpToChild,
        Command::PageUp,
        Command::PageDown,
        Command::Top,
        Command::Bottom,
        Command::OpenDetails,
        Command::Checkout,
        Command::Reset,
        Command::CherryPick,
        Command::Revert,
        Command::NewBranch,
        Command::NewTag,
        Command::StartFilter,
        Command::ToggleFollow,
        Command::ToggleUnicode,
        Command::Help,
        Command::Quit,
    ];

    pub fn description(&self) -> &'static str {
        match self {
            Command::MoveUp => "Move up",
            Command::MoveDown => "Move down",
            Command::JumpToParent => "Jump to parent",
            Command::JumpToChild => "Jump to child",
            Command::PageUp => "Page up",
            Command::PageDown => "Page down",
            Command::Top => "First commit",
            Command::Bottom => "Last commit (loads all)",
            Command::OpenDetails => "Toggle details",
            Command::Checkout => "Checkout",
            Command::Reset => "Reset --hard",
            Command::CherryPick => "Cherry-pick",
            Command::Revert => "Revert",
            Command::NewBranch => "New branch",
            Command::NewTag => "New tag",
            Command::StartFilter => "Filter",
            Command::ToggleFollow => "Toggle --follow",
            Command::ToggleUnicode => "Toggle Unicode glyphs",
            Command::Help => "Help",
            Command::Quit => "Quit",
        }
    }
}

/// One input event after key mapping
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Input {
    Command(Command),
    /// Yes in a confirmation
    Confirm,
    /// No in a confirmation, or close the current prompt/overlay/pane
    Cancel,
    /// Text typed into a prompt
    Char(char),
    Backspace,
    /// Enter in a prompt
    Submit,
}

/// Which key map applies
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyContext {
    Normal,
    Confirm,
    Prompt,
    Help,
}
