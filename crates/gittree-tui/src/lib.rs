//! # gittree-tui
//!
//! Terminal navigator for gittree commit graphs.
//!
//! ```text
//! ┌──────────────────────────────────────┬─────────────────────────┐
//! │ *-\  f00d123 alice 2 days ago  ...   │ Details                 │
//! │ | *  beef456 bob   3 days ago  ...   │ commit  f00d123...      │
//! │ * |  cafe789 alice 4 days ago  ...   │ author  alice <...>     │
//! │ *-/  0ddba11 alice 5 days ago  ...   │                         │
//! ├──────────────────────────────────────┴─────────────────────────┤
//! │ repo  1/4  [author:alice]  ? help                              │
//! └────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The [`Navigator`] is a synchronous state machine. It queues
//! [`Effect`]s that the [`Worker`] runs as tokio tasks; results come back
//! through an inbox the run loop drains once per frame.

mod app;
mod cache;
mod command;
mod event;
mod navigator;
mod terminal;
mod theme;
mod ui;
mod view;
mod widgets;
mod worker;
mod run;

pub use app::App;
pub use cache::RenderCache;
pub use command::{Command, Input, KeyContext};
pub use event::{key_hint, map_key, poll_event, AppEvent};
pub use navigator::{
    DetailsPane, Navigator, NavigatorConfig, Phase, Prompt, PromptKind, Status, StatusKind,
};
pub use run::run;
pub use theme::Theme;
pub use view::GenerationView;
pub use worker::{Effect, Worker, WorkerMessage};
