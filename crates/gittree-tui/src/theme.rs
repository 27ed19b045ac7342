//! Colors for style hints

use gittree_core::{ColorConfig, GitTreeConfig, RefKind, Style as ColorScheme};
use gittree_graph::StyleHint;
use ratatui::style::{Color, Modifier, Style};
use std::str::FromStr;
use tracing::warn;

/// Resolved colors for one session
#[derive(Debug, Clone)]
pub struct Theme {
    lanes: Vec<Color>,
    head: Color,
    hash: Color,
    branch: Color,
    tag: Color,
    remote: Color,
    dim: Color,
    selection: Style,
    no_color: bool,
}

/// Parse a ratatui color name, falling back to the terminal default
fn color_from_name(name: &str) -> Color {
    Color::from_str(name).unwrap_or_else(|_| {
        warn!("unknown color '{}', using default", name);
        Color::Reset
    })
}

impl Theme {
    pub fn from_config(config: &GitTreeConfig) -> Self {
        let ColorConfig {
            lanes,
            head,
            hash,
            branch,
            tag,
        } = &config.colors;

        let (dim, selection) = match config.style {
            ColorScheme::Light => (
                Color::Gray,
                Style::default().bg(Color::Gray).fg(Color::Black),
            ),
            ColorScheme::Dark | ColorScheme::Auto => (
                Color::DarkGray,
                Style::default().bg(Color::DarkGray).fg(Color::White),
            ),
        };

        Self {
            lanes: lanes.iter().map(|c| color_from_name(c)).collect(),
            head: color_from_name(head),
            hash: color_from_name(hash),
            branch: color_from_name(branch),
            tag: color_from_name(tag),
            remote: Color::Red,
            dim,
            selection,
            no_color: config.no_color,
        }
    }

    pub fn no_color(&self) -> bool {
        self.no_color
    }

    /// Style for one rendered span
    pub fn style(&self, hint: StyleHint) -> Style {
        if self.no_color {
            return match hint {
                StyleHint::Head => Style::default().add_modifier(Modifier::BOLD),
                _ => Style::default(),
            };
        }
        match hint {
            StyleHint::Lane(lane) => match self.lanes.len() {
                0 => Style::default(),
                n => Style::default().fg(self.lanes[lane % n]),
            },
            StyleHint::Head => Style::default().fg(self.head).add_modifier(Modifier::BOLD),
            StyleHint::Hash => Style::default().fg(self.hash),
            StyleHint::Author => Style::default().fg(Color::Blue),
            StyleHint::Date => Style::default().fg(self.dim),
            StyleHint::Ref(RefKind::Head) => {
                Style::default().fg(self.head).add_modifier(Modifier::BOLD)
            }
            StyleHint::Ref(RefKind::Branch) => {
                Style::default().fg(self.branch).add_modifier(Modifier::BOLD)
            }
            StyleHint::Ref(RefKind::RemoteBranch) => Style::default().fg(self.remote),
            StyleHint::Ref(RefKind::Tag) => Style::default().fg(self.tag),
            StyleHint::Subject | StyleHint::Plain => Style::default(),
        }
    }

    /// Highlight for the selected row
    pub fn selection(&self) -> Style {
        if self.no_color {
            Style::default().add_modifier(Modifier::REVERSED)
        } else {
            self.selection
        }
    }

    pub fn dim(&self) -> Style {
        if self.no_color {
            Style::default()
        } else {
            Style::default().fg(self.dim)
        }
    }

    pub fn accent(&self) -> Style {
        if self.no_color {
            Style::default().add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
        }
    }

    pub fn error(&self) -> Style {
        if self.no_color {
            Style::default().add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD)
        }
    }

    pub fn key(&self) -> Style {
        if self.no_color {
            Style::default()
        } else {
            Style::default().fg(Color::Yellow)
        }
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self::from_config(&GitTreeConfig::default())
    }
}
