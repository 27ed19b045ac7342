//! Key binding overlay

use ratatui::{
    prelude::*,
    text::Span,
    widgets::{Block, Borders, Clear, Paragraph},
};

use crate::command::Command;
use crate::event::key_hint;
use crate::theme::Theme;

pub struct HelpWidget;

impl HelpWidget {
    /// Rows needed to show every binding inside a border
    pub fn height() -> u16 {
        Command::ALL.len() as u16 + 2
    }

    pub fn render(theme: &Theme, area: Rect, buf: &mut Buffer) {
        Clear.render(area, buf);

        let lines: Vec<Line> = Command::ALL
            .iter()
            .map(|command| {
                Line::from(vec![
                    Span::styled(format!("{:<14}", key_hint(*command)), theme.key()),
                    Span::raw(command.description()),
                ])
            })
            .collect();

        let block = Block::default()
            .title(" Keys ")
            .borders(Borders::ALL)
            .border_style(theme.accent());
        Widget::render(Paragraph::new(lines).block(block), area, buf);
    }
}
