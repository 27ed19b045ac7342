//! Single-line status bar
//!
//! Shows, in order of precedence: the open prompt, the pending
//! confirmation, the last status message, or a summary of the view.

use gittree_git::to_query;
use ratatui::{prelude::*, text::Span};

use crate::navigator::{Navigator, Phase, StatusKind};
use crate::theme::Theme;

pub struct StatusBarWidget;

impl StatusBarWidget {
    pub fn render(navigator: &Navigator, repo_name: &str, theme: &Theme, area: Rect, buf: &mut Buffer) {
        if area.height == 0 {
            return;
        }
        let line = Self::line(navigator, repo_name, theme);
        buf.set_line(area.x, area.y, &line, area.width);
    }

    fn line(navigator: &Navigator, repo_name: &str, theme: &Theme) -> Line<'static> {
        if let Some(prompt) = navigator.prompt() {
            return Line::from(vec![
                Span::styled(format!("{}: ", prompt.kind.label()), theme.accent()),
                Span::raw(prompt.input.clone()),
                Span::styled("█", theme.dim()),
            ]);
        }

        if let Phase::ConfirmPending(request) = navigator.phase() {
            return Line::from(vec![
                Span::styled(format!("{}? ", request.describe()), theme.error()),
                Span::styled("[y/N]", theme.key()),
            ]);
        }

        if let Some(status) = navigator.status() {
            let style = match status.kind {
                StatusKind::Info => Style::default(),
                StatusKind::Error => theme.error(),
            };
            return Line::from(Span::styled(status.text.clone(), style));
        }

        let view = navigator.view();
        let position = if view.is_empty() {
            "0/0".to_string()
        } else {
            let total = if view.is_exhausted() {
                view.len().to_string()
            } else {
                format!("{}+", view.len())
            };
            format!("{}/{}", navigator.selected() + 1, total)
        };

        let mut spans = vec![
            Span::styled(repo_name.to_string(), theme.accent()),
            Span::raw("  "),
            Span::raw(position),
        ];
        let query = to_query(navigator.params());
        if !query.is_empty() {
            spans.push(Span::raw("  "));
            spans.push(Span::styled(format!("[{}]", query), theme.key()));
        }
        if navigator.phase() == Phase::Loading {
            spans.push(Span::styled("  loading…", theme.dim()));
        }
        if view.skipped() > 0 {
            spans.push(Span::styled(
                format!("  {} malformed skipped", view.skipped()),
                theme.error(),
            ));
        }
        spans.push(Span::styled("  ? help", theme.dim()));
        Line::from(spans)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{Command, Input};
    use crate::navigator::NavigatorConfig;
    use gittree_core::{CommitRecord, FilterParams, SourceConfig};
    use gittree_git::{MemoryRepo, MemorySourceFactory};
    use std::sync::Arc;

    fn text(navigator: &Navigator) -> String {
        let area = Rect::new(0, 0, 60, 1);
        let mut buf = Buffer::empty(area);
        StatusBarWidget::render(navigator, "demo", &Theme::default(), area, &mut buf);
        (0..area.width).map(|x| buf[(x, area.y)].symbol()).collect::<String>()
    }

    #[test]
    fn test_summary_and_prompt() {
        let repo = MemoryRepo::new(vec![CommitRecord::new("a", &[])]);
        let mut navigator = Navigator::new(
            Arc::new(MemorySourceFactory::new(repo)),
            FilterParams::default(),
            SourceConfig::default(),
            NavigatorConfig::default(),
        )
        .unwrap();

        let summary = text(&navigator);
        assert!(summary.starts_with("demo  0/0  loading"));

        navigator.handle(Input::Command(Command::StartFilter));
        navigator.handle(Input::Char('x'));
        assert!(text(&navigator).starts_with("filter: x"));
    }
}
