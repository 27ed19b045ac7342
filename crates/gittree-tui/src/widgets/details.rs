//! Details pane for the selected commit

use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Paragraph, Wrap},
};

use crate::navigator::DetailsPane;
use crate::theme::Theme;

pub struct DetailsWidget;

impl DetailsWidget {
    pub fn render(pane: &DetailsPane, theme: &Theme, area: Rect, buf: &mut Buffer) {
        let block = Block::default()
            .title(" Details ")
            .borders(Borders::ALL)
            .border_style(theme.accent());

        let paragraph = Paragraph::new(Self::lines(pane, theme))
            .block(block)
            .wrap(Wrap { trim: false });
        Widget::render(paragraph, area, buf);
    }

    fn lines(pane: &DetailsPane, theme: &Theme) -> Vec<Line<'static>> {
        let record = &pane.record;
        let field = |name: &str, value: String| {
            Line::from(vec![
                Span::styled(format!("{:<8}", name), theme.dim()),
                Span::raw(value),
            ])
        };

        let mut lines = vec![
            field("commit", record.id.clone()),
            field("parents", record.parents.join(" ")),
            field(
                "author",
                format!("{} <{}>", record.author_name, record.author_email),
            ),
            field("date", record.author_time.to_rfc2822()),
        ];
        if record.commit_time != record.author_time {
            lines.push(field("landed", record.commit_time.to_rfc2822()));
        }
        if !record.refs.is_empty() {
            let refs: Vec<String> = record.refs.iter().map(|r| r.to_string()).collect();
            lines.push(field("refs", refs.join(", ")));
        }
        lines.push(Line::default());
        lines.push(Line::styled(record.subject.clone(), theme.accent()));

        if let Some(error) = &pane.error {
            lines.push(Line::default());
            lines.push(Line::styled(error.clone(), theme.error()));
            return lines;
        }
        let Some(details) = &pane.details else {
            lines.push(Line::default());
            lines.push(Line::styled("Loading…", theme.dim()));
            return lines;
        };

        if !details.body.trim().is_empty() {
            lines.push(Line::default());
            lines.extend(details.body.trim_end().lines().map(|l| Line::raw(l.to_string())));
        }
        if !details.files.is_empty() {
            lines.push(Line::default());
            for file in &details.files {
                lines.push(Line::from(vec![
                    Span::styled(format!("{} ", file.status), theme.key()),
                    Span::raw(file.path.clone()),
                ]));
            }
        }
        lines
    }
}
