//! Commit graph list
//!
//! Draws the rows inside the viewport, one line per commit, with the
//! selected row highlighted.

use gittree_graph::StyledLine;
use ratatui::{prelude::*, text::Span};

use crate::theme::Theme;

pub struct GraphViewWidget;

impl GraphViewWidget {
    /// Render `lines` (row index, rendered row) starting at the top of `area`
    pub fn render(
        lines: &[(usize, StyledLine)],
        selected: usize,
        empty_message: Option<&str>,
        theme: &Theme,
        area: Rect,
        buf: &mut Buffer,
    ) {
        if area.height == 0 || area.width == 0 {
            return;
        }

        if lines.is_empty() {
            if let Some(message) = empty_message {
                buf.set_stringn(area.x, area.y, message, area.width as usize, theme.dim());
            }
            return;
        }

        for (offset, (index, line)) in lines.iter().take(area.height as usize).enumerate() {
            let y = area.y + offset as u16;
            let row_area = Rect::new(area.x, y, area.width, 1);
            buf.set_line(area.x, y, &Self::to_line(line, theme), area.width);
            if *index == selected {
                buf.set_style(row_area, theme.selection());
            }
        }
    }

    fn to_line(line: &StyledLine, theme: &Theme) -> Line<'static> {
        Line::from(
            line.spans
                .iter()
                .map(|span| Span::styled(span.text.clone(), theme.style(span.hint)))
                .collect::<Vec<_>>(),
        )
    }
}
