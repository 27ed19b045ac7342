//! Main UI layout and rendering
//!
//! Defines the screen layout and delegates to individual widgets.

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    prelude::*,
    Frame,
};

use crate::{
    app::App,
    navigator::Phase,
    widgets::{centered_rect, DetailsWidget, GraphViewWidget, HelpWidget, StatusBarWidget},
};

/// Screen areas for one frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScreenLayout {
    pub graph: Rect,
    pub details: Option<Rect>,
    pub status: Rect,
}

/// Split `area` into graph, optional details pane and status line
pub fn layout(area: Rect, details_open: bool) -> ScreenLayout {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(1)])
        .split(area);

    if !details_open {
        return ScreenLayout {
            graph: rows[0],
            details: None,
            status: rows[1],
        };
    }

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(rows[0]);
    ScreenLayout {
        graph: columns[0],
        details: Some(columns[1]),
        status: rows[1],
    }
}

/// Draw the whole screen
pub fn draw(frame: &mut Frame, app: &mut App) {
    let screen = layout(frame.area(), app.navigator.details().is_some());

    let lines = app.visible_lines(screen.graph.width as usize);
    let empty_message = match app.navigator.phase() {
        Phase::Loading => Some("Loading history…"),
        _ if app.navigator.view().is_empty() => Some("No commits match the current filter"),
        _ => None,
    };
    let selected = app.navigator.selected();
    let theme = &app.theme;
    frame.render_widget(
        WidgetAdapter::new(|area, buf| {
            GraphViewWidget::render(&lines, selected, empty_message, theme, area, buf)
        }),
        screen.graph,
    );

    if let (Some(area), Some(pane)) = (screen.details, app.navigator.details()) {
        frame.render_widget(
            WidgetAdapter::new(|area, buf| DetailsWidget::render(pane, theme, area, buf)),
            area,
        );
    }

    let navigator = &app.navigator;
    let repo_name = app.repo_name.as_str();
    frame.render_widget(
        WidgetAdapter::new(|area, buf| {
            StatusBarWidget::render(navigator, repo_name, theme, area, buf)
        }),
        screen.status,
    );

    if navigator.help_visible() {
        let area = centered_rect(48, HelpWidget::height(), frame.area());
        frame.render_widget(
            WidgetAdapter::new(|area, buf| HelpWidget::render(theme, area, buf)),
            area,
        );
    }
}

/// Widget adapter to bridge static render functions to ratatui's Widget trait
struct WidgetAdapter<F>
where
    F: FnOnce(Rect, &mut Buffer),
{
    render_fn: F,
}

impl<F> WidgetAdapter<F>
where
    F: FnOnce(Rect, &mut Buffer),
{
    fn new(render_fn: F) -> Self {
        Self { render_fn }
    }
}

impl<F> Widget for WidgetAdapter<F>
where
    F: FnOnce(Rect, &mut Buffer),
{
    fn render(self, area: Rect, buf: &mut Buffer) {
        (self.render_fn)(area, buf);
    }
}
