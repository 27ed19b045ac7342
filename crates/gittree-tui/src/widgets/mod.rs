//! Navigator widgets
//!
//! Each widget is a static `render` function drawing one part of the screen
//! from navigator state.

use ratatui::layout::Rect;

mod details;
mod graph_view;
mod help;
mod status_bar;

pub use details::DetailsWidget;
pub use graph_view::GraphViewWidget;
pub use help::HelpWidget;
pub use status_bar::StatusBarWidget;

/// Rectangle of at most `width` x `height` centered in `area`
pub fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect::new(
        area.x + (area.width - width) / 2,
        area.y + (area.height - height) / 2,
        width,
        height,
    )
}
