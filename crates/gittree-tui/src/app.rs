//! Main application state
//!
//! The `App` struct ties the navigator to what only the UI needs: the
//! render cache, the theme and date formatting.

use chrono::Utc;
use gittree_core::GitTreeConfig;
use gittree_graph::{DateStyle, RenderOptions, StyledLine};

use crate::{cache::RenderCache, navigator::Navigator, theme::Theme};

pub struct App {
    pub navigator: Navigator,
    pub cache: RenderCache,
    pub theme: Theme,
    pub dates: DateStyle,
    /// Shown in the status bar
    pub repo_name: String,
}

impl App {
    pub fn new(navigator: Navigator, config: &GitTreeConfig, repo_name: impl Into<String>) -> Self {
        let dates = if config.relative_dates {
            DateStyle::Relative
        } else {
            DateStyle::Absolute(config.date_format.clone())
        };
        Self {
            navigator,
            cache: RenderCache::new(),
            theme: Theme::from_config(config),
            dates,
            repo_name: repo_name.into(),
        }
    }

    pub fn render_options(&self, width: usize) -> RenderOptions {
        RenderOptions {
            glyphs: self.navigator.glyphs(),
            dates: self.dates.clone(),
            width,
            now: Utc::now(),
        }
    }

    /// Rendered rows inside the viewport, with their row index
    pub fn visible_lines(&mut self, width: usize) -> Vec<(usize, StyledLine)> {
        let options = self.render_options(width);
        let view = self.navigator.view();
        let max_lane = view.max_lane_seen();
        let mut lines = Vec::new();
        for index in self.navigator.visible() {
            if let Some(row) = view.row(index) {
                lines.push((index, self.cache.line(row, max_lane, &options).clone()));
            }
        }
        lines
    }
}
