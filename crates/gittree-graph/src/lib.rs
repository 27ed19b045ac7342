//! # gittree-graph
//!
//! Commit-graph layout for gittree.
//!
//! This crate provides:
//! - Lane slot arena with a lowest-index free-list
//! - Incremental graph builder producing one row per commit
//! - Pure row renderer with ASCII and Unicode glyph sets
//!
//! ```text
//! *-\  f00d123 alice 2 days ago (HEAD -> main) Merge feature
//! | *  beef456 bob   3 days ago Add parser
//! * |  cafe789 alice 4 days ago Fix typo
//! *-/  0ddba11 alice 5 days ago Initial commit
//! ```

mod builder;
mod lanes;
mod render;

pub use builder::{BoundaryPatch, Connector, Glyph, GraphBuilder, GraphRow};
pub use lanes::{LaneAllocator, LaneSlot};
pub use render::{
    format_relative, render_row, truncate_to_width, DateStyle, GlyphSet, RenderOptions,
    StyleHint, StyledLine, StyledSpan,
};

use gittree_core::{CommitRecord, Generation, GitTreeError};
use tracing::warn;

/// Result of laying out a complete, finite commit sequence
#[derive(Debug, Clone, Default)]
pub struct Layout {
    pub rows: Vec<GraphRow>,
    pub max_lane_seen: usize,
    /// Records rejected as malformed
    pub skipped: Vec<String>,
}

/// Lay out every record of a finite sequence, marking boundaries on the
/// last row. Malformed records are skipped.
pub fn layout_all(generation: Generation, records: impl IntoIterator<Item = CommitRecord>) -> Layout {
    let mut builder = GraphBuilder::new(generation);
    let mut layout = Layout::default();

    for record in records {
        match builder.advance(record) {
            Ok(row) => layout.rows.push(row),
            Err(GitTreeError::MalformedRecord(msg)) => {
                warn!("skipping row: {}", msg);
                layout.skipped.push(msg);
            }
            Err(e) => {
                warn!("skipping row: {}", e);
                layout.skipped.push(e.to_string());
            }
        }
    }

    if let Some(patch) = builder.finish() {
        if let Some(row) = layout.rows.get_mut(patch.row) {
            patch.apply(row);
        }
    }
    layout.max_lane_seen = builder.max_lane_seen();
    layout
}
