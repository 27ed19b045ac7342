//! Render-ahead cache for styled rows

use gittree_core::Generation;
use gittree_graph::{render_row, GlyphSet, GraphRow, RenderOptions, StyledLine};
use std::collections::HashMap;

/// Entries kept before the cache starts over
const CAPACITY: usize = 4096;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct CacheKey {
    row: usize,
    glyphs: GlyphSet,
    width: usize,
    /// Lane columns drawn; grows as wider rows are laid out further down
    lanes: usize,
    /// Boundaries are patched onto a row once the source runs dry
    connectors: usize,
}

/// Rendered lines of one generation
#[derive(Debug, Default)]
pub struct RenderCache {
    generation: Generation,
    lines: HashMap<CacheKey, StyledLine>,
    hits: u64,
    misses: u64,
}

impl RenderCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rendered line for `row`, rendering it on a miss
    pub fn line(&mut self, row: &GraphRow, max_lane_seen: usize, options: &RenderOptions) -> &StyledLine {
        if row.generation != self.generation {
            self.lines.clear();
            self.generation = row.generation;
        }
        if self.lines.len() >= CAPACITY {
            self.lines.clear();
        }

        let key = CacheKey {
            row: row.index,
            glyphs: options.glyphs,
            width: options.width,
            lanes: max_lane_seen,
            connectors: row.connectors.len(),
        };
        if self.lines.contains_key(&key) {
            self.hits += 1;
        } else {
            self.misses += 1;
        }
        self.lines
            .entry(key)
            .or_insert_with(|| render_row(row, max_lane_seen, options))
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// (hits, misses) since creation
    pub fn stats(&self) -> (u64, u64) {
        (self.hits, self.misses)
    }
}
