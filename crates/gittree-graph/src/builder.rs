//! Incremental graph construction
//!
//! [`GraphBuilder`] consumes commits in source order (children before
//! parents) and lays out one [`GraphRow`] per commit:
//!
//! 1. A commit takes the lowest lane already waiting for it, or the lowest
//!    free lane if none is (a branch tip entering the graph).
//! 2. Other lanes waiting for the same commit fork off here and are freed.
//! 3. The first parent continues in the commit's lane; every further parent
//!    gets a merge-in connector, to the lane already waiting for it or to
//!    the lowest free lane.
//! 4. A root commit frees its lane.
//! 5. Every other waiting lane passes straight through the row.
//!
//! Parents that never show up (history cut by a cap or range) leave lanes
//! waiting when the source runs dry; [`GraphBuilder::finish`] turns those
//! into boundary connectors on the last row.

use std::collections::HashSet;
use std::sync::Arc;

use gittree_core::{CommitRecord, Generation, GitTreeError, Result};
use tracing::{debug, trace};

use crate::lanes::LaneAllocator;

/// A line segment a row draws in some lane
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Connector {
    /// Vertical line for a lane waiting on a commit further down
    PassThrough { lane: usize },
    /// Line from this commit out to the lane carrying an additional parent
    MergeIn { lane: usize },
    /// Lane that was waiting for this commit joins it here and terminates
    Fork { lane: usize },
    /// The lane's next commit lies outside the loaded or filtered history
    Boundary { lane: usize },
}

/// Drawable cell of a row. The renderer maps each to one character.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Glyph {
    None,
    Vertical,
    Horizontal,
    /// `/`: a line running from upper right to lower left
    Fork,
    /// `\`: a line running from upper left to lower right
    Merge,
    Commit,
    Boundary,
}

/// Layout of one commit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphRow {
    pub generation: Generation,
    /// Position in the generation's row sequence
    pub index: usize,
    /// Lane holding the commit marker
    pub lane: usize,
    /// Segments drawn in this row, in the order they were produced
    pub connectors: Vec<Connector>,
    pub record: Arc<CommitRecord>,
}

impl GraphRow {
    /// Number of lane columns this row touches
    pub fn width(&self) -> usize {
        self.connectors
            .iter()
            .map(|c| match *c {
                Connector::PassThrough { lane }
                | Connector::MergeIn { lane }
                | Connector::Fork { lane }
                | Connector::Boundary { lane } => lane,
            })
            .chain(std::iter::once(self.lane))
            .max()
            .unwrap_or(0)
            + 1
    }

    pub fn merge_count(&self) -> usize {
        self.connectors
            .iter()
            .filter(|c| matches!(c, Connector::MergeIn { .. }))
            .count()
    }

    pub fn has_boundary(&self) -> bool {
        self.connectors
            .iter()
            .any(|c| matches!(c, Connector::Boundary { .. }))
    }

    /// Lay the connectors out as cells: two per lane (the lane itself and
    /// the gap to its right), `lanes` lanes wide.
    pub fn cells(&self, lanes: usize) -> Vec<Glyph> {
        let lanes = lanes.max(self.width());
        let mut cells = vec![Glyph::None; lanes * 2];

        for connector in &self.connectors {
            if let Connector::PassThrough { lane } = *connector {
                cells[lane * 2] = Glyph::Vertical;
            }
        }

        for connector in &self.connectors {
            let (lane, away, toward) = match *connector {
                Connector::MergeIn { lane } => (lane, Glyph::Merge, Glyph::Fork),
                Connector::Fork { lane } => (lane, Glyph::Fork, Glyph::Merge),
                _ => continue,
            };
            let (start, end) = if lane > self.lane {
                (self.lane * 2 + 1, lane * 2)
            } else {
                (lane * 2 + 1, self.lane * 2)
            };
            for cell in &mut cells[start..end] {
                if *cell == Glyph::None {
                    *cell = Glyph::Horizontal;
                }
            }
            // Lines opening to the right lean like `\`, to the left like `/`.
            // A lane that also passes through keeps its vertical.
            if cells[lane * 2] != Glyph::Vertical {
                cells[lane * 2] = if lane > self.lane { away } else { toward };
            }
        }

        cells[self.lane * 2] = Glyph::Commit;

        for connector in &self.connectors {
            if let Connector::Boundary { lane } = *connector {
                if lane == self.lane {
                    cells[lane * 2 + 1] = Glyph::Boundary;
                } else {
                    cells[lane * 2] = Glyph::Boundary;
                }
            }
        }

        cells
    }
}

/// Lanes left dangling when the source ran dry, to be drawn on `row`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundaryPatch {
    pub row: usize,
    pub lanes: Vec<usize>,
}

impl BoundaryPatch {
    pub fn apply(&self, row: &mut GraphRow) {
        for &lane in &self.lanes {
            let connector = Connector::Boundary { lane };
            if !row.connectors.contains(&connector) {
                row.connectors.push(connector);
            }
        }
    }
}

/// Builds the rows of one generation
#[derive(Debug)]
pub struct GraphBuilder {
    generation: Generation,
    lanes: LaneAllocator,
    seen: HashSet<String>,
    rows: usize,
    max_lane: usize,
}

impl GraphBuilder {
    pub fn new(generation: Generation) -> Self {
        Self {
            generation,
            lanes: LaneAllocator::new(),
            seen: HashSet::new(),
            rows: 0,
            max_lane: 0,
        }
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    /// Rows produced so far
    pub fn row_count(&self) -> usize {
        self.rows
    }

    /// Highest lane index any row has used
    pub fn max_lane_seen(&self) -> usize {
        self.max_lane
    }

    /// Lanes still waiting for a commit
    pub fn active_lanes(&self) -> usize {
        self.lanes.active_count()
    }

    pub fn lanes(&self) -> &LaneAllocator {
        &self.lanes
    }

    /// Lay out the next commit.
    ///
    /// A record without an id, or one repeating an id already seen, is
    /// rejected with `MalformedRecord`; the builder state is untouched and
    /// the caller can continue with the next record.
    pub fn advance(&mut self, record: CommitRecord) -> Result<GraphRow> {
        let id = record.id.trim();
        if id.is_empty() {
            return Err(GitTreeError::MalformedRecord(format!(
                "record without identifier (subject: {:?})",
                record.subject
            )));
        }
        if self.seen.contains(id) {
            return Err(GitTreeError::MalformedRecord(format!(
                "duplicate identifier {}",
                id
            )));
        }
        let id = id.to_string();

        let before = self.lanes.occupied();
        let waiting = self.lanes.lanes_awaiting(&id);
        let lane = match waiting.first() {
            Some(&lane) => lane,
            None => self.lanes.allocate(),
        };
        let forks = waiting.get(1..).unwrap_or_default().to_vec();

        let mut connectors: Vec<Connector> = before
            .iter()
            .filter(|(l, _)| *l != lane && !forks.contains(l))
            .map(|&(lane, _)| Connector::PassThrough { lane })
            .collect();
        connectors.extend(forks.iter().map(|&lane| Connector::Fork { lane }));

        match record.parents.split_first() {
            None => self.lanes.release(lane),
            Some((first, rest)) => {
                self.lanes.occupy(lane, first);

                let mut merged: Vec<&str> = Vec::new();
                for parent in rest {
                    if parent == first || merged.contains(&parent.as_str()) {
                        continue;
                    }
                    merged.push(parent);

                    let target = match self
                        .lanes
                        .lanes_awaiting(parent)
                        .into_iter()
                        .find(|l| *l != lane && !forks.contains(l))
                    {
                        Some(existing) => existing,
                        None => {
                            let fresh = self.lanes.allocate();
                            self.lanes.occupy(fresh, parent);
                            fresh
                        }
                    };
                    connectors.push(Connector::MergeIn { lane: target });
                }
            }
        }

        // Forked lanes are freed only now, so no merge parent lands in a
        // column that is closing in this same row
        for &fork in &forks {
            self.lanes.release(fork);
        }

        let row = GraphRow {
            generation: self.generation,
            index: self.rows,
            lane,
            connectors,
            record: Arc::new(record),
        };

        self.max_lane = self.max_lane.max(row.width() - 1);
        self.rows += 1;
        self.seen.insert(id);
        trace!(
            row = row.index,
            lane = row.lane,
            active = self.lanes.active_count(),
            "laid out commit"
        );
        Ok(row)
    }

    /// Close the generation once the source is exhausted.
    ///
    /// Lanes still waiting reference commits that will never arrive; they
    /// end in a boundary on the last row. Returns `None` when nothing
    /// dangles or no row was produced.
    pub fn finish(&mut self) -> Option<BoundaryPatch> {
        let dangling: Vec<usize> = self
            .lanes
            .occupied()
            .into_iter()
            .map(|(lane, _)| lane)
            .collect();
        self.lanes.reset();

        if dangling.is_empty() || self.rows == 0 {
            return None;
        }
        debug!(
            generation = %self.generation,
            lanes = dangling.len(),
            "history ends at a boundary"
        );
        Some(BoundaryPatch {
            row: self.rows - 1,
            lanes: dangling,
        })
    }
}
