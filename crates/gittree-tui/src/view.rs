//! Materialized rows of one graph generation

use gittree_core::{CommitId, Generation, SourceConfig};
use gittree_git::{Batch, CommitSource};
use gittree_graph::{GraphBuilder, GraphRow};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::worker::Effect;

/// Rows laid out so far for one generation, plus the source they come from
pub struct GenerationView {
    generation: Generation,
    source: Arc<dyn CommitSource>,
    config: SourceConfig,
    builder: GraphBuilder,
    rows: Vec<GraphRow>,
    /// Commit id -> row index
    index: HashMap<CommitId, usize>,
    /// Commit id -> rows of its loaded children
    children: HashMap<CommitId, Vec<usize>>,
    /// Records consumed from the source, malformed ones included
    source_offset: usize,
    exhausted: bool,
    in_flight: bool,
    skipped: usize,
}

impl GenerationView {
    pub fn new(generation: Generation, source: Arc<dyn CommitSource>, config: SourceConfig) -> Self {
        Self {
            generation,
            source,
            config,
            builder: GraphBuilder::new(generation),
            rows: Vec::new(),
            index: HashMap::new(),
            children: HashMap::new(),
            source_offset: 0,
            exhausted: false,
            in_flight: false,
            skipped: 0,
        }
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    pub fn source(&self) -> &Arc<dyn CommitSource> {
        &self.source
    }

    pub fn source_config(&self) -> &SourceConfig {
        &self.config
    }

    pub fn rows(&self) -> &[GraphRow] {
        &self.rows
    }

    pub fn row(&self, index: usize) -> Option<&GraphRow> {
        self.rows.get(index)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.index.get(id).copied()
    }

    pub fn children_of(&self, id: &str) -> &[usize] {
        self.children.get(id).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn max_lane_seen(&self) -> usize {
        self.builder.max_lane_seen()
    }

    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    pub fn in_flight(&self) -> bool {
        self.in_flight
    }

    /// Malformed records skipped so far
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    /// Pull effect for the next `count` records, unless the source is done
    /// or a pull is already outstanding
    pub fn next_pull(&mut self, count: usize) -> Option<Effect> {
        if self.exhausted || self.in_flight || count == 0 {
            return None;
        }
        self.in_flight = true;
        debug!(generation = %self.generation, offset = self.source_offset, count, "requesting rows");
        Some(Effect::Pull {
            generation: self.generation,
            source: Arc::clone(&self.source),
            offset: self.source_offset,
            count,
        })
    }

    /// Lay out a batch pulled at `offset`. Returns false when the batch does
    /// not continue where the last one ended.
    pub fn apply(&mut self, offset: usize, batch: Batch) -> bool {
        self.in_flight = false;
        if offset != self.source_offset {
            warn!(
                expected = self.source_offset,
                offset, "ignoring batch that does not continue the sequence"
            );
            return false;
        }

        let received = batch.records.len();
        for record in batch.records {
            match self.builder.advance(record) {
                Ok(row) => {
                    for parent in &row.record.parents {
                        self.children.entry(parent.clone()).or_default().push(row.index);
                    }
                    self.index.insert(row.record.id.clone(), row.index);
                    self.rows.push(row);
                }
                Err(e) => {
                    warn!("skipping row: {}", e);
                    self.skipped += 1;
                }
            }
        }
        self.source_offset += received;

        // An empty batch can never make progress
        if batch.exhausted || received == 0 {
            self.exhausted = true;
            if let Some(patch) = self.builder.finish() {
                if let Some(row) = self.rows.get_mut(patch.row) {
                    patch.apply(row);
                }
            }
        }
        true
    }

    /// The outstanding pull failed; a later request may retry it
    pub fn pull_failed(&mut self) {
        self.in_flight = false;
    }
}
