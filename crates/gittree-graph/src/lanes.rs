//! Lane slot arena with an explicit free-list
//!
//! A lane is a column of the graph. Each slot records which commit the lane
//! is waiting for: the parent that will continue the line when it shows up
//! in the stream. Slots are addressed by index and recycled through a
//! free-list that always hands out the lowest free index, so the main line
//! stays leftmost and side branches bundle to the right.

use std::collections::{BTreeSet, HashMap};

use gittree_core::CommitId;

/// State of one lane column
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LaneSlot {
    /// Available for allocation
    Free,
    /// Handed out for the row being laid out, not yet waiting on anything
    Held,
    /// Waiting for the given commit to appear
    Awaiting(CommitId),
}

impl LaneSlot {
    pub fn occupant(&self) -> Option<&str> {
        match self {
            Self::Awaiting(id) => Some(id),
            _ => None,
        }
    }
}

/// Arena of lane slots addressed by index
#[derive(Debug, Clone, Default)]
pub struct LaneAllocator {
    slots: Vec<LaneSlot>,
    /// Indices of `Free` slots
    free: BTreeSet<usize>,
    /// Commit id -> lanes awaiting it (more than one when branches fork)
    awaiting: HashMap<CommitId, BTreeSet<usize>>,
}

impl LaneAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the lowest free lane, growing the arena if none is free
    pub fn allocate(&mut self) -> usize {
        if let Some(lane) = self.free.pop_first() {
            self.slots[lane] = LaneSlot::Held;
            return lane;
        }
        self.slots.push(LaneSlot::Held);
        self.slots.len() - 1
    }

    /// Make `lane` wait for `commit`, replacing whatever it waited for before
    pub fn occupy(&mut self, lane: usize, commit: &str) {
        self.detach(lane);
        self.free.remove(&lane);
        self.slots[lane] = LaneSlot::Awaiting(commit.to_string());
        self.awaiting
            .entry(commit.to_string())
            .or_default()
            .insert(lane);
    }

    /// Return `lane` to the free-list
    pub fn release(&mut self, lane: usize) {
        if lane >= self.slots.len() || self.slots[lane] == LaneSlot::Free {
            return;
        }
        self.detach(lane);
        self.slots[lane] = LaneSlot::Free;
        self.free.insert(lane);
    }

    /// Lanes waiting for `commit`, lowest first
    pub fn lanes_awaiting(&self, commit: &str) -> Vec<usize> {
        self.awaiting
            .get(commit)
            .map(|lanes| lanes.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Lowest lane waiting for `commit`
    pub fn first_awaiting(&self, commit: &str) -> Option<usize> {
        self.awaiting
            .get(commit)
            .and_then(|lanes| lanes.first().copied())
    }

    /// All lanes currently waiting for a commit, in index order
    pub fn occupied(&self) -> Vec<(usize, CommitId)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(lane, slot)| slot.occupant().map(|id| (lane, id.to_string())))
            .collect()
    }

    /// Number of lanes waiting for a commit
    pub fn active_count(&self) -> usize {
        self.slots
            .iter()
            .filter(|slot| matches!(slot, LaneSlot::Awaiting(_)))
            .count()
    }

    pub fn slot(&self, lane: usize) -> Option<&LaneSlot> {
        self.slots.get(lane)
    }

    /// Arena size: one past the highest lane ever allocated
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Drop every slot and start from an empty arena
    pub fn reset(&mut self) {
        self.slots.clear();
        self.free.clear();
        self.awaiting.clear();
    }

    fn detach(&mut self, lane: usize) {
        if let Some(LaneSlot::Awaiting(previous)) = self.slots.get(lane) {
            if let Some(lanes) = self.awaiting.get_mut(previous) {
                lanes.remove(&lane);
                if lanes.is_empty() {
                    let previous = previous.clone();
                    self.awaiting.remove(&previous);
                }
            }
        }
    }
}
