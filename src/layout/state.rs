//! Overlay state shared between recompute passes and overlay rendering

use crate::document::{BreakId, Direction};
use crate::layout::breaks::BreakPlan;
use rustc_hash::{FxHashMap, FxHashSet};

/// Kind of page break a record describes. Only explicit markers exist today.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BreakKind {
    #[default]
    Explicit,
}

/// Computed spacer for one marker
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BreakRecord {
    pub kind: BreakKind,
    pub direction: Direction,
    /// Spacer height in pixels, at least 1
    pub height: f32,
}

impl BreakRecord {
    pub fn explicit(direction: Direction, height: f32) -> Self {
        Self {
            kind: BreakKind::Explicit,
            direction,
            height,
        }
    }
}

/// What the last completed pass established.
///
/// Records are keyed by marker id and cover exactly the markers the last pass
/// saw. `page_count` never drops below one.
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayState {
    last_marker_tops: Vec<f32>,
    page_count: usize,
    records: FxHashMap<BreakId, BreakRecord>,
}

impl Default for OverlayState {
    fn default() -> Self {
        Self {
            last_marker_tops: Vec::new(),
            page_count: 1,
            records: FxHashMap::default(),
        }
    }
}

impl OverlayState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marker tops recorded by the last pass, in document order
    pub fn last_marker_tops(&self) -> &[f32] {
        &self.last_marker_tops
    }

    pub fn page_count(&self) -> usize {
        self.page_count
    }

    pub fn record(&self, break_id: BreakId) -> Option<&BreakRecord> {
        self.records.get(&break_id)
    }

    pub fn records(&self) -> impl Iterator<Item = (BreakId, &BreakRecord)> {
        self.records.iter().map(|(id, record)| (*id, record))
    }

    pub fn record_count(&self) -> usize {
        self.records.len()
    }

    /// Replace everything with the outcome of a pass. Records of markers the
    /// plan did not see are dropped.
    pub(crate) fn commit(&mut self, plan: &BreakPlan, page_count: usize) {
        self.records = plan.records().collect();
        self.last_marker_tops = plan.predicted_tops();
        self.set_page_count(page_count);
    }

    pub(crate) fn set_page_count(&mut self, page_count: usize) {
        self.page_count = page_count.max(1);
    }

    /// Drop records whose marker is gone
    pub(crate) fn retain(&mut self, live: &FxHashSet<BreakId>) {
        self.records.retain(|id, _| live.contains(id));
    }

    pub(crate) fn reset(&mut self) {
        *self = Self::default();
    }
}
