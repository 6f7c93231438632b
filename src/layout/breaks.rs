//! Spacer heights for explicit page breaks
//!
//! Read phase only: every marker is measured in document order and its
//! spacer height computed as if the spacers of all earlier markers had
//! already been written. Nothing here touches the render tree.

use crate::config::PageMetrics;
use crate::document::{BreakId, BreakMarker, Direction};
use crate::layout::geometry::GeometryReader;
use crate::layout::state::BreakRecord;
use crate::render::{ElementId, LayoutSource, MarkerSlot};
use log::warn;
use rustc_hash::{FxHashMap, FxHashSet};

/// Spacers never collapse below this height
pub const MIN_SPACER_HEIGHT: f32 = 1.0;

/// Which simulated page a position falls on, and how far into its usable
/// height
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageSlot {
    /// 0-based page index
    pub index: usize,
    /// Offset from the start of that page's usable height
    pub offset: f32,
}

impl PageMetrics {
    /// Map a document-relative position onto the simulated page sequence.
    /// Page 0 is taller by the first-page header.
    pub fn locate(&self, pos: f32) -> PageSlot {
        let first = self.first_page_usable();
        if pos < first {
            return PageSlot {
                index: 0,
                offset: pos.max(0.0),
            };
        }
        let usable = self.page_usable();
        let rel = pos - first;
        PageSlot {
            // The cast saturates for absurd positions
            index: ((rel / usable).floor() as usize).saturating_add(1),
            offset: rel % usable,
        }
    }
}

impl Direction {
    /// Spacer height that moves the page boundary to this side of a marker
    /// whose bottom lands at `slot`.
    pub fn spacer_height(self, slot: PageSlot, marker_height: f32, metrics: &PageMetrics) -> f32 {
        let content = metrics.content_height();
        let first_extra = if slot.index == 0 {
            metrics.header_height
        } else {
            0.0
        };
        let raw = match self {
            Direction::After => content + first_extra - slot.offset,
            Direction::Before => {
                content + first_extra + metrics.chrome_height() - slot.offset + marker_height
            }
        };
        clamp_spacer(raw)
    }
}

fn clamp_spacer(height: f32) -> f32 {
    if height >= MIN_SPACER_HEIGHT {
        height
    } else {
        MIN_SPACER_HEIGHT
    }
}

/// One marker's share of a recompute pass
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedBreak {
    /// Rendered marker element
    pub element: ElementId,
    pub marker: BreakMarker,
    /// Spacer height to write
    pub height: f32,
    /// Existing spacer carrying this marker's id: the one beside the marker
    /// if there is one, otherwise the first found
    pub spacer: Option<ElementId>,
    /// The existing spacer sits next to the marker on the correct side
    pub in_place: bool,
    /// Height of the in-place spacer before the write
    pub current_height: f32,
    /// Where the marker's top lands once the plan is applied
    pub predicted_top: f32,
}

impl PlannedBreak {
    pub fn break_id(&self) -> BreakId {
        self.marker.break_id
    }

    pub fn record(&self) -> BreakRecord {
        BreakRecord::explicit(self.marker.direction, self.height)
    }
}

/// Spacer heights for every rendered marker, in document order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BreakPlan {
    breaks: Vec<PlannedBreak>,
}

impl BreakPlan {
    pub fn compute<S: LayoutSource + ?Sized>(source: &S, metrics: &PageMetrics) -> Self {
        let reader = GeometryReader::new(source);
        let slots = source.marker_slots();

        // Spacers sitting beside their own marker are never handed to another
        let owned: FxHashSet<ElementId> = slots.iter().filter_map(MarkerSlot::own_spacer).collect();
        let mut strays: FxHashMap<BreakId, ElementId> = FxHashMap::default();
        for (break_id, spacer) in source.spacers() {
            if !owned.contains(&spacer) {
                strays.entry(break_id).or_insert(spacer);
            }
        }

        let mut seen: FxHashSet<BreakId> = FxHashSet::default();
        let mut shift = 0.0;
        let mut breaks = Vec::new();
        for slot in slots {
            let marker = slot.marker;
            if !seen.insert(marker.break_id) {
                warn!("break {} rendered more than once", marker.break_id);
            }
            let measured = reader.measure(slot.element);
            let own = slot.own_spacer();

            // A before-spacer already sits above the marker; measure from its
            // top so the marker is placed as if the spacer were absent.
            let top = match (marker.direction, own) {
                (Direction::Before, Some(spacer)) => reader.measure(spacer).offset_top,
                _ => measured.offset_top,
            };
            let pos = top + shift + measured.height;
            let height = marker
                .direction
                .spacer_height(metrics.locate(pos), measured.height, metrics);
            let current_height = own.map(|s| reader.measure(s).height).unwrap_or(0.0);

            let predicted_top = match marker.direction {
                Direction::After => measured.offset_top + shift,
                Direction::Before => top + shift + height,
            };

            breaks.push(PlannedBreak {
                element: slot.element,
                marker,
                height,
                spacer: own.or_else(|| strays.remove(&marker.break_id)),
                in_place: own.is_some(),
                current_height,
                predicted_top,
            });
            shift += height - current_height;
        }

        Self { breaks }
    }

    pub fn breaks(&self) -> &[PlannedBreak] {
        &self.breaks
    }

    pub fn len(&self) -> usize {
        self.breaks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.breaks.is_empty()
    }

    pub fn get(&self, break_id: BreakId) -> Option<&PlannedBreak> {
        self.breaks.iter().find(|b| b.break_id() == break_id)
    }

    pub fn predicted_tops(&self) -> Vec<f32> {
        self.breaks.iter().map(|b| b.predicted_top).collect()
    }

    pub fn records(&self) -> impl Iterator<Item = (BreakId, BreakRecord)> + '_ {
        self.breaks.iter().map(|b| (b.break_id(), b.record()))
    }
}
