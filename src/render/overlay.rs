//! Positioned overlays handed to the rendering layer
//!
//! Two independent sets: page chrome (one root widget plus the first-page
//! header) and break spacers (one per recorded marker). Each is regenerated
//! wholesale by its signal and mapped through document edits otherwise.

use crate::config::{PaginationOptions, PAGE_TOKEN};
use crate::document::{BreakId, Direction, Document, PositionMap};
use crate::layout::{OverlayState, Signal};
use rustc_hash::FxHashSet;
use serde::Serialize;

/// Furniture for one page boundary: the footer of page `index + 1`, the gap,
/// and the header of page `index + 2`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageChromeEntry {
    pub index: usize,
    /// Float offset placing the breaker at the bottom of its page
    pub margin_top: f32,
    pub footer_height: f32,
    pub gap_height: f32,
    pub gap_border: f32,
    pub header_height: f32,
    pub background: String,
    pub width: f32,
    pub footer_left: String,
    pub footer_right: String,
    pub header_left: String,
    pub header_right: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum OverlayWidget {
    /// `[data-rm-pagination]` root with one entry per page
    PageChrome { entries: Vec<PageChromeEntry> },
    /// Header block above the first line of page 1
    FirstHeader {
        height: f32,
        left: String,
        right: String,
    },
    BreakSpacer {
        break_id: BreakId,
        direction: Direction,
        height: f32,
    },
}

/// A widget anchored at a document position. `side` < 0 renders before
/// content at that position, > 0 after it.
#[derive(Debug, Clone, PartialEq)]
pub struct Overlay {
    pub pos: usize,
    pub side: i8,
    pub widget: OverlayWidget,
}

/// Substitute the running page number into a header/footer template
pub fn render_template(template: &str, page: usize) -> String {
    template.replace(PAGE_TOKEN, &page.to_string())
}

/// Page chrome overlays for the current page count
pub fn page_chrome(state: &OverlayState, options: &PaginationOptions) -> Vec<Overlay> {
    let content = options.page_height - 2.0 * options.page_header_height;
    let entries = (0..state.page_count())
        .map(|index| PageChromeEntry {
            index,
            margin_top: if index == 0 {
                options.page_header_height + content
            } else {
                content
            },
            footer_height: options.page_header_height,
            gap_height: options.page_gap,
            gap_border: options.page_gap_border_size,
            header_height: options.page_header_height,
            background: options.page_break_background.clone(),
            width: options.page_width,
            footer_left: render_template(&options.footer_left, index + 1),
            footer_right: render_template(&options.footer_right, index + 1),
            header_left: render_template(&options.header_left, index + 2),
            header_right: render_template(&options.header_right, index + 2),
        })
        .collect();

    vec![
        Overlay {
            pos: 0,
            side: -1,
            widget: OverlayWidget::PageChrome { entries },
        },
        Overlay {
            pos: 0,
            side: -1,
            widget: OverlayWidget::FirstHeader {
                height: options.page_header_height,
                left: render_template(&options.header_left, 1),
                right: render_template(&options.header_right, 1),
            },
        },
    ]
}

/// One spacer overlay per marker that has a record
pub fn break_spacers(document: &Document, state: &OverlayState) -> Vec<Overlay> {
    document
        .markers()
        .filter_map(|(offset, node, marker)| {
            let record = state.record(marker.break_id)?;
            let pos = match marker.direction {
                Direction::Before => offset,
                Direction::After => offset + node.size(),
            };
            Some(Overlay {
                pos,
                side: marker.direction.sign(),
                widget: OverlayWidget::BreakSpacer {
                    break_id: marker.break_id,
                    direction: marker.direction,
                    height: record.height,
                },
            })
        })
        .collect()
}

/// Combined overlays in `(pos, side)` order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OverlaySet {
    overlays: Vec<Overlay>,
}

impl OverlaySet {
    pub fn iter(&self) -> impl Iterator<Item = &Overlay> {
        self.overlays.iter()
    }

    pub fn len(&self) -> usize {
        self.overlays.len()
    }

    pub fn is_empty(&self) -> bool {
        self.overlays.is_empty()
    }

    /// Page count carried by the chrome widget, if any
    pub fn page_count(&self) -> Option<usize> {
        self.overlays.iter().find_map(|o| match &o.widget {
            OverlayWidget::PageChrome { entries } => Some(entries.len()),
            _ => None,
        })
    }

    pub fn spacers(&self) -> impl Iterator<Item = (BreakId, Direction, f32)> + '_ {
        self.overlays.iter().filter_map(|o| match o.widget {
            OverlayWidget::BreakSpacer {
                break_id,
                direction,
                height,
            } => Some((break_id, direction, height)),
            _ => None,
        })
    }
}

/// Merge two overlay sets into one collection. The sort is stable, so
/// overlays sharing a position keep their relative order.
pub fn merge(a: &[Overlay], b: &[Overlay]) -> OverlaySet {
    let mut overlays: Vec<Overlay> = a.iter().chain(b).cloned().collect();
    overlays.sort_by_key(|o| (o.pos, o.side));
    OverlaySet { overlays }
}

/// The two overlay sets the rendering layer keeps between signals
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OverlaySets {
    page_chrome: Vec<Overlay>,
    break_spacers: Vec<Overlay>,
}

impl OverlaySets {
    pub fn new(document: &Document, state: &OverlayState, options: &PaginationOptions) -> Self {
        Self {
            page_chrome: page_chrome(state, options),
            break_spacers: break_spacers(document, state),
        }
    }

    /// Regenerate the set a signal refers to
    pub fn apply(
        &mut self,
        signal: Signal,
        document: &Document,
        state: &OverlayState,
        options: &PaginationOptions,
    ) {
        match signal {
            Signal::PageCount => self.page_chrome = page_chrome(state, options),
            Signal::Breaks => self.break_spacers = break_spacers(document, state),
        }
    }

    /// Move every anchor through a document edit
    pub fn map(&mut self, map: &PositionMap) {
        if map.is_identity() {
            return;
        }
        for overlay in self.page_chrome.iter_mut().chain(self.break_spacers.iter_mut()) {
            overlay.pos = map.map(overlay.pos, overlay.side);
        }
    }

    /// Drop spacers whose marker left the document
    pub fn retain_breaks(&mut self, live: &FxHashSet<BreakId>) {
        self.break_spacers.retain(|o| match o.widget {
            OverlayWidget::BreakSpacer { break_id, .. } => live.contains(&break_id),
            _ => true,
        });
    }

    pub fn page_chrome(&self) -> &[Overlay] {
        &self.page_chrome
    }

    pub fn break_spacers(&self) -> &[Overlay] {
        &self.break_spacers
    }

    pub fn merged(&self) -> OverlaySet {
        merge(&self.page_chrome, &self.break_spacers)
    }
}
