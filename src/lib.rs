//! page-flow: live pagination overlay engine for a continuous editor view
//!
//! This crate paginates a document that is rendered as one continuous flow:
//! - Page chrome (footer, gap, header) is overlaid at fixed page intervals
//! - Explicit break markers get spacers that push content to the next page
//! - Geometry is re-read after every change and recomputed in guarded passes
//! - The host view stays abstract: a headless flow layout, a browser DOM
//!   through the WASM bindings, or a test fixture

pub mod config;
pub mod document;
pub mod error;
pub mod layout;
pub mod render;
pub mod wasm;

// Re-export WASM types for direct use
pub use wasm::WasmPaginator;

// Re-export primary types
pub use config::{PageMetrics, PaginationOptions};
pub use document::{BreakId, BreakMarker, Direction, Document, Node, PositionMap};
pub use error::{PaginationError, Result};
pub use layout::{BreakRecord, OverlayState, PaginationEngine, Signal};
pub use render::{HeadlessView, HostView, LayoutSource, OverlayDiff, OverlaySet, RenderTree};

use layout::Signals;
use log::{debug, warn};
use render::OverlaySets;
use serde::{Deserialize, Serialize};

/// Upper bound on notification rounds handled by one `pump`
pub const MAX_PUMP_ROUNDS: usize = 32;

/// Viewport rectangle
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self { x, y, width, height }
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    pub fn intersects(&self, other: &Rect) -> bool {
        self.x < other.x + other.width
            && self.x + self.width > other.x
            && self.y < other.y + other.height
            && self.y + self.height > other.y
    }
}

/// Outcome of draining notifications
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PumpReport {
    /// Notification batches handled
    pub rounds: usize,
    /// No notifications were left when pumping stopped
    pub settled: bool,
}

/// Host glue: a document, the view rendering it, the engine and the overlay
/// sets, kept in step
pub struct Paginator<V: HostView> {
    options: PaginationOptions,
    document: Document,
    view: V,
    engine: PaginationEngine,
    overlays: OverlaySets,
    rendered: OverlaySet,
}

impl<V: HostView> Paginator<V> {
    /// Render `document` into `view` and mount the initial overlays
    pub fn new(options: PaginationOptions, document: Document, mut view: V) -> Result<Self> {
        let engine = PaginationEngine::new(&options)?;
        view.apply_options(&options);
        view.render_document(&document);
        let overlays = OverlaySets::new(&document, engine.state(), &options);
        let mut paginator = Self {
            options,
            document,
            view,
            engine,
            overlays,
            rendered: OverlaySet::default(),
        };
        paginator.render_overlays();
        Ok(paginator)
    }

    pub fn options(&self) -> &PaginationOptions {
        &self.options
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn view(&self) -> &V {
        &self.view
    }

    pub fn view_mut(&mut self) -> &mut V {
        &mut self.view
    }

    pub fn engine(&self) -> &PaginationEngine {
        &self.engine
    }

    pub fn state(&self) -> &OverlayState {
        self.engine.state()
    }

    pub fn page_count(&self) -> usize {
        self.engine.state().page_count()
    }

    /// The overlay collection last handed to the view
    pub fn overlays(&self) -> &OverlaySet {
        &self.rendered
    }

    /// Insert a block before `index`
    pub fn insert(&mut self, index: usize, node: Node) {
        let map = self.document.insert(index, node);
        self.after_edit(map);
    }

    /// Insert a page break before `index` and return its id
    pub fn insert_page_break(&mut self, index: usize, direction: Direction) -> BreakId {
        let (break_id, map) = self.document.insert_page_break(index, direction);
        self.after_edit(map);
        break_id
    }

    /// Remove the block at `index`
    pub fn remove(&mut self, index: usize) -> Option<Node> {
        let (node, map) = self.document.remove(index)?;
        self.after_edit(map);
        Some(node)
    }

    /// Change the block at `index` in place
    pub fn update(&mut self, index: usize, f: impl FnOnce(&mut Node)) -> bool {
        match self.document.update(index, f) {
            Some(map) => {
                self.after_edit(map);
                true
            }
            None => false,
        }
    }

    fn after_edit(&mut self, map: PositionMap) {
        let live = self.document.break_ids();
        self.engine.retain_breaks(&live);
        self.overlays.map(&map);
        self.overlays.retain_breaks(&live);
        self.view.render_document(&self.document);
        self.render_overlays();
    }

    /// Handle notification batches until the view is quiet or
    /// `MAX_PUMP_ROUNDS` batches have been handled
    pub fn pump(&mut self) -> PumpReport {
        for rounds in 0..MAX_PUMP_ROUNDS {
            let batch = self.view.take_notifications();
            if batch.is_empty() {
                return PumpReport {
                    rounds,
                    settled: true,
                };
            }
            let signals = self.engine.handle(&mut self.view, &batch);
            self.dispatch(signals);
        }

        let settled = self.view.take_notifications().is_empty();
        if !settled {
            warn!("view still changing after {} notification rounds", MAX_PUMP_ROUNDS);
        }
        PumpReport {
            rounds: MAX_PUMP_ROUNDS,
            settled,
        }
    }

    /// Force a full recompute pass
    pub fn recompute(&mut self) {
        let signals = self.engine.recompute(&mut self.view);
        self.dispatch(signals);
    }

    /// Switch page geometry: state is reset and everything recomputed
    pub fn set_options(&mut self, options: PaginationOptions) -> Result<()> {
        self.engine.reconfigure(&options)?;
        self.options = options;
        self.view.apply_options(&self.options);
        self.overlays = OverlaySets::new(&self.document, self.engine.state(), &self.options);
        self.render_overlays();
        self.recompute();
        Ok(())
    }

    fn dispatch(&mut self, signals: Signals) {
        for signal in signals {
            debug!("signal {}", signal.meta_key());
            self.overlays
                .apply(signal, &self.document, self.engine.state(), &self.options);
        }
        self.render_overlays();
    }

    fn render_overlays(&mut self) {
        let next = self.overlays.merged();
        let diff = OverlayDiff::between(&self.rendered, &next);
        if diff.has_patches() {
            diff.apply_to(&mut self.view);
        }
        self.rendered = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paragraph(lines: u32) -> Node {
        Node::paragraph(8).with_attr(render::ATTR_LINES, lines.to_string())
    }

    fn paginator(nodes: Vec<Node>) -> Paginator<HeadlessView> {
        let options = PaginationOptions::default();
        let view = HeadlessView::new(&options).unwrap();
        Paginator::new(options, Document::from_nodes(nodes), view).unwrap()
    }

    #[test]
    fn test_rect_bottom_and_intersects() {
        let a = Rect::new(0.0, 10.0, 100.0, 20.0);
        assert_eq!(a.bottom(), 30.0);
        assert!(a.intersects(&Rect::new(50.0, 25.0, 10.0, 10.0)));
        assert!(!a.intersects(&Rect::new(0.0, 30.0, 100.0, 10.0)));
    }

    #[test]
    fn test_new_mounts_chrome() {
        let p = paginator(vec![paragraph(3)]);
        assert_eq!(p.view().chrome_entries(), 1);
        assert_eq!(p.overlays().page_count(), Some(1));
        assert_eq!(p.page_count(), 1);
    }

    #[test]
    fn test_pump_settles_long_document() {
        let mut p = paginator(vec![paragraph(100)]);
        let report = p.pump();
        assert!(report.settled);
        // Header 10 then 100 lines of 20 across bands: pages of 39, 39, 22
        assert_eq!(p.page_count(), 3);
        assert_eq!(p.view().chrome_entries(), 3);
    }

    #[test]
    fn test_page_break_edit_round_trip() {
        let mut p = paginator(vec![paragraph(5), paragraph(5)]);
        p.pump();
        let bid = p.insert_page_break(1, Direction::After);
        assert!(p.pump().settled);

        let record = *p.state().record(bid).unwrap();
        // Header 10 + 5 lines + marker line: bottom at 130
        assert_eq!(record.height, 790.0 - 130.0);
        assert_eq!(p.view().spacer_height(bid), Some(record.height));
        assert_eq!(p.page_count(), 2);

        p.remove(1);
        assert!(p.pump().settled);
        assert!(p.state().record(bid).is_none());
        assert_eq!(p.view().spacer_height(bid), None);
        assert_eq!(p.page_count(), 1);
    }

    #[test]
    fn test_set_options_recomputes() {
        let mut p = paginator(vec![paragraph(5), paragraph(5)]);
        let bid = p.insert_page_break(1, Direction::After);
        p.pump();

        let taller = PaginationOptions {
            page_height: 1000.0,
            ..PaginationOptions::default()
        };
        p.set_options(taller).unwrap();
        p.pump();
        assert_eq!(p.state().record(bid).map(|r| r.height), Some(990.0 - 130.0));

        let broken = PaginationOptions {
            page_height: -1.0,
            ..PaginationOptions::default()
        };
        assert!(p.set_options(broken).is_err());
    }
}
