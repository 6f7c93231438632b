//! In-memory host view with a simple block flow layout
//!
//! Stands in for a browser when paginating outside one (tests, the CLI,
//! benchmarks). Blocks stack vertically; every line box that would overlap a
//! chrome band is pushed below it, which is how the absolutely positioned
//! page chrome of the real editor interacts with floated content. Spacers and
//! widgets ignore bands.

use crate::config::{PageMetrics, PaginationOptions};
use crate::document::{BreakId, Direction, Document, NodeId};
use crate::error::Result;
use crate::layout::{Notification, NotificationBatch};
use crate::render::{
    BoxEdges, DisplayMode, ElementId, ElementRole, HostView, LayoutSource, RenderTree,
};
use crate::Rect;
use rustc_hash::FxHashMap;
use std::cell::{Cell, Ref, RefCell};

/// Node attribute: number of line boxes in a block
pub const ATTR_LINES: &str = "lines";
/// Node attribute: line height in pixels
pub const ATTR_LINE_HEIGHT: &str = "lineHeight";
/// Node attribute: comma-separated row heights; the block renders as
/// `display: contents` with one child per row
pub const ATTR_ROWS: &str = "rows";
pub const ATTR_MARGIN_TOP: &str = "marginTop";
pub const ATTR_MARGIN_BOTTOM: &str = "marginBottom";

pub const DEFAULT_LINE_HEIGHT: f32 = 20.0;

/// Writes smaller than this do not count as geometry changes
const WRITE_EPSILON: f32 = 0.01;

/// Vertical box model of a rendered block
#[derive(Debug, Clone, PartialEq)]
pub struct BlockStyle {
    pub lines: u32,
    pub line_height: f32,
    pub margin_top: f32,
    pub margin_bottom: f32,
    pub rows: Vec<f32>,
}

impl Default for BlockStyle {
    fn default() -> Self {
        Self {
            lines: 1,
            line_height: DEFAULT_LINE_HEIGHT,
            margin_top: 0.0,
            margin_bottom: 0.0,
            rows: Vec::new(),
        }
    }
}

impl BlockStyle {
    /// Read style attributes from a node, ignoring malformed values
    pub fn from_node(node: &crate::document::Node) -> Self {
        let mut style = Self::default();
        if node.is_break_marker() {
            return style;
        }
        let num = |key: &str| node.attr(key).and_then(|v| v.trim().parse::<f32>().ok());
        if let Some(lines) = node.attr(ATTR_LINES).and_then(|v| v.trim().parse().ok()) {
            style.lines = lines;
        }
        if let Some(lh) = num(ATTR_LINE_HEIGHT).filter(|v| *v >= 0.0) {
            style.line_height = lh;
        }
        style.margin_top = num(ATTR_MARGIN_TOP).unwrap_or(0.0).max(0.0);
        style.margin_bottom = num(ATTR_MARGIN_BOTTOM).unwrap_or(0.0).max(0.0);
        if let Some(rows) = node.attr(ATTR_ROWS) {
            style.rows = rows
                .split(',')
                .filter_map(|r| r.trim().parse::<f32>().ok())
                .filter(|h| *h >= 0.0)
                .collect();
        }
        style
    }

    fn is_contents(&self) -> bool {
        !self.rows.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
enum SimKind {
    ChromeRoot,
    Header { height: f32 },
    Block { style: BlockStyle, rows: Vec<ElementId> },
    Row { height: f32 },
    Spacer { height: f32 },
}

#[derive(Debug, Clone, PartialEq)]
struct SimElement {
    role: ElementRole,
    kind: SimKind,
}

/// A laid-out box in flow coordinates (0 = top of the editor root)
#[derive(Debug, Clone, Copy, PartialEq)]
struct Placed {
    top: f32,
    height: f32,
}

#[derive(Debug, Default)]
struct FlowLayout {
    boxes: FxHashMap<ElementId, Placed>,
    bands: Vec<Placed>,
    end: f32,
}

impl FlowLayout {
    /// Move a line box below every chrome band it would overlap
    fn push_below_bands(&self, mut y: f32, height: f32) -> f32 {
        let width = 1.0;
        for band in &self.bands {
            let line = Rect::new(0.0, y, width, height.max(f32::EPSILON));
            let chrome = Rect::new(0.0, band.top, width, band.height);
            if line.intersects(&chrome) {
                y = band.top + band.height;
            }
        }
        y
    }
}

/// Headless host: renders a `Document` into positioned boxes
pub struct HeadlessView {
    metrics: PageMetrics,
    width: f32,
    container_offset: f32,
    scroll_offset: f32,
    elements: FxHashMap<ElementId, SimElement>,
    order: Vec<ElementId>,
    node_elements: FxHashMap<NodeId, ElementId>,
    spacer_sides: FxHashMap<BreakId, (ElementId, Direction)>,
    chrome_root: Option<ElementId>,
    breakers: Vec<ElementId>,
    chrome_entries: usize,
    min_height: f32,
    next_id: u32,
    layout: RefCell<FlowLayout>,
    layout_dirty: Cell<bool>,
    pending: NotificationBatch,
}

impl HeadlessView {
    pub fn new(options: &PaginationOptions) -> Result<Self> {
        Ok(Self {
            metrics: options.metrics()?,
            width: options.page_width,
            container_offset: 0.0,
            scroll_offset: 0.0,
            elements: FxHashMap::default(),
            order: Vec::new(),
            node_elements: FxHashMap::default(),
            spacer_sides: FxHashMap::default(),
            chrome_root: None,
            breakers: Vec::new(),
            chrome_entries: 0,
            min_height: 0.0,
            next_id: 0,
            layout: RefCell::new(FlowLayout::default()),
            layout_dirty: Cell::new(true),
            pending: NotificationBatch::new(),
        })
    }

    /// Place the editor root `offset` pixels below the viewport top and
    /// scroll it by `scroll`
    pub fn with_viewport(mut self, offset: f32, scroll: f32) -> Self {
        self.container_offset = offset;
        self.scroll_offset = scroll;
        self
    }

    pub fn min_height(&self) -> f32 {
        self.min_height
    }

    /// Bottom of the last content box
    pub fn content_end(&self) -> f32 {
        self.layout().end
    }

    /// Top of the element in root coordinates
    pub fn top_of(&self, element: ElementId) -> Option<f32> {
        self.layout().boxes.get(&element).map(|b| b.top)
    }

    /// Rendered element of a document node
    pub fn element_for(&self, node: NodeId) -> Option<ElementId> {
        self.node_elements.get(&node).copied()
    }

    /// Current spacer height for a break
    pub fn spacer_height(&self, break_id: BreakId) -> Option<f32> {
        let (spacer, _) = self.spacer_sides.get(&break_id)?;
        match self.elements.get(spacer)?.kind {
            SimKind::Spacer { height } => Some(height),
            _ => None,
        }
    }

    /// Move a root child to another index, as a foreign DOM edit would.
    /// Returns false if the element is not a root child.
    pub fn move_element(&mut self, element: ElementId, to_index: usize) -> bool {
        let Some(from) = self.order.iter().position(|&e| e == element) else {
            return false;
        };
        self.order.remove(from);
        let to_index = to_index.min(self.order.len());
        self.order.insert(to_index, element);
        self.touch(Some(element));
        true
    }

    fn allocate(&mut self, role: ElementRole, kind: SimKind) -> ElementId {
        let id = ElementId(self.next_id);
        self.next_id += 1;
        self.elements.insert(id, SimElement { role, kind });
        id
    }

    fn touch(&mut self, element: Option<ElementId>) {
        self.layout_dirty.set(true);
        self.pending.push(Notification::root());
        if let Some(element) = element {
            self.pending.push(Notification::element(element));
        }
    }

    fn layout(&self) -> Ref<'_, FlowLayout> {
        if self.layout_dirty.get() {
            self.layout.replace(self.compute_layout());
            self.layout_dirty.set(false);
        }
        self.layout.borrow()
    }

    fn compute_layout(&self) -> FlowLayout {
        let m = &self.metrics;
        let mut flow = FlowLayout::default();

        let mut band_top = m.header_height + m.content_height();
        for _ in 0..self.chrome_entries {
            flow.bands.push(Placed {
                top: band_top,
                height: m.chrome_height(),
            });
            band_top += m.page_usable();
        }

        let mut y = 0.0;
        for &id in &self.order {
            let Some(element) = self.elements.get(&id) else {
                continue;
            };
            match &element.kind {
                SimKind::ChromeRoot => {
                    flow.boxes.insert(id, Placed { top: y, height: 0.0 });
                }
                SimKind::Header { height } | SimKind::Spacer { height } => {
                    flow.boxes.insert(id, Placed { top: y, height: *height });
                    y += height;
                }
                SimKind::Block { style, rows } => {
                    y += style.margin_top;
                    let top = y;
                    if style.is_contents() {
                        for (row, height) in rows.iter().zip(&style.rows) {
                            let row_top = flow.push_below_bands(y, *height);
                            flow.boxes.insert(*row, Placed { top: row_top, height: *height });
                            y = row_top + height;
                        }
                    } else {
                        for _ in 0..style.lines {
                            y = flow.push_below_bands(y, style.line_height) + style.line_height;
                        }
                    }
                    flow.boxes.insert(id, Placed { top, height: y - top });
                    y += style.margin_bottom;
                }
                SimKind::Row { .. } => {}
            }
        }
        flow.end = y;
        flow
    }

    fn to_viewport(&self, placed: Placed) -> Rect {
        Rect::new(
            0.0,
            self.container_offset + placed.top - self.scroll_offset,
            self.width,
            placed.height,
        )
    }

    fn remove_root_child(&mut self, element: ElementId) {
        self.order.retain(|&e| e != element);
        if let Some(SimElement {
            kind: SimKind::Block { rows, .. },
            ..
        }) = self.elements.remove(&element)
        {
            for row in rows {
                self.elements.remove(&row);
            }
        }
    }

    fn block_for(&mut self, node: &crate::document::Node) -> (ElementId, bool) {
        let role = match node.break_marker() {
            Some(marker) => ElementRole::Marker {
                break_id: marker.break_id,
                direction: marker.direction,
            },
            None => ElementRole::Content,
        };
        let style = BlockStyle::from_node(node);

        if let Some(&id) = self.node_elements.get(&node.id()) {
            let unchanged = matches!(
                self.elements.get(&id),
                Some(SimElement { role: r, kind: SimKind::Block { style: s, .. } }) if *r == role && *s == style
            );
            if unchanged {
                return (id, false);
            }
            self.remove_root_child(id);
        }

        let rows = style
            .rows
            .iter()
            .map(|&height| self.allocate(ElementRole::Content, SimKind::Row { height }))
            .collect();
        let id = self.allocate(role, SimKind::Block { style, rows });
        self.node_elements.insert(node.id(), id);
        (id, true)
    }
}

impl LayoutSource for HeadlessView {
    fn root_children(&self) -> Vec<ElementId> {
        self.order.clone()
    }

    fn role(&self, element: ElementId) -> ElementRole {
        self.elements
            .get(&element)
            .map(|e| e.role)
            .unwrap_or(ElementRole::Content)
    }

    fn client_rect(&self, element: ElementId) -> Option<Rect> {
        if let Some(index) = self.breakers.iter().position(|&b| b == element) {
            let band = *self.layout().bands.get(index)?;
            return Some(self.to_viewport(band));
        }
        match &self.elements.get(&element)?.kind {
            // No box of its own
            SimKind::Block { style, .. } if style.is_contents() => {
                Some(Rect::new(0.0, 0.0, 0.0, 0.0))
            }
            _ => {
                let placed = *self.layout().boxes.get(&element)?;
                Some(self.to_viewport(placed))
            }
        }
    }

    fn box_edges(&self, element: ElementId) -> BoxEdges {
        match self.elements.get(&element).map(|e| &e.kind) {
            Some(SimKind::Block { style, .. }) if !style.is_contents() => BoxEdges {
                margin_top: style.margin_top,
                margin_bottom: style.margin_bottom,
                ..BoxEdges::default()
            },
            _ => BoxEdges::default(),
        }
    }

    fn display(&self, element: ElementId) -> DisplayMode {
        match self.elements.get(&element).map(|e| &e.kind) {
            Some(SimKind::Block { style, .. }) if style.is_contents() => DisplayMode::Contents,
            _ => DisplayMode::Block,
        }
    }

    fn children(&self, element: ElementId) -> Vec<ElementId> {
        match self.elements.get(&element).map(|e| &e.kind) {
            Some(SimKind::Block { rows, .. }) => rows.clone(),
            _ => Vec::new(),
        }
    }

    fn container_offset(&self) -> f32 {
        self.container_offset
    }

    fn scroll_offset(&self) -> f32 {
        self.scroll_offset
    }

    fn scroll_height(&self) -> f32 {
        let layout = self.layout();
        let chrome_end = layout.bands.last().map(|b| b.top + b.height).unwrap_or(0.0);
        layout.end.max(chrome_end).max(self.min_height)
    }

    fn has_chrome_root(&self) -> bool {
        self.chrome_root.is_some()
    }

    fn chrome_breakers(&self) -> Vec<ElementId> {
        self.breakers[..self.chrome_entries.min(self.breakers.len())].to_vec()
    }

    fn chrome_entries(&self) -> usize {
        self.chrome_entries
    }
}

impl RenderTree for HeadlessView {
    fn insert_spacer(
        &mut self,
        marker: ElementId,
        direction: Direction,
        break_id: BreakId,
        height: f32,
    ) -> ElementId {
        let spacer = self.allocate(ElementRole::Spacer { break_id }, SimKind::Spacer { height });
        let index = match self.order.iter().position(|&e| e == marker) {
            Some(i) if direction == Direction::After => i + 1,
            Some(i) => i,
            None => self.order.len(),
        };
        self.order.insert(index, spacer);
        self.spacer_sides.insert(break_id, (spacer, direction));
        self.touch(Some(spacer));
        spacer
    }

    fn resize_spacer(&mut self, spacer: ElementId, height: f32) {
        let changed = match self.elements.get_mut(&spacer) {
            Some(SimElement {
                kind: SimKind::Spacer { height: current },
                ..
            }) if (*current - height).abs() > WRITE_EPSILON => {
                *current = height;
                true
            }
            _ => false,
        };
        if changed {
            self.touch(Some(spacer));
        }
    }

    fn remove_spacer(&mut self, spacer: ElementId) {
        if !self.order.contains(&spacer) {
            return;
        }
        self.remove_root_child(spacer);
        self.spacer_sides.retain(|_, (id, _)| *id != spacer);
        self.touch(None);
    }

    fn set_chrome_entries(&mut self, count: usize) {
        if self.chrome_root.is_none() {
            // Mounting chrome also mounts the first-page header above content
            let root = self.allocate(ElementRole::ChromeRoot, SimKind::ChromeRoot);
            let header = self.allocate(
                ElementRole::Header,
                SimKind::Header {
                    height: self.metrics.header_height,
                },
            );
            self.order.splice(0..0, [root, header]);
            self.chrome_root = Some(root);
            self.touch(Some(root));
        }
        if count == self.chrome_entries {
            return;
        }
        while self.breakers.len() < count {
            let id = ElementId(self.next_id);
            self.next_id += 1;
            self.breakers.push(id);
        }
        self.chrome_entries = count;
        self.touch(self.chrome_root);
    }

    fn set_min_height(&mut self, height: f32) {
        if (self.min_height - height).abs() > WRITE_EPSILON {
            self.min_height = height;
            self.pending.push(Notification::root());
        }
    }
}

impl HostView for HeadlessView {
    fn render_document(&mut self, document: &Document) {
        let mut order = Vec::with_capacity(self.order.len());
        if let Some(root) = self.chrome_root {
            order.extend(
                self.order
                    .iter()
                    .copied()
                    .filter(|e| *e == root || self.role(*e) == ElementRole::Header),
            );
        }

        let mut changed = Vec::new();
        let mut live_nodes = rustc_hash::FxHashSet::default();
        for node in document.nodes() {
            live_nodes.insert(node.id());
            let (element, fresh) = self.block_for(node);
            if fresh {
                changed.push(element);
            }
            let spacer = node
                .break_marker()
                .and_then(|m| self.spacer_sides.get(&m.break_id).copied());
            match spacer {
                Some((spacer, Direction::Before)) => order.extend([spacer, element]),
                Some((spacer, Direction::After)) => order.extend([element, spacer]),
                None => order.push(element),
            }
        }

        // Nodes that left the document take their element with them; spacers
        // whose marker is gone are dropped like orphaned widgets
        let stale: Vec<(NodeId, ElementId)> = self
            .node_elements
            .iter()
            .filter(|(node, _)| !live_nodes.contains(*node))
            .map(|(node, el)| (*node, *el))
            .collect();
        for (node, element) in stale {
            self.node_elements.remove(&node);
            self.remove_root_child(element);
        }
        let live_breaks = document.break_ids();
        let orphaned: Vec<ElementId> = self
            .spacer_sides
            .iter()
            .filter(|(bid, _)| !live_breaks.contains(*bid))
            .map(|(_, (spacer, _))| *spacer)
            .collect();
        for spacer in orphaned {
            self.remove_root_child(spacer);
        }
        self.spacer_sides.retain(|bid, _| live_breaks.contains(bid));

        if order != self.order || !changed.is_empty() {
            self.order = order;
            self.layout_dirty.set(true);
            self.pending.push(Notification::root());
            for element in changed {
                self.pending.push(Notification::element(element));
            }
        }
    }

    fn apply_options(&mut self, options: &PaginationOptions) {
        if let Ok(metrics) = options.metrics() {
            self.metrics = metrics;
            self.width = options.page_width;
            let header = self
                .order
                .iter()
                .copied()
                .find(|e| self.role(*e) == ElementRole::Header);
            if let Some(SimElement {
                kind: SimKind::Header { height },
                ..
            }) = header.and_then(|h| self.elements.get_mut(&h))
            {
                *height = metrics.header_height;
            }
            self.touch(self.chrome_root);
        }
    }

    fn take_notifications(&mut self) -> NotificationBatch {
        std::mem::take(&mut self.pending)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Node;

    fn view() -> HeadlessView {
        HeadlessView::new(&PaginationOptions::default()).unwrap()
    }

    #[test]
    fn test_block_style_from_attrs() {
        let node = Node::paragraph(4)
            .with_attr(ATTR_LINES, "3")
            .with_attr(ATTR_LINE_HEIGHT, "24")
            .with_attr(ATTR_MARGIN_TOP, "bogus");
        let style = BlockStyle::from_node(&node);
        assert_eq!(style.lines, 3);
        assert_eq!(style.line_height, 24.0);
        assert_eq!(style.margin_top, 0.0);
        assert!(!style.is_contents());
    }

    #[test]
    fn test_render_stacks_blocks() {
        let doc = Document::from_nodes([
            Node::paragraph(1).with_attr(ATTR_LINES, "2"),
            Node::paragraph(1).with_attr(ATTR_MARGIN_TOP, "8"),
        ]);
        let mut view = view();
        view.render_document(&doc);
        let second = view.element_for(doc.nodes()[1].id()).unwrap();
        assert_eq!(view.top_of(second), Some(48.0));
        assert_eq!(view.content_end(), 68.0);
        assert!(!view.has_chrome_root());
        assert!(view.take_notifications().targets_root());
        assert!(view.take_notifications().is_empty());
    }

    #[test]
    fn test_lines_pushed_below_chrome_band() {
        let doc = Document::from_nodes([Node::paragraph(1).with_attr(ATTR_LINES, "40")]);
        let mut view = view();
        view.render_document(&doc);
        view.set_chrome_entries(1);
        // Header 10, 39 lines reach 790, the 40th jumps the 70px band
        assert_eq!(view.content_end(), 880.0);
        let breaker = view.chrome_breakers()[0];
        assert_eq!(view.client_rect(breaker), Some(Rect::new(0.0, 790.0, 790.0, 70.0)));
    }

    #[test]
    fn test_spacer_placement_survives_rerender() {
        let mut doc = Document::from_nodes([Node::paragraph(1), Node::paragraph(1)]);
        let (bid, _) = doc.insert_page_break(1, Direction::Before);
        let mut view = view();
        view.render_document(&doc);
        let marker = view.element_for(doc.nodes()[1].id()).unwrap();
        let spacer = view.insert_spacer(marker, Direction::Before, bid, 100.0);

        doc.push(Node::paragraph(3));
        view.render_document(&doc);
        let children = view.root_children();
        let idx = children.iter().position(|&e| e == marker).unwrap();
        assert_eq!(children[idx - 1], spacer);
        assert_eq!(view.spacer_height(bid), Some(100.0));
    }

    #[test]
    fn test_removed_marker_drops_spacer() {
        let mut doc = Document::from_nodes([Node::paragraph(1)]);
        let (bid, _) = doc.insert_page_break(1, Direction::After);
        let mut view = view();
        view.render_document(&doc);
        let marker = view.element_for(doc.nodes()[1].id()).unwrap();
        view.insert_spacer(marker, Direction::After, bid, 50.0);

        doc.remove(1);
        view.render_document(&doc);
        assert_eq!(view.root_children().len(), 1);
        assert!(view.spacer_height(bid).is_none());
    }

    #[test]
    fn test_noop_writes_do_not_notify() {
        let mut doc = Document::from_nodes([Node::paragraph(1)]);
        let (bid, _) = doc.insert_page_break(1, Direction::After);
        let mut view = view();
        view.render_document(&doc);
        view.set_chrome_entries(2);
        let marker = view.element_for(doc.nodes()[1].id()).unwrap();
        let spacer = view.insert_spacer(marker, Direction::After, bid, 50.0);
        view.set_min_height(300.0);
        view.take_notifications();

        view.resize_spacer(spacer, 50.0);
        view.set_chrome_entries(2);
        view.set_min_height(300.0);
        view.render_document(&doc);
        assert!(view.take_notifications().is_empty());
    }

    #[test]
    fn test_table_rows_render_as_contents() {
        let doc = Document::from_nodes([
            Node::paragraph(1),
            Node::new("table", 10).with_attr(ATTR_ROWS, "30, 40"),
        ]);
        let mut view = view().with_viewport(50.0, 0.0);
        view.render_document(&doc);
        let table = view.element_for(doc.nodes()[1].id()).unwrap();
        assert_eq!(view.display(table), DisplayMode::Contents);
        let rows = view.children(table);
        assert_eq!(rows.len(), 2);
        assert_eq!(view.client_rect(rows[1]), Some(Rect::new(0.0, 100.0, 790.0, 40.0)));
    }
}
