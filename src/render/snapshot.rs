//! Serializable geometry readout of a rendered view
//!
//! The JavaScript side measures the DOM once per tick and hands the result
//! over as a `GeometrySnapshot`. Root children get ids `0..n` in order; their
//! children follow, then the chrome breakers.

use crate::document::{BreakId, Direction};
use crate::render::{BoxEdges, DisplayMode, ElementId, ElementRole, LayoutSource};
use crate::Rect;
use serde::{Deserialize, Serialize};

/// One child of a `display: contents` element
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SnapshotChild {
    pub rect: Option<Rect>,
    pub edges: BoxEdges,
}

/// A root child as measured by the host
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotElement {
    pub role: ElementRole,
    /// `None` when the element is not rendered
    #[serde(default)]
    pub rect: Option<Rect>,
    #[serde(default)]
    pub edges: BoxEdges,
    #[serde(default)]
    pub display: DisplayMode,
    #[serde(default)]
    pub children: Vec<SnapshotChild>,
}

impl SnapshotElement {
    pub fn new(role: ElementRole, rect: Rect) -> Self {
        Self {
            role,
            rect: Some(rect),
            edges: BoxEdges::default(),
            display: DisplayMode::Block,
            children: Vec::new(),
        }
    }

    pub fn content(rect: Rect) -> Self {
        Self::new(ElementRole::Content, rect)
    }

    pub fn marker(break_id: BreakId, direction: Direction, rect: Rect) -> Self {
        Self::new(ElementRole::Marker { break_id, direction }, rect)
    }

    pub fn spacer(break_id: BreakId, rect: Rect) -> Self {
        Self::new(ElementRole::Spacer { break_id }, rect)
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GeometrySnapshot {
    pub container_offset: f32,
    pub scroll_offset: f32,
    pub scroll_height: f32,
    pub elements: Vec<SnapshotElement>,
    /// Breaker rects of the mounted chrome; `None` when no chrome is mounted
    pub chrome: Option<Vec<Rect>>,
}

enum Slot<'a> {
    Root(&'a SnapshotElement),
    Child(&'a SnapshotChild),
    Breaker(Rect),
}

impl GeometrySnapshot {
    /// Snapshot of unpaginated elements at container offset zero
    pub fn new(elements: Vec<SnapshotElement>) -> Self {
        let scroll_height = elements
            .iter()
            .filter_map(|e| e.rect.map(|r| r.bottom()))
            .fold(0.0, f32::max);
        Self {
            scroll_height,
            elements,
            ..Self::default()
        }
    }

    pub fn with_chrome(mut self, breakers: Vec<Rect>) -> Self {
        self.chrome = Some(breakers);
        self
    }

    pub fn from_json(json: &str) -> crate::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    fn child_count(&self) -> usize {
        self.elements.iter().map(|e| e.children.len()).sum()
    }

    fn child_base(&self, root: usize) -> usize {
        self.elements.len() + self.elements[..root].iter().map(|e| e.children.len()).sum::<usize>()
    }

    fn resolve(&self, element: ElementId) -> Option<Slot<'_>> {
        let mut idx = element.0 as usize;
        if let Some(root) = self.elements.get(idx) {
            return Some(Slot::Root(root));
        }
        idx -= self.elements.len();
        for root in &self.elements {
            if idx < root.children.len() {
                return Some(Slot::Child(&root.children[idx]));
            }
            idx -= root.children.len();
        }
        self.chrome.as_ref()?.get(idx).copied().map(Slot::Breaker)
    }
}

impl LayoutSource for GeometrySnapshot {
    fn root_children(&self) -> Vec<ElementId> {
        (0..self.elements.len() as u32).map(ElementId).collect()
    }

    fn role(&self, element: ElementId) -> ElementRole {
        match self.resolve(element) {
            Some(Slot::Root(root)) => root.role,
            _ => ElementRole::Content,
        }
    }

    fn client_rect(&self, element: ElementId) -> Option<Rect> {
        match self.resolve(element)? {
            Slot::Root(root) => root.rect,
            Slot::Child(child) => child.rect,
            Slot::Breaker(rect) => Some(rect),
        }
    }

    fn box_edges(&self, element: ElementId) -> BoxEdges {
        match self.resolve(element) {
            Some(Slot::Root(root)) => root.edges,
            Some(Slot::Child(child)) => child.edges,
            _ => BoxEdges::default(),
        }
    }

    fn display(&self, element: ElementId) -> DisplayMode {
        match self.resolve(element) {
            Some(Slot::Root(root)) => root.display,
            _ => DisplayMode::Block,
        }
    }

    fn children(&self, element: ElementId) -> Vec<ElementId> {
        let idx = element.0 as usize;
        match self.elements.get(idx) {
            Some(root) => {
                let base = self.child_base(idx) as u32;
                (0..root.children.len() as u32).map(|i| ElementId(base + i)).collect()
            }
            None => Vec::new(),
        }
    }

    fn container_offset(&self) -> f32 {
        self.container_offset
    }

    fn scroll_offset(&self) -> f32 {
        self.scroll_offset
    }

    fn scroll_height(&self) -> f32 {
        self.scroll_height
    }

    fn has_chrome_root(&self) -> bool {
        self.chrome.is_some()
    }

    fn chrome_breakers(&self) -> Vec<ElementId> {
        let base = (self.elements.len() + self.child_count()) as u32;
        let count = self.chrome.as_ref().map_or(0, Vec::len) as u32;
        (0..count).map(|i| ElementId(base + i)).collect()
    }
}
