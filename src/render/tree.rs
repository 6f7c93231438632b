//! The host render surface as the engine sees it
//!
//! `LayoutSource` is the read side (geometry readouts), `RenderTree` adds the
//! handful of writes a pass performs, and `HostView` is what the paginator
//! needs on top to drive a whole view.

use crate::document::{BreakId, BreakMarker, Direction, Document};
use crate::layout::NotificationBatch;
use crate::{PaginationOptions, Rect};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// Opaque handle to a rendered element owned by the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ElementId(pub u32);

/// What a top-level rendered element is, from pagination's point of view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ElementRole {
    /// Ordinary document content
    Content,
    /// Rendered break marker (`p[data-break]`)
    #[serde(rename_all = "camelCase")]
    Marker { break_id: BreakId, direction: Direction },
    /// Spacer inserted next to a marker (`.page-vdiv`)
    #[serde(rename_all = "camelCase")]
    Spacer { break_id: BreakId },
    /// Container holding one chrome entry per page (`[data-rm-pagination]`)
    ChromeRoot,
    /// First-page header widget
    Header,
}

/// Vertical margins and borders of a box
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BoxEdges {
    pub margin_top: f32,
    pub margin_bottom: f32,
    pub border_top: f32,
    pub border_bottom: f32,
}

impl BoxEdges {
    pub fn vertical(&self) -> f32 {
        self.margin_top + self.margin_bottom + self.border_top + self.border_bottom
    }
}

/// CSS display mode relevant to measurement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DisplayMode {
    #[default]
    Block,
    /// `display: contents`: the element has no box, its children render in
    /// its place
    Contents,
}

/// A break marker found among the root children, with its neighbours
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarkerSlot {
    pub element: ElementId,
    pub marker: BreakMarker,
    pub prev: Option<(ElementId, ElementRole)>,
    pub next: Option<(ElementId, ElementRole)>,
}

impl MarkerSlot {
    /// The sibling on the side where this marker's spacer belongs
    pub fn sibling_on(&self, direction: Direction) -> Option<(ElementId, ElementRole)> {
        match direction {
            Direction::Before => self.prev,
            Direction::After => self.next,
        }
    }

    /// This marker's own spacer, if it sits on the correct side
    pub fn own_spacer(&self) -> Option<ElementId> {
        match self.sibling_on(self.marker.direction) {
            Some((id, ElementRole::Spacer { break_id })) if break_id == self.marker.break_id => {
                Some(id)
            }
            _ => None,
        }
    }

    /// Whether any spacer touches the marker
    pub fn has_adjacent_spacer(&self) -> bool {
        let is_spacer = |s: Option<(ElementId, ElementRole)>| {
            matches!(s, Some((_, ElementRole::Spacer { .. })))
        };
        is_spacer(self.prev) || is_spacer(self.next)
    }
}

/// Read-only geometry of the rendered view.
///
/// Client rects are in viewport coordinates, like
/// `getBoundingClientRect()`. `None` means the element is not rendered.
pub trait LayoutSource {
    /// Top-level rendered children of the editor root, in order
    fn root_children(&self) -> Vec<ElementId>;

    fn role(&self, element: ElementId) -> ElementRole;

    fn client_rect(&self, element: ElementId) -> Option<Rect>;

    fn box_edges(&self, _element: ElementId) -> BoxEdges {
        BoxEdges::default()
    }

    fn display(&self, _element: ElementId) -> DisplayMode {
        DisplayMode::Block
    }

    fn children(&self, _element: ElementId) -> Vec<ElementId> {
        Vec::new()
    }

    /// Viewport top of the editor root
    fn container_offset(&self) -> f32;

    fn scroll_offset(&self) -> f32 {
        0.0
    }

    fn scroll_height(&self) -> f32;

    /// Whether the page chrome container is mounted
    fn has_chrome_root(&self) -> bool;

    /// The footer/gap/header band of each chrome entry, in page order
    fn chrome_breakers(&self) -> Vec<ElementId>;

    fn chrome_entries(&self) -> usize {
        self.chrome_breakers().len()
    }

    /// Markers in render order, with their immediate siblings
    fn marker_slots(&self) -> Vec<MarkerSlot> {
        let children = self.root_children();
        let roles: Vec<ElementRole> = children.iter().map(|&id| self.role(id)).collect();
        let sibling = |idx: Option<usize>| idx.and_then(|i| Some((*children.get(i)?, roles[i])));

        children
            .iter()
            .enumerate()
            .filter_map(|(idx, &element)| match roles[idx] {
                ElementRole::Marker { break_id, direction } => Some(MarkerSlot {
                    element,
                    marker: BreakMarker::new(break_id, direction),
                    prev: sibling(idx.checked_sub(1)),
                    next: sibling(Some(idx + 1)),
                }),
                _ => None,
            })
            .collect()
    }

    /// Every spacer among the root children with the break it belongs to
    fn spacers(&self) -> SmallVec<[(BreakId, ElementId); 8]> {
        self.root_children()
            .into_iter()
            .filter_map(|id| match self.role(id) {
                ElementRole::Spacer { break_id } => Some((break_id, id)),
                _ => None,
            })
            .collect()
    }
}

/// The writes a recompute pass performs on the live view
pub trait RenderTree: LayoutSource {
    /// Insert a spacer before (`Before`) or after (`After`) the marker
    fn insert_spacer(
        &mut self,
        marker: ElementId,
        direction: Direction,
        break_id: BreakId,
        height: f32,
    ) -> ElementId;

    /// Resize a spacer in place, keeping its identity
    fn resize_spacer(&mut self, spacer: ElementId, height: f32);

    fn remove_spacer(&mut self, spacer: ElementId);

    /// Grow or shrink the chrome container to `count` entries, adding and
    /// removing at the high end
    fn set_chrome_entries(&mut self, count: usize);

    /// Minimum height of the editor root
    fn set_min_height(&mut self, height: f32);
}

/// A complete host: renders documents and reports geometry changes
pub trait HostView: RenderTree {
    /// Re-render document nodes, keeping existing spacer and chrome
    /// elements alive
    fn render_document(&mut self, document: &Document);

    /// Page geometry changed; chrome must be laid out with the new options
    fn apply_options(&mut self, options: &PaginationOptions);

    /// Drain the geometry-change notifications gathered since the last call
    fn take_notifications(&mut self) -> NotificationBatch;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slot(prev: Option<ElementRole>, next: Option<ElementRole>, direction: Direction) -> MarkerSlot {
        MarkerSlot {
            element: ElementId(5),
            marker: BreakMarker::new(BreakId(1), direction),
            prev: prev.map(|r| (ElementId(4), r)),
            next: next.map(|r| (ElementId(6), r)),
        }
    }

    #[test]
    fn test_own_spacer_side() {
        let spacer = ElementRole::Spacer { break_id: BreakId(1) };
        let after = slot(Some(ElementRole::Content), Some(spacer), Direction::After);
        assert_eq!(after.own_spacer(), Some(ElementId(6)));

        let wrong_side = slot(Some(spacer), None, Direction::After);
        assert_eq!(wrong_side.own_spacer(), None);
        assert!(wrong_side.has_adjacent_spacer());
    }

    #[test]
    fn test_foreign_spacer_is_not_own() {
        let foreign = ElementRole::Spacer { break_id: BreakId(9) };
        let before = slot(Some(foreign), None, Direction::Before);
        assert_eq!(before.own_spacer(), None);
        assert!(before.has_adjacent_spacer());
        assert!(!slot(None, Some(ElementRole::Content), Direction::Before).has_adjacent_spacer());
    }

    #[test]
    fn test_role_serde() {
        let role: ElementRole =
            serde_json::from_str(r#"{"kind":"marker","breakId":3,"direction":"before"}"#).unwrap();
        assert_eq!(
            role,
            ElementRole::Marker { break_id: BreakId(3), direction: Direction::Before }
        );
    }
}
