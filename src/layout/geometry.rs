//! Element measurement in editor-root coordinates

use crate::render::{DisplayMode, ElementId, LayoutSource};
use crate::Rect;

/// Full height and top of an element relative to the editor root
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Measurement {
    /// Client height plus vertical margins and borders
    pub height: f32,
    /// Top relative to the editor root, clamped to zero
    pub offset_top: f32,
}

impl Measurement {
    pub fn bottom(&self) -> f32 {
        self.offset_top + self.height
    }
}

/// Measure `element` against explicit container and scroll offsets.
///
/// Elements rendered with `display: contents` have no box of their own; their
/// children's full heights are summed and the first child's top is used.
/// Anything unrendered measures as zero.
pub fn measure<S: LayoutSource + ?Sized>(
    source: &S,
    element: ElementId,
    container_offset: f32,
    scroll_offset: f32,
) -> Measurement {
    GeometryReader::with_offsets(source, container_offset, scroll_offset).measure(element)
}

/// Reads element geometry from a layout source with fixed offsets
pub struct GeometryReader<'a, S: LayoutSource + ?Sized> {
    source: &'a S,
    container_offset: f32,
    scroll_offset: f32,
}

impl<'a, S: LayoutSource + ?Sized> GeometryReader<'a, S> {
    /// Reader using the source's current container and scroll offsets
    pub fn new(source: &'a S) -> Self {
        Self::with_offsets(source, source.container_offset(), source.scroll_offset())
    }

    pub fn with_offsets(source: &'a S, container_offset: f32, scroll_offset: f32) -> Self {
        Self {
            source,
            container_offset,
            scroll_offset,
        }
    }

    pub fn measure(&self, element: ElementId) -> Measurement {
        if self.source.display(element) == DisplayMode::Contents {
            let children = self.source.children(element);
            if !children.is_empty() {
                let height = children
                    .iter()
                    .filter_map(|&child| self.full_height(child))
                    .sum();
                let offset_top = children
                    .first()
                    .and_then(|&child| self.source.client_rect(child))
                    .map(|rect| self.adjusted_top(&rect))
                    .unwrap_or(0.0);
                return Measurement { height, offset_top };
            }
        }

        match self.source.client_rect(element) {
            Some(rect) => Measurement {
                height: self.full_height(element).unwrap_or(0.0),
                offset_top: self.adjusted_top(&rect),
            },
            None => Measurement::default(),
        }
    }

    fn full_height(&self, element: ElementId) -> Option<f32> {
        let rect = self.source.client_rect(element)?;
        let height = rect.height + self.source.box_edges(element).vertical();
        Some(if height.is_finite() { height.max(0.0) } else { 0.0 })
    }

    fn adjusted_top(&self, rect: &Rect) -> f32 {
        let top = rect.y + self.scroll_offset - self.container_offset;
        if top.is_finite() {
            top.max(0.0)
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::{BoxEdges, ElementRole};

    /// Root children laid out at fixed viewport rects
    struct Fixture {
        rects: Vec<Option<Rect>>,
        edges: BoxEdges,
        contents: Option<(ElementId, Vec<ElementId>)>,
    }

    impl LayoutSource for Fixture {
        fn root_children(&self) -> Vec<ElementId> {
            (0..self.rects.len() as u32).map(ElementId).collect()
        }

        fn role(&self, _element: ElementId) -> ElementRole {
            ElementRole::Content
        }

        fn client_rect(&self, element: ElementId) -> Option<Rect> {
            self.rects.get(element.0 as usize).copied().flatten()
        }

        fn box_edges(&self, _element: ElementId) -> BoxEdges {
            self.edges
        }

        fn display(&self, element: ElementId) -> DisplayMode {
            match &self.contents {
                Some((parent, _)) if *parent == element => DisplayMode::Contents,
                _ => DisplayMode::Block,
            }
        }

        fn children(&self, element: ElementId) -> Vec<ElementId> {
            match &self.contents {
                Some((parent, children)) if *parent == element => children.clone(),
                _ => Vec::new(),
            }
        }

        fn container_offset(&self) -> f32 {
            100.0
        }

        fn scroll_height(&self) -> f32 {
            0.0
        }

        fn has_chrome_root(&self) -> bool {
            false
        }

        fn chrome_breakers(&self) -> Vec<ElementId> {
            Vec::new()
        }
    }

    #[test]
    fn test_measure_includes_margins_and_borders() {
        let fixture = Fixture {
            rects: vec![Some(Rect::new(0.0, 140.0, 600.0, 20.0))],
            edges: BoxEdges {
                margin_top: 4.0,
                margin_bottom: 6.0,
                border_top: 1.0,
                border_bottom: 1.0,
            },
            contents: None,
        };
        let m = GeometryReader::new(&fixture).measure(ElementId(0));
        assert_eq!(m.height, 32.0);
        assert_eq!(m.offset_top, 40.0);
    }

    #[test]
    fn test_scroll_offset_and_clamp() {
        let fixture = Fixture {
            rects: vec![Some(Rect::new(0.0, 20.0, 600.0, 10.0))],
            edges: BoxEdges::default(),
            contents: None,
        };
        assert_eq!(measure(&fixture, ElementId(0), 100.0, 300.0).offset_top, 220.0);
        // Above the container and not scrolled: clamped
        assert_eq!(measure(&fixture, ElementId(0), 100.0, 0.0).offset_top, 0.0);
    }

    #[test]
    fn test_unrendered_measures_zero() {
        let fixture = Fixture {
            rects: vec![None],
            edges: BoxEdges::default(),
            contents: None,
        };
        assert_eq!(GeometryReader::new(&fixture).measure(ElementId(0)), Measurement::default());
    }

    #[test]
    fn test_display_contents_aggregates_children() {
        let fixture = Fixture {
            rects: vec![
                Some(Rect::new(0.0, 0.0, 0.0, 0.0)),
                Some(Rect::new(0.0, 150.0, 600.0, 30.0)),
                Some(Rect::new(0.0, 180.0, 600.0, 25.0)),
                None,
            ],
            edges: BoxEdges::default(),
            contents: Some((ElementId(0), vec![ElementId(1), ElementId(2), ElementId(3)])),
        };
        let m = GeometryReader::new(&fixture).measure(ElementId(0));
        assert_eq!(m.height, 55.0);
        assert_eq!(m.offset_top, 50.0);
        assert_eq!(m.bottom(), 105.0);
    }
}
