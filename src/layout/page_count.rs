//! Page-count estimation from rendered extents

use crate::config::PageMetrics;
use crate::layout::detector::POSITION_TOLERANCE;
use crate::render::LayoutSource;

/// What the estimator needs to know about the rendered view
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RenderedExtent {
    /// No page chrome is mounted yet
    Unpaginated { scroll_height: f32 },
    /// Client-rect bottoms of the last content block and the last chrome
    /// breaker
    Paginated { content_bottom: f32, break_bottom: f32 },
    /// Chrome is mounted but there is nothing to compare
    Unmeasured,
}

impl RenderedExtent {
    pub fn read<S: LayoutSource + ?Sized>(source: &S) -> Self {
        if !source.has_chrome_root() {
            return RenderedExtent::Unpaginated {
                scroll_height: source.scroll_height(),
            };
        }
        let content = source
            .root_children()
            .last()
            .and_then(|&el| source.client_rect(el));
        let breaker = source
            .chrome_breakers()
            .last()
            .and_then(|&el| source.client_rect(el));
        match (content, breaker) {
            (Some(content), Some(breaker)) => RenderedExtent::Paginated {
                content_bottom: content.bottom(),
                break_bottom: breaker.bottom(),
            },
            _ => RenderedExtent::Unmeasured,
        }
    }

    /// Distance from the last breaker to the end of content; negative when
    /// chrome extends past the content
    pub fn gap(&self) -> Option<f32> {
        match *self {
            RenderedExtent::Paginated {
                content_bottom,
                break_bottom,
            } => Some(content_bottom - break_bottom),
            _ => None,
        }
    }
}

/// Estimate how many pages the view needs, given `chrome_count` entries
/// currently mounted. Never less than one.
pub fn estimate(extent: RenderedExtent, chrome_count: usize, metrics: &PageMetrics) -> usize {
    let content_height = metrics.content_height();
    let current = chrome_count as i64;

    let count = match extent {
        RenderedExtent::Unpaginated { scroll_height } => {
            (scroll_height / content_height).ceil() as i64
        }
        RenderedExtent::Unmeasured => 1,
        RenderedExtent::Paginated { .. } => {
            let gap = extent.gap().unwrap_or(0.0);
            let low_bound = -(metrics.page_height - metrics.header_height);
            let high_bound = -metrics.header_height;

            if gap > 0.0 {
                current + (gap / content_height).ceil() as i64
            } else if gap > low_bound && gap < high_bound {
                current
            } else if gap <= low_bound {
                current + (gap / metrics.page_stride()).floor() as i64
            } else {
                current
            }
        }
    };

    count.max(1) as usize
}

/// A page count kept against a lower estimate that flips straight back.
///
/// With content ending just inside a new page, the estimate drops a page at
/// `kept` entries and adds it back at `lower`. The hold remembers the content
/// gap seen at `kept` so later checks of the same layout leave chrome alone.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChromeHold {
    pub kept: usize,
    pub lower: usize,
    /// Gap at `kept` entries; `None` until it has been measured there
    gap: Option<f32>,
}

impl ChromeHold {
    /// Hold the larger of two counts the estimator alternates between.
    /// `gap` is the gap measured at `current`.
    pub fn between(current: usize, target: usize, gap: Option<f32>) -> Self {
        let kept = current.max(target);
        Self {
            kept,
            lower: current.min(target),
            gap: if kept == current { gap } else { None },
        }
    }

    /// Whether `current` entries should stay mounted although the estimate
    /// asks for `target`. Records the gap on first use.
    pub fn holds(&mut self, current: usize, target: usize, gap: Option<f32>) -> bool {
        if current != self.kept || target != self.lower {
            return false;
        }
        match (self.gap, gap) {
            (None, Some(gap)) => {
                self.gap = Some(gap);
                true
            }
            (Some(held), Some(gap)) => (held - gap).abs() <= POSITION_TOLERANCE,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PaginationOptions;

    fn metrics() -> PageMetrics {
        PaginationOptions::default().metrics().unwrap()
    }

    fn paginated(gap: f32) -> RenderedExtent {
        RenderedExtent::Paginated {
            content_bottom: 1000.0 + gap,
            break_bottom: 1000.0,
        }
    }

    #[test]
    fn test_unpaginated_scroll_height() {
        let extent = RenderedExtent::Unpaginated { scroll_height: 2400.0 };
        assert_eq!(estimate(extent, 0, &metrics()), 4);
    }

    #[test]
    fn test_content_past_last_breaker_adds_pages() {
        assert_eq!(estimate(paginated(50.0), 3, &metrics()), 4);
        assert_eq!(estimate(paginated(781.0), 3, &metrics()), 5);
    }

    #[test]
    fn test_gap_inside_band_keeps_count() {
        assert_eq!(estimate(paginated(-500.0), 3, &metrics()), 3);
        assert_eq!(estimate(paginated(0.0), 3, &metrics()), 3);
        assert_eq!(estimate(paginated(-5.0), 3, &metrics()), 3);
    }

    #[test]
    fn test_excess_chrome_removes_pages() {
        assert_eq!(estimate(paginated(-790.0), 5, &metrics()), 4);
        assert_eq!(estimate(paginated(-1700.0), 5, &metrics()), 3);
    }

    #[test]
    fn test_never_below_one() {
        let m = metrics();
        assert_eq!(estimate(paginated(-50_000.0), 2, &m), 1);
        assert_eq!(estimate(RenderedExtent::Unpaginated { scroll_height: 0.0 }, 0, &m), 1);
        assert_eq!(estimate(RenderedExtent::Unpaginated { scroll_height: f32::NAN }, 0, &m), 1);
        assert_eq!(estimate(RenderedExtent::Unmeasured, 7, &m), 1);
    }

    #[test]
    fn test_hold_keeps_larger_count_for_same_gap() {
        // Stepped down from 3 to 2, the estimate wants 3 again
        let mut hold = ChromeHold::between(2, 3, Some(20.0));
        assert_eq!((hold.kept, hold.lower), (3, 2));

        assert!(hold.holds(3, 2, Some(-830.0)));
        assert!(hold.holds(3, 2, Some(-830.2)));
        assert!(!hold.holds(3, 2, Some(-900.0)));
        assert!(!hold.holds(4, 3, Some(-830.0)));
    }

    #[test]
    fn test_hold_taken_at_kept_count() {
        let mut hold = ChromeHold::between(3, 2, Some(-810.0));
        assert!(hold.holds(3, 2, Some(-810.0)));
        assert!(!hold.holds(3, 2, None));
    }
}
