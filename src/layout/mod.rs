//! Pagination layout: measurement, page counting, break heights and the
//! engine that ties them into recompute passes

mod breaks;
mod detector;
mod engine;
mod geometry;
mod page_count;
mod state;

pub use breaks::{BreakPlan, PageSlot, PlannedBreak, MIN_SPACER_HEIGHT};
pub use detector::{
    classify, markers_changed, ChangeClass, Notification, NotificationBatch, NotificationTarget,
    POSITION_TOLERANCE,
};
pub use engine::{
    ExternalPass, PaginationEngine, Signal, Signals, PAGE_BREAKS_META_KEY, PAGE_COUNT_META_KEY,
};
pub use geometry::{measure, GeometryReader, Measurement};
pub use page_count::{estimate, ChromeHold, RenderedExtent};
pub use state::{BreakKind, BreakRecord, OverlayState};
