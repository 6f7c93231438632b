//! Render side: the host view abstraction, overlays and the write phase

mod diff;
mod headless;
mod overlay;
mod snapshot;
mod sync;
mod tree;

pub use diff::{OverlayDiff, OverlayPatch};
pub use headless::{
    BlockStyle, HeadlessView, ATTR_LINES, ATTR_LINE_HEIGHT, ATTR_MARGIN_BOTTOM, ATTR_MARGIN_TOP,
    ATTR_ROWS, DEFAULT_LINE_HEIGHT,
};
pub use overlay::{
    break_spacers, merge, page_chrome, render_template, Overlay, OverlaySet, OverlaySets,
    OverlayWidget, PageChromeEntry,
};
pub use snapshot::{GeometrySnapshot, SnapshotChild, SnapshotElement};
pub use sync::{SpacerOp, SpacerOps, SyncReport, Synchronizer, MAX_SETTLE_ROUNDS};
pub use tree::{
    BoxEdges, DisplayMode, ElementId, ElementRole, HostView, LayoutSource, MarkerSlot, RenderTree,
};
