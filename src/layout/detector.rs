//! Classifies geometry-change notifications

use crate::layout::geometry::GeometryReader;
use crate::layout::state::OverlayState;
use crate::render::{ElementId, LayoutSource};
use smallvec::SmallVec;

/// Marker tops closer than this are considered unchanged (sub-pixel layout
/// rounding)
pub const POSITION_TOLERANCE: f32 = 0.5;

/// Region a notification refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationTarget {
    /// The pagination root itself
    Root,
    Element(ElementId),
}

/// "Geometry may have changed here"
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Notification {
    pub target: NotificationTarget,
}

impl Notification {
    pub fn root() -> Self {
        Self {
            target: NotificationTarget::Root,
        }
    }

    pub fn element(element: ElementId) -> Self {
        Self {
            target: NotificationTarget::Element(element),
        }
    }
}

/// Notifications gathered during one host tick
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NotificationBatch {
    notifications: SmallVec<[Notification; 8]>,
}

impl NotificationBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, notification: Notification) {
        if !self.notifications.contains(&notification) {
            self.notifications.push(notification);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.notifications.is_empty()
    }

    pub fn len(&self) -> usize {
        self.notifications.len()
    }

    pub fn targets_root(&self) -> bool {
        self.notifications
            .iter()
            .any(|n| n.target == NotificationTarget::Root)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Notification> {
        self.notifications.iter()
    }
}

impl FromIterator<Notification> for NotificationBatch {
    fn from_iter<I: IntoIterator<Item = Notification>>(iter: I) -> Self {
        let mut batch = Self::new();
        for n in iter {
            batch.push(n);
        }
        batch
    }
}

/// What a batch of notifications calls for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeClass {
    /// Break heights are stale: run a full pass
    Recompute,
    /// Only the page count may have changed
    PageCountOnly,
    Idle,
}

impl ChangeClass {
    /// Name used on the JavaScript side
    pub fn as_str(self) -> &'static str {
        match self {
            ChangeClass::Recompute => "recompute",
            ChangeClass::PageCountOnly => "pageCount",
            ChangeClass::Idle => "idle",
        }
    }
}

pub fn classify<S: LayoutSource + ?Sized>(
    source: &S,
    state: &OverlayState,
    batch: &NotificationBatch,
) -> ChangeClass {
    if batch.is_empty() {
        ChangeClass::Idle
    } else if markers_changed(source, state.last_marker_tops()) {
        ChangeClass::Recompute
    } else if batch.targets_root() {
        ChangeClass::PageCountOnly
    } else {
        ChangeClass::Idle
    }
}

/// Markers appeared, disappeared, moved, or lost their spacer since the tops
/// in `last_tops` were recorded
pub fn markers_changed<S: LayoutSource + ?Sized>(source: &S, last_tops: &[f32]) -> bool {
    let slots = source.marker_slots();
    if slots.len() != last_tops.len() {
        return true;
    }

    let reader = GeometryReader::new(source);
    slots.iter().zip(last_tops).any(|(slot, &last)| {
        let top = reader.measure(slot.element).offset_top;
        (top - last).abs() > POSITION_TOLERANCE || !slot.has_adjacent_spacer()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{BreakId, Direction};
    use crate::layout::breaks::BreakPlan;
    use crate::render::{GeometrySnapshot, SnapshotElement};
    use crate::{PaginationOptions, Rect};

    fn paginated_snapshot(marker_top: f32) -> GeometrySnapshot {
        GeometrySnapshot::new(vec![
            SnapshotElement::content(Rect::new(0.0, 0.0, 676.0, marker_top)),
            SnapshotElement::marker(BreakId(1), Direction::After, Rect::new(0.0, marker_top, 676.0, 20.0)),
            SnapshotElement::spacer(BreakId(1), Rect::new(0.0, marker_top + 20.0, 676.0, 500.0)),
        ])
    }

    fn state_for(snapshot: &GeometrySnapshot) -> OverlayState {
        let metrics = PaginationOptions::default().metrics().unwrap();
        let mut state = OverlayState::new();
        state.commit(&BreakPlan::compute(snapshot, &metrics), 1);
        state
    }

    fn root_batch() -> NotificationBatch {
        [Notification::root()].into_iter().collect()
    }

    #[test]
    fn test_empty_batch_is_idle() {
        let snapshot = paginated_snapshot(100.0);
        let state = OverlayState::new();
        assert_eq!(classify(&snapshot, &state, &NotificationBatch::new()), ChangeClass::Idle);
    }

    #[test]
    fn test_change_class_names() {
        assert_eq!(ChangeClass::Recompute.as_str(), "recompute");
        assert_eq!(ChangeClass::PageCountOnly.as_str(), "pageCount");
        assert_eq!(ChangeClass::Idle.as_str(), "idle");
    }

    #[test]
    fn test_new_marker_forces_recompute() {
        let snapshot = paginated_snapshot(100.0);
        let state = OverlayState::new();
        assert_eq!(classify(&snapshot, &state, &root_batch()), ChangeClass::Recompute);
    }

    #[test]
    fn test_unchanged_markers_check_page_count() {
        let snapshot = paginated_snapshot(100.0);
        let state = state_for(&snapshot);
        assert_eq!(classify(&snapshot, &state, &root_batch()), ChangeClass::PageCountOnly);

        let element_only: NotificationBatch =
            [Notification::element(ElementId(0))].into_iter().collect();
        assert_eq!(classify(&snapshot, &state, &element_only), ChangeClass::Idle);
    }

    #[test]
    fn test_subpixel_moves_are_ignored() {
        let state = state_for(&paginated_snapshot(100.0));
        assert!(!markers_changed(&paginated_snapshot(100.3), state.last_marker_tops()));
        assert!(markers_changed(&paginated_snapshot(102.0), state.last_marker_tops()));
    }

    #[test]
    fn test_missing_spacer_forces_recompute() {
        let with_spacer = paginated_snapshot(100.0);
        let state = state_for(&with_spacer);
        let bare = GeometrySnapshot::new(vec![
            SnapshotElement::content(Rect::new(0.0, 0.0, 676.0, 100.0)),
            SnapshotElement::marker(BreakId(1), Direction::After, Rect::new(0.0, 100.0, 676.0, 20.0)),
        ]);
        assert!(markers_changed(&bare, state.last_marker_tops()));
    }

    #[test]
    fn test_batch_deduplicates() {
        let batch: NotificationBatch = [
            Notification::root(),
            Notification::element(ElementId(2)),
            Notification::root(),
        ]
        .into_iter()
        .collect();
        assert_eq!(batch.len(), 2);
        assert!(batch.targets_root());
    }
}
