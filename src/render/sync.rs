//! Write phase of a recompute pass: spacers and page chrome

use crate::config::PageMetrics;
use crate::document::{BreakId, Direction};
use crate::layout::{estimate, BreakPlan, ChromeHold, RenderedExtent};
use crate::render::{ElementId, LayoutSource, RenderTree};
use log::{debug, trace, warn};
use rustc_hash::FxHashSet;
use serde::Serialize;
use smallvec::SmallVec;

/// Rounds of estimate-then-adjust before chrome is left as is
pub const MAX_SETTLE_ROUNDS: usize = 6;

/// Spacer heights closer than this are not rewritten
const RESIZE_EPSILON: f32 = 0.01;

/// One spacer mutation
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum SpacerOp {
    #[serde(rename_all = "camelCase")]
    Insert {
        marker: ElementId,
        direction: Direction,
        break_id: BreakId,
        height: f32,
    },
    #[serde(rename_all = "camelCase")]
    Resize { spacer: ElementId, height: f32 },
    /// Spacer exists but not beside its marker: move it back
    #[serde(rename_all = "camelCase")]
    Relocate {
        spacer: ElementId,
        marker: ElementId,
        direction: Direction,
        break_id: BreakId,
        height: f32,
    },
    #[serde(rename_all = "camelCase")]
    Remove { spacer: ElementId },
}

pub type SpacerOps = SmallVec<[SpacerOp; 8]>;

/// What a write phase did
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SyncReport {
    pub inserted: usize,
    pub resized: usize,
    pub relocated: usize,
    pub removed: usize,
    /// Chrome entries after settling
    pub page_count: usize,
}

impl SyncReport {
    pub fn spacer_writes(&self) -> usize {
        self.inserted + self.resized + self.relocated + self.removed
    }
}

/// Applies a `BreakPlan` to a render tree
pub struct Synchronizer<'a> {
    metrics: &'a PageMetrics,
}

impl<'a> Synchronizer<'a> {
    pub fn new(metrics: &'a PageMetrics) -> Self {
        Self { metrics }
    }

    /// Spacer mutations needed to bring the tree in line with `plan`. No-op
    /// resizes are skipped.
    pub fn reconcile<S: LayoutSource + ?Sized>(plan: &BreakPlan, source: &S) -> SpacerOps {
        let mut ops = SpacerOps::new();
        for planned in plan.breaks() {
            let op = match planned.spacer {
                Some(spacer) if planned.in_place => {
                    if (planned.current_height - planned.height).abs() <= RESIZE_EPSILON {
                        continue;
                    }
                    SpacerOp::Resize {
                        spacer,
                        height: planned.height,
                    }
                }
                Some(spacer) => SpacerOp::Relocate {
                    spacer,
                    marker: planned.element,
                    direction: planned.marker.direction,
                    break_id: planned.break_id(),
                    height: planned.height,
                },
                None => SpacerOp::Insert {
                    marker: planned.element,
                    direction: planned.marker.direction,
                    break_id: planned.break_id(),
                    height: planned.height,
                },
            };
            ops.push(op);
        }

        let claimed: FxHashSet<ElementId> = plan.breaks().iter().filter_map(|b| b.spacer).collect();
        for (_, spacer) in source.spacers() {
            if !claimed.contains(&spacer) {
                ops.push(SpacerOp::Remove { spacer });
            }
        }
        ops
    }

    /// Run the whole write phase and settle chrome on the estimator's count
    pub fn apply<R: RenderTree + ?Sized>(
        &self,
        plan: &BreakPlan,
        tree: &mut R,
        hold: &mut Option<ChromeHold>,
    ) -> SyncReport {
        let mut report = SyncReport::default();

        // Enough chrome that every marker's target page exists while spacers
        // grow; the excess is trimmed below.
        if !plan.is_empty() && tree.has_chrome_root() {
            let existing = tree.chrome_entries();
            let provisional =
                estimate(RenderedExtent::read(&*tree), existing, self.metrics) + plan.len() + 2;
            if existing < provisional {
                tree.set_chrome_entries(provisional);
            }
        }

        for op in Self::reconcile(plan, &*tree) {
            trace!("spacer op {:?}", op);
            match op {
                SpacerOp::Insert {
                    marker,
                    direction,
                    break_id,
                    height,
                } => {
                    tree.insert_spacer(marker, direction, break_id, height);
                    report.inserted += 1;
                }
                SpacerOp::Resize { spacer, height } => {
                    tree.resize_spacer(spacer, height);
                    report.resized += 1;
                }
                SpacerOp::Relocate {
                    spacer,
                    marker,
                    direction,
                    break_id,
                    height,
                } => {
                    warn!("spacer for break {} detached from its marker, relocating", break_id);
                    tree.remove_spacer(spacer);
                    tree.insert_spacer(marker, direction, break_id, height);
                    report.relocated += 1;
                }
                SpacerOp::Remove { spacer } => {
                    tree.remove_spacer(spacer);
                    report.removed += 1;
                }
            }
        }

        report.page_count = self.settle_chrome(tree, hold);
        report
    }

    /// Adjust chrome until the estimator agrees with the mounted count.
    ///
    /// A tree without chrome gets it mounted at the unpaginated estimate
    /// first. A step that would undo the previous one ends the loop on the
    /// larger count and leaves a `ChromeHold` for later checks.
    pub fn settle_chrome<R: RenderTree + ?Sized>(
        &self,
        tree: &mut R,
        hold: &mut Option<ChromeHold>,
    ) -> usize {
        if !tree.has_chrome_root() {
            let target = estimate(RenderedExtent::read(&*tree), 0, self.metrics);
            tree.set_chrome_entries(target);
            if !tree.has_chrome_root() {
                return tree.chrome_entries().max(1);
            }
        }

        let mut count = tree.chrome_entries();
        let mut previous = None;
        for _ in 0..MAX_SETTLE_ROUNDS {
            let extent = RenderedExtent::read(&*tree);
            let target = estimate(extent, count, self.metrics);
            if target == count {
                return count;
            }
            if let Some(held) = hold.as_mut() {
                if held.holds(count, target, extent.gap()) {
                    return count;
                }
            }

            let next = if previous == Some(target) {
                let damped = ChromeHold::between(count, target, extent.gap());
                debug!("page count alternates {} / {}, keeping {}", count, target, damped.kept);
                *hold = Some(damped);
                damped.kept
            } else {
                target
            };
            if next == count {
                return count;
            }
            tree.set_chrome_entries(next);
            previous = Some(count);
            count = tree.chrome_entries();
        }
        warn!("page chrome did not settle after {} rounds, keeping {} pages", MAX_SETTLE_ROUNDS, count);
        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::BreakPlan;
    use crate::render::{GeometrySnapshot, SnapshotElement};
    use crate::{PaginationOptions, Rect};

    fn metrics() -> PageMetrics {
        PaginationOptions::default().metrics().unwrap()
    }

    fn marker(id: u64, direction: Direction, top: f32) -> SnapshotElement {
        SnapshotElement::marker(BreakId(id), direction, Rect::new(0.0, top, 676.0, 20.0))
    }

    #[test]
    fn test_reconcile_inserts_missing_spacer() {
        let snapshot = GeometrySnapshot::new(vec![
            SnapshotElement::content(Rect::new(0.0, 0.0, 676.0, 100.0)),
            marker(1, Direction::After, 100.0),
        ]);
        let plan = BreakPlan::compute(&snapshot, &metrics());
        let ops = Synchronizer::reconcile(&plan, &snapshot);
        assert_eq!(
            ops.as_slice(),
            &[SpacerOp::Insert {
                marker: ElementId(1),
                direction: Direction::After,
                break_id: BreakId(1),
                height: 670.0,
            }]
        );
    }

    #[test]
    fn test_reconcile_skips_noop_resize() {
        let snapshot = GeometrySnapshot::new(vec![
            SnapshotElement::content(Rect::new(0.0, 0.0, 676.0, 100.0)),
            marker(1, Direction::After, 100.0),
            SnapshotElement::spacer(BreakId(1), Rect::new(0.0, 120.0, 676.0, 670.0)),
        ]);
        let plan = BreakPlan::compute(&snapshot, &metrics());
        assert!(Synchronizer::reconcile(&plan, &snapshot).is_empty());
    }

    #[test]
    fn test_reconcile_relocates_and_removes_orphans() {
        let snapshot = GeometrySnapshot::new(vec![
            SnapshotElement::spacer(BreakId(1), Rect::new(0.0, 0.0, 676.0, 50.0)),
            SnapshotElement::content(Rect::new(0.0, 50.0, 676.0, 100.0)),
            marker(1, Direction::Before, 150.0),
            SnapshotElement::spacer(BreakId(9), Rect::new(0.0, 170.0, 676.0, 30.0)),
        ]);
        let plan = BreakPlan::compute(&snapshot, &metrics());
        let ops = Synchronizer::reconcile(&plan, &snapshot);
        assert_eq!(ops.len(), 2);
        assert!(matches!(
            ops[0],
            SpacerOp::Relocate { spacer: ElementId(0), marker: ElementId(2), .. }
        ));
        assert_eq!(ops[1], SpacerOp::Remove { spacer: ElementId(3) });
    }

    #[test]
    fn test_reconcile_gives_repeated_break_its_own_spacer() {
        let snapshot = GeometrySnapshot::new(vec![
            SnapshotElement::content(Rect::new(0.0, 0.0, 676.0, 100.0)),
            marker(1, Direction::After, 100.0),
            SnapshotElement::spacer(BreakId(1), Rect::new(0.0, 120.0, 676.0, 670.0)),
            SnapshotElement::content(Rect::new(0.0, 790.0, 676.0, 100.0)),
            marker(1, Direction::After, 890.0),
        ]);
        let plan = BreakPlan::compute(&snapshot, &metrics());
        let ops = Synchronizer::reconcile(&plan, &snapshot);
        // 910 is 50px into page 2
        assert_eq!(
            ops.as_slice(),
            &[SpacerOp::Insert {
                marker: ElementId(4),
                direction: Direction::After,
                break_id: BreakId(1),
                height: 730.0,
            }]
        );
    }

    #[test]
    fn test_reconcile_removes_duplicate_spacers() {
        let snapshot = GeometrySnapshot::new(vec![
            marker(1, Direction::After, 0.0),
            SnapshotElement::spacer(BreakId(1), Rect::new(0.0, 20.0, 676.0, 770.0)),
            SnapshotElement::spacer(BreakId(1), Rect::new(0.0, 790.0, 676.0, 770.0)),
        ]);
        let plan = BreakPlan::compute(&snapshot, &metrics());
        let ops = Synchronizer::reconcile(&plan, &snapshot);
        assert_eq!(ops.as_slice(), &[SpacerOp::Remove { spacer: ElementId(2) }]);
    }

    #[test]
    fn test_op_serializes_camel_case() {
        let op = SpacerOp::Resize {
            spacer: ElementId(4),
            height: 12.0,
        };
        let json = serde_json::to_string(&op).unwrap();
        assert_eq!(json, r#"{"op":"resize","spacer":4,"height":12.0}"#);
    }
}
