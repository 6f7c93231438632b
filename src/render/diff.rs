//! Overlay diff protocol for incremental updates

use crate::document::{BreakId, Direction};
use crate::layout::GeometryReader;
use crate::render::{OverlaySet, RenderTree};
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

/// Spacer heights closer than this are considered equal
const HEIGHT_EPSILON: f32 = 0.01;

/// A single patch operation for the host view
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OverlayPatch {
    /// Mount a spacer beside its marker
    InsertSpacer {
        break_id: BreakId,
        direction: Direction,
        height: f32,
    },
    /// Change the height of a mounted spacer
    ResizeSpacer { break_id: BreakId, height: f32 },
    RemoveSpacer { break_id: BreakId },
    /// Mount exactly `count` chrome entries
    SetPageCount { count: usize },
}

/// Patches turning one overlay set into the next
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OverlayDiff {
    pub patches: SmallVec<[OverlayPatch; 4]>,
}

impl OverlayDiff {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compute patches between the previously rendered set and the next
    pub fn between(previous: &OverlaySet, next: &OverlaySet) -> Self {
        let mut diff = Self::new();

        if let Some(count) = next.page_count() {
            if previous.page_count() != Some(count) {
                diff.add_patch(OverlayPatch::SetPageCount { count });
            }
        }

        let before: FxHashMap<BreakId, (Direction, f32)> = previous
            .spacers()
            .map(|(id, direction, height)| (id, (direction, height)))
            .collect();
        let after: FxHashMap<BreakId, (Direction, f32)> = next
            .spacers()
            .map(|(id, direction, height)| (id, (direction, height)))
            .collect();

        for (break_id, _, _) in previous.spacers() {
            if !after.contains_key(&break_id) {
                diff.add_patch(OverlayPatch::RemoveSpacer { break_id });
            }
        }

        for (break_id, direction, height) in next.spacers() {
            match before.get(&break_id) {
                None => diff.add_patch(OverlayPatch::InsertSpacer {
                    break_id,
                    direction,
                    height,
                }),
                Some(&(old_direction, _)) if old_direction != direction => {
                    diff.add_patch(OverlayPatch::RemoveSpacer { break_id });
                    diff.add_patch(OverlayPatch::InsertSpacer {
                        break_id,
                        direction,
                        height,
                    });
                }
                Some(&(_, old_height)) if (old_height - height).abs() > HEIGHT_EPSILON => {
                    diff.add_patch(OverlayPatch::ResizeSpacer { break_id, height })
                }
                Some(_) => {}
            }
        }

        diff
    }

    pub fn add_patch(&mut self, patch: OverlayPatch) {
        self.patches.push(patch);
    }

    pub fn has_patches(&self) -> bool {
        !self.patches.is_empty()
    }

    pub fn patch_count(&self) -> usize {
        self.patches.len()
    }

    /// Apply the patches, touching the tree only where it differs. Returns
    /// the number of writes performed.
    pub fn apply_to<R: RenderTree + ?Sized>(&self, tree: &mut R) -> usize {
        let mut writes = 0;
        for patch in &self.patches {
            writes += match *patch {
                OverlayPatch::SetPageCount { count } => {
                    if tree.has_chrome_root() && tree.chrome_entries() == count {
                        0
                    } else {
                        tree.set_chrome_entries(count);
                        1
                    }
                }
                OverlayPatch::InsertSpacer {
                    break_id, height, ..
                }
                | OverlayPatch::ResizeSpacer { break_id, height } => {
                    place_spacer(tree, break_id, height)
                }
                OverlayPatch::RemoveSpacer { break_id } => {
                    let doomed: SmallVec<[_; 2]> = tree
                        .spacers()
                        .into_iter()
                        .filter(|(id, _)| *id == break_id)
                        .map(|(_, spacer)| spacer)
                        .collect();
                    for &spacer in &doomed {
                        tree.remove_spacer(spacer);
                    }
                    doomed.len()
                }
            };
        }
        writes
    }
}

/// Make the marker's own spacer exist with `height`, on the side its
/// direction calls for
fn place_spacer<R: RenderTree + ?Sized>(tree: &mut R, break_id: BreakId, height: f32) -> usize {
    let Some(slot) = tree
        .marker_slots()
        .into_iter()
        .find(|s| s.marker.break_id == break_id)
    else {
        // Marker not rendered (yet); the next pass places it
        return 0;
    };

    if let Some(spacer) = slot.own_spacer() {
        let current = GeometryReader::new(&*tree).measure(spacer).height;
        if (current - height).abs() <= HEIGHT_EPSILON {
            return 0;
        }
        tree.resize_spacer(spacer, height);
        return 1;
    }

    let stray = tree
        .spacers()
        .into_iter()
        .find(|(id, _)| *id == break_id)
        .map(|(_, spacer)| spacer);
    if let Some(stray) = stray {
        tree.remove_spacer(stray);
    }
    tree.insert_spacer(slot.element, slot.marker.direction, break_id, height);
    1
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{Document, Node};
    use crate::layout::OverlayState;
    use crate::render::{merge, Overlay, OverlayWidget};

    fn spacer(break_id: u64, direction: Direction, height: f32) -> Overlay {
        Overlay {
            pos: break_id as usize,
            side: direction.sign(),
            widget: OverlayWidget::BreakSpacer {
                break_id: BreakId(break_id),
                direction,
                height,
            },
        }
    }

    #[test]
    fn test_empty_diff() {
        let set = merge(&[spacer(1, Direction::After, 20.0)], &[]);
        let diff = OverlayDiff::between(&set, &set);
        assert!(!diff.has_patches());
    }

    #[test]
    fn test_spacer_patches() {
        let previous = merge(
            &[
                spacer(1, Direction::After, 20.0),
                spacer(2, Direction::After, 30.0),
                spacer(3, Direction::After, 40.0),
            ],
            &[],
        );
        let next = merge(
            &[
                spacer(1, Direction::After, 20.0),
                spacer(2, Direction::After, 35.0),
                spacer(4, Direction::Before, 50.0),
            ],
            &[],
        );
        let diff = OverlayDiff::between(&previous, &next);
        assert_eq!(diff.patch_count(), 3);
        assert!(diff.patches.contains(&OverlayPatch::RemoveSpacer { break_id: BreakId(3) }));
        assert!(diff.patches.contains(&OverlayPatch::ResizeSpacer {
            break_id: BreakId(2),
            height: 35.0,
        }));
        assert!(diff.patches.contains(&OverlayPatch::InsertSpacer {
            break_id: BreakId(4),
            direction: Direction::Before,
            height: 50.0,
        }));
    }

    #[test]
    fn test_direction_flip_reinserts() {
        let previous = merge(&[spacer(1, Direction::After, 20.0)], &[]);
        let next = merge(&[spacer(1, Direction::Before, 20.0)], &[]);
        let diff = OverlayDiff::between(&previous, &next);
        assert_eq!(diff.patches[0], OverlayPatch::RemoveSpacer { break_id: BreakId(1) });
        assert!(matches!(diff.patches[1], OverlayPatch::InsertSpacer { .. }));
    }

    #[test]
    fn test_page_count_patch() {
        let options = crate::PaginationOptions::default();
        let doc = Document::from_nodes([Node::paragraph(1)]);
        let next = crate::render::OverlaySets::new(&doc, &OverlayState::new(), &options).merged();
        let diff = OverlayDiff::between(&Default::default(), &next);
        assert_eq!(diff.patches.as_slice(), &[OverlayPatch::SetPageCount { count: 1 }]);
    }
}
