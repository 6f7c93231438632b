//! Flat document model: an ordered stream of top-level blocks
//!
//! Pagination never splits this tree. Break markers are ordinary nodes
//! whose ids are handed out by the document itself.

mod marker;
mod node;

pub use marker::{
    BreakId, BreakMarker, Direction, ATTR_BREAK_ID, ATTR_DIRECTION, PAGE_BREAK_NODE,
};
pub use node::{Node, NodeId};

use rustc_hash::FxHashSet;

/// How positions move across one replaced range of the document.
///
/// `side` follows the overlay convention: negative sticks to the content
/// before a position, positive to the content after it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PositionMap {
    pub start: usize,
    pub old_size: usize,
    pub new_size: usize,
}

impl PositionMap {
    pub fn identity() -> Self {
        Self::default()
    }

    pub fn is_identity(&self) -> bool {
        self.old_size == 0 && self.new_size == 0
    }

    pub fn map(&self, pos: usize, side: i8) -> usize {
        let end = self.start + self.old_size;
        if pos < self.start || self.is_identity() {
            pos
        } else if pos > end {
            pos + self.new_size - self.old_size
        } else if pos == self.start && (side < 0 || (self.old_size > 0 && pos != end)) {
            self.start
        } else if pos == end && pos != self.start {
            self.start + self.new_size
        } else if side < 0 {
            self.start
        } else {
            self.start + self.new_size
        }
    }
}

/// The document: top-level nodes in order
#[derive(Debug, Clone, Default)]
pub struct Document {
    nodes: Vec<Node>,
    version: u64,
    next_node_id: u64,
    next_break_id: u64,
}

impl Document {
    /// Create a new empty document
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a document from nodes, assigning ids as if inserted in order
    pub fn from_nodes(nodes: impl IntoIterator<Item = Node>) -> Self {
        let mut doc = Self::new();
        for node in nodes {
            doc.push(node);
        }
        doc
    }

    /// Monotonic version, bumped by every change
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn node(&self, index: usize) -> Option<&Node> {
        self.nodes.get(index)
    }

    /// Total size in document positions
    pub fn content_size(&self) -> usize {
        self.nodes.iter().map(Node::size).sum()
    }

    /// Position where the node at `index` starts
    pub fn offset_of(&self, index: usize) -> usize {
        self.nodes[..index.min(self.nodes.len())]
            .iter()
            .map(Node::size)
            .sum()
    }

    /// Iterate nodes together with their start offset
    pub fn iter_with_offsets(&self) -> impl Iterator<Item = (usize, &Node)> + '_ {
        self.nodes.iter().scan(0usize, |offset, node| {
            let start = *offset;
            *offset += node.size();
            Some((start, node))
        })
    }

    /// Break markers in document order, with their start offset
    pub fn markers(&self) -> impl Iterator<Item = (usize, &Node, BreakMarker)> + '_ {
        self.iter_with_offsets()
            .filter_map(|(offset, node)| node.break_marker().map(|m| (offset, node, m)))
    }

    pub fn break_ids(&self) -> FxHashSet<BreakId> {
        self.markers().map(|(_, _, m)| m.break_id).collect()
    }

    /// Append a node at the end
    pub fn push(&mut self, node: Node) -> PositionMap {
        self.insert(self.nodes.len(), node)
    }

    /// Insert a node before `index` (clamped to the end)
    pub fn insert(&mut self, index: usize, node: Node) -> PositionMap {
        self.insert_node(index, node).0
    }

    /// Insert a new page-break marker and return its id
    pub fn insert_page_break(&mut self, index: usize, direction: Direction) -> (BreakId, PositionMap) {
        let node = Node::page_break().with_attr(ATTR_DIRECTION, direction.as_str());
        let (map, break_id) = self.insert_node(index, node);
        (break_id.unwrap_or_default(), map)
    }

    fn insert_node(&mut self, index: usize, mut node: Node) -> (PositionMap, Option<BreakId>) {
        let index = index.min(self.nodes.len());
        node.set_id(NodeId(self.next_node_id));
        self.next_node_id += 1;
        let break_id = node
            .is_break_marker()
            .then(|| self.assign_break_id(&mut node));

        let map = PositionMap {
            start: self.offset_of(index),
            old_size: 0,
            new_size: node.size(),
        };
        self.nodes.insert(index, node);
        self.version += 1;
        (map, break_id)
    }

    /// Remove the node at `index`
    pub fn remove(&mut self, index: usize) -> Option<(Node, PositionMap)> {
        if index >= self.nodes.len() {
            return None;
        }
        let start = self.offset_of(index);
        let node = self.nodes.remove(index);
        self.version += 1;
        let map = PositionMap {
            start,
            old_size: node.size(),
            new_size: 0,
        };
        Some((node, map))
    }

    /// Mutate the node at `index` in place. Its id is preserved; a break
    /// marker keeps its `bid` even if the closure tries to change it.
    pub fn update(&mut self, index: usize, f: impl FnOnce(&mut Node)) -> Option<PositionMap> {
        let start = self.offset_of(index);
        let node = self.nodes.get_mut(index)?;
        let id = node.id();
        let old_size = node.size();
        let bid = node.attr(ATTR_BREAK_ID).map(str::to_string);

        f(node);
        node.set_id(id);
        if let Some(bid) = bid {
            node.set_attr(ATTR_BREAK_ID, bid);
        }

        self.version += 1;
        Some(PositionMap {
            start,
            old_size,
            new_size: self.nodes[index].size(),
        })
    }

    /// Give a marker a fresh id unless it already carries one that no other
    /// marker uses (loaded documents, undo restoring a deleted marker).
    fn assign_break_id(&mut self, node: &mut Node) -> BreakId {
        let existing = node.break_marker().map(|m| m.break_id);
        let taken = self.break_ids();
        let break_id = match existing {
            Some(id) if !taken.contains(&id) => {
                self.next_break_id = self.next_break_id.max(id.0 + 1);
                id
            }
            _ => {
                let id = BreakId(self.next_break_id);
                self.next_break_id += 1;
                id
            }
        };
        node.set_attr(ATTR_BREAK_ID, break_id.to_string());
        break_id
    }
}
