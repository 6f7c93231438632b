//! Top-level document nodes

use crate::document::marker::{BreakMarker, PAGE_BREAK_NODE};
use smallvec::SmallVec;

/// Stable identifier for a node that survives edits around it
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct NodeId(pub u64);

/// A top-level block: type name, string attributes and its size in
/// document positions.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    id: NodeId,
    name: String,
    attrs: SmallVec<[(String, String); 2]>,
    size: usize,
}

impl Node {
    /// Create a node. Its id is assigned when it enters a document.
    pub fn new(name: impl Into<String>, size: usize) -> Self {
        Self {
            id: NodeId::default(),
            name: name.into(),
            attrs: SmallVec::new(),
            size,
        }
    }

    /// A paragraph holding `text_len` positions of inline content
    pub fn paragraph(text_len: usize) -> Self {
        Self::new("paragraph", text_len + 2)
    }

    /// An unassigned page-break marker (atom node)
    pub fn page_break() -> Self {
        Self::new(PAGE_BREAK_NODE, 1)
    }

    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_attr(key, value);
        self
    }

    pub fn set_attr(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.attrs.iter_mut().find(|(k, _)| *k == key) {
            Some((_, v)) => *v = value,
            None => self.attrs.push((key, value)),
        }
    }

    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn attrs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.attrs.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub(crate) fn set_id(&mut self, id: NodeId) {
        self.id = id;
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn set_size(&mut self, size: usize) {
        self.size = size;
    }

    pub fn is_break_marker(&self) -> bool {
        self.name == PAGE_BREAK_NODE
    }

    pub fn break_marker(&self) -> Option<BreakMarker> {
        BreakMarker::from_node(self)
    }
}
