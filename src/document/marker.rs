//! Explicit page-break marker nodes

use crate::document::Node;
use crate::error::PaginationError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Node type name of a page-break marker
pub const PAGE_BREAK_NODE: &str = "pb";
/// Attribute holding the stable break identifier
pub const ATTR_BREAK_ID: &str = "bid";
/// Attribute holding the break direction (`before` | `after`)
pub const ATTR_DIRECTION: &str = "type";

/// Stable identifier of a break marker. Fresh ids come from a monotonic
/// counter owned by the document and are never handed out twice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BreakId(pub u64);

impl fmt::Display for BreakId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for BreakId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(BreakId)
    }
}

/// Where the forced page boundary sits relative to the marker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Boundary before the marker: the marker opens the next page
    Before,
    /// Boundary after the marker: the next block opens the next page
    #[default]
    After,
}

impl Direction {
    /// Legacy sign convention: -1 before, +1 after. Also the side bias of
    /// the spacer overlay anchored at the marker.
    pub fn sign(self) -> i8 {
        match self {
            Direction::Before => -1,
            Direction::After => 1,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Before => "before",
            Direction::After => "after",
        }
    }

    /// Tolerant attribute reader: anything other than `before` is `after`,
    /// matching how markers without a type attribute have always rendered.
    pub fn from_attr(value: Option<&str>) -> Self {
        match value {
            Some(v) if v.eq_ignore_ascii_case("before") => Direction::Before,
            _ => Direction::After,
        }
    }
}

impl FromStr for Direction {
    type Err = PaginationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "before" => Ok(Direction::Before),
            "after" => Ok(Direction::After),
            other => Err(PaginationError::UnknownDirection(other.to_string())),
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Attributes of a break marker node, decoded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BreakMarker {
    pub break_id: BreakId,
    pub direction: Direction,
}

impl BreakMarker {
    pub fn new(break_id: BreakId, direction: Direction) -> Self {
        Self { break_id, direction }
    }

    /// Decode a marker from a document node. Returns `None` for other node
    /// types and for markers that have not been assigned an id yet.
    pub fn from_node(node: &Node) -> Option<Self> {
        if node.name() != PAGE_BREAK_NODE {
            return None;
        }
        let break_id = node.attr(ATTR_BREAK_ID)?.parse().ok()?;
        Some(Self {
            break_id,
            direction: Direction::from_attr(node.attr(ATTR_DIRECTION)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direction_sign() {
        assert_eq!(Direction::Before.sign(), -1);
        assert_eq!(Direction::After.sign(), 1);
    }

    #[test]
    fn test_direction_from_attr_defaults_to_after() {
        assert_eq!(Direction::from_attr(None), Direction::After);
        assert_eq!(Direction::from_attr(Some("sideways")), Direction::After);
        assert_eq!(Direction::from_attr(Some("Before")), Direction::Before);
    }

    #[test]
    fn test_direction_strict_parse() {
        assert_eq!("after".parse::<Direction>().unwrap(), Direction::After);
        assert!(matches!(
            "up".parse::<Direction>(),
            Err(PaginationError::UnknownDirection(_))
        ));
    }

    #[test]
    fn test_marker_from_node() {
        let node = Node::new(PAGE_BREAK_NODE, 1)
            .with_attr(ATTR_BREAK_ID, "7")
            .with_attr(ATTR_DIRECTION, "before");
        let marker = BreakMarker::from_node(&node).unwrap();
        assert_eq!(marker, BreakMarker::new(BreakId(7), Direction::Before));

        let unassigned = Node::new(PAGE_BREAK_NODE, 1);
        assert!(BreakMarker::from_node(&unassigned).is_none());

        let paragraph = Node::new("paragraph", 4).with_attr(ATTR_BREAK_ID, "7");
        assert!(BreakMarker::from_node(&paragraph).is_none());
    }
}
