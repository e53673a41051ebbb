//! Boundary positions

use std::cmp::Ordering;

use fos_dom::{DomTree, NodeId};

use crate::boundary::compare_points;
use crate::{RangeError, RangeResult};

/// A point in a document: a container node and an offset into it.
///
/// The offset counts characters when the container holds character data
/// and children otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Position {
    container: NodeId,
    offset: usize,
}

impl Position {
    pub fn new(container: NodeId, offset: usize) -> Self {
        Self { container, offset }
    }

    /// The position just before `node` in its parent
    pub fn before(tree: &DomTree, node: NodeId) -> RangeResult<Self> {
        let parent = tree
            .parent(node)
            .ok_or(RangeError::InvalidNodeType)?;
        Ok(Self::new(parent, tree.index_of(node)))
    }

    /// The position just after `node` in its parent
    pub fn after(tree: &DomTree, node: NodeId) -> RangeResult<Self> {
        let parent = tree
            .parent(node)
            .ok_or(RangeError::InvalidNodeType)?;
        Ok(Self::new(parent, tree.index_of(node) + 1))
    }

    #[inline]
    pub fn container(&self) -> NodeId {
        self.container
    }

    #[inline]
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// The container exists and the offset does not exceed its length
    pub fn is_valid_in(&self, tree: &DomTree) -> bool {
        tree.contains(self.container) && self.offset <= tree.length(self.container)
    }

    /// Document-order comparison against `other`
    pub fn compare(&self, tree: &DomTree, other: &Position) -> RangeResult<Ordering> {
        compare_points(tree, self.container, self.offset, other.container, other.offset)
    }

    /// The child node this position sits in front of, if the container
    /// is not character data
    pub fn node_after(&self, tree: &DomTree) -> Option<NodeId> {
        if tree.is_character_data(self.container) {
            return None;
        }
        tree.child_at(self.container, self.offset)
    }

    pub(crate) fn with_offset(self, offset: usize) -> Self {
        Self::new(self.container, offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_before_and_after_node() {
        let mut tree = DomTree::new();
        let div = tree.create_element("div");
        let a = tree.create_text("a");
        let b = tree.create_text("b");
        tree.append_child(tree.root(), div).unwrap();
        tree.append_child(div, a).unwrap();
        tree.append_child(div, b).unwrap();

        assert_eq!(Position::before(&tree, b).unwrap(), Position::new(div, 1));
        assert_eq!(Position::after(&tree, b).unwrap(), Position::new(div, 2));
        assert_eq!(Position::new(div, 1).node_after(&tree), Some(b));
        assert!(Position::before(&tree, tree.root()).is_err());
    }

    #[test]
    fn test_validity_tracks_length() {
        let mut tree = DomTree::new();
        let text = tree.create_text("abc");
        assert!(Position::new(text, 3).is_valid_in(&tree));
        assert!(!Position::new(text, 4).is_valid_in(&tree));
    }
}
