//! fOS DOM - Document Object Model
//!
//! Arena-backed node tree. Nodes are addressed by [`NodeId`] handles that
//! stay valid for the lifetime of the [`DomTree`], even after a node has
//! been detached from its parent.

mod node;
mod operations;
mod tree;
mod what_to_show;

pub use node::{Attribute, ElementData, Node, NodeData, NodeType};
pub use operations::{DomError, DomResult};
pub use tree::{Ancestors, Children, Descendants, DocumentId, DomTree};
pub use what_to_show::WhatToShow;

/// Node identifier (index into arena)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    /// Root node ID
    pub const ROOT: NodeId = NodeId(0);

    /// Sentinel used for absent links
    pub const NONE: NodeId = NodeId(u32::MAX);

    /// Whether this id refers to a node rather than the sentinel
    #[inline]
    pub fn is_valid(self) -> bool {
        self != Self::NONE
    }

    #[inline]
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }

    #[inline]
    pub(crate) fn link(self) -> Option<NodeId> {
        self.is_valid().then_some(self)
    }
}

/// Number of characters (Unicode scalar values) in `s`.
///
/// Character-data offsets throughout the workspace count characters,
/// never bytes.
#[inline]
pub fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Byte index of the `chars`-th character of `s`, clamped to `s.len()`.
#[inline]
pub fn byte_offset(s: &str, chars: usize) -> usize {
    s.char_indices().nth(chars).map_or(s.len(), |(i, _)| i)
}

/// Characters `start..end` of `s`, clamped to the string.
pub fn char_slice(s: &str, start: usize, end: usize) -> &str {
    let from = byte_offset(s, start);
    let to = byte_offset(s, end.max(start));
    &s[from..to]
}
