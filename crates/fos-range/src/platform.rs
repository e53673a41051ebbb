//! Host selection primitives
//!
//! [`PlatformSelection`] is what a host offers for its live user
//! selection. [`HostSelection`] is an in-memory host that behaves the way
//! its [`HostCapabilities`] say, used when no native selection exists and
//! to simulate constrained hosts.

use std::cmp::Ordering;

use fos_dom::DomTree;

use crate::boundary::compare_positions;
use crate::{HostCapabilities, Position, RangeError, RangeResult};

/// A range as the host stores it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostRange {
    pub start: Position,
    pub end: Position,
}

impl HostRange {
    pub fn new(start: Position, end: Position) -> Self {
        Self { start, end }
    }

    pub fn collapsed(at: Position) -> Self {
        Self::new(at, at)
    }

    /// Range between two points given in either order
    pub fn between(tree: &DomTree, a: Position, b: Position) -> RangeResult<Self> {
        Ok(match compare_positions(tree, a, b)? {
            Ordering::Greater => Self::new(b, a),
            _ => Self::new(a, b),
        })
    }
}

/// The host's live selection
pub trait PlatformSelection {
    fn range_count(&self) -> usize;
    fn range_at(&self, index: usize) -> Option<HostRange>;
    /// Where the selection gesture started, when the host reports it
    fn anchor(&self) -> Option<Position>;
    /// Where the selection gesture ended, when the host reports it
    fn focus(&self) -> Option<Position>;
    fn add_range(&mut self, range: HostRange);
    fn remove_all_ranges(&mut self);
    fn collapse(&mut self, at: Position);
    /// Move the focus, keeping the anchor
    fn extend(&mut self, tree: &DomTree, to: Position) -> RangeResult<()>;
}

/// In-memory host selection
#[derive(Debug, Clone)]
pub struct HostSelection {
    capabilities: HostCapabilities,
    ranges: Vec<HostRange>,
    anchor: Option<Position>,
    focus: Option<Position>,
}

impl HostSelection {
    pub fn new(capabilities: HostCapabilities) -> Self {
        Self {
            capabilities,
            ranges: Vec::new(),
            anchor: None,
            focus: None,
        }
    }

    pub fn capabilities(&self) -> &HostCapabilities {
        &self.capabilities
    }
}

impl PlatformSelection for HostSelection {
    fn range_count(&self) -> usize {
        self.ranges.len()
    }

    fn range_at(&self, index: usize) -> Option<HostRange> {
        self.ranges.get(index).copied()
    }

    fn anchor(&self) -> Option<Position> {
        if self.capabilities.anchor_focus {
            self.anchor
        } else {
            None
        }
    }

    fn focus(&self) -> Option<Position> {
        if self.capabilities.anchor_focus {
            self.focus
        } else {
            None
        }
    }

    fn add_range(&mut self, range: HostRange) {
        if !self.capabilities.multi_range {
            self.ranges.clear();
        }
        self.ranges.push(range);
        self.anchor = Some(range.start);
        self.focus = Some(range.end);
    }

    fn remove_all_ranges(&mut self) {
        self.ranges.clear();
        self.anchor = None;
        self.focus = None;
    }

    fn collapse(&mut self, at: Position) {
        self.ranges = vec![HostRange::collapsed(at)];
        self.anchor = Some(at);
        self.focus = Some(at);
    }

    fn extend(&mut self, tree: &DomTree, to: Position) -> RangeResult<()> {
        if !self.capabilities.extend {
            return Err(RangeError::Unsupported(
                "host selection cannot be extended".to_string(),
            ));
        }
        let anchor = self
            .anchor
            .ok_or(RangeError::InvalidState("selection has no anchor to extend from"))?;
        let range = HostRange::between(tree, anchor, to)?;
        match self.ranges.last_mut() {
            Some(last) => *last = range,
            None => self.ranges.push(range),
        }
        self.focus = Some(to);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text_tree() -> (DomTree, fos_dom::NodeId) {
        let mut tree = DomTree::new();
        let t = tree.create_text("Hello world");
        tree.append_child(tree.root(), t).unwrap();
        (tree, t)
    }

    #[test]
    fn test_single_range_host_replaces() {
        let (_, t) = text_tree();
        let caps = HostCapabilities {
            multi_range: false,
            ..HostCapabilities::full()
        };
        let mut host = HostSelection::new(caps);
        host.add_range(HostRange::new(Position::new(t, 0), Position::new(t, 2)));
        host.add_range(HostRange::new(Position::new(t, 4), Position::new(t, 6)));

        assert_eq!(host.range_count(), 1);
        assert_eq!(host.range_at(0).unwrap().start, Position::new(t, 4));
    }

    #[test]
    fn test_extend_backwards_orders_range() {
        let (tree, t) = text_tree();
        let mut host = HostSelection::new(HostCapabilities::full());
        host.collapse(Position::new(t, 8));
        host.extend(&tree, Position::new(t, 2)).unwrap();

        let range = host.range_at(0).unwrap();
        assert_eq!(range.start, Position::new(t, 2));
        assert_eq!(range.end, Position::new(t, 8));
        assert_eq!(host.anchor(), Some(Position::new(t, 8)));
        assert_eq!(host.focus(), Some(Position::new(t, 2)));
    }

    #[test]
    fn test_extend_requires_capability() {
        let (tree, t) = text_tree();
        let caps = HostCapabilities {
            extend: false,
            ..HostCapabilities::full()
        };
        let mut host = HostSelection::new(caps);
        host.collapse(Position::new(t, 1));
        assert!(matches!(
            host.extend(&tree, Position::new(t, 3)),
            Err(RangeError::Unsupported(_))
        ));
    }
}
