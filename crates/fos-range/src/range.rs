//! Range - a contiguous part of the document
//!
//! A [`DocumentRange`] is a value object over a [`DomTree`]: it holds two
//! boundary [`Position`]s and never borrows the tree. Every operation takes
//! the tree explicitly and first checks that the stored boundaries still
//! make sense in it, so a range left behind by an unrelated mutation fails
//! with [`RangeError::StaleRange`] instead of reading garbage.

use std::cmp::Ordering;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};

use fos_dom::{DocumentId, DomTree, NodeId, NodeType, WhatToShow};

use crate::boundary::{compare_points, compare_positions};
use crate::{Position, RangeError, RangeResult};

static NEXT_RANGE_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of a range. Clones get a fresh id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RangeId(u64);

impl RangeId {
    fn next() -> Self {
        RangeId(NEXT_RANGE_ID.fetch_add(1, AtomicOrdering::Relaxed))
    }
}

/// Handle returned by [`DocumentRange::on_change`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u32);

/// Notification delivered synchronously to range listeners
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeEvent {
    BoundaryChange { start: Position, end: Position },
    Detach,
}

/// Which boundary of `self` is compared with which boundary of the other
/// range in [`DocumentRange::compare_boundary_points`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum How {
    StartToStart,
    StartToEnd,
    EndToStart,
    EndToEnd,
}

/// Where a node lies relative to a range
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeComparison {
    /// Starts before the range and ends inside it
    NodeBefore,
    /// Starts inside the range and ends after it
    NodeAfter,
    /// Starts before and ends after the range
    NodeBeforeAndAfter,
    /// Entirely inside the range
    NodeInside,
}

type Listener = Box<dyn FnMut(&RangeEvent)>;

/// A contiguous part of a document
pub struct DocumentRange {
    document: DocumentId,
    id: RangeId,
    start: Position,
    end: Position,
    collapsed: bool,
    common_ancestor: NodeId,
    detached: bool,
    listeners: Vec<(ListenerId, Listener)>,
    next_listener: u32,
}

impl DocumentRange {
    /// Create a range collapsed at the start of the document
    pub fn new(tree: &DomTree) -> Self {
        let origin = Position::new(tree.root(), 0);
        Self::spanning(tree, origin, origin)
    }

    /// Range over already-validated, ordered boundaries
    pub(crate) fn spanning(tree: &DomTree, start: Position, end: Position) -> Self {
        Self {
            document: tree.id(),
            id: RangeId::next(),
            start,
            end,
            collapsed: start == end,
            common_ancestor: tree
                .common_ancestor(start.container(), end.container())
                .unwrap_or(start.container()),
            detached: false,
            listeners: Vec::new(),
            next_listener: 0,
        }
    }

    // --- Getters ---
    //
    // These return the stored boundaries as-is; call `is_valid` first when
    // the tree may have changed since the range was last updated.

    pub fn id(&self) -> RangeId {
        self.id
    }

    pub fn document(&self) -> DocumentId {
        self.document
    }

    pub fn start(&self) -> Position {
        self.start
    }

    pub fn end(&self) -> Position {
        self.end
    }

    pub fn start_container(&self) -> NodeId {
        self.start.container()
    }

    pub fn start_offset(&self) -> usize {
        self.start.offset()
    }

    pub fn end_container(&self) -> NodeId {
        self.end.container()
    }

    pub fn end_offset(&self) -> usize {
        self.end.offset()
    }

    /// Whether start and end are the same point
    pub fn collapsed(&self) -> bool {
        self.collapsed
    }

    /// Nearest inclusive ancestor of both boundary containers
    pub fn common_ancestor_container(&self) -> NodeId {
        self.common_ancestor
    }

    pub fn is_detached(&self) -> bool {
        self.detached
    }

    // --- Validity ---

    /// Fails on a detached range or a tree from another document
    pub(crate) fn ensure_usable(&self, tree: &DomTree) -> RangeResult<()> {
        if self.detached {
            return Err(RangeError::InvalidState("range is detached"));
        }
        if tree.id() != self.document {
            return Err(RangeError::WrongDocument);
        }
        Ok(())
    }

    /// [`Self::ensure_usable`] plus a structural check of both boundaries
    pub(crate) fn check(&self, tree: &DomTree) -> RangeResult<()> {
        self.ensure_usable(tree)?;
        if !ordered(tree, self.start, self.end) {
            return Err(RangeError::StaleRange);
        }
        Ok(())
    }

    /// Whether the range can still be used against `tree`
    pub fn is_valid(&self, tree: &DomTree) -> bool {
        self.check(tree).is_ok()
    }

    // --- Setters ---

    /// Set the start boundary. An end that would precede the new start, or
    /// that lives in another tree, collapses onto it.
    pub fn set_start(&mut self, tree: &DomTree, node: NodeId, offset: usize) -> RangeResult<()> {
        self.ensure_usable(tree)?;
        let start = boundary_point(tree, node, offset)?;
        let end = if ordered(tree, start, self.end) {
            self.end
        } else {
            start
        };
        self.set_bounds(tree, start, end);
        Ok(())
    }

    /// Set the end boundary. A start that would follow the new end, or that
    /// lives in another tree, collapses onto it.
    pub fn set_end(&mut self, tree: &DomTree, node: NodeId, offset: usize) -> RangeResult<()> {
        self.ensure_usable(tree)?;
        let end = boundary_point(tree, node, offset)?;
        let start = if ordered(tree, self.start, end) {
            self.start
        } else {
            end
        };
        self.set_bounds(tree, start, end);
        Ok(())
    }

    /// Set both boundaries with a single notification. Behaves like
    /// `set_start` followed by `set_end`.
    pub fn set_start_and_end(
        &mut self,
        tree: &DomTree,
        start_node: NodeId,
        start_offset: usize,
        end_node: NodeId,
        end_offset: usize,
    ) -> RangeResult<()> {
        self.ensure_usable(tree)?;
        let start = boundary_point(tree, start_node, start_offset)?;
        let end = boundary_point(tree, end_node, end_offset)?;
        if ordered(tree, start, end) {
            self.set_bounds(tree, start, end);
        } else {
            self.set_bounds(tree, end, end);
        }
        Ok(())
    }

    pub fn set_start_before(&mut self, tree: &DomTree, node: NodeId) -> RangeResult<()> {
        let point = Position::before(tree, node)?;
        self.set_start(tree, point.container(), point.offset())
    }

    pub fn set_start_after(&mut self, tree: &DomTree, node: NodeId) -> RangeResult<()> {
        let point = Position::after(tree, node)?;
        self.set_start(tree, point.container(), point.offset())
    }

    pub fn set_end_before(&mut self, tree: &DomTree, node: NodeId) -> RangeResult<()> {
        let point = Position::before(tree, node)?;
        self.set_end(tree, point.container(), point.offset())
    }

    pub fn set_end_after(&mut self, tree: &DomTree, node: NodeId) -> RangeResult<()> {
        let point = Position::after(tree, node)?;
        self.set_end(tree, point.container(), point.offset())
    }

    /// Collapse the range to one of its boundaries
    pub fn collapse(&mut self, tree: &DomTree, to_start: bool) -> RangeResult<()> {
        self.check(tree)?;
        let point = if to_start { self.start } else { self.end };
        self.set_bounds(tree, point, point);
        Ok(())
    }

    /// Collapse the range onto an arbitrary point
    pub fn collapse_to_point(
        &mut self,
        tree: &DomTree,
        node: NodeId,
        offset: usize,
    ) -> RangeResult<()> {
        self.ensure_usable(tree)?;
        let point = boundary_point(tree, node, offset)?;
        self.set_bounds(tree, point, point);
        Ok(())
    }

    /// Surround `node` itself
    pub fn select_node(&mut self, tree: &DomTree, node: NodeId) -> RangeResult<()> {
        self.ensure_usable(tree)?;
        let start = Position::before(tree, node)?;
        let end = Position::after(tree, node)?;
        self.set_bounds(tree, start, end);
        Ok(())
    }

    /// Span the children (or characters) of `node`
    pub fn select_node_contents(&mut self, tree: &DomTree, node: NodeId) -> RangeResult<()> {
        self.ensure_usable(tree)?;
        let start = boundary_point(tree, node, 0)?;
        let end = Position::new(node, tree.length(node));
        self.set_bounds(tree, start, end);
        Ok(())
    }

    /// Store new boundaries, recompute derived state and notify listeners
    pub(crate) fn set_bounds(&mut self, tree: &DomTree, start: Position, end: Position) {
        self.start = start;
        self.end = end;
        self.collapsed = start == end;
        self.common_ancestor = tree
            .common_ancestor(start.container(), end.container())
            .unwrap_or(start.container());
        self.notify(RangeEvent::BoundaryChange { start, end });
    }

    // --- Comparison ---

    /// Compare one boundary of `self` with one boundary of `other`
    pub fn compare_boundary_points(
        &self,
        tree: &DomTree,
        how: How,
        other: &DocumentRange,
    ) -> RangeResult<Ordering> {
        self.check(tree)?;
        other.check(tree)?;
        let (this_point, other_point) = match how {
            How::StartToStart => (self.start, other.start),
            How::StartToEnd => (self.start, other.end),
            How::EndToStart => (self.end, other.start),
            How::EndToEnd => (self.end, other.end),
        };
        compare_positions(tree, this_point, other_point)
    }

    /// `Less` before the range, `Greater` after it, `Equal` inside it
    pub fn compare_point(&self, tree: &DomTree, node: NodeId, offset: usize) -> RangeResult<Ordering> {
        self.check(tree)?;
        let point = boundary_point(tree, node, offset)?;
        if tree.root_of(node) != tree.root_of(self.start.container()) {
            return Err(RangeError::WrongDocument);
        }
        if compare_positions(tree, point, self.start)? == Ordering::Less {
            Ok(Ordering::Less)
        } else if compare_positions(tree, point, self.end)? == Ordering::Greater {
            Ok(Ordering::Greater)
        } else {
            Ok(Ordering::Equal)
        }
    }

    /// Whether `(node, offset)` lies between the boundaries (inclusive).
    /// Points in another tree are never in range.
    pub fn is_point_in_range(&self, tree: &DomTree, node: NodeId, offset: usize) -> RangeResult<bool> {
        self.check(tree)?;
        let point = boundary_point(tree, node, offset)?;
        if tree.root_of(node) != tree.root_of(self.start.container()) {
            return Ok(false);
        }
        Ok(compare_positions(tree, point, self.start)? != Ordering::Less
            && compare_positions(tree, point, self.end)? != Ordering::Greater)
    }

    /// Where `node` lies relative to the range
    pub fn compare_node(&self, tree: &DomTree, node: NodeId) -> RangeResult<NodeComparison> {
        self.check(tree)?;
        let parent = tree
            .parent(node)
            .ok_or(RangeError::NotFound("node has no parent"))?;
        if tree.root_of(parent) != tree.root_of(self.start.container()) {
            return Err(RangeError::WrongDocument);
        }
        let index = tree.index_of(node);
        let before = compare_points(
            tree,
            parent,
            index,
            self.start.container(),
            self.start.offset(),
        )? == Ordering::Less;
        let after = compare_points(
            tree,
            parent,
            index + 1,
            self.end.container(),
            self.end.offset(),
        )? == Ordering::Greater;

        Ok(match (before, after) {
            (true, true) => NodeComparison::NodeBeforeAndAfter,
            (true, false) => NodeComparison::NodeBefore,
            (false, true) => NodeComparison::NodeAfter,
            (false, false) => NodeComparison::NodeInside,
        })
    }

    /// Whether any part of `node` lies strictly inside the range
    pub fn intersects_node(&self, tree: &DomTree, node: NodeId) -> RangeResult<bool> {
        self.check(tree)?;
        if !tree.contains(node) {
            return Err(RangeError::NotFound("node is not part of the tree"));
        }
        if tree.root_of(node) != tree.root_of(self.start.container()) {
            return Ok(false);
        }
        let Some(parent) = tree.parent(node) else {
            return Ok(true);
        };
        let index = tree.index_of(node);
        Ok(
            compare_points(tree, parent, index, self.end.container(), self.end.offset())?
                == Ordering::Less
                && compare_points(
                    tree,
                    parent,
                    index + 1,
                    self.start.container(),
                    self.start.offset(),
                )? == Ordering::Greater,
        )
    }

    /// Whether the ranges overlap. With `touching`, ranges that only share a
    /// boundary point count as intersecting.
    pub fn intersects_range(
        &self,
        tree: &DomTree,
        other: &DocumentRange,
        touching: bool,
    ) -> RangeResult<bool> {
        self.check(tree)?;
        other.check(tree)?;
        let start_vs_end = compare_positions(tree, self.start, other.end)?;
        let end_vs_start = compare_positions(tree, self.end, other.start)?;
        Ok(if touching {
            start_vs_end != Ordering::Greater && end_vs_start != Ordering::Less
        } else {
            start_vs_end == Ordering::Less && end_vs_start == Ordering::Greater
        })
    }

    /// The overlapping part of two ranges, or `None` when they do not overlap
    pub fn intersection(
        &self,
        tree: &DomTree,
        other: &DocumentRange,
    ) -> RangeResult<Option<DocumentRange>> {
        if !self.intersects_range(tree, other, false)? {
            return Ok(None);
        }
        let start = if compare_positions(tree, self.start, other.start)? == Ordering::Less {
            other.start
        } else {
            self.start
        };
        let end = if compare_positions(tree, self.end, other.end)? == Ordering::Greater {
            other.end
        } else {
            self.end
        };
        Ok(Some(Self::spanning(tree, start, end)))
    }

    /// The span covering both ranges. Ranges that neither overlap nor touch
    /// have no union.
    pub fn union(&self, tree: &DomTree, other: &DocumentRange) -> RangeResult<DocumentRange> {
        if !self.intersects_range(tree, other, true)? {
            return Err(RangeError::RangesDoNotIntersect);
        }
        let start = if compare_positions(tree, other.start, self.start)? == Ordering::Less {
            other.start
        } else {
            self.start
        };
        let end = if compare_positions(tree, other.end, self.end)? == Ordering::Greater {
            other.end
        } else {
            self.end
        };
        Ok(Self::spanning(tree, start, end))
    }

    /// Whether `node` lies inside the range, or merely intersects it when
    /// `allow_partial` is set
    pub fn contains_node(&self, tree: &DomTree, node: NodeId, allow_partial: bool) -> RangeResult<bool> {
        if allow_partial {
            self.intersects_node(tree, node)
        } else {
            Ok(self.compare_node(tree, node)? == NodeComparison::NodeInside)
        }
    }

    /// Whether every child (or character) of `node` is inside the range
    pub fn contains_node_contents(&self, tree: &DomTree, node: NodeId) -> RangeResult<bool> {
        self.check(tree)?;
        if !tree.contains(node) {
            return Err(RangeError::NotFound("node is not part of the tree"));
        }
        if tree.root_of(node) != tree.root_of(self.start.container()) {
            return Ok(false);
        }
        Ok(self.compare_point(tree, node, 0)? != Ordering::Less
            && self.compare_point(tree, node, tree.length(node))? != Ordering::Greater)
    }

    /// Whether `other` lies entirely within `self`
    pub fn contains_range(&self, tree: &DomTree, other: &DocumentRange) -> RangeResult<bool> {
        Ok(self
            .intersection(tree, other)?
            .is_some_and(|shared| shared.equals(other)))
    }

    /// Whether all the text inside `node` is inside the range. Nodes without
    /// text fall back to [`Self::contains_node_contents`].
    pub fn contains_node_text(&self, tree: &DomTree, node: NodeId) -> RangeResult<bool> {
        let mut probe = self.clone_range(tree)?;
        probe.select_node(tree, node)?;
        let texts = probe.get_nodes(tree, WhatToShow::TEXT, |_| true)?;
        match (texts.first(), texts.last()) {
            (Some(&first), Some(&last)) => {
                probe.set_start_and_end(tree, first, 0, last, tree.length(last))?;
                self.contains_range(tree, &probe)
            }
            _ => self.contains_node_contents(tree, node),
        }
    }

    /// Same document and identical boundaries
    pub fn equals(&self, other: &DocumentRange) -> bool {
        self.document == other.document && self.start == other.start && self.end == other.end
    }

    // --- Lifecycle ---

    /// Independent copy of the boundaries under a fresh [`RangeId`].
    /// Listeners are not copied.
    pub fn clone_range(&self, tree: &DomTree) -> RangeResult<DocumentRange> {
        self.check(tree)?;
        Ok(Self::spanning(tree, self.start, self.end))
    }

    /// Copy that keeps this range's identity, used when a selection takes
    /// ownership of a caller's range
    pub(crate) fn retained_copy(&self) -> DocumentRange {
        Self {
            document: self.document,
            id: self.id,
            start: self.start,
            end: self.end,
            collapsed: self.collapsed,
            common_ancestor: self.common_ancestor,
            detached: false,
            listeners: Vec::new(),
            next_listener: 0,
        }
    }

    /// Invalidate the range. Every later operation fails with
    /// [`RangeError::InvalidState`].
    pub fn detach(&mut self) {
        if self.detached {
            return;
        }
        self.detached = true;
        tracing::debug!("Range {:?} detached", self.id);
        self.notify(RangeEvent::Detach);
        self.listeners.clear();
    }

    // --- Listeners ---

    /// Register a callback fired on every boundary change and on detach
    pub fn on_change<F>(&mut self, listener: F) -> ListenerId
    where
        F: FnMut(&RangeEvent) + 'static,
    {
        let id = ListenerId(self.next_listener);
        self.next_listener += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    /// Unregister a callback; `false` when it was not registered
    pub fn remove_listener(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(listener, _)| *listener != id);
        self.listeners.len() != before
    }

    fn notify(&mut self, event: RangeEvent) {
        for (_, listener) in self.listeners.iter_mut() {
            listener(&event);
        }
    }
}

impl fmt::Debug for DocumentRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DocumentRange")
            .field("id", &self.id)
            .field("start", &self.start)
            .field("end", &self.end)
            .field("collapsed", &self.collapsed)
            .field("common_ancestor", &self.common_ancestor)
            .field("detached", &self.detached)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

/// Validate `(node, offset)` as a boundary point
pub(crate) fn boundary_point(tree: &DomTree, node: NodeId, offset: usize) -> RangeResult<Position> {
    match tree.node_type(node) {
        None => return Err(RangeError::NotFound("boundary node is not part of the tree")),
        Some(NodeType::DocumentType) => return Err(RangeError::InvalidNodeType),
        Some(_) => {}
    }
    let length = tree.length(node);
    if offset > length {
        return Err(RangeError::IndexSize { offset, length });
    }
    Ok(Position::new(node, offset))
}

/// Both points are valid, share a root, and `a` is not after `b`
pub(crate) fn ordered(tree: &DomTree, a: Position, b: Position) -> bool {
    a.is_valid_in(tree)
        && b.is_valid_in(tree)
        && tree.root_of(a.container()) == tree.root_of(b.container())
        && matches!(
            compare_positions(tree, a, b),
            Ok(Ordering::Less | Ordering::Equal)
        )
}
