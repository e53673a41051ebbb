//! Selection model
//!
//! [`SelectionModel`] mirrors a host selection as a list of
//! [`DocumentRange`]s plus anchor and focus. Every change is written through
//! the [`SelectionBackend`] chosen for the host, so the model and the host
//! agree on what is selected. Where the host cannot express something,
//! such as a backward range, the model follows what the host kept.

use fos_dom::{DocumentId, DomTree, NodeId};

use crate::backend::host_is_backward;
use crate::boundary::compare_positions;
use crate::range::{boundary_point, ordered};
use crate::{
    DocumentRange, HostCapabilities, HostRange, PlatformSelection, Position, RangeError,
    RangeResult, SelectionBackend,
};

/// A user selection: zero or more ranges with a direction
pub struct SelectionModel {
    document: DocumentId,
    capabilities: HostCapabilities,
    backend: Box<dyn SelectionBackend>,
    host: Box<dyn PlatformSelection>,
    ranges: Vec<DocumentRange>,
    anchor: Option<Position>,
    focus: Option<Position>,
    detached: bool,
}

impl SelectionModel {
    pub fn new(
        tree: &DomTree,
        capabilities: HostCapabilities,
        backend: Box<dyn SelectionBackend>,
        host: Box<dyn PlatformSelection>,
    ) -> Self {
        Self {
            document: tree.id(),
            capabilities,
            backend,
            host,
            ranges: Vec::new(),
            anchor: None,
            focus: None,
            detached: false,
        }
    }

    fn ensure_usable(&self, tree: &DomTree) -> RangeResult<()> {
        if self.detached {
            return Err(RangeError::InvalidState("selection is detached"));
        }
        if tree.id() != self.document {
            return Err(RangeError::WrongDocument);
        }
        Ok(())
    }

    // --- Reading ---

    pub fn range_count(&self) -> usize {
        self.ranges.len()
    }

    pub fn range_at(&self, index: usize) -> Option<&DocumentRange> {
        self.ranges.get(index)
    }

    pub fn ranges(&self) -> &[DocumentRange] {
        &self.ranges
    }

    pub fn anchor(&self) -> Option<Position> {
        self.anchor
    }

    pub fn focus(&self) -> Option<Position> {
        self.focus
    }

    pub fn capabilities(&self) -> &HostCapabilities {
        &self.capabilities
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    /// No ranges, or a single collapsed one
    pub fn is_collapsed(&self) -> bool {
        match self.ranges.as_slice() {
            [] => true,
            [only] => only.collapsed(),
            _ => false,
        }
    }

    /// Whether the focus precedes the anchor
    pub fn is_backwards(&self, tree: &DomTree) -> bool {
        match (self.anchor, self.focus) {
            (Some(anchor), Some(focus)) => {
                compare_positions(tree, anchor, focus).is_ok_and(|order| order.is_gt())
            }
            _ => false,
        }
    }

    /// Every range still valid and anchor/focus still inside the tree
    pub fn is_valid(&self, tree: &DomTree) -> bool {
        self.ensure_usable(tree).is_ok()
            && self.ranges.iter().all(|range| range.is_valid(tree))
            && self
                .anchor
                .into_iter()
                .chain(self.focus)
                .all(|point| point.is_valid_in(tree))
    }

    pub fn is_detached(&self) -> bool {
        self.detached
    }

    // --- Host synchronization ---

    /// Re-read the host selection. Ranges the tree no longer supports are
    /// dropped, and a single-range host never yields more than one.
    pub fn refresh(&mut self, tree: &DomTree) -> RangeResult<()> {
        self.ensure_usable(tree)?;
        let mut found: Vec<HostRange> = self
            .backend
            .read_ranges(self.host.as_ref(), tree)
            .into_iter()
            .filter(|range| ordered(tree, range.start, range.end))
            .collect();
        if !self.capabilities.multi_range && found.len() > 1 {
            tracing::debug!(
                "Single-range host reported {} ranges; keeping the last",
                found.len()
            );
            found.drain(..found.len() - 1);
        }

        self.ranges = found
            .iter()
            .map(|range| DocumentRange::spanning(tree, range.start, range.end))
            .collect();

        let host_points = match (self.host.anchor(), self.host.focus()) {
            (Some(anchor), Some(focus)) if anchor.is_valid_in(tree) && focus.is_valid_in(tree) => {
                Some((anchor, focus))
            }
            _ => None,
        };
        match (self.ranges.last(), host_points) {
            (None, _) => {
                self.anchor = None;
                self.focus = None;
            }
            (Some(_), Some((anchor, focus))) => {
                self.anchor = Some(anchor);
                self.focus = Some(focus);
            }
            (Some(last), None) => {
                self.anchor = Some(last.start());
                self.focus = Some(last.end());
            }
        }
        tracing::debug!(
            "Selection refreshed: {} range(s), backwards: {}",
            self.ranges.len(),
            host_is_backward(self.host.as_ref(), tree)
        );
        Ok(())
    }

    /// Write one range to the host. Returns whether the direction survived.
    fn push(&mut self, tree: &DomTree, range: HostRange, backward: bool) -> RangeResult<bool> {
        if range.start == range.end
            && !self.capabilities.collapsed_non_editable
            && !tree.is_editable(range.start.container())
        {
            tracing::debug!("Host refuses carets in non-editable content; caret kept in the model");
            return Ok(true);
        }
        self.backend
            .add_range(self.host.as_mut(), tree, range, backward)
    }

    /// Rewrite the host from the model's ranges, all forward
    fn resync(&mut self, tree: &DomTree) -> RangeResult<()> {
        self.host.remove_all_ranges();
        let bounds: Vec<HostRange> = self
            .ranges
            .iter()
            .map(|range| HostRange::new(range.start(), range.end()))
            .collect();
        for range in &bounds {
            self.push(tree, *range, false)?;
        }
        match bounds.last() {
            Some(last) => {
                self.anchor = Some(last.start);
                self.focus = Some(last.end);
            }
            None => {
                self.anchor = None;
                self.focus = None;
            }
        }
        Ok(())
    }

    fn set_direction(&mut self, start: Position, end: Position, backward: bool) {
        if backward {
            self.anchor = Some(end);
            self.focus = Some(start);
        } else {
            self.anchor = Some(start);
            self.focus = Some(end);
        }
    }

    /// Make `range` the only selected range
    fn replace_with(
        &mut self,
        tree: &DomTree,
        range: DocumentRange,
        backward: bool,
    ) -> RangeResult<()> {
        self.host.remove_all_ranges();
        self.ranges.clear();
        let (start, end) = (range.start(), range.end());
        let kept = self.push(tree, HostRange::new(start, end), backward)?;
        self.ranges.push(range);
        self.set_direction(start, end, backward && kept);
        Ok(())
    }

    // --- Editing ---

    /// Add `range` to the selection. A single-range host replaces the
    /// current range instead.
    pub fn add_range(
        &mut self,
        tree: &DomTree,
        range: &DocumentRange,
        backward: bool,
    ) -> RangeResult<()> {
        self.ensure_usable(tree)?;
        range.check(tree)?;
        if !self.capabilities.multi_range {
            return self.replace_with(tree, range.retained_copy(), backward && !range.collapsed());
        }

        let backward = backward && !range.collapsed();
        let (start, end) = (range.start(), range.end());
        let kept = self.push(tree, HostRange::new(start, end), backward)?;
        self.ranges.push(range.retained_copy());
        self.set_direction(start, end, backward && kept);
        Ok(())
    }

    /// Remove the range with the same identity as `range`. Returns `false`,
    /// changing nothing, when it is not part of the selection.
    pub fn remove_range(&mut self, tree: &DomTree, range: &DocumentRange) -> RangeResult<bool> {
        self.ensure_usable(tree)?;
        let Some(index) = self.ranges.iter().position(|r| r.id() == range.id()) else {
            return Ok(false);
        };
        self.ranges.remove(index);
        self.resync(tree)?;
        Ok(true)
    }

    pub fn remove_all_ranges(&mut self) {
        if self.detached {
            return;
        }
        self.host.remove_all_ranges();
        self.ranges.clear();
        self.anchor = None;
        self.focus = None;
    }

    /// Replace the selection with `range`
    pub fn set_single_range(
        &mut self,
        tree: &DomTree,
        range: &DocumentRange,
        backward: bool,
    ) -> RangeResult<()> {
        self.ensure_usable(tree)?;
        range.check(tree)?;
        self.replace_with(tree, range.retained_copy(), backward && !range.collapsed())
    }

    /// Replace the selection with `ranges`, all forward
    pub fn set_ranges(&mut self, tree: &DomTree, ranges: &[&DocumentRange]) -> RangeResult<()> {
        self.ensure_usable(tree)?;
        for range in ranges {
            range.check(tree)?;
        }
        self.remove_all_ranges();
        for range in ranges {
            self.add_range(tree, range, false)?;
        }
        Ok(())
    }

    /// Place a caret at `(node, offset)`
    pub fn collapse(&mut self, tree: &DomTree, node: NodeId, offset: usize) -> RangeResult<()> {
        self.ensure_usable(tree)?;
        let point = boundary_point(tree, node, offset)?;
        self.replace_with(tree, DocumentRange::spanning(tree, point, point), false)
    }

    /// Collapse onto the start of the first range
    pub fn collapse_to_start(&mut self, tree: &DomTree) -> RangeResult<()> {
        self.ensure_usable(tree)?;
        let point = self
            .ranges
            .first()
            .map(DocumentRange::start)
            .ok_or(RangeError::InvalidState("selection has no ranges"))?;
        self.collapse(tree, point.container(), point.offset())
    }

    /// Collapse onto the end of the last range
    pub fn collapse_to_end(&mut self, tree: &DomTree) -> RangeResult<()> {
        self.ensure_usable(tree)?;
        let point = self
            .ranges
            .last()
            .map(DocumentRange::end)
            .ok_or(RangeError::InvalidState("selection has no ranges"))?;
        self.collapse(tree, point.container(), point.offset())
    }

    /// Select every child of `node`
    pub fn select_all_children(&mut self, tree: &DomTree, node: NodeId) -> RangeResult<()> {
        self.ensure_usable(tree)?;
        let mut range = DocumentRange::new(tree);
        range.select_node_contents(tree, node)?;
        self.replace_with(tree, range, false)
    }

    /// Move the focus to `(node, offset)`, keeping the anchor
    pub fn extend(&mut self, tree: &DomTree, node: NodeId, offset: usize) -> RangeResult<()> {
        self.ensure_usable(tree)?;
        let anchor = self
            .anchor
            .ok_or(RangeError::InvalidState("selection has no ranges"))?;
        let focus = boundary_point(tree, node, offset)?;
        if !ordered(tree, anchor, anchor) || tree.root_of(anchor.container()) != tree.root_of(node) {
            return self.collapse(tree, node, offset);
        }
        let backward = compare_positions(tree, anchor, focus)?.is_gt();
        let range = if backward {
            DocumentRange::spanning(tree, focus, anchor)
        } else {
            DocumentRange::spanning(tree, anchor, focus)
        };
        self.replace_with(tree, range, backward)
    }

    /// Delete the contents of every range, then collapse onto what is left
    /// of the last one
    pub fn delete_from_document(&mut self, tree: &mut DomTree) -> RangeResult<()> {
        self.ensure_usable(tree)?;
        if self.ranges.is_empty() {
            return Ok(());
        }
        for range in &self.ranges {
            range.check(tree)?;
        }

        let mut ranges = std::mem::take(&mut self.ranges);
        let mut bounds: Vec<Position> = ranges
            .iter()
            .flat_map(|range| [range.start(), range.end()])
            .collect();
        for (index, range) in ranges.iter_mut().enumerate() {
            let (start, end) = (bounds[2 * index], bounds[2 * index + 1]);
            if range.start() != start || range.end() != end {
                range.set_bounds(tree, start, end);
            }
            let mut others: Vec<Position> = bounds
                .iter()
                .enumerate()
                .filter(|(i, _)| i / 2 != index)
                .map(|(_, point)| *point)
                .collect();
            range.delete_contents_preserving(tree, &mut others)?;

            let mut rest = others.into_iter();
            for (i, point) in bounds.iter_mut().enumerate() {
                if i / 2 == index {
                    *point = range.start();
                } else if let Some(moved) = rest.next() {
                    *point = moved;
                }
            }
        }

        let Some(last) = ranges.pop() else {
            return Ok(());
        };
        tracing::debug!("Deleted the contents of {} range(s)", ranges.len() + 1);
        self.replace_with(tree, last, false)
    }

    // --- Queries ---

    /// Whether any range contains `node`
    pub fn contains_node(
        &self,
        tree: &DomTree,
        node: NodeId,
        allow_partial: bool,
    ) -> RangeResult<bool> {
        self.ensure_usable(tree)?;
        for range in &self.ranges {
            if range.contains_node(tree, node, allow_partial)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Text of every range, concatenated in selection order
    pub fn text(&self, tree: &DomTree) -> RangeResult<String> {
        self.ensure_usable(tree)?;
        let mut text = String::new();
        for range in &self.ranges {
            text.push_str(&range.text(tree)?);
        }
        Ok(text)
    }

    /// Release the ranges. Every later operation fails with
    /// [`RangeError::InvalidState`].
    pub fn detach(&mut self) {
        if self.detached {
            return;
        }
        for range in &mut self.ranges {
            range.detach();
        }
        self.ranges.clear();
        self.anchor = None;
        self.focus = None;
        self.detached = true;
    }
}

impl std::fmt::Debug for SelectionModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SelectionModel")
            .field("backend", &self.backend.name())
            .field("ranges", &self.ranges)
            .field("anchor", &self.anchor)
            .field("focus", &self.focus)
            .field("detached", &self.detached)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::HostSelection;
    use crate::backend::backend_for;

    /// <p>"Hello "<b>"big"</b>" world"</p>
    fn sample() -> (DomTree, NodeId, [NodeId; 3]) {
        let mut tree = DomTree::new();
        let p = tree.create_element("p");
        tree.append_child(tree.root(), p).unwrap();
        let hello = tree.create_text("Hello ");
        let b = tree.create_element("b");
        let big = tree.create_text("big");
        let world = tree.create_text(" world");
        tree.append_child(p, hello).unwrap();
        tree.append_child(p, b).unwrap();
        tree.append_child(b, big).unwrap();
        tree.append_child(p, world).unwrap();
        (tree, p, [hello, big, world])
    }

    fn model(tree: &DomTree, caps: HostCapabilities) -> SelectionModel {
        SelectionModel::new(
            tree,
            caps,
            backend_for(&caps),
            Box::new(HostSelection::new(caps)),
        )
    }

    fn range(tree: &DomTree, a: NodeId, ao: usize, b: NodeId, bo: usize) -> DocumentRange {
        let mut range = DocumentRange::new(tree);
        range.set_start_and_end(tree, a, ao, b, bo).unwrap();
        range
    }

    #[test]
    fn test_add_and_remove_by_identity() {
        let (tree, _, [hello, _, world]) = sample();
        let mut selection = model(&tree, HostCapabilities::full());
        let first = range(&tree, hello, 0, hello, 2);
        let second = range(&tree, world, 1, world, 3);
        selection.add_range(&tree, &first, false).unwrap();
        selection.add_range(&tree, &second, false).unwrap();
        assert_eq!(selection.range_count(), 2);

        let lookalike = range(&tree, hello, 0, hello, 2);
        assert!(!selection.remove_range(&tree, &lookalike).unwrap());
        assert_eq!(selection.range_count(), 2);

        assert!(selection.remove_range(&tree, &first).unwrap());
        assert_eq!(selection.range_count(), 1);
        assert_eq!(selection.range_at(0).unwrap().id(), second.id());
        assert_eq!(selection.anchor(), Some(Position::new(world, 1)));
    }

    #[test]
    fn test_backward_range_sets_anchor_at_end() {
        let (tree, _, [hello, _, world]) = sample();
        let mut selection = model(&tree, HostCapabilities::full());
        let r = range(&tree, hello, 1, world, 2);
        selection.add_range(&tree, &r, true).unwrap();

        assert!(selection.is_backwards(&tree));
        assert_eq!(selection.anchor(), Some(Position::new(world, 2)));
        assert_eq!(selection.focus(), Some(Position::new(hello, 1)));

        selection.refresh(&tree).unwrap();
        assert!(selection.is_backwards(&tree));
        assert_eq!(selection.range_at(0).unwrap().start(), Position::new(hello, 1));
    }

    #[test]
    fn test_backward_lost_without_extend() {
        let (tree, _, [hello, _, world]) = sample();
        let caps = HostCapabilities {
            extend: false,
            ..HostCapabilities::full()
        };
        let mut selection = model(&tree, caps);
        selection
            .add_range(&tree, &range(&tree, hello, 1, world, 2), true)
            .unwrap();
        assert!(!selection.is_backwards(&tree));
    }

    #[test]
    fn test_collapse_to_start_requires_ranges() {
        let (tree, _, [hello, _, world]) = sample();
        let mut selection = model(&tree, HostCapabilities::full());
        assert_eq!(
            selection.collapse_to_start(&tree).unwrap_err(),
            RangeError::InvalidState("selection has no ranges")
        );

        selection
            .add_range(&tree, &range(&tree, hello, 2, world, 3), false)
            .unwrap();
        selection.collapse_to_end(&tree).unwrap();
        assert!(selection.is_collapsed());
        assert_eq!(selection.focus(), Some(Position::new(world, 3)));
    }

    #[test]
    fn test_extend_keeps_anchor() {
        let (tree, _, [hello, big, _]) = sample();
        let mut selection = model(&tree, HostCapabilities::full());
        selection.collapse(&tree, big, 2).unwrap();
        selection.extend(&tree, hello, 1).unwrap();

        assert_eq!(selection.anchor(), Some(Position::new(big, 2)));
        assert!(selection.is_backwards(&tree));
        assert_eq!(selection.text(&tree).unwrap(), "ello bi");
    }

    #[test]
    fn test_select_all_children() {
        let (tree, p, _) = sample();
        let mut selection = model(&tree, HostCapabilities::full());
        selection.select_all_children(&tree, p).unwrap();
        assert_eq!(selection.text(&tree).unwrap(), "Hello big world");
        assert!(selection.contains_node(&tree, p, true).unwrap());
    }

    #[test]
    fn test_delete_from_document_keeps_other_ranges() {
        let (mut tree, p, [hello, _, world]) = sample();
        let mut selection = model(&tree, HostCapabilities::full());
        let first = range(&tree, hello, 0, hello, 2);
        let second = range(&tree, world, 1, world, 3);
        selection.add_range(&tree, &first, false).unwrap();
        selection.add_range(&tree, &second, false).unwrap();

        selection.delete_from_document(&mut tree).unwrap();

        assert_eq!(tree.text_content(p), "llo big rld");
        assert_eq!(selection.range_count(), 1);
        assert!(selection.is_collapsed());
        assert_eq!(selection.focus(), Some(Position::new(world, 1)));
    }

    #[test]
    fn test_caret_not_pushed_to_static_content() {
        let (tree, _, [hello, _, _]) = sample();
        let caps = HostCapabilities {
            collapsed_non_editable: false,
            ..HostCapabilities::full()
        };
        let mut selection = model(&tree, caps);
        selection.collapse(&tree, hello, 1).unwrap();
        assert_eq!(selection.range_count(), 1);

        // The host never saw the caret
        selection.refresh(&tree).unwrap();
        assert_eq!(selection.range_count(), 0);
    }

    #[test]
    fn test_detached_selection_rejects_operations() {
        let (tree, _, [hello, _, _]) = sample();
        let mut selection = model(&tree, HostCapabilities::full());
        selection.collapse(&tree, hello, 1).unwrap();
        selection.detach();
        assert!(selection.is_detached());
        assert!(matches!(
            selection.collapse(&tree, hello, 0),
            Err(RangeError::InvalidState(_))
        ));
    }
}
