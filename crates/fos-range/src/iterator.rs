//! Range traversal
//!
//! A [`RangeTreeIterator`] walks the top-level nodes a range touches: the
//! children of the range's common ancestor from the one holding the start
//! boundary to the one holding the end boundary. Nodes that contain a
//! boundary are only partially selected; callers recurse into them with
//! [`RangeTreeIterator::get_subtree_iterator`], which yields the same walk
//! one level down. `next` itself never descends: it stays on one sibling
//! level. [`iterate_subtree`] is the full pre-order walk, recursing into
//! every partially selected node in document order.
//!
//! The iterator holds node ids only. Removal is checked against the
//! cursor: only the node returned by the last `next` can be removed, and
//! only once. The following node is computed before removal so the walk
//! survives it.

use fos_dom::{DomTree, NodeId};

use crate::{DocumentRange, Position, RangeError, RangeResult, mutation};

/// Stateful walk over the nodes a range selects
#[derive(Debug, Clone)]
pub struct RangeTreeIterator {
    start: Position,
    end: Position,
    first: Option<NodeId>,
    last: Option<NodeId>,
    next: Option<NodeId>,
    current: Option<NodeId>,
    single_character_data: bool,
    current_removed: bool,
    detached: bool,
}

impl RangeTreeIterator {
    /// Iterate over the nodes selected by `range`
    pub fn new(tree: &DomTree, range: &DocumentRange) -> RangeResult<Self> {
        range.check(tree)?;
        Ok(Self::over(tree, range.start(), range.end()))
    }

    /// Iterator over boundaries that are known to be valid and ordered
    pub(crate) fn over(tree: &DomTree, start: Position, end: Position) -> Self {
        let mut iter = Self {
            start,
            end,
            first: None,
            last: None,
            next: None,
            current: None,
            single_character_data: false,
            current_removed: false,
            detached: false,
        };
        if start == end {
            return iter;
        }

        let (sc, so) = (start.container(), start.offset());
        let (ec, eo) = (end.container(), end.offset());
        if sc == ec && tree.is_character_data(sc) {
            // The whole selection is a run of characters in one node
            iter.single_character_data = true;
            iter.first = Some(sc);
            iter.last = Some(sc);
        } else {
            let root = tree.common_ancestor(sc, ec).unwrap_or(sc);
            iter.first = if sc == root && !tree.is_character_data(sc) {
                tree.child_at(sc, so)
            } else {
                tree.closest_ancestor_in(sc, root)
            };
            iter.last = if ec == root && !tree.is_character_data(ec) {
                eo.checked_sub(1).and_then(|index| tree.child_at(ec, index))
            } else {
                tree.closest_ancestor_in(ec, root)
            };
        }
        iter.next = iter.first;
        iter
    }

    /// Move to the next top-level node and return it
    pub fn next(&mut self, tree: &DomTree) -> Option<NodeId> {
        if self.detached {
            return None;
        }
        self.current = self.next;
        self.current_removed = false;
        let current = self.current?;
        self.next = if Some(current) != self.last {
            tree.next_sibling(current)
        } else {
            None
        };
        Some(current)
    }

    pub fn has_next(&self) -> bool {
        !self.detached && self.next.is_some()
    }

    /// Node returned by the last call to [`Self::next`]
    pub fn current(&self) -> Option<NodeId> {
        self.current
    }

    /// Selected character span of the current node when it holds
    /// character data
    pub fn selected_span(&self, tree: &DomTree) -> Option<(usize, usize)> {
        let current = self.current?;
        if !tree.is_character_data(current) {
            return None;
        }
        let start = if current == self.start.container() {
            self.start.offset()
        } else {
            0
        };
        let end = if current == self.end.container() {
            self.end.offset()
        } else {
            tree.length(current)
        };
        Some((start, end.max(start)))
    }

    /// Whether the current node holds character data cut by a boundary
    pub(crate) fn current_is_boundary_data(&self, tree: &DomTree) -> bool {
        self.current.is_some_and(|current| {
            tree.is_character_data(current)
                && (current == self.start.container() || current == self.end.container())
        })
    }

    /// True when the current node is structural and holds a boundary, so
    /// only part of its subtree is selected
    pub fn is_partially_selected_subtree(&self, tree: &DomTree) -> bool {
        self.current
            .is_some_and(|current| self.contains_boundary(tree, current))
    }

    fn contains_boundary(&self, tree: &DomTree, node: NodeId) -> bool {
        !tree.is_character_data(node)
            && (tree.is_inclusive_ancestor_of(node, self.start.container())
                || tree.is_inclusive_ancestor_of(node, self.end.container()))
    }

    /// Whether the first or last top-level node is only partially selected
    pub(crate) fn cuts_structure(&self, tree: &DomTree) -> bool {
        self.first.is_some_and(|node| self.contains_boundary(tree, node))
            || self.last.is_some_and(|node| self.contains_boundary(tree, node))
    }

    /// Iterator over the selected part of the current node's subtree
    pub fn get_subtree_iterator(&self, tree: &DomTree) -> RangeResult<RangeTreeIterator> {
        if self.detached {
            return Err(RangeError::InvalidState("iterator is detached"));
        }
        let current = self
            .current
            .ok_or(RangeError::InvalidState("iterator has no current node"))?;
        if self.single_character_data {
            return Ok(Self::over(tree, self.end, self.end));
        }

        let mut start = Position::new(current, 0);
        let mut end = Position::new(current, tree.length(current));
        if tree.is_inclusive_ancestor_of(current, self.start.container()) {
            start = self.start;
        }
        if tree.is_inclusive_ancestor_of(current, self.end.container()) {
            end = self.end;
        }
        Ok(Self::over(tree, start, end))
    }

    /// Remove the current node. Character data cut by a boundary only
    /// loses its selected characters.
    pub fn remove(&mut self, tree: &mut DomTree) -> RangeResult<()> {
        self.remove_preserving(tree, &mut [])
    }

    /// [`Self::remove`], keeping the supplied positions valid
    pub fn remove_preserving(
        &mut self,
        tree: &mut DomTree,
        keep: &mut [Position],
    ) -> RangeResult<()> {
        if self.detached {
            return Err(RangeError::InvalidState("iterator is detached"));
        }
        let current = self
            .current
            .ok_or(RangeError::InvalidState("iterator has no current node"))?;
        if self.current_removed {
            return Err(RangeError::InvalidState("current node was already removed"));
        }

        if self.current_is_boundary_data(tree) {
            if let Some((start, end)) = self.selected_span(tree) {
                if start != end {
                    mutation::delete_data(tree, current, start, end - start, keep)?;
                }
            }
        } else {
            mutation::remove_node(tree, current, keep);
        }
        self.current_removed = true;
        Ok(())
    }

    /// Release the iterator; `next` returns `None` afterwards
    pub fn detach(&mut self) {
        self.first = None;
        self.last = None;
        self.next = None;
        self.current = None;
        self.detached = true;
    }
}

/// Visit every node selected by `iter` in document order.
///
/// Partially selected containers are visited before their selected
/// descendants. Character data returned by the iterator carries its
/// selected span; nodes reached below a wholly selected node get `None`
/// and are selected entirely. Returns `false` when `visit` stopped the
/// walk.
pub fn iterate_subtree<F>(
    tree: &DomTree,
    iter: &mut RangeTreeIterator,
    visit: &mut F,
) -> RangeResult<bool>
where
    F: FnMut(NodeId, Option<(usize, usize)>) -> bool,
{
    while let Some(node) = iter.next(tree) {
        if iter.is_partially_selected_subtree(tree) {
            if !visit(node, None) {
                return Ok(false);
            }
            let mut sub = iter.get_subtree_iterator(tree)?;
            let finished = iterate_subtree(tree, &mut sub, visit)?;
            sub.detach();
            if !finished {
                return Ok(false);
            }
        } else {
            if !visit(node, iter.selected_span(tree)) {
                return Ok(false);
            }
            for descendant in tree.descendants(node) {
                if !visit(descendant, None) {
                    return Ok(false);
                }
            }
        }
    }
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// <div><p>"One"</p><p>"Two"<b>"Three"</b></p><p>"Four"</p></div>
    fn sample() -> (DomTree, NodeId, Vec<NodeId>) {
        let mut tree = DomTree::new();
        let div = tree.create_element("div");
        tree.append_child(tree.root(), div).unwrap();
        let mut texts = Vec::new();
        for words in [&["One"][..], &["Two", "Three"], &["Four"]] {
            let p = tree.create_element("p");
            tree.append_child(div, p).unwrap();
            for (i, word) in words.iter().enumerate() {
                let text = tree.create_text(word);
                if i == 0 {
                    tree.append_child(p, text).unwrap();
                } else {
                    let b = tree.create_element("b");
                    tree.append_child(p, b).unwrap();
                    tree.append_child(b, text).unwrap();
                }
                texts.push(text);
            }
        }
        (tree, div, texts)
    }

    #[test]
    fn test_top_level_walk() {
        let (tree, div, texts) = sample();
        let mut iter = RangeTreeIterator::over(
            &tree,
            Position::new(texts[0], 1),
            Position::new(texts[3], 2),
        );
        let mut seen = Vec::new();
        while let Some(node) = iter.next(&tree) {
            seen.push(node);
        }
        let paragraphs: Vec<NodeId> = tree.children(div).collect();
        assert_eq!(seen, paragraphs);
    }

    #[test]
    fn test_single_character_data_node() {
        let (tree, _, texts) = sample();
        let mut iter = RangeTreeIterator::over(
            &tree,
            Position::new(texts[2], 1),
            Position::new(texts[2], 4),
        );
        assert_eq!(iter.next(&tree), Some(texts[2]));
        assert_eq!(iter.selected_span(&tree), Some((1, 4)));
        assert!(!iter.is_partially_selected_subtree(&tree));

        // Nothing below a single run of characters
        let mut sub = iter.get_subtree_iterator(&tree).unwrap();
        assert_eq!(sub.next(&tree), None);

        assert_eq!(iter.next(&tree), None);
        assert!(iter.get_subtree_iterator(&tree).is_err());
    }

    #[test]
    fn test_partial_subtree_recursion() {
        let (tree, _, texts) = sample();
        let mut iter = RangeTreeIterator::over(
            &tree,
            Position::new(texts[0], 1),
            Position::new(texts[3], 2),
        );
        let first = iter.next(&tree).unwrap();
        assert!(iter.is_partially_selected_subtree(&tree));

        let mut sub = iter.get_subtree_iterator(&tree).unwrap();
        assert_eq!(sub.next(&tree), Some(texts[0]));
        assert_eq!(sub.selected_span(&tree), Some((1, 3)));
        assert_eq!(sub.next(&tree), None);
        assert_eq!(tree.parent(texts[0]), Some(first));

        // Middle paragraph is wholly selected
        iter.next(&tree).unwrap();
        assert!(!iter.is_partially_selected_subtree(&tree));
    }

    #[test]
    fn test_iterate_subtree_collects_trimmed_text() {
        let (tree, _, texts) = sample();
        let mut iter = RangeTreeIterator::over(
            &tree,
            Position::new(texts[0], 1),
            Position::new(texts[3], 2),
        );
        let mut text = String::new();
        let finished = iterate_subtree(&tree, &mut iter, &mut |node, span| {
            if let Some(data) = tree.data(node) {
                let (start, end) = span.unwrap_or((0, fos_dom::char_len(data)));
                text.push_str(fos_dom::char_slice(data, start, end));
            }
            true
        })
        .unwrap();

        assert!(finished);
        assert_eq!(text, "neTwoThreeFo");
    }

    #[test]
    fn test_remove_is_checked_against_cursor() {
        let (mut tree, div, texts) = sample();
        let mut iter = RangeTreeIterator::over(&tree, Position::new(div, 1), Position::new(div, 3));

        assert_eq!(
            iter.remove(&mut tree),
            Err(RangeError::InvalidState("iterator has no current node"))
        );

        let second = iter.next(&tree).unwrap();
        iter.remove(&mut tree).unwrap();
        assert_eq!(
            iter.remove(&mut tree),
            Err(RangeError::InvalidState("current node was already removed"))
        );
        assert_eq!(tree.parent(second), None);

        // The walk continues past the removed node
        let third = iter.next(&tree).unwrap();
        assert_eq!(tree.first_child(third), Some(texts[3]));
        iter.remove(&mut tree).unwrap();
        assert_eq!(iter.next(&tree), None);
        assert_eq!(tree.child_count(div), 1);
    }

    #[test]
    fn test_remove_boundary_text_deletes_span() {
        let (mut tree, _, texts) = sample();
        let mut iter = RangeTreeIterator::over(
            &tree,
            Position::new(texts[2], 1),
            Position::new(texts[2], 4),
        );
        iter.next(&tree).unwrap();
        iter.remove(&mut tree).unwrap();
        assert_eq!(tree.data(texts[2]), Some("Te"));
    }

    #[test]
    fn test_detached_iterator_stops() {
        let (tree, div, _) = sample();
        let mut iter = RangeTreeIterator::over(&tree, Position::new(div, 0), Position::new(div, 3));
        assert!(iter.has_next());
        iter.detach();
        assert!(!iter.has_next());
        assert_eq!(iter.next(&tree), None);
    }
}
