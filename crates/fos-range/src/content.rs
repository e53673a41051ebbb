//! Range content operations
//!
//! Cloning, extraction and deletion walk the selection with a
//! [`RangeTreeIterator`], recursing into partially selected containers.
//! Fragments are created in the same arena as the source nodes.

use fos_dom::{DomTree, NodeId, NodeType, WhatToShow, char_slice};

use crate::iterator::iterate_subtree;
use crate::range::ordered;
use crate::{DocumentRange, Position, RangeError, RangeResult, RangeTreeIterator, mutation};

impl DocumentRange {
    /// Concatenated text of the Text/CDATA nodes inside the range, with
    /// boundary nodes trimmed to their selected characters
    pub fn text(&self, tree: &DomTree) -> RangeResult<String> {
        self.check(tree)?;
        let (start, end) = (self.start(), self.end());
        if start.container() == end.container() && tree.is_text(start.container()) {
            let data = tree.data(start.container()).unwrap_or_default();
            return Ok(char_slice(data, start.offset(), end.offset()).to_string());
        }

        let mut text = String::new();
        let mut iter = RangeTreeIterator::over(tree, start, end);
        iterate_subtree(tree, &mut iter, &mut |node, span| {
            if tree.is_text(node) {
                if let Some(data) = tree.data(node) {
                    match span {
                        Some((from, to)) => text.push_str(char_slice(data, from, to)),
                        None => text.push_str(data),
                    }
                }
            }
            true
        })?;
        iter.detach();
        Ok(text)
    }

    /// Nodes inside the range in document order, including partially
    /// selected containers, restricted to `what_to_show` and `filter`
    pub fn get_nodes<F>(
        &self,
        tree: &DomTree,
        what_to_show: WhatToShow,
        mut filter: F,
    ) -> RangeResult<Vec<NodeId>>
    where
        F: FnMut(NodeId) -> bool,
    {
        self.check(tree)?;
        let mut nodes = Vec::new();
        let mut iter = RangeTreeIterator::over(tree, self.start(), self.end());
        iterate_subtree(tree, &mut iter, &mut |node, _| {
            if tree
                .node_type(node)
                .is_some_and(|node_type| what_to_show.includes(node_type))
                && filter(node)
            {
                nodes.push(node);
            }
            true
        })?;
        iter.detach();
        Ok(nodes)
    }

    /// Copy the selected content into a new fragment, leaving the tree
    /// untouched
    pub fn clone_contents(&self, tree: &mut DomTree) -> RangeResult<NodeId> {
        self.check(tree)?;
        let fragment = tree.create_fragment();
        if self.collapsed() {
            return Ok(fragment);
        }

        let (start, end) = (self.start(), self.end());
        if start.container() == end.container() && tree.is_character_data(start.container()) {
            let copy = clone_span(tree, start.container(), start.offset(), end.offset())?;
            tree.append_child(fragment, copy)?;
            return Ok(fragment);
        }

        let mut iter = RangeTreeIterator::over(tree, start, end);
        clone_subtree(tree, &mut iter, fragment)?;
        iter.detach();
        Ok(fragment)
    }

    /// Move the selected content into a new fragment. The range collapses
    /// where the content used to start.
    pub fn extract_contents(&mut self, tree: &mut DomTree) -> RangeResult<NodeId> {
        let fragment = tree.create_fragment();
        self.remove_contents(tree, Some(fragment), &mut [])?;
        Ok(fragment)
    }

    /// Remove the selected content. The range collapses where the content
    /// used to start.
    pub fn delete_contents(&mut self, tree: &mut DomTree) -> RangeResult<()> {
        self.remove_contents(tree, None, &mut [])
    }

    /// [`Self::delete_contents`], keeping the supplied positions valid
    pub fn delete_contents_preserving(
        &mut self,
        tree: &mut DomTree,
        keep: &mut [Position],
    ) -> RangeResult<()> {
        self.remove_contents(tree, None, keep)
    }

    fn remove_contents(
        &mut self,
        tree: &mut DomTree,
        fragment: Option<NodeId>,
        keep: &mut [Position],
    ) -> RangeResult<()> {
        self.check(tree)?;
        let (start, end) = (self.start(), self.end());

        // The top-level node holding the start survives removal; collapse
        // right after it unless the start container is the common ancestor.
        let root = self.common_ancestor_container();
        let mut collapse_to = start;
        if start.container() != root {
            let top = tree
                .closest_ancestor_in(start.container(), root)
                .ok_or(RangeError::TreeStructure)?;
            collapse_to = Position::after(tree, top)?;
        }

        if !self.collapsed() {
            if fragment.is_some() {
                let mut scan = RangeTreeIterator::over(tree, start, end);
                let mut doctype = false;
                iterate_subtree(tree, &mut scan, &mut |node, _| {
                    doctype = tree.node_type(node) == Some(NodeType::DocumentType);
                    !doctype
                })?;
                if doctype {
                    return Err(RangeError::HierarchyRequest(
                        "a document type cannot be moved into a fragment",
                    ));
                }
            }

            let mut iter = RangeTreeIterator::over(tree, start, end);
            match fragment {
                Some(fragment) => extract_subtree(tree, &mut iter, fragment, keep)?,
                None => delete_subtree(tree, &mut iter, keep)?,
            }
            iter.detach();
        }

        self.set_bounds(tree, collapse_to, collapse_to);
        Ok(())
    }

    /// Insert `node` at the start of the range, splitting a text start
    /// container. The range then starts right before the inserted node.
    pub fn insert_node(&mut self, tree: &mut DomTree, node: NodeId) -> RangeResult<()> {
        self.check(tree)?;
        match tree.node_type(node) {
            None => return Err(RangeError::NotFound("node is not part of the tree")),
            Some(NodeType::Document) => {
                return Err(RangeError::HierarchyRequest("a document cannot be inserted"));
            }
            Some(_) => {}
        }
        if tree.is_inclusive_ancestor_of(node, self.start_container()) {
            return Err(RangeError::HierarchyRequest(
                "node is an ancestor of the range start",
            ));
        }

        let (first, last) = if tree.node_type(node) == Some(NodeType::DocumentFragment) {
            (tree.first_child(node), tree.last_child(node))
        } else {
            (Some(node), Some(node))
        };
        let (Some(first), Some(last)) = (first, last) else {
            return Ok(());
        };

        let was_collapsed = self.collapsed();
        let mut keep = [self.end()];
        insert_at(tree, node, self.start(), &mut keep)?;

        let start = Position::before(tree, first)?;
        let end = if was_collapsed {
            Position::after(tree, last)?
        } else if ordered(tree, start, keep[0]) {
            keep[0]
        } else {
            start
        };
        self.set_bounds(tree, start, end);
        Ok(())
    }

    /// Whether [`Self::surround_contents`] can wrap the range without
    /// cutting through a structural node
    pub fn can_surround_contents(&self, tree: &DomTree) -> RangeResult<bool> {
        self.check(tree)?;
        let iter = RangeTreeIterator::over(tree, self.start(), self.end());
        Ok(!iter.cuts_structure(tree))
    }

    /// Move the range's content into `new_parent` and put `new_parent` where
    /// the content was. The range ends up selecting `new_parent`.
    pub fn surround_contents(&mut self, tree: &mut DomTree, new_parent: NodeId) -> RangeResult<()> {
        self.check(tree)?;
        match tree.node_type(new_parent) {
            None => return Err(RangeError::NotFound("node is not part of the tree")),
            Some(NodeType::Element) => {}
            Some(_) => return Err(RangeError::InvalidNodeType),
        }
        if !self.can_surround_contents(tree)? {
            return Err(RangeError::BadBoundaryPoints);
        }

        let content = self.extract_contents(tree)?;
        let mut keep = [self.start()];
        while let Some(child) = tree.last_child(new_parent) {
            mutation::remove_node(tree, child, &mut keep);
        }
        insert_at(tree, new_parent, keep[0], &mut [])?;
        tree.append_child(new_parent, content)?;
        self.select_node(tree, new_parent)
    }

    /// Split text nodes cut by a boundary so both boundaries fall on node
    /// edges
    pub fn split_boundaries(&mut self, tree: &mut DomTree) -> RangeResult<()> {
        self.split_boundaries_preserving(tree, &mut [])
    }

    /// [`Self::split_boundaries`], keeping the supplied positions valid
    pub fn split_boundaries_preserving(
        &mut self,
        tree: &mut DomTree,
        keep: &mut [Position],
    ) -> RangeResult<()> {
        self.check(tree)?;
        let mut points = Vec::with_capacity(keep.len() + 2);
        points.push(self.start());
        points.push(self.end());
        points.extend_from_slice(keep);

        let end = points[1];
        if cuts_text(tree, end) {
            mutation::split_text(tree, end.container(), end.offset(), &mut points)?;
        }
        let start = points[0];
        if cuts_text(tree, start) {
            let tail = mutation::split_text(tree, start.container(), start.offset(), &mut points)?;
            points[0] = Position::new(tail, 0);
        }

        keep.copy_from_slice(&points[2..]);
        self.set_bounds(tree, points[0], points[1]);
        Ok(())
    }

    /// Merge character data adjacent to the boundaries back together,
    /// keeping the boundaries on the same characters
    pub fn normalize_boundaries(&mut self, tree: &mut DomTree) -> RangeResult<()> {
        self.check(tree)?;
        let collapsed = self.collapsed();
        let mut bounds = [self.start(), self.end()];
        let mut normalize_start = true;

        let end = bounds[1];
        let ec = end.container();
        if tree.is_character_data(ec) {
            if end.offset() == tree.length(ec) {
                if let Some(next) = same_kind_sibling(tree, ec, tree.next_sibling(ec)) {
                    mutation::merge_into_previous(tree, ec, next, &mut bounds)?;
                }
            } else if end.offset() == 0 {
                if let Some(prev) = same_kind_sibling(tree, ec, tree.prev_sibling(ec)) {
                    if bounds[0].container() == ec {
                        normalize_start = false;
                    }
                    mutation::merge_into_previous(tree, prev, ec, &mut bounds)?;
                }
            }
        } else {
            let before_end = end
                .offset()
                .checked_sub(1)
                .and_then(|index| tree.child_at(ec, index))
                .filter(|&node| tree.is_character_data(node));
            if let Some(node) = before_end {
                if let Some(next) = same_kind_sibling(tree, node, tree.next_sibling(node)) {
                    let length = tree.length(node);
                    mutation::merge_into_previous(tree, node, next, &mut bounds)?;
                    bounds[1] = Position::new(node, length);
                }
            }
            normalize_start = !collapsed;
        }

        if normalize_start {
            let start = bounds[0];
            let sc = start.container();
            if tree.is_character_data(sc) {
                if start.offset() == 0 {
                    if let Some(prev) = same_kind_sibling(tree, sc, tree.prev_sibling(sc)) {
                        mutation::merge_into_previous(tree, prev, sc, &mut bounds)?;
                    }
                } else if start.offset() == tree.length(sc) {
                    if let Some(next) = same_kind_sibling(tree, sc, tree.next_sibling(sc)) {
                        mutation::merge_into_previous(tree, sc, next, &mut bounds)?;
                    }
                }
            } else {
                let at_start = tree
                    .child_at(sc, start.offset())
                    .filter(|&node| tree.is_character_data(node));
                if let Some(node) = at_start {
                    if let Some(prev) = same_kind_sibling(tree, node, tree.prev_sibling(node)) {
                        let length = tree.length(prev);
                        mutation::merge_into_previous(tree, prev, node, &mut bounds)?;
                        bounds[0] = Position::new(prev, length);
                    }
                }
            }
        } else {
            bounds[0] = bounds[1];
        }

        self.set_bounds(tree, bounds[0], bounds[1]);
        Ok(())
    }
}

/// Detached copy of `node` holding only characters `start..end`
fn clone_span(tree: &mut DomTree, node: NodeId, start: usize, end: usize) -> RangeResult<NodeId> {
    let copy = tree.clone_node(node, false)?;
    let data = tree.substring_data(node, start, end.saturating_sub(start))?;
    tree.set_data(copy, &data)?;
    Ok(copy)
}

fn clone_subtree(tree: &mut DomTree, iter: &mut RangeTreeIterator, parent: NodeId) -> RangeResult<()> {
    while let Some(node) = iter.next(tree) {
        if tree.node_type(node) == Some(NodeType::DocumentType) {
            return Err(RangeError::HierarchyRequest(
                "a document type cannot be copied into a fragment",
            ));
        }
        let copy = if iter.is_partially_selected_subtree(tree) {
            let copy = tree.clone_node(node, false)?;
            let mut sub = iter.get_subtree_iterator(tree)?;
            clone_subtree(tree, &mut sub, copy)?;
            sub.detach();
            copy
        } else if let Some((start, end)) = iter.selected_span(tree) {
            clone_span(tree, node, start, end)?
        } else {
            tree.clone_node(node, true)?
        };
        tree.append_child(parent, copy)?;
    }
    Ok(())
}

fn extract_subtree(
    tree: &mut DomTree,
    iter: &mut RangeTreeIterator,
    parent: NodeId,
    keep: &mut [Position],
) -> RangeResult<()> {
    while let Some(node) = iter.next(tree) {
        let moved = if iter.is_partially_selected_subtree(tree) {
            let copy = tree.clone_node(node, false)?;
            let mut sub = iter.get_subtree_iterator(tree)?;
            extract_subtree(tree, &mut sub, copy, keep)?;
            sub.detach();
            copy
        } else if iter.current_is_boundary_data(tree) {
            let (start, end) = iter.selected_span(tree).unwrap_or((0, 0));
            let copy = clone_span(tree, node, start, end)?;
            iter.remove_preserving(tree, keep)?;
            copy
        } else {
            iter.remove_preserving(tree, keep)?;
            node
        };
        tree.append_child(parent, moved)?;
    }
    Ok(())
}

fn delete_subtree(
    tree: &mut DomTree,
    iter: &mut RangeTreeIterator,
    keep: &mut [Position],
) -> RangeResult<()> {
    while iter.next(tree).is_some() {
        if iter.is_partially_selected_subtree(tree) {
            let mut sub = iter.get_subtree_iterator(tree)?;
            delete_subtree(tree, &mut sub, keep)?;
            sub.detach();
        } else {
            iter.remove_preserving(tree, keep)?;
        }
    }
    Ok(())
}

/// Insert `node` at `at`, splitting character data when `at` falls inside it
pub(crate) fn insert_at(
    tree: &mut DomTree,
    node: NodeId,
    at: Position,
    keep: &mut [Position],
) -> RangeResult<()> {
    let container = at.container();
    if tree.is_character_data(container) {
        let parent = tree.parent(container).ok_or(RangeError::HierarchyRequest(
            "character data boundary has no parent",
        ))?;
        let reference = if at.offset() == tree.length(container) {
            tree.next_sibling(container)
        } else if at.offset() == 0 {
            Some(container)
        } else {
            Some(mutation::split_text(tree, container, at.offset(), keep)?)
        };
        mutation::insert_before(tree, parent, node, reference, keep)
    } else {
        let reference = tree.child_at(container, at.offset());
        mutation::insert_before(tree, container, node, reference, keep)
    }
}

/// Whether `point` falls strictly inside character data
fn cuts_text(tree: &DomTree, point: Position) -> bool {
    tree.is_character_data(point.container())
        && point.offset() > 0
        && point.offset() < tree.length(point.container())
}

/// `sibling` when it is character data of the same type as `node`
fn same_kind_sibling(tree: &DomTree, node: NodeId, sibling: Option<NodeId>) -> Option<NodeId> {
    sibling.filter(|&sibling| {
        tree.is_character_data(sibling) && tree.node_type(sibling) == tree.node_type(node)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    /// <div><p>"Hello "<b>"big"</b>" world"</p></div>
    fn sample() -> (DomTree, NodeId, NodeId, [NodeId; 3], NodeId) {
        let mut tree = DomTree::new();
        let div = tree.create_element("div");
        let p = tree.create_element("p");
        let b = tree.create_element("b");
        let t1 = tree.create_text("Hello ");
        let t2 = tree.create_text("big");
        let t3 = tree.create_text(" world");
        tree.append_child(tree.root(), div).unwrap();
        tree.append_child(div, p).unwrap();
        tree.append_child(p, t1).unwrap();
        tree.append_child(p, b).unwrap();
        tree.append_child(b, t2).unwrap();
        tree.append_child(p, t3).unwrap();
        (tree, div, p, [t1, t2, t3], b)
    }

    fn range(tree: &DomTree, sc: NodeId, so: usize, ec: NodeId, eo: usize) -> DocumentRange {
        let mut range = DocumentRange::new(tree);
        range.set_start_and_end(tree, sc, so, ec, eo).unwrap();
        range
    }

    #[test]
    fn test_text_across_elements() {
        let (tree, _, _, [t1, _, t3], _) = sample();
        let r = range(&tree, t1, 3, t3, 3);
        assert_eq!(r.text(&tree).unwrap(), "lo big wo");
    }

    #[test]
    fn test_clone_contents_keeps_source() {
        let (mut tree, _, p, [t1, _, t3], _) = sample();
        let r = range(&tree, t1, 3, t3, 3);
        let fragment = r.clone_contents(&mut tree).unwrap();

        assert_eq!(tree.text_content(fragment), "lo big wo");
        assert_eq!(tree.text_content(p), "Hello big world");
        assert_eq!(tree.child_count(fragment), 3);
    }

    #[test]
    fn test_extract_partial_structure() {
        let (mut tree, div, p, [t1, t2, _], _) = sample();
        let mut r = range(&tree, t1, 3, t2, 1);
        let fragment = r.extract_contents(&mut tree).unwrap();

        assert_eq!(tree.text_content(fragment), "lo b");
        assert_eq!(tree.text_content(div), "Helig world");
        // The start container is the common ancestor's first child
        assert_eq!(r.start(), Position::new(p, 1));
        assert!(r.collapsed());
    }

    #[test]
    fn test_delete_contents_whole_nodes() {
        let (mut tree, _, p, _, _) = sample();
        let mut r = range(&tree, p, 1, p, 3);
        r.delete_contents(&mut tree).unwrap();

        assert_eq!(tree.text_content(p), "Hello ");
        assert_eq!(r.start(), Position::new(p, 1));
    }

    #[test]
    fn test_delete_preserves_other_positions() {
        let (mut tree, _, _, [t1, _, t3], _) = sample();
        let mut r = range(&tree, t1, 1, t1, 4);
        let mut keep = [Position::new(t1, 5), Position::new(t3, 2)];
        r.delete_contents_preserving(&mut tree, &mut keep).unwrap();

        assert_eq!(tree.data(t1), Some("Ho "));
        assert_eq!(keep, [Position::new(t1, 2), Position::new(t3, 2)]);
    }

    #[test]
    fn test_insert_node_splits_text() {
        let (mut tree, _, p, [t1, _, _], _) = sample();
        let mut r = range(&tree, t1, 2, t1, 5);
        let img = tree.create_element("img");
        r.insert_node(&mut tree, img).unwrap();

        assert_eq!(tree.child_at(p, 1), Some(img));
        assert_eq!(r.start(), Position::new(p, 1));
        assert_eq!(tree.data(t1), Some("He"));
        assert_eq!(r.text(&tree).unwrap(), "llo");
    }

    #[test]
    fn test_insert_ancestor_is_rejected() {
        let (mut tree, _, p, [t1, _, _], _) = sample();
        let mut r = range(&tree, t1, 2, t1, 2);
        assert!(matches!(
            r.insert_node(&mut tree, p),
            Err(RangeError::HierarchyRequest(_))
        ));
    }

    #[test]
    fn test_surround_contents() {
        let (mut tree, _, p, [t1, _, t3], _) = sample();
        let mut r = range(&tree, t1, 0, t3, 6);
        assert!(r.can_surround_contents(&tree).unwrap());

        let span = tree.create_element("span");
        r.surround_contents(&mut tree, span).unwrap();

        assert_eq!(tree.parent(span), Some(p));
        assert_eq!(tree.text_content(span), "Hello big world");
        assert_eq!(r.start(), Position::before(&tree, span).unwrap());
        assert_eq!(r.end(), Position::after(&tree, span).unwrap());
    }

    #[test]
    fn test_surround_rejects_cut_structure() {
        let (mut tree, _, _, [t1, t2, _], _) = sample();
        let mut r = range(&tree, t1, 1, t2, 1);
        assert!(!r.can_surround_contents(&tree).unwrap());

        let span = tree.create_element("span");
        assert_eq!(
            r.surround_contents(&mut tree, span),
            Err(RangeError::BadBoundaryPoints)
        );
    }

    #[test]
    fn test_split_then_normalize_boundaries() {
        let (mut tree, _, p, [t1, _, _], _) = sample();
        let mut r = range(&tree, t1, 1, t1, 4);
        r.split_boundaries(&mut tree).unwrap();

        assert_eq!(tree.child_count(p), 5);
        assert_eq!(tree.data(r.start_container()), Some("ell"));
        assert_eq!(r.start_offset(), 0);
        assert_eq!(r.end(), Position::new(r.start_container(), 3));
        assert_eq!(r.text(&tree).unwrap(), "ell");

        r.normalize_boundaries(&mut tree).unwrap();
        assert_eq!(tree.child_count(p), 3);
        assert_eq!(r.text(&tree).unwrap(), "ell");
        assert_eq!(tree.data(r.start_container()), Some("Hello "));
    }

    /// <div>"ab""cd"<b/></div>
    fn adjacent_texts() -> (DomTree, NodeId, NodeId, NodeId) {
        let mut tree = DomTree::new();
        let div = tree.create_element("div");
        let ab = tree.create_text("ab");
        let cd = tree.create_text("cd");
        let b = tree.create_element("b");
        tree.append_child(tree.root(), div).unwrap();
        tree.append_child(div, ab).unwrap();
        tree.append_child(div, cd).unwrap();
        tree.append_child(div, b).unwrap();
        (tree, div, ab, cd)
    }

    #[test]
    fn test_normalize_with_start_between_texts() {
        let (mut tree, div, ab, cd) = adjacent_texts();
        let mut r = range(&tree, div, 1, cd, 0);
        r.normalize_boundaries(&mut tree).unwrap();

        assert_eq!(tree.data(ab), Some("abcd"));
        assert_eq!(r.start(), Position::new(ab, 2));
        assert_eq!(r.end(), Position::new(ab, 2));
        assert!(r.is_valid(&tree));
        assert_eq!(r.text(&tree).unwrap(), "");
    }

    #[test]
    fn test_normalize_collapsed_at_element_boundary() {
        let (mut tree, div, ab, _) = adjacent_texts();
        let mut r = range(&tree, div, 1, div, 1);
        r.normalize_boundaries(&mut tree).unwrap();

        assert_eq!(tree.child_count(div), 2);
        assert!(r.collapsed());
        assert_eq!(r.start(), Position::new(ab, 2));
        assert!(r.is_valid(&tree));
    }

    #[test]
    fn test_normalize_keeps_text_around_element_bounds() {
        let (mut tree, div, ab, _) = adjacent_texts();
        let mut r = range(&tree, div, 1, div, 3);
        r.normalize_boundaries(&mut tree).unwrap();

        assert_eq!(r.start(), Position::new(ab, 2));
        assert_eq!(r.end(), Position::new(div, 2));
        assert_eq!(r.text(&tree).unwrap(), "cd");
    }

    #[test]
    fn test_get_nodes_filters() {
        let (tree, _, p, [t1, t2, t3], b) = sample();
        let r = range(&tree, t1, 3, t3, 3);

        let texts = r.get_nodes(&tree, WhatToShow::TEXT, |_| true).unwrap();
        assert_eq!(texts, vec![t1, t2, t3]);

        let elements = r.get_nodes(&tree, WhatToShow::ELEMENT, |_| true).unwrap();
        assert_eq!(elements, vec![b]);

        let mut whole = DocumentRange::new(&tree);
        whole.select_node(&tree, p).unwrap();
        let long = whole
            .get_nodes(&tree, WhatToShow::TEXT, |node| tree.length(node) > 3)
            .unwrap();
        assert_eq!(long, vec![t1, t3]);
    }
}
