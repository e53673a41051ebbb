//! Boundary point comparison
//!
//! Total document order over positions: pre-order over nodes, then offset
//! within a shared container. Every range algorithm is built on
//! [`compare_points`].

use std::cmp::Ordering;

use fos_dom::{DomTree, NodeId};

use crate::{Position, RangeError, RangeResult};

/// Compare `(node_a, offset_a)` with `(node_b, offset_b)` in document order.
pub fn compare_points(
    tree: &DomTree,
    node_a: NodeId,
    offset_a: usize,
    node_b: NodeId,
    offset_b: usize,
) -> RangeResult<Ordering> {
    if !tree.contains(node_a) || !tree.contains(node_b) {
        return Err(RangeError::NotFound("boundary container is not part of the tree"));
    }

    if node_a == node_b {
        return Ok(offset_a.cmp(&offset_b));
    }

    // B lies inside A: compare A's offset with the index of B's branch
    if let Some(child) = tree.closest_ancestor_in(node_b, node_a) {
        return Ok(if offset_a <= tree.index_of(child) {
            Ordering::Less
        } else {
            Ordering::Greater
        });
    }

    // A lies inside B
    if let Some(child) = tree.closest_ancestor_in(node_a, node_b) {
        return Ok(if tree.index_of(child) < offset_b {
            Ordering::Less
        } else {
            Ordering::Greater
        });
    }

    let root = tree
        .common_ancestor(node_a, node_b)
        .ok_or(RangeError::WrongDocument)?;
    let child_a = tree
        .closest_ancestor_in(node_a, root)
        .ok_or(RangeError::TreeStructure)?;
    let child_b = tree
        .closest_ancestor_in(node_b, root)
        .ok_or(RangeError::TreeStructure)?;
    if child_a == child_b {
        return Err(RangeError::TreeStructure);
    }

    for child in tree.children(root) {
        if child == child_a {
            return Ok(Ordering::Less);
        }
        if child == child_b {
            return Ok(Ordering::Greater);
        }
    }
    Err(RangeError::TreeStructure)
}

/// [`compare_points`] over two [`Position`]s
#[inline]
pub fn compare_positions(tree: &DomTree, a: Position, b: Position) -> RangeResult<Ordering> {
    compare_points(tree, a.container(), a.offset(), b.container(), b.offset())
}

/// Nearest inclusive ancestor shared by `a` and `b`
#[inline]
pub fn common_ancestor(tree: &DomTree, a: NodeId, b: NodeId) -> Option<NodeId> {
    tree.common_ancestor(a, b)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// <div><p>"Hello"</p><p>"world"</p></div>
    fn sample() -> (DomTree, NodeId, [NodeId; 2], [NodeId; 2]) {
        let mut tree = DomTree::new();
        let div = tree.create_element("div");
        tree.append_child(tree.root(), div).unwrap();
        let p1 = tree.create_element("p");
        let p2 = tree.create_element("p");
        let t1 = tree.create_text("Hello");
        let t2 = tree.create_text("world");
        tree.append_child(div, p1).unwrap();
        tree.append_child(div, p2).unwrap();
        tree.append_child(p1, t1).unwrap();
        tree.append_child(p2, t2).unwrap();
        (tree, div, [p1, p2], [t1, t2])
    }

    #[test]
    fn test_same_container() {
        let (tree, _, _, [t1, _]) = sample();
        assert_eq!(compare_points(&tree, t1, 1, t1, 3).unwrap(), Ordering::Less);
        assert_eq!(compare_points(&tree, t1, 3, t1, 3).unwrap(), Ordering::Equal);
        assert_eq!(compare_points(&tree, t1, 4, t1, 3).unwrap(), Ordering::Greater);
    }

    #[test]
    fn test_descendant_against_interior_point() {
        let (tree, div, _, [t1, t2]) = sample();
        // (div, 0) is before everything in the first paragraph
        assert_eq!(compare_points(&tree, div, 0, t1, 0).unwrap(), Ordering::Less);
        // (div, 1) sits between the paragraphs
        assert_eq!(compare_points(&tree, div, 1, t1, 5).unwrap(), Ordering::Greater);
        assert_eq!(compare_points(&tree, div, 1, t2, 0).unwrap(), Ordering::Less);
        assert_eq!(compare_points(&tree, t2, 0, div, 1).unwrap(), Ordering::Greater);
        assert_eq!(compare_points(&tree, t1, 5, div, 1).unwrap(), Ordering::Less);
    }

    #[test]
    fn test_sibling_branches() {
        let (tree, _, _, [t1, t2]) = sample();
        assert_eq!(compare_points(&tree, t1, 5, t2, 0).unwrap(), Ordering::Less);
        assert_eq!(compare_points(&tree, t2, 0, t1, 5).unwrap(), Ordering::Greater);
    }

    #[test]
    fn test_order_is_antisymmetric() {
        let (tree, div, [p1, p2], [t1, t2]) = sample();
        let points = [
            (div, 0),
            (div, 1),
            (div, 2),
            (p1, 0),
            (p1, 1),
            (p2, 0),
            (p2, 1),
            (t1, 0),
            (t1, 3),
            (t1, 5),
            (t2, 0),
            (t2, 5),
        ];
        for &(na, oa) in &points {
            for &(nb, ob) in &points {
                let forward = compare_points(&tree, na, oa, nb, ob).unwrap();
                let backward = compare_points(&tree, nb, ob, na, oa).unwrap();
                assert_eq!(forward, backward.reverse(), "({na:?},{oa}) vs ({nb:?},{ob})");
            }
        }
    }

    #[test]
    fn test_disjoint_trees_are_wrong_document() {
        let (mut tree, _, _, [t1, _]) = sample();
        let loose = tree.create_text("detached");
        assert_eq!(
            compare_points(&tree, t1, 0, loose, 0),
            Err(RangeError::WrongDocument)
        );
    }
}
