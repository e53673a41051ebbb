//! Tree mutations that keep caller-supplied positions valid
//!
//! Ranges are not live: the tree does not know about them. Range
//! operations that mutate the tree route through these helpers and pass
//! every position that must survive the edit, and each helper applies the
//! usual live-range adjustment rules to them.

use fos_dom::{DomTree, NodeId, NodeType};

use crate::{Position, RangeResult};

/// Delete `count` characters at `offset`; positions inside the deleted span
/// collapse to `offset`, later ones shift left.
pub(crate) fn delete_data(
    tree: &mut DomTree,
    node: NodeId,
    offset: usize,
    count: usize,
    keep: &mut [Position],
) -> RangeResult<()> {
    tree.delete_data(node, offset, count)?;
    for position in keep.iter_mut() {
        if position.container() != node || position.offset() <= offset {
            continue;
        }
        let shifted = if position.offset() <= offset + count {
            offset
        } else {
            position.offset() - count
        };
        *position = position.with_offset(shifted);
    }
    Ok(())
}

/// Split character data at `offset`. Positions past the split move into the
/// new node; positions in the parent after the original node shift right.
pub(crate) fn split_text(
    tree: &mut DomTree,
    node: NodeId,
    offset: usize,
    keep: &mut [Position],
) -> RangeResult<NodeId> {
    let parent = tree.parent(node);
    let index = tree.index_of(node);
    let new_node = tree.split_text(node, offset)?;
    for position in keep.iter_mut() {
        if position.container() == node && position.offset() > offset {
            *position = Position::new(new_node, position.offset() - offset);
        } else if Some(position.container()) == parent && position.offset() > index {
            *position = position.with_offset(position.offset() + 1);
        }
    }
    Ok(new_node)
}

/// Unlink `node`; positions inside it fall back to where it used to be.
pub(crate) fn remove_node(tree: &mut DomTree, node: NodeId, keep: &mut [Position]) {
    let Some(parent) = tree.parent(node) else {
        return;
    };
    let index = tree.index_of(node);
    for position in keep.iter_mut() {
        if tree.is_inclusive_ancestor_of(node, position.container()) {
            *position = Position::new(parent, index);
        } else if position.container() == parent && position.offset() > index {
            *position = position.with_offset(position.offset() - 1);
        }
    }
    tree.detach(node);
}

/// Insert `node` into `parent` before `reference`; positions in `parent`
/// after the insertion point shift by the number of inserted nodes.
pub(crate) fn insert_before(
    tree: &mut DomTree,
    parent: NodeId,
    node: NodeId,
    reference: Option<NodeId>,
    keep: &mut [Position],
) -> RangeResult<()> {
    let reference = if reference == Some(node) {
        tree.next_sibling(node)
    } else {
        reference
    };
    if tree.parent(node).is_some() {
        remove_node(tree, node, keep);
    }
    let count = if tree.node_type(node) == Some(NodeType::DocumentFragment) {
        tree.child_count(node)
    } else {
        1
    };
    let index = match reference {
        Some(reference) => tree.index_of(reference),
        None => tree.child_count(parent),
    };
    tree.insert_before(parent, node, reference)?;
    for position in keep.iter_mut() {
        if position.container() == parent && position.offset() > index {
            *position = position.with_offset(position.offset() + count);
        }
    }
    Ok(())
}

/// Append the data of `sibling` to `node` and unlink `sibling`, which must
/// directly follow it. Positions in `sibling`, or in the parent right
/// before it, are rebased onto `node`.
pub(crate) fn merge_into_previous(
    tree: &mut DomTree,
    node: NodeId,
    sibling: NodeId,
    keep: &mut [Position],
) -> RangeResult<()> {
    let base = tree.length(node);
    let parent = tree.parent(sibling);
    let index = tree.index_of(sibling);
    let tail = tree.data(sibling).unwrap_or_default().to_string();
    tree.append_data(node, &tail)?;
    for position in keep.iter_mut() {
        if position.container() == sibling {
            *position = Position::new(node, base + position.offset());
        } else if Some(position.container()) == parent && position.offset() == index {
            *position = Position::new(node, base);
        }
    }
    remove_node(tree, sibling, keep);
    Ok(())
}
