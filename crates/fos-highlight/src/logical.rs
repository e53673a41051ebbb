//! Marker-independent paths
//!
//! Saved highlights address the container as if no markers were painted:
//! marker elements are transparent and consecutive text nodes read as one
//! run. Painting, unpainting or splitting text therefore never changes a
//! saved path.

use fos_dom::{DomTree, NodeId};
use fos_range::{Position, RangeError, RangeResult, SerializedPosition, SerializedRange};

use crate::HighlightConfig;

/// A child in the marker-free view of the tree
#[derive(Debug, Clone, PartialEq, Eq)]
enum LogicalChild {
    Node(NodeId),
    /// Consecutive text nodes, in order
    Run(Vec<NodeId>),
}

impl LogicalChild {
    fn holds(&self, node: NodeId) -> bool {
        match self {
            LogicalChild::Node(n) => *n == node,
            LogicalChild::Run(run) => run.contains(&node),
        }
    }
}

/// Whether `node` is a marker element painted by a highlight store
pub(crate) fn is_marker(tree: &DomTree, config: &HighlightConfig, node: NodeId) -> bool {
    tree.tag_name(node) == Some(config.tag_name.as_str())
        && tree.attribute(node, &config.id_attribute).is_some()
}

fn logical_children(tree: &DomTree, config: &HighlightConfig, node: NodeId) -> Vec<LogicalChild> {
    let mut out = Vec::new();
    for child in tree.children(node) {
        push_logical(tree, config, child, &mut out);
    }
    out
}

fn push_logical(tree: &DomTree, config: &HighlightConfig, node: NodeId, out: &mut Vec<LogicalChild>) {
    if is_marker(tree, config, node) {
        for child in tree.children(node) {
            push_logical(tree, config, child, out);
        }
    } else if tree.is_text(node) {
        match out.last_mut() {
            Some(LogicalChild::Run(run)) => run.push(node),
            _ => out.push(LogicalChild::Run(vec![node])),
        }
    } else {
        out.push(LogicalChild::Node(node));
    }
}

/// Nearest ancestor that is not a marker
fn logical_parent(tree: &DomTree, config: &HighlightConfig, node: NodeId) -> Option<NodeId> {
    tree.ancestors(node).find(|&n| !is_marker(tree, config, n))
}

/// Text, or a marker whose first (or last) content leads to text
fn leads_to_text(tree: &DomTree, config: &HighlightConfig, node: NodeId, from_end: bool) -> bool {
    if tree.is_text(node) {
        return true;
    }
    if !is_marker(tree, config, node) {
        return false;
    }
    let edge = if from_end {
        tree.last_child(node)
    } else {
        tree.first_child(node)
    };
    edge.is_some_and(|child| leads_to_text(tree, config, child, from_end))
}

/// Move a point next to text into that text, and a point inside a marker
/// out of it where it cannot reach text
fn canonical(tree: &DomTree, config: &HighlightConfig, mut point: Position) -> Position {
    loop {
        let container = point.container();
        if tree.is_character_data(container) {
            return point;
        }
        let before = point
            .offset()
            .checked_sub(1)
            .and_then(|index| tree.child_at(container, index))
            .filter(|&node| leads_to_text(tree, config, node, true));
        if let Some(node) = before {
            point = Position::new(node, tree.length(node));
            continue;
        }
        let after = tree
            .child_at(container, point.offset())
            .filter(|&node| leads_to_text(tree, config, node, false));
        if let Some(node) = after {
            point = Position::new(node, 0);
            continue;
        }
        if is_marker(tree, config, container) {
            if let Some(parent) = tree.parent(container) {
                let index = tree.index_of(container);
                let offset = if point.offset() >= tree.child_count(container) && point.offset() > 0 {
                    index + 1
                } else {
                    index
                };
                point = Position::new(parent, offset);
                continue;
            }
        }
        return point;
    }
}

/// Express `point` relative to `root` in the marker-free view
pub(crate) fn to_logical(
    tree: &DomTree,
    config: &HighlightConfig,
    root: NodeId,
    point: Position,
) -> RangeResult<SerializedPosition> {
    let point = canonical(tree, config, point);
    let container = point.container();
    let outside = RangeError::NotFound("position is not inside the highlight container");

    let mut path = Vec::new();
    let offset;
    let mut node;
    if tree.is_character_data(container) && container != root {
        let parent = logical_parent(tree, config, container).ok_or(outside.clone())?;
        let children = logical_children(tree, config, parent);
        let index = children
            .iter()
            .position(|child| child.holds(container))
            .ok_or(RangeError::TreeStructure)?;
        offset = match &children[index] {
            LogicalChild::Run(run) => {
                let before: usize = run
                    .iter()
                    .take_while(|&&n| n != container)
                    .map(|&n| tree.length(n))
                    .sum();
                before + point.offset()
            }
            LogicalChild::Node(_) => point.offset(),
        };
        path.push(index);
        node = parent;
    } else {
        // Children before the offset, counted in the marker-free view
        let mut prefix = Vec::new();
        for child in tree.children(container).take(point.offset()) {
            push_logical(tree, config, child, &mut prefix);
        }
        offset = prefix.len();
        node = container;
    }

    while node != root {
        let parent = logical_parent(tree, config, node).ok_or(outside.clone())?;
        let index = logical_children(tree, config, parent)
            .iter()
            .position(|child| child.holds(node))
            .ok_or(RangeError::TreeStructure)?;
        path.push(index);
        node = parent;
    }
    path.reverse();
    Ok(SerializedPosition { path, offset })
}

/// Resolve a marker-free path against the current tree
pub(crate) fn from_logical(
    tree: &DomTree,
    config: &HighlightConfig,
    root: NodeId,
    serialized: &SerializedPosition,
) -> RangeResult<Position> {
    let unresolved = RangeError::NotFound("logical path does not resolve");
    let mut node = root;
    for (step, &index) in serialized.path.iter().enumerate() {
        match logical_children(tree, config, node).get(index) {
            Some(LogicalChild::Node(child)) => node = *child,
            Some(LogicalChild::Run(run)) if step + 1 == serialized.path.len() => {
                return locate_in_run(tree, run, serialized.offset);
            }
            _ => return Err(unresolved),
        }
    }

    let offset = serialized.offset;
    if tree.is_character_data(node) {
        let length = tree.length(node);
        if offset > length {
            return Err(RangeError::IndexSize { offset, length });
        }
        return Ok(Position::new(node, offset));
    }
    let children = logical_children(tree, config, node);
    match children.get(offset) {
        None if offset == children.len() => Ok(Position::new(node, tree.child_count(node))),
        None => Err(RangeError::IndexSize {
            offset,
            length: children.len(),
        }),
        Some(LogicalChild::Node(child)) => Position::before(tree, *child),
        Some(LogicalChild::Run(run)) => Ok(Position::new(run[0], 0)),
    }
}

/// First text node of `run` holding character `offset`
fn locate_in_run(tree: &DomTree, run: &[NodeId], offset: usize) -> RangeResult<Position> {
    let mut seen = 0;
    for &text in run {
        let length = tree.length(text);
        if offset <= seen + length {
            return Ok(Position::new(text, offset - seen));
        }
        seen += length;
    }
    Err(RangeError::IndexSize {
        offset,
        length: seen,
    })
}

/// Both boundaries of a range in the marker-free view
pub(crate) fn range_to_logical(
    tree: &DomTree,
    config: &HighlightConfig,
    root: NodeId,
    start: Position,
    end: Position,
) -> RangeResult<SerializedRange> {
    Ok(SerializedRange {
        start: to_logical(tree, config, root, start)?,
        end: to_logical(tree, config, root, end)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    /// <div><p>"Hello world"</p><ul><li>"item"</li></ul></div>
    fn sample() -> (DomTree, NodeId, NodeId, NodeId) {
        let mut tree = DomTree::new();
        let div = tree.create_element("div");
        let p = tree.create_element("p");
        let text = tree.create_text("Hello world");
        let ul = tree.create_element("ul");
        let li = tree.create_element("li");
        let item = tree.create_text("item");
        tree.append_child(tree.root(), div).unwrap();
        tree.append_child(div, p).unwrap();
        tree.append_child(p, text).unwrap();
        tree.append_child(div, ul).unwrap();
        tree.append_child(ul, li).unwrap();
        tree.append_child(li, item).unwrap();
        (tree, div, text, item)
    }

    /// Split `text` at `at` and wrap the tail in a marker
    fn paint_tail(tree: &mut DomTree, config: &HighlightConfig, text: NodeId, at: usize) -> NodeId {
        let tail = tree.split_text(text, at).unwrap();
        let parent = tree.parent(tail).unwrap();
        let marker = tree.create_element("span");
        tree.set_attribute(marker, &config.id_attribute, "hl1").unwrap();
        tree.insert_before(parent, marker, Some(tail)).unwrap();
        tree.append_child(marker, tail).unwrap();
        tail
    }

    #[test]
    fn test_markers_do_not_change_paths() {
        let config = HighlightConfig::default();
        let (mut tree, div, text, item) = sample();
        let plain = to_logical(&tree, &config, div, Position::new(text, 8)).unwrap();
        let other = to_logical(&tree, &config, div, Position::new(item, 2)).unwrap();
        assert_eq!(plain.path, vec![0, 0]);
        assert_eq!(plain.offset, 8);
        assert_eq!(other.path, vec![1, 0, 0]);

        let tail = paint_tail(&mut tree, &config, text, 6);
        let painted = to_logical(&tree, &config, div, Position::new(tail, 2)).unwrap();
        assert_eq!(painted, plain);
        assert_eq!(
            to_logical(&tree, &config, div, Position::new(item, 2)).unwrap(),
            other
        );
    }

    #[test]
    fn test_resolves_into_split_runs() {
        let config = HighlightConfig::default();
        let (mut tree, div, text, _) = sample();
        let tail = paint_tail(&mut tree, &config, text, 6);

        let saved = SerializedPosition {
            path: vec![0, 0],
            offset: 8,
        };
        assert_eq!(
            from_logical(&tree, &config, div, &saved).unwrap(),
            Position::new(tail, 2)
        );
        let edge = SerializedPosition {
            path: vec![0, 0],
            offset: 6,
        };
        assert_eq!(
            from_logical(&tree, &config, div, &edge).unwrap(),
            Position::new(text, 6)
        );
    }

    #[test]
    fn test_element_offsets_skip_markers() {
        let config = HighlightConfig::default();
        let (tree, div, _, _) = sample();
        let ul_end = to_logical(&tree, &config, div, Position::new(div, 2)).unwrap();
        assert!(ul_end.path.is_empty());
        assert_eq!(ul_end.offset, 2);
        assert_eq!(
            from_logical(&tree, &config, div, &ul_end).unwrap(),
            Position::new(div, 2)
        );
    }

    #[test]
    fn test_point_next_to_text_moves_into_it() {
        let config = HighlightConfig::default();
        let (tree, div, text, _) = sample();
        let p = tree.parent(text).unwrap();
        let at_end = to_logical(&tree, &config, div, Position::new(p, 1)).unwrap();
        assert_eq!(at_end.path, vec![0, 0]);
        assert_eq!(at_end.offset, 11);
    }

    #[test]
    fn test_missing_path_fails() {
        let config = HighlightConfig::default();
        let (tree, div, _, _) = sample();
        let saved = SerializedPosition {
            path: vec![4, 0],
            offset: 0,
        };
        assert!(matches!(
            from_logical(&tree, &config, div, &saved),
            Err(RangeError::NotFound(_))
        ));
    }
}
