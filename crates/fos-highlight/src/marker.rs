//! Marker painting
//!
//! A highlight is shown by wrapping each selected text node in a marker
//! element that carries the highlight id.

use fos_dom::{DomTree, NodeId, WhatToShow};
use fos_range::{Bookmark, DocumentRange};

use crate::logical::is_marker;
use crate::{HighlightConfig, HighlightResult, HighlightSpan};

/// Range over the characters `span` covers inside `container`
pub(crate) fn materialize(
    tree: &DomTree,
    container: NodeId,
    span: HighlightSpan,
) -> HighlightResult<DocumentRange> {
    let mut range = DocumentRange::new(tree);
    range.move_to_bookmark(
        tree,
        &Bookmark {
            start: span.start,
            end: span.end,
            container,
        },
    )?;
    Ok(range)
}

/// Wrap the text covered by `span` in markers for highlight `id`
pub(crate) fn paint(
    tree: &mut DomTree,
    config: &HighlightConfig,
    container: NodeId,
    span: HighlightSpan,
    id: &str,
) -> HighlightResult<Vec<NodeId>> {
    let mut range = materialize(tree, container, span)?;
    range.split_boundaries(tree)?;
    let (start, end) = (range.start(), range.end());

    let view: &DomTree = tree;
    let texts = range.get_nodes(view, WhatToShow::TEXT, |node| {
        let length = view.length(node);
        length > 0
            && !(node == start.container() && start.offset() == length)
            && !(node == end.container() && end.offset() == 0)
    })?;

    let mut markers = Vec::with_capacity(texts.len());
    for text in texts {
        let Some(parent) = tree.parent(text) else {
            continue;
        };
        let marker = tree.create_element(&config.tag_name);
        tree.set_attribute(marker, "class", &config.class_name)?;
        tree.set_attribute(marker, &config.id_attribute, id)?;
        tree.insert_before(parent, marker, Some(text))?;
        tree.append_child(marker, text)?;
        markers.push(marker);
    }
    Ok(markers)
}

/// Replace each marker with its children. With `normalize`, text split
/// apart by painting is merged back.
pub(crate) fn unpaint(tree: &mut DomTree, markers: &[NodeId], normalize: bool) -> HighlightResult<()> {
    let mut parents = Vec::new();
    for &marker in markers {
        let Some(parent) = tree.parent(marker) else {
            continue;
        };
        while let Some(child) = tree.first_child(marker) {
            tree.insert_before(parent, child, Some(marker))?;
        }
        tree.remove_child(parent, marker)?;
        if !parents.contains(&parent) {
            parents.push(parent);
        }
    }
    if normalize {
        for parent in parents {
            tree.normalize(parent);
        }
    }
    Ok(())
}

/// Remove every marker below `container`, whoever painted it
pub(crate) fn strip(
    tree: &mut DomTree,
    config: &HighlightConfig,
    container: NodeId,
) -> HighlightResult<usize> {
    let view: &DomTree = tree;
    let found: Vec<NodeId> = view
        .descendants(container)
        .filter(|&node| is_marker(view, config, node))
        .collect();
    unpaint(tree, &found, false)?;
    Ok(found.len())
}
