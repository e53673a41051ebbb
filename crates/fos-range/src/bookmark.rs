//! Character bookmarks
//!
//! A bookmark expresses a range as character offsets into the text of a
//! container, so it survives edits that replace nodes but keep the text.

use fos_dom::{DomTree, NodeId, char_len};

use crate::{DocumentRange, Position, RangeError, RangeResult};

/// Character offsets of a range within `container`'s text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bookmark {
    pub start: usize,
    pub end: usize,
    pub container: NodeId,
}

impl DocumentRange {
    /// Offsets of the part of the range inside `container`. A range
    /// outside it yields an empty bookmark at 0.
    pub fn get_bookmark(&self, tree: &DomTree, container: NodeId) -> RangeResult<Bookmark> {
        self.check(tree)?;
        if !tree.contains(container) {
            return Err(RangeError::NotFound("bookmark container is not part of the tree"));
        }
        let mut scope = DocumentRange::spanning(
            tree,
            Position::new(container, 0),
            Position::new(container, tree.length(container)),
        );

        let (mut start, mut end) = (0, 0);
        if let Some(shared) = self.intersection(tree, &scope)? {
            scope.set_end(tree, shared.start_container(), shared.start_offset())?;
            start = char_len(&scope.text(tree)?);
            end = start + char_len(&shared.text(tree)?);
        }
        Ok(Bookmark {
            start,
            end,
            container,
        })
    }

    /// Re-select the characters a bookmark describes
    pub fn move_to_bookmark(&mut self, tree: &DomTree, bookmark: &Bookmark) -> RangeResult<()> {
        self.ensure_usable(tree)?;
        let container = bookmark.container;
        if !tree.contains(container) {
            return Err(RangeError::NotFound("bookmark container is not part of the tree"));
        }

        let mut start = Position::new(container, 0);
        let mut end = None;
        let mut found_start = false;
        let mut index = 0;
        let mut stack = vec![container];
        while let Some(node) = stack.pop() {
            if tree.is_text(node) {
                let next_index = index + tree.length(node);
                if !found_start && (index..=next_index).contains(&bookmark.start) {
                    start = Position::new(node, bookmark.start - index);
                    found_start = true;
                }
                if found_start && (index..=next_index).contains(&bookmark.end) {
                    end = Some(Position::new(node, bookmark.end - index));
                    break;
                }
                index = next_index;
            } else {
                let children: Vec<NodeId> = tree.children(node).collect();
                stack.extend(children.into_iter().rev());
            }
        }

        let end = end.unwrap_or(start);
        self.set_start_and_end(
            tree,
            start.container(),
            start.offset(),
            end.container(),
            end.offset(),
        )
    }
}
