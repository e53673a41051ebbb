//! Range serialization
//!
//! Each boundary is stored as the chain of child indices leading from a
//! root node down to the boundary container, plus the offset. The textual
//! form joins the indices with `/`, appends `:offset`, and separates the
//! two boundaries with a comma: `"0/3/1:5,0/3/2:1"`.

use std::fmt;
use std::str::FromStr;

use fos_dom::{DomTree, NodeId};
use serde::{Deserialize, Serialize};

use crate::{DocumentRange, Position, RangeError, RangeResult};

/// Child-index path from a root plus an offset
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SerializedPosition {
    pub path: Vec<usize>,
    pub offset: usize,
}

/// Both boundaries of a range relative to the same root
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SerializedRange {
    pub start: SerializedPosition,
    pub end: SerializedPosition,
}

/// Express `position` relative to `root`
pub fn serialize_position(
    tree: &DomTree,
    position: Position,
    root: NodeId,
) -> RangeResult<SerializedPosition> {
    let mut path = Vec::new();
    let mut node = position.container();
    while node != root {
        path.push(tree.index_of(node));
        node = tree
            .parent(node)
            .ok_or(RangeError::NotFound("position is not inside the serialization root"))?;
    }
    path.reverse();
    Ok(SerializedPosition {
        path,
        offset: position.offset(),
    })
}

/// Resolve a serialized position against the current tree
pub fn deserialize_position(
    tree: &DomTree,
    serialized: &SerializedPosition,
    root: NodeId,
) -> RangeResult<Position> {
    let mut node = root;
    for &index in &serialized.path {
        node = tree
            .child_at(node, index)
            .ok_or(RangeError::NotFound("serialized path does not resolve"))?;
    }
    let length = tree.length(node);
    if serialized.offset > length {
        return Err(RangeError::IndexSize {
            offset: serialized.offset,
            length,
        });
    }
    Ok(Position::new(node, serialized.offset))
}

/// Express `range` relative to `root`, which must contain it
pub fn serialize_range(
    tree: &DomTree,
    range: &DocumentRange,
    root: NodeId,
) -> RangeResult<SerializedRange> {
    range.check(tree)?;
    if !tree.is_inclusive_ancestor_of(root, range.common_ancestor_container()) {
        return Err(RangeError::NotFound("range is not inside the serialization root"));
    }
    Ok(SerializedRange {
        start: serialize_position(tree, range.start(), root)?,
        end: serialize_position(tree, range.end(), root)?,
    })
}

/// Rebuild a range from its serialized form
pub fn deserialize_range(
    tree: &DomTree,
    serialized: &SerializedRange,
    root: NodeId,
) -> RangeResult<DocumentRange> {
    let start = deserialize_position(tree, &serialized.start, root)?;
    let end = deserialize_position(tree, &serialized.end, root)?;
    let mut range = DocumentRange::new(tree);
    range.set_start_and_end(
        tree,
        start.container(),
        start.offset(),
        end.container(),
        end.offset(),
    )?;
    Ok(range)
}

impl fmt::Display for SerializedPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, index) in self.path.iter().enumerate() {
            if i > 0 {
                f.write_str("/")?;
            }
            write!(f, "{index}")?;
        }
        write!(f, ":{}", self.offset)
    }
}

impl FromStr for SerializedPosition {
    type Err = RangeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (path, offset) = s
            .rsplit_once(':')
            .ok_or_else(|| RangeError::Malformed(format!("missing offset in {s:?}")))?;
        let offset = offset
            .parse()
            .map_err(|_| RangeError::Malformed(format!("bad offset in {s:?}")))?;
        let path = if path.is_empty() {
            Vec::new()
        } else {
            path.split('/')
                .map(|index| {
                    index
                        .parse()
                        .map_err(|_| RangeError::Malformed(format!("bad path index in {s:?}")))
                })
                .collect::<Result<_, _>>()?
        };
        Ok(Self { path, offset })
    }
}

impl fmt::Display for SerializedRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.start, self.end)
    }
}

impl FromStr for SerializedRange {
    type Err = RangeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (start, end) = s
            .split_once(',')
            .ok_or_else(|| RangeError::Malformed(format!("expected two boundaries in {s:?}")))?;
        Ok(Self {
            start: start.parse()?,
            end: end.parse()?,
        })
    }
}
