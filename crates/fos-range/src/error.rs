//! Range and selection errors

use fos_dom::DomError;

/// Result type for range and selection operations
pub type RangeResult<T> = Result<T, RangeError>;

/// Range and selection errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RangeError {
    #[error("Offset {offset} is out of bounds for a node of length {length}")]
    IndexSize { offset: usize, length: usize },

    #[error("Invalid node type for this operation")]
    InvalidNodeType,

    #[error("Nodes belong to different documents")]
    WrongDocument,

    #[error("Invalid state: {0}")]
    InvalidState(&'static str),

    #[error("Hierarchy request error: {0}")]
    HierarchyRequest(&'static str),

    #[error("Range boundaries do not cleanly bound its contents")]
    BadBoundaryPoints,

    #[error("Tree structure contradiction while comparing positions")]
    TreeStructure,

    #[error("Node not found: {0}")]
    NotFound(&'static str),

    #[error("Range is no longer valid after a DOM mutation")]
    StaleRange,

    #[error("Ranges do not intersect")]
    RangesDoNotIntersect,

    #[error("Unsupported host: {0}")]
    Unsupported(String),

    #[error("Malformed serialized range: {0}")]
    Malformed(String),
}

impl From<DomError> for RangeError {
    fn from(err: DomError) -> Self {
        match err {
            DomError::NotFound => RangeError::NotFound("node is not part of the tree"),
            DomError::HierarchyRequest(reason) => RangeError::HierarchyRequest(reason),
            DomError::InvalidNodeType => RangeError::InvalidNodeType,
            DomError::NotAChild => RangeError::NotFound("reference node is not a child"),
            DomError::IndexSize { offset, length } => RangeError::IndexSize { offset, length },
        }
    }
}
