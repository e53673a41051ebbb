//! DOM Node Operations
//!
//! Error type shared by every tree mutation.

/// Result type for DOM operations
pub type DomResult<T> = Result<T, DomError>;

/// DOM operation errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DomError {
    /// Node not found
    #[error("Node not found")]
    NotFound,

    /// Hierarchy error (e.g., inserting ancestor)
    #[error("Hierarchy request error: {0}")]
    HierarchyRequest(&'static str),

    /// Invalid node type
    #[error("Invalid node type")]
    InvalidNodeType,

    /// Node is not a child
    #[error("Node is not a child")]
    NotAChild,

    /// Character offset past the end of the node
    #[error("Offset {offset} is out of bounds for length {length}")]
    IndexSize { offset: usize, length: usize },
}
