//! Highlight errors

use fos_dom::DomError;
use fos_range::RangeError;

/// Result type for highlight operations
pub type HighlightResult<T> = Result<T, HighlightError>;

/// Highlight errors
#[derive(Debug, thiserror::Error)]
pub enum HighlightError {
    #[error(transparent)]
    Range(#[from] RangeError),

    #[error(transparent)]
    Dom(#[from] DomError),

    #[error("Unknown highlight: {0}")]
    UnknownHighlight(String),

    #[error("Selection covers no text inside the highlight container")]
    EmptySelection,

    #[error("Saved highlight {id} on screen {screen} does not resolve at {path}")]
    UnresolvedPath {
        screen: String,
        id: String,
        path: String,
    },

    #[error("Snapshot serialization failed: {0}")]
    Snapshot(#[from] serde_json::Error),
}
