//! fOS Range
//!
//! Ranges and selections over [`fos_dom`] trees.
//!
//! # Overview
//! - [`DocumentRange`]: two boundary [`Position`]s with comparison,
//!   containment, content and serialization operations
//! - [`RangeTreeIterator`]: walks the nodes a range touches
//! - [`SelectionModel`]: the user selection, kept in step with a host
//!   through a [`PlatformSelection`]
//! - [`Environment`]: probes a host once and hands out the above
//!
//! # Example
//! ```rust,ignore
//! use fos_range::{Environment, HostCapabilities};
//!
//! let env = Environment::init(&HostCapabilities::full())?;
//! let mut range = env.create_range(&tree);
//! range.select_node_contents(&tree, paragraph)?;
//! let text = range.text(&tree)?;
//! ```

mod backend;
mod bookmark;
mod boundary;
mod capabilities;
mod content;
mod environment;
mod error;
mod iterator;
mod mutation;
mod platform;
mod position;
mod range;
mod selection;
pub mod serialize;

pub use backend::{AnchorFocusBackend, RangeListBackend, SelectionBackend, backend_for};
pub use bookmark::Bookmark;
pub use boundary::{common_ancestor, compare_points, compare_positions};
pub use capabilities::{HostCapabilities, HostProbe};
pub use environment::Environment;
pub use error::{RangeError, RangeResult};
pub use iterator::{RangeTreeIterator, iterate_subtree};
pub use platform::{HostRange, HostSelection, PlatformSelection};
pub use position::Position;
pub use range::{DocumentRange, How, ListenerId, NodeComparison, RangeEvent, RangeId};
pub use selection::SelectionModel;
pub use serialize::{SerializedPosition, SerializedRange};

// Re-export the tree crate for callers that only depend on ranges
pub use fos_dom as dom;

/// Create a range collapsed at the start of `tree`
pub fn create_range(tree: &fos_dom::DomTree) -> DocumentRange {
    DocumentRange::new(tree)
}
