//! fOS Highlight
//!
//! Persistent text highlights with notes over a container node.
//!
//! Highlights never overlap: a new one absorbs every entry it overlaps or
//! touches. Each entry is painted as marker elements around its text and
//! can be saved per screen, serialized to JSON and restored later, even
//! into a tree whose markers differ from the one it was saved from.
//!
//! # Example
//! ```rust,ignore
//! use fos_highlight::{HighlightConfig, HighlightStore, Note};
//!
//! let mut store = HighlightStore::new(&tree, article, HighlightConfig::default())?;
//! let id = store.highlight(&mut tree, &selection_range, Some(Note::new("check this")))?;
//! store.save(&tree, "chapter-1")?;
//! let json = store.snapshots_to_json()?;
//! ```

mod config;
mod error;
mod logical;
mod marker;
mod snapshot;
mod store;

pub use config::{HighlightConfig, MergePolicy, RestorePolicy};
pub use error::{HighlightError, HighlightResult};
pub use snapshot::{HighlightSnapshot, SnapshotEntry, SnapshotMap};
pub use store::{Highlight, HighlightSpan, HighlightStore, Note, check_overlap};
