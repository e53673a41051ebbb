//! Highlight Configuration

use serde::{Deserialize, Serialize};

/// How a new highlight absorbs existing ones it overlaps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MergePolicy {
    /// Keep merging until the new span overlaps nothing. Entries stay
    /// disjoint.
    #[default]
    Chained,
    /// Merge with the first overlapping entry only
    FirstMatch,
}

/// What restore does with an entry whose path no longer resolves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RestorePolicy {
    /// Drop the entry and log a warning
    #[default]
    Lenient,
    /// Fail the whole restore
    Strict,
}

/// Highlight store options
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HighlightConfig {
    /// Class set on marker elements
    pub class_name: String,

    /// Attribute carrying the highlight id on marker elements
    pub id_attribute: String,

    /// Tag of marker elements
    pub tag_name: String,

    pub merge_policy: MergePolicy,
    pub restore_policy: RestorePolicy,
}

impl Default for HighlightConfig {
    fn default() -> Self {
        Self {
            class_name: "highlight".to_string(),
            id_attribute: "data-highlight-id".to_string(),
            tag_name: "span".to_string(),
            merge_policy: MergePolicy::default(),
            restore_policy: RestorePolicy::default(),
        }
    }
}
