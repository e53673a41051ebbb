//! Per-screen highlight snapshots

use std::collections::BTreeMap;

use fos_range::SerializedRange;
use serde::{Deserialize, Serialize};

use crate::{HighlightResult, Note};

/// One saved highlight: its id, marker-free paths and note
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotEntry {
    pub id: String,
    pub range: SerializedRange,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<Note>,
}

/// Every highlight of one screen
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HighlightSnapshot {
    pub entries: Vec<SnapshotEntry>,
}

/// Snapshots keyed by screen id
pub type SnapshotMap = BTreeMap<String, HighlightSnapshot>;

pub(crate) fn to_json(snapshots: &SnapshotMap) -> HighlightResult<String> {
    Ok(serde_json::to_string(snapshots)?)
}

pub(crate) fn from_json(json: &str) -> HighlightResult<SnapshotMap> {
    Ok(serde_json::from_str(json)?)
}
