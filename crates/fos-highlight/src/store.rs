//! Highlight store
//!
//! Named, non-overlapping highlights over one container node. Each entry
//! is kept as a character span of the container's text, so painting
//! markers (which splits and wraps text nodes) never moves it; the
//! [`DocumentRange`] of an entry is rebuilt from the span after every
//! change to the tree.

use fos_dom::{DocumentId, DomTree, NodeId, char_len};
use fos_range::{DocumentRange, Position, RangeError};
use serde::{Deserialize, Serialize};

use crate::logical::{from_logical, range_to_logical};
use crate::marker::{materialize, paint, strip, unpaint};
use crate::snapshot::{self, HighlightSnapshot, SnapshotEntry, SnapshotMap};
use crate::{
    HighlightConfig, HighlightError, HighlightResult, MergePolicy, RestorePolicy,
};

/// Note attached to a highlight
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub text: String,
}

impl Note {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

/// Characters `start..end` of the container's text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HighlightSpan {
    pub start: usize,
    pub end: usize,
}

impl HighlightSpan {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Smallest span covering both
    pub fn union(&self, other: &HighlightSpan) -> HighlightSpan {
        HighlightSpan::new(self.start.min(other.start), self.end.max(other.end))
    }

    /// Whether the character at `offset` is highlighted
    pub fn contains(&self, offset: usize) -> bool {
        self.start <= offset && offset < self.end
    }
}

/// Spans that share at least one point overlap, so abutting spans do too
pub fn check_overlap(a: &HighlightSpan, b: &HighlightSpan) -> bool {
    !(a.end < b.start) && !(a.start > b.end)
}

/// A stored highlight
#[derive(Debug)]
pub struct Highlight {
    id: String,
    span: HighlightSpan,
    range: DocumentRange,
    note: Option<Note>,
    markers: Vec<NodeId>,
}

impl Highlight {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn span(&self) -> HighlightSpan {
        self.span
    }

    /// Current range over the highlighted text
    pub fn range(&self) -> &DocumentRange {
        &self.range
    }

    pub fn note(&self) -> Option<&Note> {
        self.note.as_ref()
    }

    /// Marker elements painted for this highlight
    pub fn markers(&self) -> &[NodeId] {
        &self.markers
    }
}

/// Highlights over one container
#[derive(Debug)]
pub struct HighlightStore {
    config: HighlightConfig,
    document: DocumentId,
    container: NodeId,
    entries: Vec<Highlight>,
    snapshots: SnapshotMap,
    next_id: u64,
}

impl HighlightStore {
    pub fn new(tree: &DomTree, container: NodeId, config: HighlightConfig) -> HighlightResult<Self> {
        if !tree.contains(container) {
            return Err(RangeError::NotFound("highlight container is not part of the tree").into());
        }
        Ok(Self {
            config,
            document: tree.id(),
            container,
            entries: Vec::new(),
            snapshots: SnapshotMap::new(),
            next_id: 1,
        })
    }

    fn ensure_tree(&self, tree: &DomTree) -> HighlightResult<()> {
        if tree.id() != self.document {
            return Err(RangeError::WrongDocument.into());
        }
        Ok(())
    }

    fn allocate_id(&mut self) -> String {
        loop {
            let id = format!("hl{}", self.next_id);
            self.next_id += 1;
            if !self.entries.iter().any(|entry| entry.id == id) {
                return id;
            }
        }
    }

    /// Keep generated ids clear of ids restored from a snapshot
    fn reserve_id(&mut self, id: &str) {
        if let Some(n) = id.strip_prefix("hl").and_then(|n| n.parse::<u64>().ok()) {
            self.next_id = self.next_id.max(n + 1);
        }
    }

    fn position_of(&self, id: &str) -> HighlightResult<usize> {
        self.entries
            .iter()
            .position(|entry| entry.id == id)
            .ok_or_else(|| HighlightError::UnknownHighlight(id.to_string()))
    }

    /// Rebuild every entry's range from its span
    fn rebind_ranges(&mut self, tree: &DomTree) -> HighlightResult<()> {
        for entry in &mut self.entries {
            entry.range = materialize(tree, self.container, entry.span)?;
        }
        Ok(())
    }

    // --- Accessors ---

    pub fn config(&self) -> &HighlightConfig {
        &self.config
    }

    pub fn container(&self) -> NodeId {
        self.container
    }

    pub fn entries(&self) -> &[Highlight] {
        &self.entries
    }

    pub fn get(&self, id: &str) -> Option<&Highlight> {
        self.entries.iter().find(|entry| entry.id == id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The highlight covering the character right after `position`
    pub fn highlight_at(
        &self,
        tree: &DomTree,
        position: Position,
    ) -> HighlightResult<Option<&Highlight>> {
        self.ensure_tree(tree)?;
        if !tree.is_inclusive_ancestor_of(self.container, position.container()) {
            return Ok(None);
        }
        let mut before = DocumentRange::new(tree);
        before.set_start_and_end(
            tree,
            self.container,
            0,
            position.container(),
            position.offset(),
        )?;
        let offset = char_len(&before.text(tree)?);
        Ok(self.entries.iter().find(|entry| entry.span.contains(offset)))
    }

    // --- Highlighting ---

    /// Highlight the part of `range` inside the container and return the
    /// new entry's id. Overlapping entries are merged into it and the
    /// first of their notes is carried forward in place of `note`.
    pub fn highlight(
        &mut self,
        tree: &mut DomTree,
        range: &DocumentRange,
        note: Option<Note>,
    ) -> HighlightResult<String> {
        self.ensure_tree(tree)?;
        let bookmark = range.get_bookmark(tree, self.container)?;
        if bookmark.start == bookmark.end {
            return Err(HighlightError::EmptySelection);
        }

        let mut span = HighlightSpan::new(bookmark.start, bookmark.end);
        let mut carried = None;
        while let Some(index) = self
            .entries
            .iter()
            .position(|entry| check_overlap(&entry.span, &span))
        {
            let entry = self.entries.remove(index);
            let merged = span.union(&entry.span);
            tracing::debug!(
                "Merging highlight {} ({}..{}) into {}..{}",
                entry.id,
                entry.span.start,
                entry.span.end,
                merged.start,
                merged.end
            );
            span = merged;
            if carried.is_none() {
                carried = entry.note;
            }
            unpaint(tree, &entry.markers, false)?;
            if self.config.merge_policy == MergePolicy::FirstMatch {
                break;
            }
        }

        let id = self.allocate_id();
        let markers = paint(tree, &self.config, self.container, span, &id)?;
        let range = materialize(tree, self.container, span)?;
        self.entries.push(Highlight {
            id: id.clone(),
            span,
            range,
            note: carried.or(note),
            markers,
        });
        self.rebind_ranges(tree)?;
        Ok(id)
    }

    /// Remove one highlight together with its markers and note
    pub fn clear(&mut self, tree: &mut DomTree, id: &str) -> HighlightResult<()> {
        self.ensure_tree(tree)?;
        let index = self.position_of(id)?;
        let entry = self.entries.remove(index);
        unpaint(tree, &entry.markers, true)?;
        self.rebind_ranges(tree)
    }

    /// Remove every highlight
    pub fn clear_all(&mut self, tree: &mut DomTree) -> HighlightResult<()> {
        self.ensure_tree(tree)?;
        let markers: Vec<NodeId> = self
            .entries
            .drain(..)
            .flat_map(|entry| entry.markers)
            .collect();
        unpaint(tree, &markers, true)
    }

    // --- Notes ---

    pub fn set_note(&mut self, id: &str, note: Note) -> HighlightResult<()> {
        let index = self.position_of(id)?;
        self.entries[index].note = Some(note);
        Ok(())
    }

    pub fn remove_note(&mut self, id: &str) -> HighlightResult<Option<Note>> {
        let index = self.position_of(id)?;
        Ok(self.entries[index].note.take())
    }

    // --- Screens ---

    /// Store every entry under `screen_id`, replacing what was saved there
    pub fn save(&mut self, tree: &DomTree, screen_id: &str) -> HighlightResult<()> {
        self.ensure_tree(tree)?;
        let mut entries = Vec::with_capacity(self.entries.len());
        for entry in &self.entries {
            let range = range_to_logical(
                tree,
                &self.config,
                self.container,
                entry.range.start(),
                entry.range.end(),
            )?;
            entries.push(SnapshotEntry {
                id: entry.id.clone(),
                range,
                note: entry.note.clone(),
            });
        }
        tracing::info!("Saved {} highlight(s) for screen {}", entries.len(), screen_id);
        self.snapshots
            .insert(screen_id.to_string(), HighlightSnapshot { entries });
        Ok(())
    }

    /// Replace the current highlights with those saved under `screen_id`.
    /// Returns how many were restored.
    pub fn restore(&mut self, tree: &mut DomTree, screen_id: &str) -> HighlightResult<usize> {
        self.ensure_tree(tree)?;
        let snapshot = self.snapshots.get(screen_id).cloned().unwrap_or_default();
        let total = snapshot.entries.len();

        // Resolve first so a strict failure leaves the tree untouched
        let mut resolved = Vec::with_capacity(total);
        for saved in snapshot.entries {
            match self.resolve(tree, &saved) {
                Ok(span) => resolved.push((saved, span)),
                Err(err) => match self.config.restore_policy {
                    RestorePolicy::Lenient => {
                        tracing::warn!(
                            "Dropping highlight {} on screen {}: {} ({})",
                            saved.id,
                            screen_id,
                            saved.range,
                            err
                        );
                    }
                    RestorePolicy::Strict => {
                        return Err(HighlightError::UnresolvedPath {
                            screen: screen_id.to_string(),
                            id: saved.id,
                            path: saved.range.to_string(),
                        });
                    }
                },
            }
        }

        let current: Vec<NodeId> = self
            .entries
            .drain(..)
            .flat_map(|entry| entry.markers)
            .collect();
        unpaint(tree, &current, false)?;
        let stale = strip(tree, &self.config, self.container)?;
        if stale > 0 {
            tracing::debug!("Removed {} stale marker(s) before restoring", stale);
        }

        for (saved, span) in resolved {
            self.reserve_id(&saved.id);
            let markers = paint(tree, &self.config, self.container, span, &saved.id)?;
            let range = materialize(tree, self.container, span)?;
            self.entries.push(Highlight {
                id: saved.id,
                span,
                range,
                note: saved.note,
                markers,
            });
        }
        self.rebind_ranges(tree)?;

        tracing::info!(
            "Restored {} of {} highlight(s) for screen {}",
            self.entries.len(),
            total,
            screen_id
        );
        Ok(self.entries.len())
    }

    fn resolve(&self, tree: &DomTree, saved: &SnapshotEntry) -> HighlightResult<HighlightSpan> {
        let start = from_logical(tree, &self.config, self.container, &saved.range.start)?;
        let end = from_logical(tree, &self.config, self.container, &saved.range.end)?;
        let mut range = DocumentRange::new(tree);
        range.set_start_and_end(
            tree,
            start.container(),
            start.offset(),
            end.container(),
            end.offset(),
        )?;
        let bookmark = range.get_bookmark(tree, self.container)?;
        if bookmark.start == bookmark.end {
            return Err(HighlightError::EmptySelection);
        }
        Ok(HighlightSpan::new(bookmark.start, bookmark.end))
    }

    /// Screens with saved highlights
    pub fn screens(&self) -> impl Iterator<Item = &str> {
        self.snapshots.keys().map(String::as_str)
    }

    pub fn snapshots_to_json(&self) -> HighlightResult<String> {
        snapshot::to_json(&self.snapshots)
    }

    /// Replace every saved screen with the ones in `json`
    pub fn snapshots_from_json(&mut self, json: &str) -> HighlightResult<()> {
        self.snapshots = snapshot::from_json(json)?;
        Ok(())
    }

    /// Move the store to another container, repainting every entry there.
    /// Entries past the end of the new container's text are dropped.
    pub fn rebind(&mut self, tree: &mut DomTree, container: NodeId) -> HighlightResult<()> {
        self.ensure_tree(tree)?;
        if !tree.contains(container) {
            return Err(RangeError::NotFound("highlight container is not part of the tree").into());
        }
        let markers: Vec<NodeId> = self
            .entries
            .iter_mut()
            .flat_map(|entry| std::mem::take(&mut entry.markers))
            .collect();
        unpaint(tree, &markers, true)?;

        self.container = container;
        let length = char_len(&tree.text_content(container));
        self.entries.retain(|entry| {
            let fits = entry.span.end <= length;
            if !fits {
                tracing::warn!(
                    "Dropping highlight {}: {}..{} is past the end of the new container",
                    entry.id,
                    entry.span.start,
                    entry.span.end
                );
            }
            fits
        });
        for entry in &mut self.entries {
            entry.markers = paint(tree, &self.config, self.container, entry.span, &entry.id)?;
        }
        self.rebind_ranges(tree)
    }
}
