//! Selection backends
//!
//! How a range reaches the host depends on what the host can do. The
//! backend is picked once from the [`HostCapabilities`] and used through
//! the [`SelectionBackend`] trait afterwards.

use std::fmt;

use fos_dom::DomTree;

use crate::boundary::compare_positions;
use crate::{HostCapabilities, HostRange, PlatformSelection, RangeResult};

/// Strategy for writing ranges to and reading them from a host selection
pub trait SelectionBackend: fmt::Debug {
    fn name(&self) -> &'static str;

    /// Push `range` to the host. Returns whether the host kept the
    /// direction, which is always true for forward ranges.
    fn add_range(
        &self,
        host: &mut dyn PlatformSelection,
        tree: &DomTree,
        range: HostRange,
        backward: bool,
    ) -> RangeResult<bool>;

    /// The ranges the host currently reports, in its own order
    fn read_ranges(&self, host: &dyn PlatformSelection, tree: &DomTree) -> Vec<HostRange>;
}

/// Pick the backend matching the host's capabilities
pub fn backend_for(capabilities: &HostCapabilities) -> Box<dyn SelectionBackend> {
    if !capabilities.multi_range && capabilities.anchor_focus && capabilities.extend {
        Box::new(AnchorFocusBackend)
    } else {
        Box::new(RangeListBackend {
            extend: capabilities.extend,
        })
    }
}

/// Hosts that keep a list of ranges. Backward ranges need `extend`.
#[derive(Debug, Clone, Copy)]
pub struct RangeListBackend {
    extend: bool,
}

impl SelectionBackend for RangeListBackend {
    fn name(&self) -> &'static str {
        "range-list"
    }

    fn add_range(
        &self,
        host: &mut dyn PlatformSelection,
        tree: &DomTree,
        range: HostRange,
        backward: bool,
    ) -> RangeResult<bool> {
        if backward && self.extend {
            host.add_range(HostRange::collapsed(range.end));
            host.extend(tree, range.start)?;
            return Ok(true);
        }
        host.add_range(range);
        if backward {
            tracing::debug!("Host cannot extend a selection; backward direction dropped");
        }
        Ok(!backward)
    }

    fn read_ranges(&self, host: &dyn PlatformSelection, _tree: &DomTree) -> Vec<HostRange> {
        (0..host.range_count())
            .filter_map(|index| host.range_at(index))
            .collect()
    }
}

/// Single-range hosts driven through anchor and focus: every range is a
/// caret followed by an extension, which keeps the direction.
#[derive(Debug, Clone, Copy)]
pub struct AnchorFocusBackend;

impl SelectionBackend for AnchorFocusBackend {
    fn name(&self) -> &'static str {
        "anchor-focus"
    }

    fn add_range(
        &self,
        host: &mut dyn PlatformSelection,
        tree: &DomTree,
        range: HostRange,
        backward: bool,
    ) -> RangeResult<bool> {
        let (anchor, focus) = if backward {
            (range.end, range.start)
        } else {
            (range.start, range.end)
        };
        host.collapse(anchor);
        if anchor != focus {
            host.extend(tree, focus)?;
        }
        Ok(true)
    }

    fn read_ranges(&self, host: &dyn PlatformSelection, tree: &DomTree) -> Vec<HostRange> {
        match (host.anchor(), host.focus()) {
            (Some(anchor), Some(focus)) => HostRange::between(tree, anchor, focus)
                .map(|range| vec![range])
                .unwrap_or_default(),
            _ => host.range_at(0).into_iter().collect(),
        }
    }
}

/// Whether the host reports a backward selection
pub(crate) fn host_is_backward(host: &dyn PlatformSelection, tree: &DomTree) -> bool {
    match (host.anchor(), host.focus()) {
        (Some(anchor), Some(focus)) => {
            compare_positions(tree, anchor, focus).is_ok_and(|order| order.is_gt())
        }
        _ => false,
    }
}
