//! Host capability detection
//!
//! The host is probed once for each behavior the range and selection
//! layers depend on. The answers are kept as named flags and never
//! re-probed.

use serde::{Deserialize, Serialize};

/// Behavior probes a host answers at startup
pub trait HostProbe {
    /// Standard boundary-point ranges are available
    fn has_range_api(&self) -> bool;
    /// Only the legacy text-range family is available
    fn has_legacy_range_api(&self) -> bool;
    /// A selection can hold more than one range
    fn supports_multiple_ranges(&self) -> bool;
    /// The selection reports anchor and focus separately from its ranges
    fn exposes_anchor_focus(&self) -> bool;
    /// The selection can be extended from its anchor
    fn supports_extend(&self) -> bool;
    /// A caret can be placed in content that is not editable
    fn allows_collapsed_in_non_editable(&self) -> bool;
}

/// Named results of the host probes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostCapabilities {
    pub range_api: bool,
    pub legacy_range_api: bool,
    pub multi_range: bool,
    pub anchor_focus: bool,
    pub extend: bool,
    pub collapsed_non_editable: bool,
}

impl HostCapabilities {
    /// Every capability present
    pub fn full() -> Self {
        Self {
            range_api: true,
            legacy_range_api: false,
            multi_range: true,
            anchor_focus: true,
            extend: true,
            collapsed_non_editable: true,
        }
    }

    /// Run every probe once
    pub fn probe(probe: &dyn HostProbe) -> Self {
        Self {
            range_api: probe.has_range_api(),
            legacy_range_api: probe.has_legacy_range_api(),
            multi_range: probe.supports_multiple_ranges(),
            anchor_focus: probe.exposes_anchor_focus(),
            extend: probe.supports_extend(),
            collapsed_non_editable: probe.allows_collapsed_in_non_editable(),
        }
    }

    /// Whether either range family is available
    pub fn has_any_range_api(&self) -> bool {
        self.range_api || self.legacy_range_api
    }
}

impl Default for HostCapabilities {
    fn default() -> Self {
        Self::full()
    }
}

/// Fixed answers, for hosts whose capabilities are known up front
impl HostProbe for HostCapabilities {
    fn has_range_api(&self) -> bool {
        self.range_api
    }

    fn has_legacy_range_api(&self) -> bool {
        self.legacy_range_api
    }

    fn supports_multiple_ranges(&self) -> bool {
        self.multi_range
    }

    fn exposes_anchor_focus(&self) -> bool {
        self.anchor_focus
    }

    fn supports_extend(&self) -> bool {
        self.extend
    }

    fn allows_collapsed_in_non_editable(&self) -> bool {
        self.collapsed_non_editable
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct SingleRangeHost;

    impl HostProbe for SingleRangeHost {
        fn has_range_api(&self) -> bool {
            true
        }
        fn has_legacy_range_api(&self) -> bool {
            false
        }
        fn supports_multiple_ranges(&self) -> bool {
            false
        }
        fn exposes_anchor_focus(&self) -> bool {
            true
        }
        fn supports_extend(&self) -> bool {
            false
        }
        fn allows_collapsed_in_non_editable(&self) -> bool {
            true
        }
    }

    #[test]
    fn test_probe_reads_every_flag() {
        let caps = HostCapabilities::probe(&SingleRangeHost);
        assert!(caps.range_api);
        assert!(!caps.multi_range);
        assert!(!caps.extend);
        assert!(caps.has_any_range_api());
    }

    #[test]
    fn test_capabilities_probe_themselves() {
        let caps = HostCapabilities {
            legacy_range_api: true,
            range_api: false,
            ..HostCapabilities::full()
        };
        assert_eq!(HostCapabilities::probe(&caps), caps);
    }
}
