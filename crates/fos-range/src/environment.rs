//! Range environment
//!
//! Probes the host once and hands out ranges and selections bound to what
//! it found. Nothing here is global: create one [`Environment`] per host.

use fos_dom::DomTree;

use crate::backend::backend_for;
use crate::{
    DocumentRange, HostCapabilities, HostProbe, HostSelection, PlatformSelection, RangeError,
    RangeResult, SelectionBackend, SelectionModel,
};

/// Capabilities of one host, probed at startup
#[derive(Debug, Clone, Copy)]
pub struct Environment {
    capabilities: HostCapabilities,
}

impl Environment {
    /// Probe the host. Fails when it offers no usable range API.
    pub fn init(probe: &dyn HostProbe) -> RangeResult<Self> {
        let capabilities = HostCapabilities::probe(probe);
        tracing::info!("Host capabilities: {:?}", capabilities);

        if !capabilities.has_any_range_api() {
            tracing::error!("Host offers no range API; ranges and selections are unavailable");
            return Err(RangeError::Unsupported(
                "host offers neither the range API nor the legacy text-range API".to_string(),
            ));
        }
        if !capabilities.range_api {
            tracing::error!("Host only offers legacy text ranges, which are not supported");
            return Err(RangeError::Unsupported(
                "legacy text ranges are not supported".to_string(),
            ));
        }
        Ok(Self { capabilities })
    }

    pub fn capabilities(&self) -> &HostCapabilities {
        &self.capabilities
    }

    pub fn create_range(&self, tree: &DomTree) -> DocumentRange {
        DocumentRange::new(tree)
    }

    /// The backend this host needs
    pub fn backend(&self) -> Box<dyn SelectionBackend> {
        backend_for(&self.capabilities)
    }

    /// An in-memory host selection with this host's limits
    pub fn host_selection(&self) -> HostSelection {
        HostSelection::new(self.capabilities)
    }

    /// Bind a selection model to `host` and load its current state. Each
    /// frame or window gets its own model.
    pub fn get_selection(
        &self,
        tree: &DomTree,
        host: Box<dyn PlatformSelection>,
    ) -> RangeResult<SelectionModel> {
        let backend = self.backend();
        tracing::debug!("Selection uses the {} backend", backend.name());
        let mut selection = SelectionModel::new(tree, self.capabilities, backend, host);
        selection.refresh(tree)?;
        Ok(selection)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_without_range_api_fails() {
        let caps = HostCapabilities {
            range_api: false,
            legacy_range_api: false,
            ..HostCapabilities::full()
        };
        assert!(matches!(
            Environment::init(&caps),
            Err(RangeError::Unsupported(_))
        ));
    }

    #[test]
    fn test_legacy_only_host_is_unsupported() {
        let caps = HostCapabilities {
            range_api: false,
            legacy_range_api: true,
            ..HostCapabilities::full()
        };
        assert!(Environment::init(&caps).is_err());
    }

    #[test]
    fn test_selection_starts_empty() {
        let tree = DomTree::new();
        let env = Environment::init(&HostCapabilities::full()).unwrap();
        let selection = env
            .get_selection(&tree, Box::new(env.host_selection()))
            .unwrap();
        assert_eq!(selection.range_count(), 0);
        assert!(selection.is_collapsed());
        assert_eq!(env.create_range(&tree).start_container(), tree.root());
    }
}
