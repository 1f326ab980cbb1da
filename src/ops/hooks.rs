//! Host lifecycle events.

use crate::core::ModuleConfig;

/// Events the host forwards to the coordinator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostEvent {
    /// A participating module announced itself.
    ModuleRegistered(ModuleConfig),
    /// A module was activated.
    ModuleActivated { slug: String },
    /// A module was deactivated.
    ModuleDeactivated { slug: String },
    /// Modules were installed or upgraded.
    UpgradeComplete,
}

impl HostEvent {
    /// Whether this event makes persisted package information stale.
    pub fn invalidates_cache(&self) -> bool {
        !matches!(self, HostEvent::ModuleRegistered(_))
    }
}
