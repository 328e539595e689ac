//! Destination platforms and their connection flags.

use tracing::{debug, warn};

use gostream_ipc::Platform;

use crate::error::EngineError;
use crate::EngineResult;

/// Single source of truth for which destinations are linked and active.
///
/// Every mutation keeps `active => connected` for every platform.
#[derive(Debug, Clone)]
pub struct PlatformRegistry {
    platforms: Vec<Platform>,
}

impl PlatformRegistry {
    /// Create a registry from a catalog.
    pub fn new(platforms: Vec<Platform>) -> Self {
        let mut registry = Self {
            platforms: Vec::new(),
        };
        registry.replace_all(platforms);
        registry
    }

    /// Platforms in catalog order.
    pub fn list(&self) -> &[Platform] {
        &self.platforms
    }

    /// Look up a platform.
    pub fn get(&self, id: &str) -> EngineResult<&Platform> {
        self.platforms
            .iter()
            .find(|p| p.id == id)
            .ok_or_else(|| EngineError::NotFound(id.to_string()))
    }

    fn get_mut(&mut self, id: &str) -> EngineResult<&mut Platform> {
        self.platforms
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| EngineError::NotFound(id.to_string()))
    }

    /// Set the active flag. Activating a disconnected platform is refused.
    pub fn set_active(&mut self, id: &str, active: bool) -> EngineResult<()> {
        let platform = self.get_mut(id)?;
        if active && !platform.connected {
            return Err(EngineError::InvalidState(format!(
                "{} is not connected",
                platform.name
            )));
        }
        platform.active = active;
        debug!(platform = id, active, "Destination activation changed");
        Ok(())
    }

    /// Flip the active flag of a connected platform. Returns the new value.
    pub fn toggle_active(&mut self, id: &str) -> EngineResult<bool> {
        let active = !self.get(id)?.active;
        self.set_active(id, active)?;
        Ok(active)
    }

    /// Set the connected flag. Disconnecting also deactivates.
    pub fn set_connected(&mut self, id: &str, connected: bool) -> EngineResult<()> {
        let platform = self.get_mut(id)?;
        platform.connected = connected;
        if !connected {
            platform.active = false;
        }
        debug!(platform = id, connected, "Destination connection changed");
        Ok(())
    }

    /// Replace the whole list, e.g. from persisted state.
    ///
    /// Entries claiming `active` without `connected` are deactivated.
    pub fn replace_all(&mut self, mut platforms: Vec<Platform>) {
        for platform in platforms.iter_mut().filter(|p| p.active && !p.connected) {
            warn!(platform = %platform.id, "Active but not connected, deactivating");
            platform.active = false;
        }
        self.platforms = platforms;
    }

    /// Number of platforms that are both active and connected.
    pub fn active_count(&self) -> usize {
        self.platforms.iter().filter(|p| p.is_broadcasting()).count()
    }

    /// Platforms that are both active and connected, in catalog order.
    pub fn broadcasting(&self) -> impl Iterator<Item = &Platform> {
        self.platforms.iter().filter(|p| p.is_broadcasting())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gostream_ipc::default_catalog;

    fn registry() -> PlatformRegistry {
        PlatformRegistry::new(default_catalog())
    }

    #[test]
    fn test_list_keeps_catalog_order() {
        let ids: Vec<_> = registry().list().iter().map(|p| p.id.clone()).collect();
        assert_eq!(ids, vec!["twitch", "youtube", "kick", "facebook"]);
    }

    #[test]
    fn test_get_unknown_is_not_found() {
        assert!(matches!(
            registry().get("myspace"),
            Err(EngineError::NotFound(_))
        ));
    }

    #[test]
    fn test_activating_disconnected_is_rejected() {
        let mut registry = registry();
        let before = registry.list().to_vec();

        let result = registry.set_active("kick", true);

        assert!(matches!(result, Err(EngineError::InvalidState(_))));
        assert_eq!(registry.list(), before.as_slice());
    }

    #[test]
    fn test_disconnect_cascades_to_inactive() {
        let mut registry = registry();
        registry.set_connected("twitch", false).unwrap();

        let twitch = registry.get("twitch").unwrap();
        assert!(!twitch.connected);
        assert!(!twitch.active);
        assert_eq!(registry.active_count(), 1);
    }

    #[test]
    fn test_toggle_active_flips_connected_platform() {
        let mut registry = registry();
        assert!(!registry.toggle_active("youtube").unwrap());
        assert!(registry.toggle_active("youtube").unwrap());
        assert!(registry.toggle_active("facebook").is_err());
    }

    #[test]
    fn test_replace_all_normalizes_invariant() {
        let mut registry = registry();
        let mut snapshot = default_catalog();
        snapshot[2].active = true; // kick, not connected

        registry.replace_all(snapshot);

        assert!(!registry.get("kick").unwrap().active);
        assert!(registry.list().iter().all(|p| !p.active || p.connected));
    }

    #[test]
    fn test_broadcasting_lists_active_connected_only() {
        let mut registry = registry();
        registry.set_active("twitch", false).unwrap();
        let ids: Vec<_> = registry.broadcasting().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["youtube"]);
    }
}
