//! Addon entry points
//!
//! Each addon registers one `Addon` implementation under its name. The
//! lifecycle manager calls its install/enable/... callbacks, and the hook
//! index reads the hook names it declares.

use indexmap::IndexMap;
use parking_lot::RwLock;
use serde_json::Value;
use std::sync::Arc;

/// Capability names every addon has; they are never treated as hooks
pub const BASE_CAPABILITIES: &[&str] = &[
    "install",
    "uninstall",
    "enable",
    "disable",
    "upgrade",
    "get_info",
    "get_config",
    "set_config",
    "check_info",
];

/// Main addon interface
pub trait Addon: Send + Sync {
    /// Addon name, equal to its directory name
    fn name(&self) -> &str;

    /// Hook names this addon implements
    fn hooks(&self) -> Vec<String> {
        Vec::new()
    }

    /// Invoked for every hook named in `hooks()`
    fn call_hook(&self, _hook: &str, _payload: &Value) -> anyhow::Result<Value> {
        Ok(Value::Null)
    }

    fn install(&self) -> anyhow::Result<()> {
        Ok(())
    }

    fn uninstall(&self) -> anyhow::Result<()> {
        Ok(())
    }

    fn enable(&self) -> anyhow::Result<()> {
        Ok(())
    }

    fn disable(&self) -> anyhow::Result<()> {
        Ok(())
    }

    fn upgrade(&self) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Process-wide mapping from addon name to its entry point
#[derive(Default, Clone)]
pub struct AddonRegistry {
    addons: Arc<RwLock<IndexMap<String, Arc<dyn Addon>>>>,
}

impl std::fmt::Debug for AddonRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AddonRegistry")
            .field("addons", &self.addons.read().keys().collect::<Vec<_>>())
            .finish()
    }
}

impl AddonRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an addon, replacing any earlier one with the same name
    pub fn register(&self, addon: Arc<dyn Addon>) {
        self.addons.write().insert(addon.name().to_string(), addon);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Addon>> {
        self.addons.read().get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.addons.read().contains_key(name)
    }

    pub fn names(&self) -> Vec<String> {
        self.addons.read().keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Blog;

    impl Addon for Blog {
        fn name(&self) -> &str {
            "blog"
        }
    }

    #[test]
    fn test_register_replaces_by_name() {
        let registry = AddonRegistry::new();
        registry.register(Arc::new(Blog));
        registry.register(Arc::new(Blog));

        assert_eq!(registry.names(), ["blog"]);
        assert!(registry.get("blog").is_some());
        assert!(!registry.contains("shop"));
    }
}
