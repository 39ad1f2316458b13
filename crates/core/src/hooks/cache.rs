use parking_lot::RwLock;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

use super::{ADDONS_INIT, HookIndex, normalize};
use crate::addon::AddonRegistry;
use crate::descriptor::DescriptorStore;
use crate::error::{Error, Result};

/// Process-wide hook index, built on first use and kept until invalidated
#[derive(Debug)]
pub struct HookCache {
    registry: AddonRegistry,
    index: RwLock<Option<Arc<HookIndex>>>,
}

impl HookCache {
    pub fn new(registry: AddonRegistry) -> Self {
        Self {
            registry,
            index: RwLock::new(None),
        }
    }

    pub fn registry(&self) -> &AddonRegistry {
        &self.registry
    }

    /// Cached index, building it from the store's enabled addons if needed
    pub fn get(&self, store: &DescriptorStore) -> Result<Arc<HookIndex>> {
        if let Some(index) = self.index.read().as_ref() {
            return Ok(Arc::clone(index));
        }
        self.rebuild(store)
    }

    /// Rebuilds from disk, swaps the cached index and runs `addons_init`
    pub fn rebuild(&self, store: &DescriptorStore) -> Result<Arc<HookIndex>> {
        let addons = store.enabled()?;
        let index = Arc::new(HookIndex::build(&addons, &self.registry));
        debug!("Built hook index with {} hook(s)", index.len());
        *self.index.write() = Some(Arc::clone(&index));

        for name in index.get(ADDONS_INIT) {
            if let Some(addon) = self.registry.get(name) {
                if let Err(e) = addon.call_hook(ADDONS_INIT, &Value::Null) {
                    warn!("Addon {} failed during {}: {}", name, ADDONS_INIT, e);
                }
            }
        }
        Ok(index)
    }

    pub fn invalidate(&self) {
        *self.index.write() = None;
    }

    /// Calls `hook` on every implementing addon in index order and collects
    /// the results. Addons always see the normalised name. With `once`,
    /// stops at the first non-null result.
    pub fn trigger(
        &self,
        store: &DescriptorStore,
        hook: &str,
        payload: &Value,
        once: bool,
    ) -> Result<Vec<Value>> {
        let index = self.get(store)?;
        let hook = normalize(hook);
        let mut results = Vec::new();

        for name in index.get(&hook) {
            let Some(addon) = self.registry.get(name) else {
                continue;
            };
            let value = addon.call_hook(&hook, payload).map_err(|e| Error::Hook {
                addon: name.clone(),
                message: format!("{e:#}"),
            })?;
            if once && !value.is_null() {
                return Ok(vec![value]);
            }
            results.push(value);
        }
        Ok(results)
    }
}
