//! Hook index: hook name to the ordered addons implementing it

pub mod cache;

pub use cache::HookCache;

use heck::ToSnakeCase;
use indexmap::IndexMap;
use serde::Serialize;

use crate::addon::{AddonRegistry, BASE_CAPABILITIES};
use crate::descriptor::AddonDescriptor;

/// Hook run once, eagerly, whenever the index is built
pub const ADDONS_INIT: &str = "addons_init";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct HookIndex {
    hooks: IndexMap<String, Vec<String>>,
}

impl HookIndex {
    /// Builds the index from the enabled addons among `addons`, in the order given
    pub fn build(addons: &[AddonDescriptor], registry: &AddonRegistry) -> Self {
        let mut index = HookIndex::default();

        for descriptor in addons.iter().filter(|d| d.state.is_enabled()) {
            let Some(addon) = registry.get(&descriptor.name) else {
                tracing::debug!("Addon {} has no registered entry point", descriptor.name);
                continue;
            };
            for hook in addon.hooks() {
                index.insert(&hook, &descriptor.name);
            }
        }
        index
    }

    fn insert(&mut self, hook: &str, addon: &str) {
        let hook = normalize(hook);
        if hook.is_empty() || BASE_CAPABILITIES.contains(&hook.as_str()) {
            return;
        }
        let implementers = self.hooks.entry(hook).or_default();
        if !implementers.iter().any(|a| a == addon) {
            implementers.push(addon.to_string());
        }
    }

    pub fn get(&self, hook: &str) -> &[String] {
        self.hooks
            .get(&normalize(hook))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn contains(&self, hook: &str) -> bool {
        self.hooks.contains_key(&normalize(hook))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Vec<String>)> {
        self.hooks.iter()
    }

    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }

    pub fn as_map(&self) -> &IndexMap<String, Vec<String>> {
        &self.hooks
    }
}

/// Hook names are stored snake_case: `userLogin` and `UserLogin` are `user_login`
pub fn normalize(hook: &str) -> String {
    hook.trim().to_snake_case()
}
