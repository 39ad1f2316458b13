use heck::ToUpperCamelCase;
use indexmap::IndexMap;
use parking_lot::RwLock;
use serde_json::Value;
use std::sync::Arc;

use super::Params;

/// Request handler of one addon controller
pub trait Controller: Send {
    fn has_action(&self, action: &str) -> bool;

    fn call(&mut self, action: &str, params: &Params) -> anyhow::Result<Value>;

    /// Whether unknown actions are routed to `fallback`
    fn has_fallback(&self) -> bool {
        false
    }

    fn fallback(&mut self, action: &str) -> anyhow::Result<Value> {
        anyhow::bail!("no fallback for action {action}")
    }
}

pub type ControllerFactory = Arc<dyn Fn() -> Box<dyn Controller> + Send + Sync>;

/// `(addon, module, controller)` with the controller in its conventional
/// Studly form; multi-level controllers keep their dotted prefix
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ControllerKey {
    pub addon: String,
    pub module: Option<String>,
    pub controller: String,
}

impl ControllerKey {
    pub fn new(addon: &str, module: Option<&str>, controller: &str) -> Self {
        Self {
            addon: addon.trim().to_string(),
            module: module.map(|m| m.trim().to_string()),
            controller: studly_controller(controller),
        }
    }

    /// Conventional class path, used in messages and events
    pub fn class_name(&self) -> String {
        let controller = self.controller.replace('.', "\\");
        match &self.module {
            Some(module) => format!(
                "\\addons\\{}\\app\\{}\\controller\\{}",
                self.addon, module, controller
            ),
            None => format!("\\addons\\{}\\controller\\{}", self.addon, controller),
        }
    }
}

/// `post` -> `Post`, `user.profile_edit` -> `user.ProfileEdit`
pub fn studly_controller(controller: &str) -> String {
    match controller.trim().rsplit_once('.') {
        Some((prefix, last)) => format!("{prefix}.{}", last.to_upper_camel_case()),
        None => controller.trim().to_upper_camel_case(),
    }
}

/// Process-wide controller lookup, populated by each addon at startup
#[derive(Default, Clone)]
pub struct ControllerRegistry {
    factories: Arc<RwLock<IndexMap<ControllerKey, ControllerFactory>>>,
}

impl std::fmt::Debug for ControllerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ControllerRegistry")
            .field("controllers", &self.factories.read().keys().collect::<Vec<_>>())
            .finish()
    }
}

impl ControllerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F>(&self, addon: &str, module: Option<&str>, controller: &str, factory: F)
    where
        F: Fn() -> Box<dyn Controller> + Send + Sync + 'static,
    {
        self.factories
            .write()
            .insert(ControllerKey::new(addon, module, controller), Arc::new(factory));
    }

    pub fn get(&self, key: &ControllerKey) -> Option<ControllerFactory> {
        self.factories.read().get(key).cloned()
    }

    pub fn len(&self) -> usize {
        self.factories.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.read().is_empty()
    }
}
