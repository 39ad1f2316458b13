//! Per-addon configuration object (`config.json` inside the package)

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// File holding an addon's configuration items
pub const ADDON_CONFIG_FILE: &str = "config.json";

/// One configurable item as declared by the package
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigItem {
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub title: String,
    #[serde(rename = "type", default = "default_item_type")]
    pub kind: String,
    #[serde(default)]
    pub value: Value,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn default_item_type() -> String {
    "string".to_string()
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AddonConfig {
    pub items: Vec<ConfigItem>,
}

impl AddonConfig {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Item name to current value
    pub fn values(&self) -> IndexMap<String, Value> {
        self.items
            .iter()
            .map(|item| (item.name.clone(), item.value.clone()))
            .collect()
    }

    /// Merges `values` into matching items; unknown names are ignored.
    /// Array input for a non-array item is stored comma-joined.
    pub fn apply(&mut self, values: &IndexMap<String, Value>) {
        for item in &mut self.items {
            let Some(value) = values.get(&item.name) else {
                continue;
            };
            item.value = match value {
                Value::Array(parts) if item.kind != "array" => Value::String(
                    parts
                        .iter()
                        .map(|p| match p {
                            Value::String(s) => s.clone(),
                            other => other.to_string(),
                        })
                        .collect::<Vec<_>>()
                        .join(","),
                ),
                other => other.clone(),
            };
        }
    }
}
