use addon_manager_core::AddonManager;
use anyhow::{Context, Result};
use indexmap::IndexMap;
use serde_json::Value;

use crate::utils::parse_pairs;

pub fn config_command(manager: &AddonManager, name: &str, set: &[String]) -> Result<()> {
    if !set.is_empty() {
        let values: IndexMap<String, Value> = parse_pairs(set)?
            .into_iter()
            .map(|(key, raw)| {
                let value = serde_json::from_str(&raw).unwrap_or(Value::String(raw));
                (key, value)
            })
            .collect();
        manager
            .set_config(name, &values)
            .with_context(|| format!("Failed to update configuration of {name}"))?;
        println!("✅ Updated {} value(s) of {}", values.len(), name);
    }

    let config = manager
        .get_config(name)
        .with_context(|| format!("Failed to load configuration of {name}"))?;
    if config.is_empty() {
        println!("ℹ️  {} has no configuration", name);
        return Ok(());
    }
    println!("⚙️  {}:", name);
    for (key, value) in &config {
        println!("   {} = {}", key, value);
    }
    Ok(())
}
