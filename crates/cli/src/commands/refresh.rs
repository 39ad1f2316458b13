use addon_manager_core::AddonManager;
use anyhow::{Context, Result};

pub fn refresh_command(manager: &AddonManager) -> Result<()> {
    manager.refresh().context("Failed to refresh addon state")?;

    let config = manager.config();
    println!("🔄 Refreshed addon state");
    println!("   • {}", config.bootstrap_path().display());
    if !config.autoload {
        println!("   • {}", config.route_config_path().display());
    }
    Ok(())
}

pub fn hooks_command(manager: &AddonManager) -> Result<()> {
    let index = manager.hook_index().context("Failed to build the hook index")?;

    if index.is_empty() {
        println!("ℹ️  No enabled addon implements a hook");
        println!("   addonctl registers no addon code; hooks are indexed by the host process");
        return Ok(());
    }

    println!("🪝 Hooks:");
    for (hook, addons) in index.iter() {
        println!("   {} -> {}", hook, addons.join(", "));
    }
    Ok(())
}
