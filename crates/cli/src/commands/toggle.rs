use addon_manager_core::AddonManager;
use anyhow::{Context, Result};

pub fn enable_command(manager: &AddonManager, name: &str, force: bool) -> Result<()> {
    let descriptor = manager
        .enable(name, force)
        .with_context(|| format!("Failed to enable addon {name}"))?;
    println!("✅ Enabled {} {}", descriptor.name, descriptor.version);
    Ok(())
}

pub fn disable_command(manager: &AddonManager, name: &str, force: bool) -> Result<()> {
    let descriptor = manager
        .disable(name, force)
        .with_context(|| format!("Failed to disable addon {name}"))?;
    println!("⏸️  Disabled {} {}", descriptor.name, descriptor.version);
    Ok(())
}
