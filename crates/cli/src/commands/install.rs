use addon_manager_core::AddonManager;
use anyhow::{Context, Result};
use tracing::debug;

use crate::utils::parse_extra;

pub fn install_command(manager: &AddonManager, name: &str, force: bool, extra: &[String]) -> Result<()> {
    let extra = parse_extra(extra)?;
    debug!("Install {} with extra {:?}", name, extra);
    println!("📥 Installing {}...", name);

    let descriptor = manager
        .install(name, force, &extra)
        .with_context(|| format!("Failed to install addon {name}"))?;

    println!(
        "✅ Installed {} {} ({:?})",
        descriptor.name, descriptor.version, descriptor.state
    );
    Ok(())
}

pub fn upgrade_command(manager: &AddonManager, name: &str, extra: &[String]) -> Result<()> {
    let extra = parse_extra(extra)?;
    println!("⬆️  Upgrading {}...", name);

    let archive = manager
        .upgrade(name, &extra)
        .with_context(|| format!("Failed to upgrade addon {name}"))?;
    let descriptor = manager.descriptor(name)?;

    println!("✅ Upgraded {} to {}", name, descriptor.version);
    println!("   • previous version archived at {}", archive.display());
    println!("   • enable it again with `addonctl enable {}`", name);
    Ok(())
}
