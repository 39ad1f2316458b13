use addon_manager_core::AddonManager;
use anyhow::{Context, Result};

pub fn uninstall_command(manager: &AddonManager, name: &str, force: bool) -> Result<()> {
    println!("🗑️  Uninstalling {}...", name);

    manager
        .uninstall(name, force)
        .with_context(|| format!("Failed to uninstall addon {name}"))?;

    println!("✅ Uninstalled {}", name);
    if !force {
        println!("   • files it copied into the host tree were kept, use --force to remove them");
    }
    Ok(())
}
