use addon_manager_core::AddonManager;
use anyhow::{Context, Result};

pub fn conflicts_command(manager: &AddonManager, name: &str, all: bool) -> Result<()> {
    let files = manager
        .global_files(name, !all)
        .with_context(|| format!("Failed to scan the overlay of {name}"))?;

    if files.is_empty() {
        if all {
            println!("ℹ️  {} has no overlay files", name);
        } else {
            println!("✅ {} does not conflict with the host tree", name);
        }
        return Ok(());
    }

    if all {
        println!("📂 Overlay files of {}:", name);
    } else {
        println!("⚠️  Host files {} would overwrite:", name);
    }
    for file in &files {
        println!("   • {}", file.display());
    }
    Ok(())
}
