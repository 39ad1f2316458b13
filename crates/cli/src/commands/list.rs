use addon_manager_core::{AddonDescriptor, AddonManager};
use anyhow::{Context, Result};

use crate::cli::KindFilter;

pub fn list_command(manager: &AddonManager, kind: KindFilter, running: bool, json: bool) -> Result<()> {
    let addons = match kind {
        KindFilter::All => manager.list(),
        KindFilter::Modules => manager.list_modules(),
        KindFilter::Apps => manager.list_apps(running),
    }
    .context("Failed to list addons")?;
    let addons: Vec<AddonDescriptor> = addons
        .into_iter()
        .map(|(_, descriptor)| descriptor)
        .filter(|descriptor| !running || descriptor.state.is_enabled())
        .collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&addons)?);
        return Ok(());
    }

    if addons.is_empty() {
        println!(
            "ℹ️  No addons found in {}",
            manager.config().addons_path().display()
        );
        return Ok(());
    }

    println!("📦 Addons in {}:", manager.config().addons_path().display());
    for addon in &addons {
        let marker = if addon.state.is_enabled() { "✅" } else { "⏸️ " };
        println!(
            "   {} {} {} [{:?}] {}",
            marker, addon.name, addon.version, addon.kind, addon.title
        );
    }
    Ok(())
}

pub fn info_command(manager: &AddonManager, name: &str) -> Result<()> {
    let descriptor = manager
        .descriptor(name)
        .with_context(|| format!("Failed to load addon {name}"))?;
    let config = manager
        .get_config(name)
        .with_context(|| format!("Failed to load configuration of {name}"))?;

    println!("📦 {} {}", descriptor.name, descriptor.version);
    println!("   • title:  {}", descriptor.title);
    if !descriptor.author.is_empty() {
        println!("   • author: {}", descriptor.author);
    }
    println!("   • state:  {:?}", descriptor.state);
    if let Some(domain) = &descriptor.domain {
        println!("   • domain: {}", domain);
    }
    if !descriptor.rewrite.is_empty() {
        println!("\n🔀 Rewrite rules:");
        for (path, template) in &descriptor.rewrite {
            println!("   {} -> {}", path, template);
        }
    }
    if !config.is_empty() {
        println!("\n⚙️  Configuration:");
        for (key, value) in &config {
            println!("   {} = {}", key, value);
        }
    }
    Ok(())
}
