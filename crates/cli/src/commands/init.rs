use addon_manager_core::Config;
use addon_manager_core::config::CONFIG_FILE_NAME;
use anyhow::{Context, Result, bail};
use std::env;
use std::path::Path;
use tracing::info;

pub fn init_command(root: Option<&Path>, force: bool) -> Result<()> {
    let root = match root {
        Some(root) => root.to_path_buf(),
        None => env::current_dir().context("Failed to read the current directory")?,
    };
    let path = root.join(CONFIG_FILE_NAME);

    println!("🔧 Initializing addon manager in {}", root.display());

    if path.exists() && !force {
        bail!(
            "{} already exists, use --force to overwrite it",
            path.display()
        );
    }

    // host_root stays relative so the tree can be moved
    let config = Config::default();
    config
        .save_to_file(&path)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    info!("Wrote {}", path.display());

    println!("✅ Created {}", path.display());
    println!("   • addons:   {}", config.addon_dir.display());
    println!("   • overlay:  {}", config.overlay_dir.display());
    println!("   • bootstrap: {}", config.bootstrap_file.display());
    Ok(())
}
