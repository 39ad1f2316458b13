use addon_manager_core::{AddonManager, Config, DirectorySource, Error as CoreError, Extra};
use anyhow::{Context, Result, bail};
use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Configuration for `root`, or for the current directory when none is given
pub fn load_config(root: Option<&Path>) -> Result<Config> {
    let start = match root {
        Some(root) => root.to_path_buf(),
        None => env::current_dir().context("Failed to read the current directory")?,
    };
    Config::discover(&start)
        .with_context(|| format!("Failed to load configuration for {}", start.display()))
}

/// Manager serving packages from `packages`, or `<runtime_dir>/packages`
pub fn load_manager(root: Option<&Path>, packages: Option<&Path>) -> Result<AddonManager> {
    let config = load_config(root)?;
    let packages = packages
        .map(Path::to_path_buf)
        .unwrap_or_else(|| default_packages_dir(&config));
    debug!("Serving packages from {}", packages.display());
    Ok(AddonManager::new(config, Arc::new(DirectorySource::new(packages))))
}

pub fn default_packages_dir(config: &Config) -> PathBuf {
    config.host_root.join(&config.runtime_dir).join("packages")
}

/// Splits `KEY=VALUE` arguments
pub fn parse_pairs(pairs: &[String]) -> Result<Vec<(String, String)>> {
    pairs
        .iter()
        .map(|pair| match pair.split_once('=') {
            Some((key, value)) if !key.trim().is_empty() => {
                Ok((key.trim().to_string(), value.to_string()))
            }
            _ => bail!("Expected KEY=VALUE, got `{pair}`"),
        })
        .collect()
}

pub fn parse_extra(pairs: &[String]) -> Result<Extra> {
    Ok(parse_pairs(pairs)?.into_iter().collect())
}

/// Prints an error chain, plus the conflict list and code of core errors
pub fn report_error(err: &anyhow::Error) {
    eprintln!("❌ {err:#}");

    let Some(core) = err.chain().find_map(|e| e.downcast_ref::<CoreError>()) else {
        return;
    };
    if let CoreError::Conflict { files, .. } = core {
        eprintln!("\n⚠️  Conflicting host files (re-run with --force to overwrite):");
        for file in files {
            eprintln!("   • {}", file.display());
        }
    }
    if core.code() != 0 {
        eprintln!("   code: {}", core.code());
    }
}
