//! Addon lifecycle: install, enable, disable, upgrade and uninstall
//!
//! Every operation holds the addon's exclusive section for its whole
//! duration and finishes by rebuilding the derived state (hook index,
//! rewrite table, bootstrap bundle and route config) before returning.

pub mod locks;
pub mod refresh;

pub use locks::AddonLocks;
pub use refresh::{RouteConfig, bootstrap_bundle, write_artifacts};

use chrono::Local;
use indexmap::IndexMap;
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::addon::{Addon, AddonRegistry};
use crate::config::Config;
use crate::conflict::{ConflictCheck, ConflictResolver};
use crate::descriptor::{AddonDescriptor, AddonState, DescriptorStore};
use crate::error::{Error, Result};
use crate::hooks::{HookCache, HookIndex};
use crate::package::{Extra, PackageSource, backup_dir, extract_zip};
use crate::route::{ControllerRegistry, Dispatcher, Host, Params, RewriteCache, UrlBuilder};
use crate::schema::{self, NoopExecutor, SqlExecutor};
use crate::utils::fs::remove_tree;

/// Coordinates the descriptor store, the conflict resolver and the package
/// source. Cheap to share behind an `Arc`.
pub struct AddonManager {
    config: Arc<Config>,
    store: Arc<DescriptorStore>,
    resolver: ConflictResolver,
    hooks: Arc<HookCache>,
    rewrites: Arc<RewriteCache>,
    source: Arc<dyn PackageSource>,
    sql: Arc<dyn SqlExecutor>,
    locks: AddonLocks,
}

impl std::fmt::Debug for AddonManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AddonManager")
            .field("config", &self.config)
            .field("store", &self.store)
            .finish_non_exhaustive()
    }
}

impl AddonManager {
    pub fn new(config: Config, source: Arc<dyn PackageSource>) -> Self {
        Self {
            store: Arc::new(DescriptorStore::from_config(&config)),
            resolver: ConflictResolver::new(&config),
            hooks: Arc::new(HookCache::new(AddonRegistry::new())),
            rewrites: Arc::new(RewriteCache::new()),
            locks: AddonLocks::new(config.locks_path()),
            config: Arc::new(config),
            source,
            sql: Arc::new(NoopExecutor),
        }
    }

    /// Uses `registry` for lifecycle callbacks and hook discovery
    pub fn with_registry(mut self, registry: AddonRegistry) -> Self {
        self.hooks = Arc::new(HookCache::new(registry));
        self
    }

    pub fn with_sql_executor(mut self, sql: Arc<dyn SqlExecutor>) -> Self {
        self.sql = sql;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn store(&self) -> &DescriptorStore {
        &self.store
    }

    pub fn registry(&self) -> &AddonRegistry {
        self.hooks.registry()
    }

    /// Fetches, unpacks and verifies a package, copies its overlay into the
    /// host tree and enables it.
    ///
    /// The addon directory is removed again only when verification fails;
    /// a failure in any later step leaves it in place for inspection. A
    /// forced reinstall over an enabled addon first puts the host files back
    /// the way the previous enable found them.
    pub fn install(&self, name: &str, force: bool, extra: &Extra) -> Result<AddonDescriptor> {
        validate_name(name)?;
        self.locks.with_lock(name, || {
            let dir = self.store.addon_path(name);
            if dir.exists() {
                if !force {
                    return Err(Error::AlreadyInstalled(name.to_string()));
                }
                self.withdraw_overlay(name)?;
            }

            info!("Installing addon {}", name);
            let bytes = self.source.fetch(name, extra)?;
            let unpacked = extract_zip(&bytes, &dir)?;
            debug!("Unpacked {} file(s) into {}", unpacked, dir.display());

            if let Err(e) = self.verify(name, force) {
                warn!("Addon {} failed verification, removing {}", name, dir.display());
                remove_tree(&dir)?;
                return Err(e);
            }

            let files = self.resolver.global_files(name, false)?;
            self.resolver.snapshot_and_backup(name, &files)?;
            self.resolver.apply_overlay(name)?;

            let mut descriptor = self.store.read(name)?;
            if !descriptor.state.is_enabled() {
                descriptor.state = AddonState::Enabled;
                self.store.save(name, &descriptor)?;
            }

            self.run_callback(name, |addon| addon.install())?;
            self.import_schema(name)?;
            self.refresh()?;

            info!("Installed addon {}", name);
            self.store.read(name)
        })
    }

    /// Runs the uninstall callback and removes the addon directory. With
    /// `force`, the overlay files are also removed from the host tree and
    /// the pre-enable snapshot restored.
    pub fn uninstall(&self, name: &str, force: bool) -> Result<()> {
        validate_name(name)?;
        self.locks.with_lock(name, || {
            if !self.store.exists(name) {
                return Err(Error::NotFound(name.to_string()));
            }

            info!("Uninstalling addon {}", name);
            self.run_callback(name, |addon| addon.uninstall())?;

            if !force {
                self.ensure_no_conflicts(name)?;
            } else {
                let removed = self.resolver.remove_overlay(name)?;
                debug!("Removed {} overlay file(s) of {}", removed, name);
                self.resolver.restore(name)?;
            }

            remove_tree(&self.store.addon_path(name))?;
            self.store.invalidate(name);
            self.refresh()?;

            info!("Uninstalled addon {}", name);
            Ok(())
        })
    }

    /// Snapshots the host files the overlay would replace, copies the
    /// overlay in and marks the addon enabled. Without `force`, conflicts
    /// abort before anything is touched.
    pub fn enable(&self, name: &str, force: bool) -> Result<AddonDescriptor> {
        validate_name(name)?;
        self.locks.with_lock(name, || {
            let mut descriptor = self.store.read(name)?;
            if !force {
                self.ensure_no_conflicts(name)?;
            }

            // re-enabling must not snapshot the addon's own files
            if descriptor.state.is_enabled() && self.resolver.has_backup(name) {
                debug!("Addon {} already enabled, keeping its snapshot", name);
            } else {
                let files = self.resolver.global_files(name, false)?;
                self.resolver.snapshot_and_backup(name, &files)?;
            }
            let copied = self.resolver.apply_overlay(name)?;
            debug!("Copied {} overlay file(s) of {}", copied, name);

            descriptor.state = AddonState::Enabled;
            self.store.save(name, &descriptor)?;

            self.run_callback(name, |addon| addon.enable())?;
            self.refresh()?;

            info!("Enabled addon {}", name);
            Ok(descriptor)
        })
    }

    /// Removes the addon's overlay files from the host tree, restores the
    /// snapshot taken by the most recent enable and marks the addon disabled.
    /// Host edits made to overlay files since enable are discarded. An addon
    /// that is already disabled is left alone unless `force`.
    pub fn disable(&self, name: &str, force: bool) -> Result<AddonDescriptor> {
        validate_name(name)?;
        self.locks.with_lock(name, || {
            let mut descriptor = self.store.read(name)?;
            if !descriptor.state.is_enabled() && !force {
                debug!("Addon {} already disabled", name);
                return Ok(descriptor);
            }
            if let ConflictCheck::Conflicts(files) = self.resolver.check(name)? {
                warn!(
                    "Addon {}: {} overlay file(s) changed since enable, discarding: {:?}",
                    name,
                    files.len(),
                    files
                );
            }

            self.run_callback(name, |addon| addon.disable())?;

            let removed = self.resolver.remove_overlay(name)?;
            let restored = self.resolver.restore(name)?;
            debug!("Removed {} and restored {} file(s) for {}", removed, restored, name);

            descriptor.state = AddonState::Disabled;
            self.store.save(name, &descriptor)?;
            self.refresh()?;

            info!("Disabled addon {}", name);
            Ok(descriptor)
        })
    }

    /// Replaces a disabled addon with a freshly fetched package. The old
    /// directory is archived under the runtime directory first and the
    /// addon's configuration values carry over. Returns the archive path.
    pub fn upgrade(&self, name: &str, extra: &Extra) -> Result<PathBuf> {
        validate_name(name)?;
        self.locks.with_lock(name, || {
            let descriptor = self.store.read(name)?;
            if descriptor.state.is_enabled() {
                return Err(Error::Enabled(name.to_string()));
            }

            info!("Upgrading addon {} from {}", name, descriptor.version);
            let values = self.store.config_values(name)?;

            let dir = self.store.addon_path(name);
            let archive = self.config.runtime_addons_path().join(format!(
                "{}-backup-{}.zip",
                name,
                Local::now().format("%Y%m%d%H%M%S")
            ));
            backup_dir(&dir, &archive)?;
            info!("Backed up {} to {}", name, archive.display());

            let bytes = self.source.fetch(name, extra)?;
            extract_zip(&bytes, &dir)?;
            self.store.invalidate(name);

            let mut upgraded = self.store.read(name)?;
            if upgraded.state.is_enabled() {
                upgraded.state = AddonState::Disabled;
                self.store.save(name, &upgraded)?;
            }
            if !values.is_empty() {
                self.store.set_config_values(name, &values)?;
            }

            self.import_schema(name)?;
            self.run_callback(name, |addon| addon.upgrade())?;
            self.refresh()?;

            info!("Upgraded addon {} to {}", name, upgraded.version);
            Ok(archive)
        })
    }

    /// Drops every cache and regenerates the derived artifacts
    pub fn refresh(&self) -> Result<()> {
        self.store.invalidate_all();
        self.hooks.invalidate();
        self.rewrites.invalidate();

        let index = self.hooks.rebuild(&self.store)?;
        self.rewrites.rebuild(&self.store, &self.config)?;
        let addons = self.store.enabled()?;
        write_artifacts(&self.config, &self.store, &addons, &index)
    }

    pub fn check_conflicts(&self, name: &str) -> Result<ConflictCheck> {
        validate_name(name)?;
        self.resolver.check(name)
    }

    pub fn global_files(&self, name: &str, only_conflicting: bool) -> Result<Vec<PathBuf>> {
        validate_name(name)?;
        self.resolver.global_files(name, only_conflicting)
    }

    pub fn list(&self) -> Result<Vec<(String, AddonDescriptor)>> {
        self.store.list()
    }

    pub fn list_modules(&self) -> Result<Vec<(String, AddonDescriptor)>> {
        self.store.list_modules()
    }

    pub fn list_apps(&self, only_running: bool) -> Result<Vec<(String, AddonDescriptor)>> {
        self.store.list_apps(only_running)
    }

    pub fn descriptor(&self, name: &str) -> Result<AddonDescriptor> {
        validate_name(name)?;
        self.store.load(name)
    }

    pub fn get_config(&self, name: &str) -> Result<IndexMap<String, Value>> {
        validate_name(name)?;
        if !self.store.exists(name) {
            return Err(Error::NotFound(name.to_string()));
        }
        self.store.config_values(name)
    }

    pub fn set_config(&self, name: &str, values: &IndexMap<String, Value>) -> Result<()> {
        validate_name(name)?;
        self.locks.with_lock(name, || {
            if !self.store.exists(name) {
                return Err(Error::NotFound(name.to_string()));
            }
            self.store.set_config_values(name, values)
        })
    }

    pub fn hook_index(&self) -> Result<Arc<HookIndex>> {
        self.hooks.get(&self.store)
    }

    /// Calls `event` on every addon implementing it, in index order
    pub fn hook(&self, event: &str, payload: &Value, once: bool) -> Result<Vec<Value>> {
        self.hooks.trigger(&self.store, event, payload, once)
    }

    pub fn build_url(&self, url: &str, params: &Params) -> String {
        UrlBuilder::new(&self.config, &self.store).build(url, params)
    }

    /// Dispatcher sharing this manager's caches, so lifecycle changes are
    /// visible to the next request
    pub fn dispatcher(&self, controllers: ControllerRegistry, host: Arc<dyn Host>) -> Dispatcher {
        Dispatcher::new(
            Arc::clone(&self.config),
            Arc::clone(&self.store),
            Arc::clone(&self.hooks),
            Arc::clone(&self.rewrites),
            controllers,
            host,
        )
    }

    /// Package checks run between unpacking and the overlay copy
    fn verify(&self, name: &str, force: bool) -> Result<()> {
        self.store.invalidate(name);
        if !self.store.is_package(name) {
            return Err(Error::Descriptor(format!(
                "package {name} is missing {} or its descriptor",
                self.store.entry_point(name).display()
            )));
        }
        let descriptor = self.store.read(name)?;
        if !descriptor.is_complete() {
            return Err(Error::Descriptor(format!(
                "descriptor of {name} needs name, title and version"
            )));
        }
        if descriptor.name != name {
            return Err(Error::Descriptor(format!(
                "descriptor names {} but the package is {name}",
                descriptor.name
            )));
        }
        if !force {
            self.ensure_no_conflicts(name)?;
        }
        Ok(())
    }

    /// Removes an enabled addon's overlay from the host tree and restores its
    /// snapshot, so the next snapshot captures the host's own files
    fn withdraw_overlay(&self, name: &str) -> Result<()> {
        let enabled = matches!(self.store.read(name), Ok(d) if d.state.is_enabled());
        if !enabled {
            return Ok(());
        }
        let removed = self.resolver.remove_overlay(name)?;
        let restored = self.resolver.restore(name)?;
        debug!(
            "Withdrew {} overlay file(s) and restored {} for reinstall of {}",
            removed, restored, name
        );
        Ok(())
    }

    fn ensure_no_conflicts(&self, name: &str) -> Result<()> {
        match self.resolver.check(name)? {
            ConflictCheck::Clear => Ok(()),
            ConflictCheck::Conflicts(files) => Err(Error::Conflict {
                name: name.to_string(),
                files,
            }),
        }
    }

    fn import_schema(&self, name: &str) -> Result<()> {
        let report = schema::import_file(
            &self.store.addon_path(name),
            &self.config.table_prefix,
            self.sql.as_ref(),
        )?;
        if report.failed > 0 {
            warn!(
                "Schema import for {}: {} statement(s) failed, {} executed",
                name, report.failed, report.executed
            );
        }
        Ok(())
    }

    fn run_callback<F>(&self, name: &str, callback: F) -> Result<()>
    where
        F: FnOnce(&dyn Addon) -> anyhow::Result<()>,
    {
        let Some(addon) = self.registry().get(name) else {
            return Ok(());
        };
        callback(addon.as_ref()).map_err(|e| Error::Hook {
            addon: name.to_string(),
            message: format!("{e:#}"),
        })
    }
}

/// Addon names double as directory names and must stay inside the addon root
pub fn validate_name(name: &str) -> Result<()> {
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if valid {
        Ok(())
    } else {
        Err(Error::Package(format!("invalid addon name `{name}`")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_name() {
        assert!(validate_name("blog").is_ok());
        assert!(validate_name("user_center-2").is_ok());
        assert!(validate_name("").is_err());
        assert!(validate_name("../etc").is_err());
        assert!(validate_name("a/b").is_err());
    }
}
