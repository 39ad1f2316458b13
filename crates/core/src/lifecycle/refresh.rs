//! Derived artifacts regenerated after every lifecycle change: the front-end
//! bootstrap bundle and the persisted route/hook configuration.

use indexmap::IndexMap;
use serde::Serialize;
use tracing::{debug, info};

use crate::config::Config;
use crate::descriptor::{AddonDescriptor, DescriptorStore};
use crate::error::Result;
use crate::hooks::HookIndex;
use crate::utils::fs::write_atomic;

/// Per-addon front-end snippet, relative to the addon directory
pub const BOOTSTRAP_SNIPPET: &str = "bootstrap.js";

const BOOTSTRAP_TEMPLATE: &str = "define([], function () {\n    {__JS__}\n});";

/// Wraps every enabled addon's bootstrap snippet in the module template.
/// Addons without a snippet are skipped.
pub fn bootstrap_bundle(store: &DescriptorStore, addons: &[AddonDescriptor]) -> Result<String> {
    let mut snippets = Vec::new();
    for addon in addons.iter().filter(|a| a.state.is_enabled()) {
        let path = store.addon_path(&addon.name).join(BOOTSTRAP_SNIPPET);
        if !path.is_file() {
            debug!("Addon {} has no {}", addon.name, BOOTSTRAP_SNIPPET);
            continue;
        }
        snippets.push(std::fs::read_to_string(&path)?);
    }
    Ok(BOOTSTRAP_TEMPLATE.replace("{__JS__}", &snippets.join("\n")))
}

/// Rewrite rules of an addon bound to its own domain
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DomainRoute {
    pub addon: String,
    pub domain: String,
    pub rule: IndexMap<String, String>,
}

/// Route and hook configuration persisted for hosts that do not compute
/// it on every request
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteConfig {
    pub autoload: bool,
    pub hooks: IndexMap<String, Vec<String>>,
    /// URL template -> `addon/logical/path`
    pub route: IndexMap<String, String>,
    pub domains: Vec<DomainRoute>,
}

impl RouteConfig {
    pub fn build(addons: &[AddonDescriptor], hooks: &HookIndex, config: &Config) -> Self {
        let mut route = IndexMap::new();
        let mut domains = Vec::new();

        for addon in addons.iter().filter(|a| a.state.is_enabled()) {
            let rule: IndexMap<String, String> = addon
                .rewrite
                .iter()
                .map(|(path, template)| (template.clone(), format!("{}/{}", addon.name, path)))
                .collect();

            match addon.domain.as_deref().filter(|d| !d.is_empty()) {
                Some(domain) if config.url_domain_deploy => domains.push(DomainRoute {
                    addon: addon.name.clone(),
                    domain: domain.to_string(),
                    rule,
                }),
                _ => route.extend(rule),
            }
        }

        Self {
            autoload: config.autoload,
            hooks: hooks.as_map().clone(),
            route,
            domains,
        }
    }
}

/// Regenerates the bootstrap bundle and, unless routes are computed
/// dynamically, the route config file
pub fn write_artifacts(
    config: &Config,
    store: &DescriptorStore,
    addons: &[AddonDescriptor],
    hooks: &HookIndex,
) -> Result<()> {
    let bundle = bootstrap_bundle(store, addons)?;
    write_atomic(&config.bootstrap_path(), bundle.as_bytes())?;
    info!("Wrote {}", config.bootstrap_path().display());

    if config.autoload {
        debug!("Autoload on, not writing route config");
        return Ok(());
    }

    let route_config = RouteConfig::build(addons, hooks, config);
    let contents = serde_json::to_string_pretty(&route_config)?;
    write_atomic(&config.route_config_path(), contents.as_bytes())?;
    info!("Wrote {}", config.route_config_path().display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::addon::AddonRegistry;
    use crate::descriptor::{AddonState, PackageKind};
    use tempfile::TempDir;

    fn enabled(name: &str) -> AddonDescriptor {
        let mut descriptor = AddonDescriptor::new(name, PackageKind::Module);
        descriptor.state = AddonState::Enabled;
        descriptor
    }

    #[test]
    fn test_bootstrap_bundle_skips_missing_snippets() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let config = Config::with_root(temp_dir.path());
        let store = DescriptorStore::from_config(&config);
        std::fs::create_dir_all(config.addon_path("blog"))?;
        std::fs::write(
            config.addon_path("blog").join(BOOTSTRAP_SNIPPET),
            "require(['blog']);",
        )?;
        let mut shop = AddonDescriptor::new("shop", PackageKind::Module);
        shop.state = AddonState::Disabled;

        let bundle = bootstrap_bundle(&store, &[enabled("blog"), enabled("forum"), shop])?;

        insta::assert_snapshot!(bundle, @r"
        define([], function () {
            require(['blog']);
        });
        ");
        Ok(())
    }

    #[test]
    fn test_route_config_splits_domain_rules() {
        let mut blog = enabled("blog");
        blog.rewrite.insert("post/view".to_string(), "article/[id]".to_string());
        let mut shop = enabled("shop");
        shop.rewrite.insert("index/index".to_string(), "/".to_string());
        shop.domain = Some("shop".to_string());

        let mut config = Config::default();
        let hooks = HookIndex::build(&[], &AddonRegistry::new());

        let flat = RouteConfig::build(&[blog.clone(), shop.clone()], &hooks, &config);
        assert_eq!(flat.route.len(), 2);
        assert_eq!(flat.route["article/[id]"], "blog/post/view");
        assert!(flat.domains.is_empty());

        config.url_domain_deploy = true;
        let split = RouteConfig::build(&[blog, shop], &hooks, &config);
        assert_eq!(split.route.len(), 1);
        assert_eq!(split.domains.len(), 1);
        assert_eq!(split.domains[0].domain, "shop");
        assert_eq!(split.domains[0].rule["/"], "shop/index/index");
    }

    #[test]
    fn test_autoload_skips_route_config() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let mut config = Config::with_root(temp_dir.path());
        config.autoload = true;
        let store = DescriptorStore::from_config(&config);
        let hooks = HookIndex::build(&[], &AddonRegistry::new());

        write_artifacts(&config, &store, &[], &hooks)?;

        assert!(config.bootstrap_path().is_file());
        assert!(!config.route_config_path().exists());
        Ok(())
    }
}
