use heck::ToUpperCamelCase;
use indexmap::IndexMap;
use lru::LruCache;
use parking_lot::Mutex;
use serde_json::Value;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use super::addon_config::{ADDON_CONFIG_FILE, AddonConfig};
use super::{AddonDescriptor, IniDocument, PackageKind};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::utils::fs::write_atomic;

const CACHE_CAPACITY: usize = 256;

/// Reads and writes addon descriptors under the addon root, caching parsed
/// results until `save` or `invalidate` replaces them
pub struct DescriptorStore {
    root: PathBuf,
    entry_ext: String,
    cache: Mutex<LruCache<String, AddonDescriptor>>,
}

impl std::fmt::Debug for DescriptorStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DescriptorStore")
            .field("root", &self.root)
            .field("cached", &self.cache.lock().len())
            .finish()
    }
}

impl DescriptorStore {
    pub fn new(root: impl Into<PathBuf>, entry_ext: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            entry_ext: entry_ext.into(),
            cache: Mutex::new(LruCache::new(
                NonZeroUsize::new(CACHE_CAPACITY).unwrap_or(NonZeroUsize::MIN),
            )),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.addons_path(), config.entry_ext.clone())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn addon_path(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    /// Conventional entry point of a package: `Studly(name).ext`
    pub fn entry_point(&self, name: &str) -> PathBuf {
        self.addon_path(name)
            .join(format!("{}.{}", name.to_upper_camel_case(), self.entry_ext))
    }

    /// Locates the descriptor file; `module.ini` wins over `app.ini`
    pub fn descriptor_path(&self, name: &str) -> Option<(PathBuf, PackageKind)> {
        let dir = self.addon_path(name);
        [PackageKind::Module, PackageKind::App]
            .into_iter()
            .map(|kind| (dir.join(kind.descriptor_file()), kind))
            .find(|(path, _)| path.is_file())
    }

    pub fn exists(&self, name: &str) -> bool {
        !name.is_empty() && self.addon_path(name).is_dir()
    }

    /// A directory is a package when it has both an entry point and a descriptor
    pub fn is_package(&self, name: &str) -> bool {
        self.entry_point(name).is_file() && self.descriptor_path(name).is_some()
    }

    pub fn load(&self, name: &str) -> Result<AddonDescriptor> {
        if let Some(descriptor) = self.cache.lock().get(name) {
            return Ok(descriptor.clone());
        }

        let descriptor = self.read(name)?;
        self.cache.lock().put(name.to_string(), descriptor.clone());
        Ok(descriptor)
    }

    /// Reads straight from disk, bypassing the cache
    pub fn read(&self, name: &str) -> Result<AddonDescriptor> {
        if name.is_empty() {
            return Err(Error::NotFound(String::new()));
        }
        let (path, kind) = self
            .descriptor_path(name)
            .ok_or_else(|| Error::NotFound(name.to_string()))?;

        let contents = std::fs::read_to_string(&path)?;
        let doc = IniDocument::parse(&contents)
            .map_err(|e| Error::Descriptor(format!("{}: {e}", path.display())))?;
        AddonDescriptor::from_ini(doc, kind)
    }

    /// Persists `descriptor` atomically and replaces the cached copy
    pub fn save(&self, name: &str, descriptor: &AddonDescriptor) -> Result<()> {
        let path = match self.descriptor_path(name) {
            Some((path, _)) => path,
            None => self
                .addon_path(name)
                .join(descriptor.kind.descriptor_file()),
        };

        debug!("Writing descriptor {}", path.display());
        write_atomic(&path, descriptor.to_ini().render().as_bytes())?;
        self.cache.lock().put(name.to_string(), descriptor.clone());
        Ok(())
    }

    pub fn invalidate(&self, name: &str) {
        self.cache.lock().pop(name);
    }

    pub fn invalidate_all(&self) {
        self.cache.lock().clear();
    }

    /// Every package under the addon root, sorted by name
    pub fn list(&self) -> Result<Vec<(String, AddonDescriptor)>> {
        if !self.root.is_dir() {
            return Ok(Vec::new());
        }

        let mut names: Vec<String> = std::fs::read_dir(&self.root)?
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().map(|t| t.is_dir()).unwrap_or(false))
            .filter_map(|entry| entry.file_name().to_str().map(str::to_string))
            .collect();
        names.sort();

        let mut list = Vec::new();
        for name in names {
            if !self.is_package(&name) {
                debug!("Skipping {}: not a package", name);
                continue;
            }
            match self.read(&name) {
                Ok(descriptor) => list.push((name, descriptor)),
                Err(e) => warn!("Skipping addon {}: {}", name, e),
            }
        }
        Ok(list)
    }

    pub fn list_modules(&self) -> Result<Vec<(String, AddonDescriptor)>> {
        Ok(self
            .list()?
            .into_iter()
            .filter(|(_, d)| d.kind == PackageKind::Module)
            .collect())
    }

    pub fn list_apps(&self, only_running: bool) -> Result<Vec<(String, AddonDescriptor)>> {
        Ok(self
            .list()?
            .into_iter()
            .filter(|(_, d)| d.kind == PackageKind::App)
            .filter(|(_, d)| !only_running || d.state.is_enabled())
            .collect())
    }

    pub fn enabled(&self) -> Result<Vec<AddonDescriptor>> {
        Ok(self
            .list()?
            .into_iter()
            .filter(|(_, d)| d.state.is_enabled())
            .map(|(_, d)| d)
            .collect())
    }

    fn config_path(&self, name: &str) -> PathBuf {
        self.addon_path(name).join(ADDON_CONFIG_FILE)
    }

    /// The addon's configuration items; empty when the package ships none
    pub fn load_config(&self, name: &str) -> Result<AddonConfig> {
        let path = self.config_path(name);
        if !path.is_file() {
            return Ok(AddonConfig::default());
        }
        let contents = std::fs::read_to_string(&path)?;
        Ok(serde_json::from_str(&contents)?)
    }

    pub fn save_config(&self, name: &str, config: &AddonConfig) -> Result<()> {
        let contents = serde_json::to_string_pretty(config)?;
        write_atomic(&self.config_path(name), contents.as_bytes())
    }

    pub fn config_values(&self, name: &str) -> Result<IndexMap<String, Value>> {
        Ok(self.load_config(name)?.values())
    }

    /// Merges `values` into the addon's configuration and writes it back
    pub fn set_config_values(&self, name: &str, values: &IndexMap<String, Value>) -> Result<()> {
        let mut config = self.load_config(name)?;
        config.apply(values);
        self.save_config(name, &config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::AddonState;
    use tempfile::TempDir;

    fn write_package(root: &Path, name: &str, descriptor_file: &str, ini: &str) {
        let dir = root.join(name);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(
            dir.join(format!("{}.rs", name.to_upper_camel_case())),
            "",
        )
        .unwrap();
        std::fs::write(dir.join(descriptor_file), ini).unwrap();
    }

    #[test]
    fn test_list_distinguishes_package_kinds() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let root = temp_dir.path();
        write_package(root, "blog", "module.ini", "name = blog\ntitle = Blog\nversion = 1\nstate = 1\n");
        write_package(root, "shop", "app.ini", "name = shop\ntitle = Shop\nversion = 1\nstate = 0\n");
        // no descriptor at all
        std::fs::create_dir_all(root.join("notes"))?;
        std::fs::write(root.join("notes").join("Notes.rs"), "")?;
        // descriptor without entry point
        std::fs::create_dir_all(root.join("orphan"))?;
        std::fs::write(root.join("orphan").join("module.ini"), "name = orphan\n")?;

        let store = DescriptorStore::new(root, "rs");
        let names: Vec<_> = store.list()?.into_iter().map(|(n, _)| n).collect();
        assert_eq!(names, ["blog", "shop"]);

        assert_eq!(store.list_modules()?.len(), 1);
        assert_eq!(store.list_apps(false)?[0].1.kind, PackageKind::App);
        assert!(store.list_apps(true)?.is_empty());
        Ok(())
    }

    #[test]
    fn test_load_uses_cache_until_saved() -> Result<()> {
        let temp_dir = TempDir::new()?;
        write_package(temp_dir.path(), "blog", "module.ini", "name = blog\ntitle = Blog\nversion = 1\nstate = 0\n");
        let store = DescriptorStore::new(temp_dir.path(), "rs");

        let mut descriptor = store.load("blog")?;
        assert_eq!(descriptor.state, AddonState::Disabled);

        // edits behind the store's back are not observed until invalidated
        std::fs::write(
            temp_dir.path().join("blog/module.ini"),
            "name = blog\ntitle = Blog\nversion = 1\nstate = 1\n",
        )?;
        assert_eq!(store.load("blog")?.state, AddonState::Disabled);
        store.invalidate("blog");
        assert_eq!(store.load("blog")?.state, AddonState::Enabled);

        descriptor.state = AddonState::Disabled;
        descriptor.title = "Weblog".to_string();
        store.save("blog", &descriptor)?;
        assert_eq!(store.load("blog")?.title, "Weblog");
        assert_eq!(store.read("blog")?.state, AddonState::Disabled);
        Ok(())
    }

    #[test]
    fn test_missing_descriptor_is_not_found() {
        let temp_dir = TempDir::new().unwrap();
        let store = DescriptorStore::new(temp_dir.path(), "rs");

        assert!(matches!(store.load("ghost"), Err(Error::NotFound(_))));
        assert!(matches!(store.load(""), Err(Error::NotFound(_))));
    }

    #[test]
    fn test_config_values_round_trip() -> Result<()> {
        let temp_dir = TempDir::new()?;
        write_package(temp_dir.path(), "blog", "module.ini", "name = blog\n");
        std::fs::write(
            temp_dir.path().join("blog/config.json"),
            r#"[{"name": "per_page", "type": "number", "value": 10}]"#,
        )?;
        let store = DescriptorStore::new(temp_dir.path(), "rs");

        let mut values = store.config_values("blog")?;
        assert_eq!(values["per_page"], serde_json::json!(10));

        values.insert("per_page".to_string(), serde_json::json!(25));
        store.set_config_values("blog", &values)?;
        assert_eq!(store.config_values("blog")?["per_page"], serde_json::json!(25));
        assert!(store.load_config("ghost")?.is_empty());
        Ok(())
    }
}
