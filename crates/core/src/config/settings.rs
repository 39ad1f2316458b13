use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Name of the configuration file looked up from the working directory upwards
pub const CONFIG_FILE_NAME: &str = ".addon-manager.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct Config {
    /// Root of the host file tree; relative paths resolve against the config file
    pub host_root: PathBuf,
    pub addon_dir: PathBuf,
    pub runtime_dir: PathBuf,
    /// Subtree of a package that mirrors the host root
    pub overlay_dir: PathBuf,
    /// Per-addon backup area, relative to the addon directory
    pub conflict_dir: PathBuf,
    pub entry_ext: String,
    pub bootstrap_file: PathBuf,
    pub route_config_file: PathBuf,
    /// When set the route config is computed on demand and never written
    pub autoload: bool,
    pub table_prefix: String,
    pub admin_root: String,
    pub addon_url_prefix: String,
    pub app_url_prefix: String,
    pub url_domain_deploy: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url_suffix: Option<String>,
    pub default_return_type: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host_root: PathBuf::from("."),
            addon_dir: PathBuf::from("addons"),
            runtime_dir: PathBuf::from("runtime"),
            overlay_dir: PathBuf::from("overlay"),
            conflict_dir: PathBuf::from("cache/conflict"),
            entry_ext: "rs".to_string(),
            bootstrap_file: PathBuf::from("assets/js/addons.js"),
            route_config_file: PathBuf::from("config/addons.json"),
            autoload: false,
            table_prefix: String::new(),
            admin_root: "admin".to_string(),
            addon_url_prefix: "addons".to_string(),
            app_url_prefix: "app".to_string(),
            url_domain_deploy: false,
            url_suffix: None,
            default_return_type: "html".to_string(),
        }
    }
}

impl Config {
    /// Default configuration rooted at `host_root`
    pub fn with_root(host_root: impl Into<PathBuf>) -> Self {
        Self {
            host_root: host_root.into(),
            ..Default::default()
        }
    }

    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let mut config: Config = serde_json::from_str(&contents)
            .map_err(|e| Error::Config(format!("Failed to parse config: {e}")))?;

        if config.host_root.is_relative() {
            if let Some(parent) = path.parent() {
                config.host_root = parent.join(&config.host_root);
            }
        }

        Ok(config)
    }

    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let contents = serde_json::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {e}")))?;
        std::fs::write(path, contents).map_err(|e| Error::from_write(e, path))?;
        Ok(())
    }

    pub fn find_config_file(start_path: &Path) -> Option<PathBuf> {
        let mut current = start_path;

        loop {
            let config_path = current.join(CONFIG_FILE_NAME);
            if config_path.exists() {
                return Some(config_path);
            }

            current = current.parent()?;
        }
    }

    /// Loads the nearest config file above `start_path`, or defaults rooted there
    pub fn discover(start_path: &Path) -> Result<Self> {
        match Self::find_config_file(start_path) {
            Some(path) => {
                tracing::debug!("Loading config from {}", path.display());
                Self::load_from_file(&path)
            }
            None => Ok(Self::with_root(start_path)),
        }
    }

    pub fn addons_path(&self) -> PathBuf {
        self.host_root.join(&self.addon_dir)
    }

    pub fn addon_path(&self, name: &str) -> PathBuf {
        self.addons_path().join(name)
    }

    pub fn overlay_path(&self, name: &str) -> PathBuf {
        self.addon_path(name).join(&self.overlay_dir)
    }

    pub fn conflict_path(&self, name: &str) -> PathBuf {
        self.addon_path(name).join(&self.conflict_dir)
    }

    /// Scratch directory for downloaded packages and upgrade backups
    pub fn runtime_addons_path(&self) -> PathBuf {
        self.host_root.join(&self.runtime_dir).join("addons")
    }

    /// Per-addon lock files shared by every manager on this host root
    pub fn locks_path(&self) -> PathBuf {
        self.host_root.join(&self.runtime_dir).join("locks")
    }

    pub fn bootstrap_path(&self) -> PathBuf {
        self.host_root.join(&self.bootstrap_file)
    }

    pub fn route_config_path(&self) -> PathBuf {
        self.host_root.join(&self.route_config_file)
    }
}
