//! Package fetching and archive handling

pub mod archive;

pub use archive::{backup_dir, extract_zip};

use indexmap::IndexMap;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Extra parameters forwarded to the package source (version, channel, ...)
pub type Extra = IndexMap<String, String>;

/// Fetches the zip bytes of a package given its name
pub trait PackageSource: Send + Sync {
    fn fetch(&self, name: &str, extra: &Extra) -> Result<Vec<u8>>;
}

/// Serves `<dir>/<name>.zip`, or `<dir>/<name>-<version>.zip` when a
/// `version` extra is given
#[derive(Debug, Clone)]
pub struct DirectorySource {
    dir: PathBuf,
}

impl DirectorySource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn package_path(&self, name: &str, extra: &Extra) -> PathBuf {
        match extra.get("version") {
            Some(version) => self.dir.join(format!("{name}-{version}.zip")),
            None => self.dir.join(format!("{name}.zip")),
        }
    }
}

impl PackageSource for DirectorySource {
    fn fetch(&self, name: &str, extra: &Extra) -> Result<Vec<u8>> {
        let path = self.package_path(name, extra);
        std::fs::read(&path)
            .map_err(|e| Error::Package(format!("cannot read {}: {e}", path.display())))
    }
}
