//! Shared fixtures: a host tree, a directory of zipped packages and a manager
//! wired to both

#![allow(dead_code)]

use addon_manager_core::{AddonManager, AddonRegistry, Config, DirectorySource};
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;
use walkdir::WalkDir;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

pub const BLOG_INI: &str = "name = blog\ntitle = Blog\nversion = 1.0.0\nauthor = tester\nstate = 0\n";

pub struct Fixture {
    pub temp_dir: TempDir,
    pub host: PathBuf,
    pub packages: PathBuf,
    pub manager: AddonManager,
}

impl Fixture {
    pub fn new() -> Self {
        Self::with_registry(AddonRegistry::new())
    }

    pub fn with_registry(registry: AddonRegistry) -> Self {
        Self::build(registry, |_| {})
    }

    pub fn build(registry: AddonRegistry, tweak: impl FnOnce(&mut Config)) -> Self {
        let temp_dir = TempDir::new().unwrap();
        let host = temp_dir.path().join("host");
        let packages = temp_dir.path().join("packages");
        fs::create_dir_all(host.join("public/css")).unwrap();
        fs::create_dir_all(&packages).unwrap();
        fs::write(host.join("public/index.html"), "<h1>home</h1>").unwrap();
        fs::write(host.join("public/css/site.css"), "body { color: black; }").unwrap();

        let mut config = Config::with_root(&host);
        tweak(&mut config);
        let manager = AddonManager::new(config, Arc::new(DirectorySource::new(&packages)))
            .with_registry(registry);

        Self {
            temp_dir,
            host,
            packages,
            manager,
        }
    }

    /// Zips `files` into `<packages>/<file_name>`
    pub fn package(&self, file_name: &str, files: &[(&str, &str)]) {
        write_zip(&self.packages.join(file_name), files);
    }

    /// The standard blog package: an entry point, a descriptor and an
    /// overlay adding one script and one stylesheet
    pub fn blog_package(&self) {
        self.package("blog.zip", &blog_files(BLOG_INI));
    }

    /// Every file under the host's `public` directory with its contents
    pub fn public_tree(&self) -> BTreeMap<PathBuf, Vec<u8>> {
        tree(&self.host.join("public"))
    }

    pub fn addon_dir(&self, name: &str) -> PathBuf {
        self.manager.config().addon_path(name)
    }
}

pub fn blog_files(ini: &str) -> Vec<(&str, &str)> {
    vec![
        ("Blog.rs", "// blog entry point"),
        ("module.ini", ini),
        ("bootstrap.js", "require(['blog']);"),
        ("overlay/public/js/blog.js", "console.log('blog');"),
        ("overlay/public/css/site.css", "body { color: black; }"),
    ]
}

pub fn write_zip(path: &Path, files: &[(&str, &str)]) {
    let mut zip = ZipWriter::new(File::create(path).unwrap());
    for (name, contents) in files {
        zip.start_file(*name, SimpleFileOptions::default()).unwrap();
        zip.write_all(contents.as_bytes()).unwrap();
    }
    zip.finish().unwrap();
}

pub fn tree(root: &Path) -> BTreeMap<PathBuf, Vec<u8>> {
    WalkDir::new(root)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| {
            let relative = e.path().strip_prefix(root).unwrap().to_path_buf();
            (relative, fs::read(e.path()).unwrap())
        })
        .collect()
}
