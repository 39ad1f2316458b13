//! End-to-end tests of the addonctl binary

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;
use tempfile::TempDir;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

const BLOG_INI: &str = "name = blog\ntitle = Blog\nversion = 1.0.0\nstate = 0\n[rewrite]\npost/view = article/[id]\n";
const BLOG_CONFIG: &str = r#"[{"name": "per_page", "title": "Posts per page", "type": "number", "value": 10}]"#;

fn addonctl(root: &Path) -> Command {
    let mut cmd = Command::cargo_bin("addonctl").unwrap();
    cmd.env("ADDON_ROOT", root).env_remove("RUST_LOG");
    cmd
}

/// Host root with the blog package waiting in the default package directory
fn setup() -> TempDir {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    fs::create_dir_all(root.join("public/css")).unwrap();
    fs::write(root.join("public/css/site.css"), "host css").unwrap();

    let packages = root.join("runtime/packages");
    fs::create_dir_all(&packages).unwrap();
    let mut zip = ZipWriter::new(File::create(packages.join("blog.zip")).unwrap());
    for (name, contents) in [
        ("Blog.rs", "// blog"),
        ("module.ini", BLOG_INI),
        ("config.json", BLOG_CONFIG),
        ("overlay/public/js/blog.js", "console.log('blog');"),
        ("overlay/public/css/site.css", "blog css"),
    ] {
        zip.start_file(name, SimpleFileOptions::default()).unwrap();
        zip.write_all(contents.as_bytes()).unwrap();
    }
    zip.finish().unwrap();

    temp_dir
}

#[test]
fn test_init_writes_config_once() {
    let temp_dir = TempDir::new().unwrap();

    addonctl(temp_dir.path())
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("Created"));
    assert!(temp_dir.path().join(".addon-manager.json").is_file());

    addonctl(temp_dir.path())
        .arg("init")
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));

    addonctl(temp_dir.path()).args(["init", "--force"]).assert().success();
}

#[test]
fn test_install_conflict_reports_files() {
    let temp_dir = setup();

    addonctl(temp_dir.path())
        .args(["install", "blog"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Conflicting host files"))
        .stderr(predicate::str::contains("public/css/site.css"))
        .stderr(predicate::str::contains("code: -3"));

    assert!(!temp_dir.path().join("addons/blog").exists());
}

#[test]
fn test_install_list_disable_round_trip() {
    let temp_dir = setup();
    let root = temp_dir.path();

    addonctl(root)
        .args(["install", "blog", "--force"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Installed blog 1.0.0"));
    assert_eq!(fs::read_to_string(root.join("public/css/site.css")).unwrap(), "blog css");

    let output = addonctl(root).args(["list", "--json"]).output().unwrap();
    assert!(output.status.success());
    let listed: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(listed[0]["name"], "blog");
    assert_eq!(listed[0]["state"], "enabled");

    addonctl(root)
        .args(["disable", "blog"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Disabled blog"));
    assert_eq!(fs::read_to_string(root.join("public/css/site.css")).unwrap(), "host css");
    assert!(!root.join("public/js/blog.js").exists());

    addonctl(root)
        .args(["list", "--running"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No addons found"));
}

#[test]
fn test_url_and_resolve_use_rewrites() {
    let temp_dir = setup();
    let root = temp_dir.path();
    addonctl(root).args(["install", "blog", "--force"]).assert().success();

    addonctl(root)
        .args(["url", "blog/post/view", "--param", "id=5"])
        .assert()
        .success()
        .stdout("article/5\n");

    addonctl(root)
        .args(["resolve", "article/5"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"controller\": \"post\""))
        .stdout(predicate::str::contains("\"id\": \"5\""));

    addonctl(root)
        .args(["resolve", "addons/shop/cart/add"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("addon shop not found"));
}

#[test]
fn test_config_set_and_show() {
    let temp_dir = setup();
    let root = temp_dir.path();
    addonctl(root).args(["install", "blog", "--force"]).assert().success();

    addonctl(root)
        .args(["config", "blog", "--set", "per_page=25"])
        .assert()
        .success()
        .stdout(predicate::str::contains("per_page = 25"));

    let saved = fs::read_to_string(root.join("addons/blog/config.json")).unwrap();
    let items: serde_json::Value = serde_json::from_str(&saved).unwrap();
    assert_eq!(items[0]["value"], 25);
}

#[test]
fn test_upgrade_requires_disabled_addon() {
    let temp_dir = setup();
    let root = temp_dir.path();
    addonctl(root).args(["install", "blog", "--force"]).assert().success();

    addonctl(root)
        .args(["upgrade", "blog"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("disable it first"));

    addonctl(root).args(["disable", "blog"]).assert().success();
    addonctl(root)
        .args(["upgrade", "blog"])
        .assert()
        .success()
        .stdout(predicate::str::contains("archived at"));
}

#[test]
fn test_unknown_addon_fails() {
    let temp_dir = setup();

    addonctl(temp_dir.path())
        .args(["enable", "ghost"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Addon not found: ghost"));
}

#[test]
fn test_hooks_explains_empty_index() {
    let temp_dir = setup();
    let root = temp_dir.path();
    addonctl(root).args(["install", "blog", "--force"]).assert().success();

    addonctl(root)
        .arg("hooks")
        .assert()
        .success()
        .stdout(predicate::str::contains("No enabled addon implements a hook"))
        .stdout(predicate::str::contains("hooks are indexed by the host process"));
}
