//! Best-effort import of a package's `install.sql`

use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;
use tracing::{debug, warn};

use crate::error::Result;

/// Schema script shipped at the top level of a package
pub const SCHEMA_FILE: &str = "install.sql";

static PREFIX_PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)__PREFIX__").expect("valid regex"));
static INSERT_INTO: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)INSERT INTO ").expect("valid regex"));

/// Executes one statement against the host database
pub trait SqlExecutor: Send + Sync {
    fn execute(&self, statement: &str) -> anyhow::Result<()>;
}

/// Discards statements; used when the host has no database
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopExecutor;

impl SqlExecutor for NoopExecutor {
    fn execute(&self, statement: &str) -> anyhow::Result<()> {
        debug!("Skipping statement ({} bytes): no database", statement.len());
        Ok(())
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ImportReport {
    pub executed: usize,
    pub failed: usize,
}

/// Splits `script` into statements ending with `;` at line end, skipping
/// comment lines, and rewrites each for the host
pub fn statements(script: &str, table_prefix: &str) -> Vec<String> {
    let mut statements = Vec::new();
    let mut current = String::new();

    for line in script.lines() {
        if line.starts_with("--") || line.starts_with("/*") || line.trim().is_empty() {
            continue;
        }
        current.push_str(line);
        current.push('\n');

        if line.trim_end().ends_with(';') {
            let statement = PREFIX_PLACEHOLDER.replace_all(&current, regex::NoExpand(table_prefix));
            let statement = INSERT_INTO.replace_all(&statement, "INSERT IGNORE INTO ");
            statements.push(statement.trim_end().to_string());
            current.clear();
        }
    }
    statements
}

/// Runs every statement of `script`; failures are logged and skipped
pub fn import_script(script: &str, table_prefix: &str, executor: &dyn SqlExecutor) -> ImportReport {
    let mut report = ImportReport::default();
    for statement in statements(script, table_prefix) {
        match executor.execute(&statement) {
            Ok(()) => report.executed += 1,
            Err(e) => {
                warn!("Schema statement failed: {e}");
                report.failed += 1;
            }
        }
    }
    report
}

/// Imports `<addon_dir>/install.sql` if the package ships one
pub fn import_file(addon_dir: &Path, table_prefix: &str, executor: &dyn SqlExecutor) -> Result<ImportReport> {
    let path = addon_dir.join(SCHEMA_FILE);
    if !path.is_file() {
        return Ok(ImportReport::default());
    }
    let script = std::fs::read_to_string(&path)?;
    Ok(import_script(&script, table_prefix, executor))
}
