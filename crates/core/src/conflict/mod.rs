//! Overlay conflict detection, backup and restore
//!
//! An addon's overlay subtree mirrors the host root. Enabling copies it over
//! the host tree, so any host file it would replace is snapshotted first into
//! the addon's backup area; disabling copies that snapshot back.

use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::utils::fs::{copy_file, copy_tree, file_hash, relative_files, remove_tree};

/// Outcome of a conflict check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConflictCheck {
    Clear,
    Conflicts(Vec<PathBuf>),
}

impl ConflictCheck {
    pub fn is_clear(&self) -> bool {
        matches!(self, ConflictCheck::Clear)
    }
}

#[derive(Debug, Clone)]
pub struct ConflictResolver {
    host_root: PathBuf,
    addons_root: PathBuf,
    overlay_dir: PathBuf,
    conflict_dir: PathBuf,
}

impl ConflictResolver {
    pub fn new(config: &Config) -> Self {
        Self {
            host_root: config.host_root.clone(),
            addons_root: config.addons_path(),
            overlay_dir: config.overlay_dir.clone(),
            conflict_dir: config.conflict_dir.clone(),
        }
    }

    pub fn overlay_path(&self, name: &str) -> PathBuf {
        self.addons_root.join(name).join(&self.overlay_dir)
    }

    pub fn backup_path(&self, name: &str) -> PathBuf {
        self.addons_root.join(name).join(&self.conflict_dir)
    }

    /// Paths (relative to the host root) the addon's overlay places into the
    /// host tree. With `only_conflicting`, only paths whose host file exists
    /// and differs in size or content.
    pub fn global_files(&self, name: &str, only_conflicting: bool) -> Result<Vec<PathBuf>> {
        let overlay = self.overlay_path(name);
        let mut list = Vec::new();

        for relative in relative_files(&overlay)? {
            if only_conflicting {
                let dest = self.host_root.join(&relative);
                if !dest.is_file() || !differs(&overlay.join(&relative), &dest)? {
                    continue;
                }
            }
            list.push(relative);
        }
        Ok(list)
    }

    pub fn check(&self, name: &str) -> Result<ConflictCheck> {
        let conflicts = self.global_files(name, true)?;
        if conflicts.is_empty() {
            Ok(ConflictCheck::Clear)
        } else {
            debug!("Addon {} conflicts on {} file(s)", name, conflicts.len());
            Ok(ConflictCheck::Conflicts(conflicts))
        }
    }

    /// Copies each of `paths` that exists in the host tree into the backup
    /// area, discarding any earlier snapshot first. The area exists afterwards
    /// even when nothing needed saving.
    pub fn snapshot_and_backup(&self, name: &str, paths: &[PathBuf]) -> Result<usize> {
        let backup = self.backup_path(name);
        remove_tree(&backup)?;
        std::fs::create_dir_all(&backup).map_err(|e| Error::from_write(e, &backup))?;

        let mut saved = 0;
        for relative in paths {
            let source = self.host_root.join(relative);
            if source.is_file() {
                copy_file(&source, &backup.join(relative))?;
                saved += 1;
            }
        }
        info!("Backed up {} host file(s) for addon {}", saved, name);
        Ok(saved)
    }

    /// Copies the backup area back over the host tree; no-op without one
    pub fn restore(&self, name: &str) -> Result<usize> {
        let backup = self.backup_path(name);
        if !backup.is_dir() {
            return Ok(0);
        }
        let restored = copy_tree(&backup, &self.host_root)?;
        info!("Restored {} host file(s) for addon {}", restored, name);
        Ok(restored)
    }

    pub fn has_backup(&self, name: &str) -> bool {
        self.backup_path(name).is_dir()
    }

    /// Copies the overlay subtree over the host tree
    pub fn apply_overlay(&self, name: &str) -> Result<usize> {
        copy_tree(&self.overlay_path(name), &self.host_root)
    }

    /// Deletes every overlay file from the host tree, ignoring ones already gone
    pub fn remove_overlay(&self, name: &str) -> Result<usize> {
        let mut removed = 0;
        for relative in self.global_files(name, false)? {
            match std::fs::remove_file(self.host_root.join(&relative)) {
                Ok(()) => removed += 1,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(removed)
    }
}

fn differs(a: &Path, b: &Path) -> Result<bool> {
    let size_a = std::fs::metadata(a)?.len();
    let size_b = std::fs::metadata(b)?.len();
    if size_a != size_b {
        return Ok(true);
    }
    Ok(file_hash(a)? != file_hash(b)?)
}
