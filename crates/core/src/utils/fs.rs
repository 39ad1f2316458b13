//! File-tree helpers shared by the store, the conflict resolver and the
//! lifecycle manager

use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use walkdir::WalkDir;

use crate::error::{Error, Result};

/// Writes `contents` to a sibling temp file and renames it over `path`.
/// A failed write leaves the previous file untouched.
pub fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    let parent = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    std::fs::create_dir_all(parent).map_err(|e| Error::from_write(e, parent))?;

    let mut tmp = NamedTempFile::new_in(parent).map_err(|e| Error::from_write(e, path))?;
    tmp.write_all(contents)
        .and_then(|_| tmp.as_file().sync_all())
        .map_err(|e| Error::from_write(e, path))?;
    tmp.persist(path)
        .map_err(|e| Error::from_write(e.error, path))?;
    Ok(())
}

/// Every regular file under `root`, as paths relative to it, sorted
pub fn relative_files(root: &Path) -> Result<Vec<PathBuf>> {
    if !root.is_dir() {
        return Ok(Vec::new());
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            e.into_io_error()
                .map(Error::Io)
                .unwrap_or_else(|| Error::Package(format!("walk failed under {}", root.display())))
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        if let Ok(relative) = entry.path().strip_prefix(root) {
            files.push(relative.to_path_buf());
        }
    }
    Ok(files)
}

/// Copies every file under `src` into `dest`, overwriting and creating
/// parent directories as needed
pub fn copy_tree(src: &Path, dest: &Path) -> Result<usize> {
    let files = relative_files(src)?;
    for relative in &files {
        copy_file(&src.join(relative), &dest.join(relative))?;
    }
    Ok(files.len())
}

pub fn copy_file(from: &Path, to: &Path) -> Result<()> {
    if let Some(parent) = to.parent() {
        std::fs::create_dir_all(parent).map_err(|e| Error::from_write(e, parent))?;
    }
    std::fs::copy(from, to).map_err(|e| Error::from_write(e, to))?;
    Ok(())
}

/// Removes a directory tree; a missing directory is not an error
pub fn remove_tree(path: &Path) -> Result<()> {
    match std::fs::remove_dir_all(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(Error::Io(e)),
    }
}

/// MD5 digest of a file's bytes, hex encoded
pub fn file_hash(path: &Path) -> Result<String> {
    let contents = std::fs::read(path)?;
    Ok(format!("{:x}", md5::compute(&contents)))
}
