use std::fs::File;
use std::io::{self, Cursor, Write};
use std::path::{Component, Path, PathBuf};

use tracing::debug;
use walkdir::WalkDir;
use zip::ZipArchive;
use zip::write::{SimpleFileOptions, ZipWriter};

use crate::error::{Error, Result};

/// Extracts zip `bytes` into `dest`, overwriting existing files
pub fn extract_zip(bytes: &[u8], dest: &Path) -> Result<usize> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| Error::Package(format!("unable to open the zip file: {e}")))?;

    std::fs::create_dir_all(dest).map_err(|e| Error::from_write(e, dest))?;
    let mut extracted = 0;
    for i in 0..archive.len() {
        let mut entry = archive
            .by_index(i)
            .map_err(|e| Error::Package(format!("unable to read zip entry: {e}")))?;
        let relative = sanitize_entry(entry.name())?;
        let out = dest.join(&relative);

        if entry.is_dir() {
            std::fs::create_dir_all(&out).map_err(|e| Error::from_write(e, &out))?;
            continue;
        }
        if let Some(parent) = out.parent() {
            std::fs::create_dir_all(parent).map_err(|e| Error::from_write(e, parent))?;
        }
        let mut file = File::create(&out).map_err(|e| Error::from_write(e, &out))?;
        io::copy(&mut entry, &mut file)
            .map_err(|e| Error::Package(format!("unable to extract {}: {e}", out.display())))?;
        extracted += 1;
    }

    debug!("Extracted {} file(s) into {}", extracted, dest.display());
    Ok(extracted)
}

/// Rejects absolute paths and `..` so entries cannot escape the destination
fn sanitize_entry(name: &str) -> Result<PathBuf> {
    let normalized = name.replace('\\', "/");
    let mut out = PathBuf::new();
    for component in Path::new(&normalized).components() {
        match component {
            Component::Normal(part) => out.push(part),
            Component::CurDir => {}
            _ => {
                return Err(Error::Package(format!("unsafe path in archive: {name}")));
            }
        }
    }
    Ok(out)
}

/// Zips the whole of `dir` into `archive_path`
pub fn backup_dir(dir: &Path, archive_path: &Path) -> Result<()> {
    if let Some(parent) = archive_path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| Error::from_write(e, parent))?;
    }
    let file = File::create(archive_path).map_err(|e| Error::from_write(e, archive_path))?;
    let mut zip = ZipWriter::new(file);
    let options = SimpleFileOptions::default();

    for entry in WalkDir::new(dir).min_depth(1).sort_by_file_name() {
        let entry = entry.map_err(|e| Error::Package(format!("backup walk failed: {e}")))?;
        let Ok(relative) = entry.path().strip_prefix(dir) else {
            continue;
        };
        let name = relative.to_string_lossy().replace('\\', "/");

        if entry.file_type().is_dir() {
            zip.add_directory(name, options)
                .map_err(|e| Error::Package(format!("backup failed: {e}")))?;
        } else if entry.file_type().is_file() {
            zip.start_file(name, options)
                .map_err(|e| Error::Package(format!("backup failed: {e}")))?;
            zip.write_all(&std::fs::read(entry.path())?)?;
        }
    }

    zip.finish()
        .map_err(|e| Error::Package(format!("backup failed: {e}")))?;
    Ok(())
}
