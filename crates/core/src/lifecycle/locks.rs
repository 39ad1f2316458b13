use fs2::FileExt;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::error::{Error, Result};

/// One exclusive section per addon name, held as an advisory lock on
/// `<dir>/<name>.lock`. Managers in other threads or other processes working
/// on the same host root wait for each other; different addons do not.
#[derive(Debug, Clone)]
pub struct AddonLocks {
    dir: PathBuf,
}

impl AddonLocks {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn lock_path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}.lock"))
    }

    /// Runs `f` while holding the lock for `name`
    pub fn with_lock<T>(&self, name: &str, f: impl FnOnce() -> Result<T>) -> Result<T> {
        std::fs::create_dir_all(&self.dir).map_err(|e| Error::from_write(e, &self.dir))?;
        let path = self.lock_path(name);
        let lock_file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .map_err(|e| Error::from_write(e, &path))?;

        lock_file.lock_exclusive()?;
        debug!("Acquired {}", path.display());

        let result = f();

        if let Err(e) = FileExt::unlock(&lock_file) {
            warn!("Failed to release {}: {}", path.display(), e);
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;
    use std::time::Duration;
    use tempfile::TempDir;

    #[test]
    fn test_same_name_is_serialised() {
        let temp_dir = TempDir::new().unwrap();
        let inside = Arc::new(AtomicUsize::new(0));
        let max_seen = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..4)
            .map(|_| {
                // separate instances, as separate managers would hold
                let locks = AddonLocks::new(temp_dir.path());
                let inside = Arc::clone(&inside);
                let max_seen = Arc::clone(&max_seen);
                thread::spawn(move || {
                    locks.with_lock("blog", || {
                        let now = inside.fetch_add(1, Ordering::SeqCst) + 1;
                        max_seen.fetch_max(now, Ordering::SeqCst);
                        thread::sleep(Duration::from_millis(5));
                        inside.fetch_sub(1, Ordering::SeqCst);
                        Ok(())
                    })
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap().unwrap();
        }

        assert_eq!(max_seen.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_different_names_do_not_block() {
        let temp_dir = TempDir::new().unwrap();
        let locks = AddonLocks::new(temp_dir.path());

        let nested = locks
            .with_lock("blog", || locks.with_lock("shop", || Ok(42)))
            .unwrap();

        assert_eq!(nested, 42);
        assert!(locks.lock_path("blog").is_file());
        assert!(locks.lock_path("shop").is_file());
    }

    #[test]
    fn test_errors_pass_through_and_release() {
        let temp_dir = TempDir::new().unwrap();
        let locks = AddonLocks::new(temp_dir.path().join("locks"));

        let err = locks
            .with_lock("blog", || -> Result<()> { Err(Error::NotFound("blog".to_string())) })
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));

        assert_eq!(locks.with_lock("blog", || Ok("again")).unwrap(), "again");
    }
}
