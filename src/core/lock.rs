//! Advisory file locking for the worktree cache.
//!
//! [`FileLock`] holds an exclusive `flock`-style lock on a single file for as long
//! as it lives. Acquisition blocks without a timeout. The lock only excludes other
//! processes that take the same lock; it does not protect the cache from writers
//! that ignore it.

use crate::core::error::{Result, WorktreeKeeperError};
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

/// An exclusive advisory lock. Released on [`FileLock::release`] or drop.
#[derive(Debug)]
pub struct FileLock {
    file: Option<File>,
    path: PathBuf,
}

impl FileLock {
    /// Create the lock file if needed and block until the lock is held.
    pub fn acquire(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| WorktreeKeeperError::lock_failed(path, e))?;
        }

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)
            .map_err(|e| WorktreeKeeperError::lock_failed(path, e))?;

        log::debug!("Waiting for cache lock {}", path.display());
        file.lock_exclusive()
            .map_err(|e| WorktreeKeeperError::lock_failed(path, e))?;
        log::debug!("Acquired cache lock {}", path.display());

        Ok(Self {
            file: Some(file),
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Unlock and close the handle.
    pub fn release(mut self) -> Result<()> {
        self.unlock()
    }

    fn unlock(&mut self) -> Result<()> {
        if let Some(file) = self.file.take() {
            FileExt::unlock(&file).map_err(|e| WorktreeKeeperError::lock_failed(&self.path, e))?;
            log::debug!("Released cache lock {}", self.path.display());
        }
        Ok(())
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        if let Err(e) = self.unlock() {
            log::warn!("{e}");
        }
    }
}
