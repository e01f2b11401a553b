// src/lock.rs

//! Single-instance guard based on an advisory `flock` on a lock file.

use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::errors::{HydraError, Result};

/// Default lock file name inside the output directory.
pub const LOCK_FILE_NAME: &str = ".hydra.lock";

/// Held exclusive lock; released when dropped.
#[derive(Debug)]
pub struct InstanceLock {
    file: File,
    path: PathBuf,
}

impl InstanceLock {
    /// Take the lock without blocking. Fails with
    /// [`HydraError::AlreadyRunning`] if another process holds it.
    pub fn acquire(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&path)?;

        try_lock(&file, &path)?;
        debug!(path = %path.display(), "acquired instance lock");
        Ok(Self { file, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(unix)]
fn try_lock(file: &File, path: &Path) -> Result<()> {
    use std::os::unix::io::AsRawFd;

    let ret = unsafe { libc::flock(file.as_raw_fd(), libc::LOCK_EX | libc::LOCK_NB) };
    if ret == 0 {
        return Ok(());
    }

    let err = std::io::Error::last_os_error();
    if err.kind() == std::io::ErrorKind::WouldBlock {
        Err(HydraError::AlreadyRunning(path.display().to_string()))
    } else {
        Err(err.into())
    }
}

#[cfg(not(unix))]
fn try_lock(_file: &File, _path: &Path) -> Result<()> {
    Ok(())
}

impl Drop for InstanceLock {
    fn drop(&mut self) {
        #[cfg(unix)]
        unsafe {
            libc::flock(
                std::os::unix::io::AsRawFd::as_raw_fd(&self.file),
                libc::LOCK_UN,
            );
        }
        debug!(path = %self.path.display(), "released instance lock");
    }
}
