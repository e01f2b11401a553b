// src/staging.rs

//! Staged filesystem artifacts.
//!
//! A staged artifact lives under a temporary name while it is being
//! produced and is renamed to its final name only by an explicit
//! `commit`. Dropping a guard without committing leaves the temporary
//! artifact on disk as a trace of an incomplete run.

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

/// Prefix marking a file that is still being written.
pub const STAGED_FILE_MARKER: char = ',';

/// Suffix marking a directory whose run is still in progress.
pub const STAGED_DIR_SUFFIX: &str = ".running";

/// Temporary name for `final_path`: same directory, base name prefixed
/// with [`STAGED_FILE_MARKER`].
pub fn staged_file_path(final_path: &Path) -> PathBuf {
    let base = final_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    final_path.with_file_name(format!("{STAGED_FILE_MARKER}{base}"))
}

/// Temporary name for `final_path` with [`STAGED_DIR_SUFFIX`] appended.
pub fn staged_dir_path(final_path: &Path) -> PathBuf {
    let mut staged = final_path.as_os_str().to_owned();
    staged.push(STAGED_DIR_SUFFIX);
    PathBuf::from(staged)
}

/// A file written under a staged name.
#[derive(Debug)]
pub struct StagedFile {
    file: File,
    staged_path: PathBuf,
    final_path: PathBuf,
    committed: bool,
}

impl StagedFile {
    pub fn create(final_path: impl Into<PathBuf>) -> io::Result<Self> {
        let final_path = final_path.into();
        let staged_path = staged_file_path(&final_path);
        let file = File::create(&staged_path)?;
        Ok(Self {
            file,
            staged_path,
            final_path,
            committed: false,
        })
    }

    pub fn file(&self) -> &File {
        &self.file
    }

    pub fn staged_path(&self) -> &Path {
        &self.staged_path
    }

    pub fn final_path(&self) -> &Path {
        &self.final_path
    }

    /// Flush the file and move it to its final name. The handle is closed
    /// when the guard goes out of scope.
    pub fn commit(mut self) -> io::Result<PathBuf> {
        self.file.sync_all()?;
        fs::rename(&self.staged_path, &self.final_path)?;
        self.committed = true;
        debug!(path = %self.final_path.display(), "committed staged file");
        Ok(self.final_path.clone())
    }
}

impl Drop for StagedFile {
    fn drop(&mut self) {
        if !self.committed {
            warn!(
                path = %self.staged_path.display(),
                "staged file dropped without commit; leaving it in place"
            );
        }
    }
}

/// A directory created under a `.running` name.
#[derive(Debug)]
pub struct StagedDir {
    staged_path: PathBuf,
    final_path: PathBuf,
    committed: bool,
}

impl StagedDir {
    /// Create the staged directory. Parents are created as needed; neither
    /// the staged nor the final directory may exist yet.
    pub fn create(final_path: impl Into<PathBuf>) -> io::Result<Self> {
        let final_path = final_path.into();
        if final_path.exists() {
            return Err(already_exists(&final_path));
        }
        let staged_path = staged_dir_path(&final_path);
        if let Some(parent) = staged_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::create_dir(&staged_path)?;
        debug!(path = %staged_path.display(), "created staged directory");
        Ok(Self {
            staged_path,
            final_path,
            committed: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.staged_path
    }

    pub fn final_path(&self) -> &Path {
        &self.final_path
    }

    /// Rename the directory to its final name.
    pub fn commit(mut self) -> io::Result<PathBuf> {
        if self.final_path.exists() {
            return Err(already_exists(&self.final_path));
        }
        fs::rename(&self.staged_path, &self.final_path)?;
        self.committed = true;
        debug!(path = %self.final_path.display(), "committed staged directory");
        Ok(self.final_path.clone())
    }
}

fn already_exists(path: &Path) -> io::Error {
    io::Error::new(
        io::ErrorKind::AlreadyExists,
        format!("{} already exists", path.display()),
    )
}

impl Drop for StagedDir {
    fn drop(&mut self) {
        if !self.committed {
            warn!(
                path = %self.staged_path.display(),
                "run directory left staged; the run did not complete"
            );
        }
    }
}
