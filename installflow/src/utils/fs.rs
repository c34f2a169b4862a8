//! Filesystem helpers used by the built-in steps.
//!
//! All helpers are synchronous and report `std::io::Error`; callers turn
//! failures into a `StepStatus` with `StepStatus::from_io`.

use std::collections::BTreeSet;
use std::ffi::OsString;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Suffix appended to a path to form its backup location.
pub const BACKUP_SUFFIX: &str = ".bck";

/// Returns `<path>.bck`.
#[must_use]
pub fn backup_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(BACKUP_SUFFIX);
    PathBuf::from(name)
}

/// Returns the topmost ancestor of `path` (or `path` itself) that does not
/// exist yet, i.e. the directory whose removal undoes a `create_dir_all`.
///
/// Returns `None` when `path` already exists.
#[must_use]
pub fn topmost_missing(path: &Path) -> Option<PathBuf> {
    path.ancestors()
        .take_while(|p| !p.as_os_str().is_empty() && !p.exists())
        .last()
        .map(Path::to_path_buf)
}

/// Copies `src` (file or directory tree) to `dst`.
///
/// Returns every path created under `dst`, parents before children.
///
/// # Errors
///
/// Returns the first I/O error hit while walking or copying.
pub fn copy_dir_all(src: &Path, dst: &Path) -> io::Result<Vec<PathBuf>> {
    let mut written = Vec::new();

    if src.is_file() {
        if let Some(parent) = dst.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::copy(src, dst)?;
        written.push(dst.to_path_buf());
        return Ok(written);
    }

    for entry in WalkDir::new(src).follow_links(false) {
        let entry = entry?;
        let relative = entry
            .path()
            .strip_prefix(src)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
        let target = dst.join(relative);

        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)?;
        } else {
            fs::copy(entry.path(), &target)?;
        }
        written.push(target);
    }

    debug!(src = %src.display(), dst = %dst.display(), entries = written.len(), "Copied tree");
    Ok(written)
}

/// Removes a file or directory tree. A missing path is not an error.
///
/// # Errors
///
/// Returns any I/O error other than `NotFound`.
pub fn remove_path(path: &Path) -> io::Result<()> {
    let result = match fs::symlink_metadata(path) {
        Ok(meta) if meta.is_dir() => fs::remove_dir_all(path),
        Ok(_) => fs::remove_file(path),
        Err(e) => Err(e),
    };
    match result {
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        other => other,
    }
}

/// Failure of [`move_path`].
#[derive(Debug, Error)]
pub enum MoveError {
    /// Nothing was moved: `from` is intact and `to` does not exist.
    #[error("{0}")]
    NotMoved(io::Error),
    /// `to` holds a complete copy, but `from` could not be fully removed.
    #[error("copied, but removing the source failed: {0}")]
    SourceLeft(io::Error),
}

impl MoveError {
    /// Returns the underlying I/O error.
    #[must_use]
    pub fn io_error(&self) -> &io::Error {
        match self {
            Self::NotMoved(e) | Self::SourceLeft(e) => e,
        }
    }
}

/// Moves `from` to `to`, falling back to copy and remove across devices.
///
/// `to` must not exist.
///
/// # Errors
///
/// See [`MoveError`] for what is left on disk in each case.
pub fn move_path(from: &Path, to: &Path) -> Result<(), MoveError> {
    if fs::rename(from, to).is_ok() {
        return Ok(());
    }
    copy_then_remove(from, to)
}

pub(crate) fn copy_then_remove(from: &Path, to: &Path) -> Result<(), MoveError> {
    if let Err(e) = copy_dir_all(from, to) {
        if let Err(cleanup) = remove_path(to) {
            warn!(path = %to.display(), error = %cleanup, "Failed to remove partial copy");
        }
        return Err(MoveError::NotMoved(e));
    }
    remove_path(from).map_err(MoveError::SourceLeft)
}

/// Flushes each path to stable storage. Best-effort.
///
/// Directories are synced as well, which persists renames and removals of
/// their entries. Duplicates are synced once. Returns the number of paths
/// that could not be synced; missing paths are skipped silently.
pub fn sync_paths(paths: &[PathBuf]) -> usize {
    let unique: BTreeSet<&PathBuf> = paths.iter().collect();
    let mut failures = 0;
    for path in unique {
        if !path.exists() {
            continue;
        }
        if let Err(e) = File::open(path).and_then(|f| f.sync_all()) {
            warn!(path = %path.display(), error = %e, "Failed to sync path");
            failures += 1;
        }
    }
    failures
}
