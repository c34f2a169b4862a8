//! Built-in filesystem steps shared by every package kind.
//!
//! Each step remembers exactly what it changed so that `undo` only reverts
//! its own effects, even after a partial `process`.

use super::Step;
use crate::context::ExecutionContext;
use crate::core::StepStatus;
use crate::utils::fs::{
    backup_path, copy_dir_all, move_path, remove_path, topmost_missing, MoveError,
};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

fn io_failure(message: &mut Option<String>, what: &str, path: &Path, err: &io::Error) -> StepStatus {
    let status = StepStatus::from_io(err);
    warn!(path = %path.display(), error = %err, status = %status, "{what} failed");
    *message = Some(format!("{what} failed for {}: {err}", path.display()));
    status
}

fn require_pkgid(ctx: &ExecutionContext) -> StepStatus {
    match ctx.require_pkgid() {
        Ok(_) => StepStatus::Ok,
        Err(e) => StepStatus::from(e),
    }
}

/// Queues the directory holding `path` for the final flush.
fn track_parent(ctx: &mut ExecutionContext, path: &Path) {
    if let Some(parent) = path.parent() {
        ctx.track_written(parent);
    }
}

/// A failed move to backup. `backup` is set when a complete backup exists
/// anyway and must be restored by `undo`.
struct BackupFailure {
    backup: Option<PathBuf>,
    error: io::Error,
}

/// Moves `path` aside to `<path>.bck`, replacing a stale backup.
fn move_to_backup(ctx: &mut ExecutionContext, path: &Path) -> Result<PathBuf, BackupFailure> {
    let backup = backup_path(path);
    remove_path(&backup).map_err(|error| BackupFailure { backup: None, error })?;
    track_parent(ctx, path);

    match move_path(path, &backup) {
        Ok(()) => {}
        Err(MoveError::NotMoved(error)) => return Err(BackupFailure { backup: None, error }),
        Err(MoveError::SourceLeft(error)) => {
            ctx.add_backup_path(&backup);
            ctx.track_written(&backup);
            return Err(BackupFailure {
                backup: Some(backup),
                error,
            });
        }
    }
    ctx.add_backup_path(&backup);
    debug!(path = %path.display(), backup = %backup.display(), "Moved to backup");
    Ok(backup)
}

/// Moves `<path>.bck` back over `path`.
fn restore_backup(ctx: &mut ExecutionContext, backup: &Path, path: &Path) -> io::Result<()> {
    remove_path(path)?;
    track_parent(ctx, path);

    match move_path(backup, path) {
        Ok(()) => ctx.remove_backup_path(backup),
        Err(MoveError::SourceLeft(e)) => {
            warn!(path = %path.display(), backup = %backup.display(), error = %e, "Restored package, backup left behind");
        }
        Err(MoveError::NotMoved(e)) => return Err(e),
    }
    ctx.track_written(path);
    debug!(path = %path.display(), "Restored backup");
    Ok(())
}

/// Deletes a backup once the run succeeded.
fn drop_backup(ctx: &mut ExecutionContext, backup: &Path) -> io::Result<()> {
    remove_path(backup)?;
    ctx.remove_backup_path(backup);
    track_parent(ctx, backup);
    Ok(())
}

// ============================================================================
// create-directory
// ============================================================================

/// Creates the final package directory.
#[derive(Debug, Default)]
pub struct StepCreateDirectory {
    created: Option<PathBuf>,
    message: Option<String>,
}

impl StepCreateDirectory {
    /// Step name.
    pub const NAME: &'static str = "create-directory";

    /// Creates the step.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Step for StepCreateDirectory {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn precheck(&self, ctx: &ExecutionContext) -> StepStatus {
        require_pkgid(ctx)
    }

    fn process(&mut self, ctx: &mut ExecutionContext) -> StepStatus {
        let path = ctx.pkg_path();
        let Some(top) = topmost_missing(&path) else {
            debug!(path = %path.display(), "Package directory already exists");
            return StepStatus::Ok;
        };

        // Everything from `top` down is ours, even if creation stops halfway.
        self.created = Some(top.clone());
        if let Err(e) = fs::create_dir_all(&path) {
            let status = io_failure(&mut self.message, "Creating directory", &path, &e);
            return match status {
                StepStatus::OutOfSpace => status,
                _ => StepStatus::CreateDirError,
            };
        }

        ctx.track_written(&path);
        track_parent(ctx, &top);
        StepStatus::Ok
    }

    fn undo(&mut self, ctx: &mut ExecutionContext) -> StepStatus {
        let Some(path) = self.created.take() else {
            return StepStatus::Ok;
        };
        match remove_path(&path) {
            Ok(()) => {
                track_parent(ctx, &path);
                StepStatus::Ok
            }
            Err(e) => io_failure(&mut self.message, "Removing directory", &path, &e),
        }
    }

    fn failure_message(&self) -> Option<String> {
        self.message.clone()
    }
}

// ============================================================================
// copy-package
// ============================================================================

/// Copies the unpacked package into its final location.
///
/// An existing destination (update flows) is moved to `<dest>.bck` first.
/// `undo` removes the copy and restores the backup; `clean` deletes the backup.
#[derive(Debug, Default)]
pub struct StepCopyPackage {
    dest: Option<PathBuf>,
    backup: Option<PathBuf>,
    created: Option<PathBuf>,
    message: Option<String>,
}

impl StepCopyPackage {
    /// Step name.
    pub const NAME: &'static str = "copy-package";

    /// Creates the step.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Step for StepCopyPackage {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn precheck(&self, ctx: &ExecutionContext) -> StepStatus {
        let status = require_pkgid(ctx);
        if status.is_failure() {
            return status;
        }
        let src = ctx.unpacked_dir_path();
        if src.as_os_str().is_empty() {
            return StepStatus::InvalidValue;
        }
        if !src.exists() {
            return StepStatus::PackageNotFound;
        }
        StepStatus::Ok
    }

    fn process(&mut self, ctx: &mut ExecutionContext) -> StepStatus {
        let src = ctx.unpacked_dir_path().to_path_buf();
        let dest = ctx.pkg_path();

        self.dest = Some(dest.clone());
        if dest.exists() {
            match move_to_backup(ctx, &dest) {
                Ok(backup) => self.backup = Some(backup),
                Err(failure) => {
                    self.backup = failure.backup;
                    return io_failure(&mut self.message, "Backing up package", &dest, &failure.error);
                }
            }
        }

        // From here on the destination and any missing parents are ours to remove.
        self.created = topmost_missing(&dest);
        match copy_dir_all(&src, &dest) {
            Ok(written) => {
                info!(src = %src.display(), dest = %dest.display(), files = written.len(), "Copied package");
                for path in written {
                    ctx.track_written(path);
                }
                StepStatus::Ok
            }
            Err(e) => io_failure(&mut self.message, "Copying package", &dest, &e),
        }
    }

    fn clean(&mut self, ctx: &mut ExecutionContext) -> StepStatus {
        let Some(backup) = self.backup.take() else {
            return StepStatus::Ok;
        };
        match drop_backup(ctx, &backup) {
            Ok(()) => StepStatus::Ok,
            Err(e) => io_failure(&mut self.message, "Removing backup", &backup, &e),
        }
    }

    fn undo(&mut self, ctx: &mut ExecutionContext) -> StepStatus {
        let Some(dest) = self.dest.take() else {
            return StepStatus::Ok;
        };
        let reverted = match (self.backup.take(), self.created.take()) {
            (Some(backup), _) => restore_backup(ctx, &backup, &dest),
            (None, Some(created)) => {
                remove_path(&created).map(|()| track_parent(ctx, &created))
            }
            (None, None) => Ok(()),
        };
        match reverted {
            Ok(()) => StepStatus::Ok,
            Err(e) => io_failure(&mut self.message, "Reverting package copy", &dest, &e),
        }
    }

    fn failure_message(&self) -> Option<String> {
        self.message.clone()
    }
}

// ============================================================================
// remove-package-files
// ============================================================================

/// Moves the installed package out of the way.
///
/// The files are only deleted in `clean`, so `undo` can put them back.
#[derive(Debug, Default)]
pub struct StepRemovePackageFiles {
    moved: Option<(PathBuf, PathBuf)>,
    message: Option<String>,
}

impl StepRemovePackageFiles {
    /// Step name.
    pub const NAME: &'static str = "remove-package-files";

    /// Creates the step.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Step for StepRemovePackageFiles {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn precheck(&self, ctx: &ExecutionContext) -> StepStatus {
        require_pkgid(ctx)
    }

    fn process(&mut self, ctx: &mut ExecutionContext) -> StepStatus {
        let path = ctx.pkg_path();
        if !path.exists() {
            if ctx.force_remove() {
                warn!(path = %path.display(), "Package directory missing, continuing with force_remove");
                return StepStatus::Ok;
            }
            self.message = Some(format!("Package directory not found: {}", path.display()));
            return StepStatus::PackageNotFound;
        }

        match move_to_backup(ctx, &path) {
            Ok(backup) => {
                self.moved = Some((path, backup));
                StepStatus::Ok
            }
            Err(failure) => {
                let status =
                    io_failure(&mut self.message, "Removing package files", &path, &failure.error);
                self.moved = failure.backup.map(|backup| (path, backup));
                status
            }
        }
    }

    fn clean(&mut self, ctx: &mut ExecutionContext) -> StepStatus {
        let Some((_, backup)) = self.moved.take() else {
            return StepStatus::Ok;
        };
        match drop_backup(ctx, &backup) {
            Ok(()) => StepStatus::Ok,
            Err(e) => io_failure(&mut self.message, "Deleting package files", &backup, &e),
        }
    }

    fn undo(&mut self, ctx: &mut ExecutionContext) -> StepStatus {
        let Some((path, backup)) = self.moved.take() else {
            return StepStatus::Ok;
        };
        match restore_backup(ctx, &backup, &path) {
            Ok(()) => StepStatus::Ok,
            Err(e) => io_failure(&mut self.message, "Restoring package files", &path, &e),
        }
    }

    fn failure_message(&self) -> Option<String> {
        self.message.clone()
    }
}
