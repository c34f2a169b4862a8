//! Step status, error classes and the aggregate pipeline result.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Outcome of a single step phase.
///
/// `Ok` is the only success value. Every other variant names a specific
/// failure kind, because undo dispatch and error signalling depend on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    /// Phase completed successfully.
    #[default]
    Ok,
    /// Generic failure, also used for panics caught at the pipeline boundary.
    Error,
    /// A required context field is missing or malformed.
    InvalidValue,
    /// The package archive or installed package could not be found.
    PackageNotFound,
    /// The package manifest could not be found.
    ManifestNotFound,
    /// The package manifest is present but unusable.
    ManifestError,
    /// Signature verification rejected the package.
    SignatureError,
    /// Security registration or policy check failed.
    SecurityError,
    /// The package requests a privilege above its certificate level.
    PrivilegeError,
    /// Not enough disk space.
    OutOfSpace,
    /// A directory could not be created.
    CreateDirError,
    /// Generic filesystem or process failure.
    IoError,
    /// Policy, blacklist or restriction denied the request.
    OperationNotAllowed,
    /// Writing to the platform package database failed.
    RegistrationError,
    /// A recovery step finished the recovery itself and stops the forward pass.
    RecoveryDone,
}

impl fmt::Display for StepStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Ok => "ok",
            Self::Error => "error",
            Self::InvalidValue => "invalid_value",
            Self::PackageNotFound => "package_not_found",
            Self::ManifestNotFound => "manifest_not_found",
            Self::ManifestError => "manifest_error",
            Self::SignatureError => "signature_error",
            Self::SecurityError => "security_error",
            Self::PrivilegeError => "privilege_error",
            Self::OutOfSpace => "out_of_space",
            Self::CreateDirError => "create_dir_error",
            Self::IoError => "io_error",
            Self::OperationNotAllowed => "operation_not_allowed",
            Self::RegistrationError => "registration_error",
            Self::RecoveryDone => "recovery_done",
        };
        f.write_str(name)
    }
}

impl StepStatus {
    /// Returns true if the status is `Ok`.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok)
    }

    /// Returns true for any non-`Ok` status.
    #[must_use]
    pub fn is_failure(&self) -> bool {
        !self.is_ok()
    }

    /// Stable numeric code, sent over the signalling channel.
    #[must_use]
    pub fn code(&self) -> i32 {
        match self {
            Self::Ok => 0,
            Self::Error => 1,
            Self::InvalidValue => 2,
            Self::PackageNotFound => 3,
            Self::ManifestNotFound => 4,
            Self::ManifestError => 5,
            Self::SignatureError => 6,
            Self::SecurityError => 7,
            Self::PrivilegeError => 8,
            Self::OutOfSpace => 9,
            Self::CreateDirError => 10,
            Self::IoError => 11,
            Self::OperationNotAllowed => 12,
            Self::RegistrationError => 13,
            Self::RecoveryDone => 14,
        }
    }

    /// Returns the error class of a failure status, `None` for `Ok`.
    #[must_use]
    pub fn class(&self) -> Option<ErrorClass> {
        let class = match self {
            Self::Ok => return None,
            Self::InvalidValue => ErrorClass::InvalidArgument,
            Self::PackageNotFound | Self::ManifestNotFound => ErrorClass::NotFound,
            Self::ManifestError => ErrorClass::InvalidArgument,
            Self::SignatureError | Self::SecurityError | Self::PrivilegeError => {
                ErrorClass::PermissionOrSecurity
            }
            Self::OutOfSpace | Self::CreateDirError => ErrorClass::Resource,
            Self::IoError => ErrorClass::Io,
            Self::OperationNotAllowed => ErrorClass::OperationNotAllowed,
            Self::RegistrationError => ErrorClass::Registration,
            Self::Error | Self::RecoveryDone => ErrorClass::Generic,
        };
        Some(class)
    }

    /// Maps a filesystem error to a status.
    ///
    /// `ENOSPC` becomes `OutOfSpace`, everything else `IoError`.
    #[must_use]
    pub fn from_io(err: &std::io::Error) -> Self {
        const ENOSPC: i32 = 28;
        if err.raw_os_error() == Some(ENOSPC) {
            Self::OutOfSpace
        } else {
            Self::IoError
        }
    }
}

/// Coarse grouping of failure statuses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorClass {
    /// Malformed or missing required context field.
    InvalidArgument,
    /// Manifest, package or file missing.
    NotFound,
    /// Signature, privilege or security registration failure.
    PermissionOrSecurity,
    /// Disk space or directory creation failure.
    Resource,
    /// Generic filesystem or process failure.
    Io,
    /// Denied by policy.
    OperationNotAllowed,
    /// Platform database write failure.
    Registration,
    /// Catch-all.
    Generic,
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidArgument => write!(f, "invalid_argument"),
            Self::NotFound => write!(f, "not_found"),
            Self::PermissionOrSecurity => write!(f, "permission_or_security"),
            Self::Resource => write!(f, "resource"),
            Self::Io => write!(f, "io"),
            Self::OperationNotAllowed => write!(f, "operation_not_allowed"),
            Self::Registration => write!(f, "registration"),
            Self::Generic => write!(f, "generic"),
        }
    }
}

/// The step lifecycle phase a status was produced in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Side-effect free validation.
    Precheck,
    /// The step's actual work.
    Process,
    /// Post-success finalization.
    Clean,
    /// Rollback after a failure.
    Undo,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Precheck => write!(f, "precheck"),
            Self::Process => write!(f, "process"),
            Self::Clean => write!(f, "clean"),
            Self::Undo => write!(f, "undo"),
        }
    }
}

/// Aggregate outcome of one pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineResult {
    /// Every step processed and cleaned.
    Ok,
    /// A step failed and every undo succeeded.
    Error,
    /// A step failed and at least one undo failed too.
    UndoError,
    /// Every step processed but a clean failed.
    CleanupError,
}

impl PipelineResult {
    /// Returns true for `Ok`.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok)
    }

    /// Process exit code surfaced to the platform tool.
    #[must_use]
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Ok => 0,
            Self::Error => 1,
            Self::UndoError => 2,
            Self::CleanupError => 3,
        }
    }
}

impl fmt::Display for PipelineResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ok => write!(f, "ok"),
            Self::Error => write!(f, "error"),
            Self::UndoError => write!(f, "undo_error"),
            Self::CleanupError => write!(f, "cleanup_error"),
        }
    }
}

impl From<PipelineResult> for std::process::ExitCode {
    fn from(result: PipelineResult) -> Self {
        Self::from(result.exit_code())
    }
}
