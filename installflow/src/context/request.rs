//! Request kinds and the parsed platform request.

use crate::errors::UnknownRequestType;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// The operation the installer was asked to perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestType {
    /// Fresh installation.
    Install,
    /// Replace an installed version.
    Update,
    /// Remove an installed package.
    Uninstall,
    /// Re-register an already unpacked package.
    Reinstall,
    /// Apply a delta patch over an installed version.
    Delta,
    /// Install a package that is mounted instead of unpacked.
    MountInstall,
    /// Update a mounted package.
    MountUpdate,
    /// Finish or revert an interrupted request.
    Recovery,
}

impl RequestType {
    /// All request types, in declaration order.
    pub const ALL: [Self; 8] = [
        Self::Install,
        Self::Update,
        Self::Uninstall,
        Self::Reinstall,
        Self::Delta,
        Self::MountInstall,
        Self::MountUpdate,
        Self::Recovery,
    ];

    /// Returns true for requests that replace an installed version.
    #[must_use]
    pub fn is_update_like(&self) -> bool {
        matches!(self, Self::Update | Self::Delta | Self::MountUpdate)
    }

    /// Returns true for requests that may carry the previous manifest.
    #[must_use]
    pub fn allows_old_manifest(&self) -> bool {
        self.is_update_like() || matches!(self, Self::Recovery)
    }

    /// Returns true for requests that need a package archive on disk.
    #[must_use]
    pub fn needs_package_file(&self) -> bool {
        matches!(
            self,
            Self::Install | Self::Update | Self::Delta | Self::MountInstall | Self::MountUpdate
        )
    }

    /// Returns true for requests that act on an installed package id.
    #[must_use]
    pub fn needs_package_id(&self) -> bool {
        matches!(self, Self::Uninstall | Self::Reinstall | Self::Recovery)
    }
}

impl fmt::Display for RequestType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Install => write!(f, "install"),
            Self::Update => write!(f, "update"),
            Self::Uninstall => write!(f, "uninstall"),
            Self::Reinstall => write!(f, "reinstall"),
            Self::Delta => write!(f, "delta"),
            Self::MountInstall => write!(f, "mount_install"),
            Self::MountUpdate => write!(f, "mount_update"),
            Self::Recovery => write!(f, "recovery"),
        }
    }
}

impl FromStr for RequestType {
    type Err = UnknownRequestType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        Self::ALL
            .into_iter()
            .find(|request| request.to_string() == normalized)
            .ok_or_else(|| UnknownRequestType(s.to_string()))
    }
}

/// Whether the platform package manager is reachable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstallationMode {
    /// Running under the package manager; progress is signalled.
    #[default]
    Online,
    /// Running standalone (image creation, recovery at boot).
    Offline,
}

/// Privilege level granted by the package's certificate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrivilegeLevel {
    /// Level not determined yet.
    #[default]
    Unknown,
    /// Publicly distributed applications.
    Public,
    /// Partner applications.
    Partner,
    /// Platform applications.
    Platform,
}

/// The platform request as handed over by the package manager.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallRequest {
    /// The requested operation.
    pub request_type: RequestType,
    /// Package id, known up front for requests on installed packages.
    #[serde(default)]
    pub pkgid: Option<String>,
    /// Package archive path, for requests that consume one.
    #[serde(default)]
    pub file_path: Option<PathBuf>,
    /// Target user id.
    #[serde(default)]
    pub uid: u32,
    /// Install as a preloaded (read-only) package.
    #[serde(default)]
    pub is_preload: bool,
    /// Proceed even if parts of the installed package are missing.
    #[serde(default)]
    pub force_remove: bool,
}

impl InstallRequest {
    /// Creates a request of the given type with everything else defaulted.
    #[must_use]
    pub fn new(request_type: RequestType) -> Self {
        Self {
            request_type,
            pkgid: None,
            file_path: None,
            uid: 0,
            is_preload: false,
            force_remove: false,
        }
    }

    /// Sets the package id.
    #[must_use]
    pub fn with_pkgid(mut self, pkgid: impl Into<String>) -> Self {
        self.pkgid = Some(pkgid.into());
        self
    }

    /// Sets the package archive path.
    #[must_use]
    pub fn with_file_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.file_path = Some(path.into());
        self
    }

    /// Sets the target uid.
    #[must_use]
    pub fn with_uid(mut self, uid: u32) -> Self {
        self.uid = uid;
        self
    }

    /// Marks the request as a preload install.
    #[must_use]
    pub fn preload(mut self) -> Self {
        self.is_preload = true;
        self
    }

    /// Marks the request as a forced removal.
    #[must_use]
    pub fn force_remove(mut self) -> Self {
        self.force_remove = true;
        self
    }
}
