//! Parsed package metadata carried on the context.
//!
//! Manifest parsing and certificate validation are done by backend steps;
//! these types only hold what those steps produce.

use super::PrivilegeLevel;
use serde::{Deserialize, Serialize};

/// The parts of a package manifest the engine and generic steps look at.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    /// Package id declared by the manifest.
    pub package_id: String,
    /// Package version string.
    pub version: String,
    /// Platform API version the package targets.
    #[serde(default)]
    pub api_version: Option<String>,
    /// Application ids contained in the package.
    #[serde(default)]
    pub applications: Vec<String>,
    /// Privileges the package requests.
    #[serde(default)]
    pub privileges: Vec<String>,
}

impl Manifest {
    /// Creates a manifest with an id and version.
    #[must_use]
    pub fn new(package_id: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            package_id: package_id.into(),
            version: version.into(),
            ..Self::default()
        }
    }

    /// Adds an application id.
    #[must_use]
    pub fn with_application(mut self, appid: impl Into<String>) -> Self {
        self.applications.push(appid.into());
        self
    }

    /// Adds a requested privilege.
    #[must_use]
    pub fn with_privilege(mut self, privilege: impl Into<String>) -> Self {
        self.privileges.push(privilege.into());
        self
    }
}

/// Certificate data extracted by signature checking.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertificateInfo {
    /// Author certificate, encoded as the signature step delivers it.
    #[serde(default)]
    pub author_certificate: Option<String>,
    /// Distributor certificate.
    #[serde(default)]
    pub distributor_certificate: Option<String>,
    /// Privilege level the signature grants.
    #[serde(default)]
    pub level: PrivilegeLevel,
}
