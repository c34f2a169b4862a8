//! Installer configuration.

use crate::context::{ExecutionContext, InstallationMode};
use crate::errors::InstallflowError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Settings shared by every pipeline an installer backend builds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallerConfig {
    /// Package type label sent with progress signals (e.g. "tpk").
    #[serde(default = "default_pkg_type")]
    pub pkg_type: String,
    /// Flush written paths to disk before the run ends.
    #[serde(default = "default_true")]
    pub sync_on_finish: bool,
    /// Send progress signals at all.
    #[serde(default = "default_true")]
    pub report_progress: bool,
    /// Online (package manager attached) or offline.
    #[serde(default)]
    pub installation_mode: InstallationMode,
    /// Root directory applications are installed under.
    #[serde(default)]
    pub root_application_path: Option<PathBuf>,
}

fn default_pkg_type() -> String {
    "pkg".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for InstallerConfig {
    fn default() -> Self {
        Self {
            pkg_type: default_pkg_type(),
            sync_on_finish: default_true(),
            report_progress: default_true(),
            installation_mode: InstallationMode::default(),
            root_application_path: None,
        }
    }
}

impl InstallerConfig {
    /// Creates a configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a JSON document.
    ///
    /// # Errors
    ///
    /// Returns [`InstallflowError::Serialization`] for malformed JSON.
    pub fn from_json_str(json: &str) -> Result<Self, InstallflowError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Reads and parses a JSON file.
    ///
    /// # Errors
    ///
    /// Returns [`InstallflowError::Config`] if the file cannot be read or
    /// parsed.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, InstallflowError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            InstallflowError::Config(format!("cannot read {}: {e}", path.display()))
        })?;
        serde_json::from_str(&raw)
            .map_err(|e| InstallflowError::Config(format!("invalid {}: {e}", path.display())))
    }

    /// Sets the package type label.
    #[must_use]
    pub fn with_pkg_type(mut self, pkg_type: impl Into<String>) -> Self {
        self.pkg_type = pkg_type.into();
        self
    }

    /// Enables or disables flushing written paths.
    #[must_use]
    pub fn with_sync_on_finish(mut self, sync: bool) -> Self {
        self.sync_on_finish = sync;
        self
    }

    /// Enables or disables progress signals.
    #[must_use]
    pub fn with_report_progress(mut self, report: bool) -> Self {
        self.report_progress = report;
        self
    }

    /// Sets the installation mode.
    #[must_use]
    pub fn with_installation_mode(mut self, mode: InstallationMode) -> Self {
        self.installation_mode = mode;
        self
    }

    /// Sets the root application path.
    #[must_use]
    pub fn with_root_application_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.root_application_path = Some(path.into());
        self
    }

    /// Returns true if progress signals should be sent.
    ///
    /// Offline runs have nobody listening, whatever `report_progress` says.
    #[must_use]
    pub fn progress_enabled(&self) -> bool {
        self.report_progress && self.installation_mode == InstallationMode::Online
    }

    /// Copies the context-facing settings into `ctx`.
    pub fn apply_to(&self, ctx: &mut ExecutionContext) {
        ctx.set_pkg_type(self.pkg_type.clone());
        ctx.set_installation_mode(self.installation_mode);
        if let Some(root) = &self.root_application_path {
            ctx.set_root_application_path(root.clone());
        }
    }
}
