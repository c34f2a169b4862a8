//! Request-type step templates.
//!
//! Maps each [`RequestType`] to the ordered list of step names a backend
//! runs for it, and assembles a [`Pipeline`] from a [`StepRegistry`]. The
//! order encodes real data dependencies between steps (unzip before copy,
//! parse before register), but it is not validated here.

use crate::config::InstallerConfig;
use crate::context::{ExecutionContext, InstallRequest, RequestType};
use crate::errors::InstallflowError;
use crate::pipeline::{Pipeline, PipelineBuilder};
use crate::reporter::ProgressReporter;
use crate::steps::{StepConfigure, StepRegistry};
use tracing::debug;

const INSTALL: &[&str] = &[
    "configure",
    "unzip",
    "check-signature",
    "parse-manifest",
    "create-directory",
    "copy-package",
    "create-symbolic-link",
    "register-security",
    "generate-xml",
    "record-to-db",
];

const UPDATE: &[&str] = &[
    "configure",
    "unzip",
    "check-signature",
    "parse-manifest",
    "copy-package",
    "create-symbolic-link",
    "register-security",
    "generate-xml",
    "update-db",
];

const UNINSTALL: &[&str] = &[
    "configure",
    "parse-manifest",
    "unregister-app",
    "remove-package-files",
    "revoke-security",
];

const REINSTALL: &[&str] = &[
    "configure",
    "parse-manifest",
    "copy-package",
    "register-security",
    "update-db",
];

const DELTA: &[&str] = &[
    "configure",
    "unzip",
    "parse-manifest",
    "apply-delta",
    "copy-package",
    "register-security",
    "update-db",
];

const MOUNT_INSTALL: &[&str] = &[
    "configure",
    "mount",
    "check-signature",
    "parse-manifest",
    "create-directory",
    "copy-package",
    "create-symbolic-link",
    "register-security",
    "generate-xml",
    "record-to-db",
];

const MOUNT_UPDATE: &[&str] = &[
    "configure",
    "mount",
    "check-signature",
    "parse-manifest",
    "copy-package",
    "create-symbolic-link",
    "register-security",
    "generate-xml",
    "update-db",
];

const RECOVERY: &[&str] = &["configure", "recover-files", "recover-db"];

/// Returns the step names run for `request_type`, starting with `configure`.
#[must_use]
pub fn template(request_type: RequestType) -> &'static [&'static str] {
    match request_type {
        RequestType::Install => INSTALL,
        RequestType::Update => UPDATE,
        RequestType::Uninstall => UNINSTALL,
        RequestType::Reinstall => REINSTALL,
        RequestType::Delta => DELTA,
        RequestType::MountInstall => MOUNT_INSTALL,
        RequestType::MountUpdate => MOUNT_UPDATE,
        RequestType::Recovery => RECOVERY,
    }
}

/// Returns the template steps that `registry` cannot build.
///
/// `configure` is never missing: it is built from the request.
#[must_use]
pub fn missing_steps(request_type: RequestType, registry: &StepRegistry) -> Vec<&'static str> {
    template(request_type)
        .iter()
        .copied()
        .filter(|name| *name != StepConfigure::NAME && !registry.contains(name))
        .collect()
}

/// Builds the pipeline for `request`.
///
/// The first step is a [`StepConfigure`] carrying the request; the rest
/// come from `registry` in template order.
///
/// # Errors
///
/// Returns [`InstallflowError::UnknownStep`] for the first template step
/// that is not registered. Nothing has run at that point.
pub fn build_pipeline(
    request: InstallRequest,
    registry: &StepRegistry,
    config: &InstallerConfig,
    reporter: ProgressReporter,
) -> Result<Pipeline, InstallflowError> {
    let request_type = request.request_type;
    let mut builder = PipelineBuilder::new(request_type.to_string())
        .context(ExecutionContext::new())
        .config(config.clone())
        .reporter(reporter)
        .step(StepConfigure::new(request));

    for name in template(request_type).iter().skip(1) {
        builder = builder.boxed_step(registry.create(name)?);
    }

    debug!(request = %request_type, steps = builder.len(), "Assembled pipeline");
    Ok(builder.build()?)
}
