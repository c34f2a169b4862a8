//! The leading step of every pipeline: copies the platform request into the context.

use super::Step;
use crate::context::{ExecutionContext, InstallRequest};
use crate::core::StepStatus;
use crate::utils::validate_pkgid;
use parking_lot::Mutex;
use tracing::debug;

/// Validates the [`InstallRequest`] and writes it into the context.
///
/// Locks the request type for the rest of the run. Has no undo or clean
/// effects.
#[derive(Debug)]
pub struct StepConfigure {
    request: InstallRequest,
    message: Mutex<Option<String>>,
}

impl StepConfigure {
    /// Step name.
    pub const NAME: &'static str = "configure";

    /// Creates the step for one request.
    #[must_use]
    pub fn new(request: InstallRequest) -> Self {
        Self {
            request,
            message: Mutex::new(None),
        }
    }

    /// Returns the request this step applies.
    #[must_use]
    pub fn request(&self) -> &InstallRequest {
        &self.request
    }

    fn validate(&self, ctx: &ExecutionContext) -> Result<(), (StepStatus, String)> {
        let request_type = self.request.request_type;

        if let Some(current) = ctx.request_type() {
            if current != request_type {
                return Err((
                    StepStatus::InvalidValue,
                    format!("Request type is already '{current}', got '{request_type}'"),
                ));
            }
        }

        match &self.request.file_path {
            None if request_type.needs_package_file() => {
                return Err((
                    StepStatus::InvalidValue,
                    format!("'{request_type}' request needs a package file"),
                ));
            }
            Some(path) if !path.exists() => {
                return Err((
                    StepStatus::PackageNotFound,
                    format!("Package file not found: {}", path.display()),
                ));
            }
            _ => {}
        }

        match &self.request.pkgid {
            None if request_type.needs_package_id() => Err((
                StepStatus::InvalidValue,
                format!("'{request_type}' request needs a package id"),
            )),
            Some(pkgid) => {
                validate_pkgid(pkgid).map_err(|e| (StepStatus::from(e.clone()), e.to_string()))
            }
            None => Ok(()),
        }
    }

    fn fail(&self, status: StepStatus, message: String) -> StepStatus {
        debug!(step = Self::NAME, status = %status, message = %message, "Request rejected");
        *self.message.lock() = Some(message);
        status
    }
}

impl Step for StepConfigure {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn precheck(&self, ctx: &ExecutionContext) -> StepStatus {
        match self.validate(ctx) {
            Ok(()) => StepStatus::Ok,
            Err((status, message)) => self.fail(status, message),
        }
    }

    fn process(&mut self, ctx: &mut ExecutionContext) -> StepStatus {
        let request = &self.request;

        if let Err(e) = ctx.set_request_type(request.request_type) {
            return self.fail(StepStatus::from(e.clone()), e.to_string());
        }
        if let Some(pkgid) = &request.pkgid {
            if let Err(e) = ctx.set_pkgid(pkgid.clone()) {
                return self.fail(StepStatus::from(e.clone()), e.to_string());
            }
        }
        if let Some(path) = &request.file_path {
            ctx.set_file_path(path.clone());
        }
        ctx.set_uid(request.uid);
        ctx.set_preload(request.is_preload);
        ctx.set_force_remove(request.force_remove);

        debug!(
            step = Self::NAME,
            request = %request.request_type,
            pkgid = request.pkgid.as_deref().unwrap_or(""),
            uid = request.uid,
            "Configured request"
        );
        StepStatus::Ok
    }

    fn failure_message(&self) -> Option<String> {
        self.message.lock().clone()
    }
}
