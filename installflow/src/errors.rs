//! Error types for the installflow engine.
//!
//! Step outcomes travel as [`StepStatus`](crate::core::StepStatus) values, never
//! as errors. The types here cover everything around the steps: context
//! invariants, pipeline assembly, configuration and the progress sink.

use crate::context::RequestType;
use crate::core::StepStatus;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// The main error type for installflow operations.
#[derive(Debug, Error)]
pub enum InstallflowError {
    /// A context invariant was violated.
    #[error("{0}")]
    Context(#[from] ContextError),

    /// The pipeline could not be assembled.
    #[error("{0}")]
    Validation(#[from] PipelineValidationError),

    /// A template referenced a step that is not registered.
    #[error("Unknown step: {name}")]
    UnknownStep {
        /// The step name.
        name: String,
    },

    /// The request type string could not be parsed.
    #[error("{0}")]
    UnknownRequestType(#[from] UnknownRequestType),

    /// Configuration could not be loaded.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl InstallflowError {
    /// Returns the pipeline contract code for assembly errors.
    #[must_use]
    pub fn code(&self) -> Option<&str> {
        match self {
            Self::Validation(err) => err.code(),
            Self::UnknownStep { .. } => Some("PIPELINE-UNKNOWN-STEP"),
            _ => None,
        }
    }
}

/// Violations of [`ExecutionContext`](crate::context::ExecutionContext) invariants.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContextError {
    /// The request type was already fixed by the configuration step.
    #[error("Request type is locked to '{current}', cannot change it to '{attempted}'")]
    RequestTypeLocked {
        /// The locked request type.
        current: RequestType,
        /// The rejected request type.
        attempted: RequestType,
    },

    /// A step needed the package id before anything set it.
    #[error("Package id is empty")]
    EmptyPackageId,

    /// The package id does not match the accepted format.
    #[error("Invalid package id: '{0}'")]
    InvalidPackageId(String),

    /// An old manifest only exists for update-like requests.
    #[error("Old manifest is not allowed for '{0}' requests")]
    OldManifestNotAllowed(RequestType),

    /// The old manifest can only be set once.
    #[error("Old manifest is already set")]
    OldManifestAlreadySet,

    /// A path that must exist on disk does not.
    #[error("Path does not exist: {}", .0.display())]
    MissingPath(PathBuf),

    /// A required field was not set by an earlier step.
    #[error("Required context field '{0}' is not set")]
    MissingField(&'static str),
}

impl From<ContextError> for StepStatus {
    fn from(err: ContextError) -> Self {
        match err {
            ContextError::MissingPath(_) => Self::PackageNotFound,
            ContextError::RequestTypeLocked { .. }
            | ContextError::EmptyPackageId
            | ContextError::InvalidPackageId(_)
            | ContextError::OldManifestNotAllowed(_)
            | ContextError::OldManifestAlreadySet
            | ContextError::MissingField(_) => Self::InvalidValue,
        }
    }
}

/// An unrecognised request type name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown request type: '{0}'")]
pub struct UnknownRequestType(pub String);

/// Metadata about a pipeline assembly error for better diagnostics.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct ContractErrorInfo {
    /// Error code (e.g., "PIPELINE-EMPTY").
    pub code: String,
    /// Short summary of the error.
    pub summary: String,
    /// Hint for fixing the error.
    pub fix_hint: Option<String>,
}

impl ContractErrorInfo {
    /// Creates a new contract error info.
    #[must_use]
    pub fn new(code: impl Into<String>, summary: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            summary: summary.into(),
            fix_hint: None,
        }
    }

    /// Sets the fix hint.
    #[must_use]
    pub fn with_fix_hint(mut self, hint: impl Into<String>) -> Self {
        self.fix_hint = Some(hint.into());
        self
    }
}

/// Error raised when a pipeline cannot be built.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct PipelineValidationError {
    /// The error message.
    pub message: String,
    /// The steps involved in the error.
    pub steps: Vec<String>,
    /// Optional contract error info.
    pub error_info: Option<ContractErrorInfo>,
}

impl PipelineValidationError {
    /// Creates a new pipeline validation error.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            steps: Vec::new(),
            error_info: None,
        }
    }

    /// Sets the steps involved.
    #[must_use]
    pub fn with_steps(mut self, steps: Vec<String>) -> Self {
        self.steps = steps;
        self
    }

    /// Sets the contract error info.
    #[must_use]
    pub fn with_error_info(mut self, info: ContractErrorInfo) -> Self {
        self.error_info = Some(info);
        self
    }

    /// Returns the contract error code, if any.
    #[must_use]
    pub fn code(&self) -> Option<&str> {
        self.error_info.as_ref().map(|info| info.code.as_str())
    }
}

/// A progress sink failed to deliver an event.
#[derive(Debug, Clone, Error)]
#[error("Progress sink error: {0}")]
pub struct SinkError(pub String);

impl SinkError {
    /// Creates a new sink error.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_error_to_status() {
        assert_eq!(StepStatus::from(ContextError::EmptyPackageId), StepStatus::InvalidValue);
        assert_eq!(
            StepStatus::from(ContextError::MissingPath(PathBuf::from("/nowhere"))),
            StepStatus::PackageNotFound
        );
        assert_eq!(
            StepStatus::from(ContextError::MissingField("manifest")),
            StepStatus::InvalidValue
        );
    }

    #[test]
    fn test_request_type_locked_message() {
        let err = ContextError::RequestTypeLocked {
            current: RequestType::Install,
            attempted: RequestType::Uninstall,
        };
        assert_eq!(
            err.to_string(),
            "Request type is locked to 'install', cannot change it to 'uninstall'"
        );
    }

    #[test]
    fn test_validation_error_code() {
        let err = PipelineValidationError::new("empty")
            .with_error_info(ContractErrorInfo::new("PIPELINE-EMPTY", "no steps"));
        assert_eq!(err.code(), Some("PIPELINE-EMPTY"));
        assert_eq!(PipelineValidationError::new("x").code(), None);
    }

    #[test]
    fn test_installflow_error_from_context() {
        let err: InstallflowError = ContextError::EmptyPackageId.into();
        assert!(matches!(err, InstallflowError::Context(_)));
        assert_eq!(err.to_string(), "Package id is empty");
    }
}
