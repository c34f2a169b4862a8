//! Execution context for installer runs.
//!
//! This module provides:
//! - The shared mutable [`ExecutionContext`] passed to every step
//! - Request kinds and the parsed platform request
//! - Manifest and certificate data produced by backend steps
//! - A type-erased extension slot for package-kind specific state
//! - The accumulated per-step results of a run

#[cfg(test)]
mod context_tests;
mod execution;
mod extension;
mod identity;
mod package;
mod records;
mod request;

pub use execution::ExecutionContext;
pub use extension::{DeltaExtension, ExtensionSlot};
pub use identity::RunIdentity;
pub use package::{CertificateInfo, Manifest};
pub use records::{StepRecord, StepRecords};
pub use request::{InstallRequest, InstallationMode, PrivilegeLevel, RequestType};
