//! Test fixtures for building contexts and reporters.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::context::{ExecutionContext, RequestType};
use crate::reporter::{CollectingProgressSink, ProgressReporter};

/// Builder for an [`ExecutionContext`] rooted in a scratch directory.
#[derive(Debug, Clone)]
pub struct TestContext {
    root: PathBuf,
    pkgid: String,
    pkg_type: String,
    request_type: Option<RequestType>,
}

impl TestContext {
    /// Package id used when none is given.
    pub const DEFAULT_PKGID: &'static str = "org.example.app";

    /// Creates a fixture installing under `root`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            pkgid: Self::DEFAULT_PKGID.to_string(),
            pkg_type: "test".to_string(),
            request_type: None,
        }
    }

    /// Sets the package id. An empty id leaves the context without one.
    #[must_use]
    pub fn with_pkgid(mut self, pkgid: impl Into<String>) -> Self {
        self.pkgid = pkgid.into();
        self
    }

    /// Sets the package type label.
    #[must_use]
    pub fn with_pkg_type(mut self, pkg_type: impl Into<String>) -> Self {
        self.pkg_type = pkg_type.into();
        self
    }

    /// Locks the request type up front.
    #[must_use]
    pub fn with_request_type(mut self, request_type: RequestType) -> Self {
        self.request_type = Some(request_type);
        self
    }

    /// Returns the root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns where the package will be installed.
    #[must_use]
    pub fn pkg_path(&self) -> PathBuf {
        self.root.join(&self.pkgid)
    }

    /// Builds the context.
    ///
    /// A malformed package id is left unset, so steps see it as missing.
    #[must_use]
    pub fn build(&self) -> ExecutionContext {
        let mut ctx = ExecutionContext::new()
            .with_root_application_path(&self.root)
            .with_pkg_type(&self.pkg_type);
        if !self.pkgid.is_empty() {
            let _ = ctx.set_pkgid(&self.pkgid);
        }
        if let Some(request_type) = self.request_type {
            let _ = ctx.set_request_type(request_type);
        }
        ctx
    }
}

/// Creates a reporter backed by a collecting sink.
#[must_use]
pub fn collecting_reporter() -> (ProgressReporter, Arc<CollectingProgressSink>) {
    let sink = Arc::new(CollectingProgressSink::new());
    (ProgressReporter::new(sink.clone()), sink)
}
