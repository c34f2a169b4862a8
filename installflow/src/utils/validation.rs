//! Input validation helpers.

use crate::errors::ContextError;
use regex::Regex;
use std::sync::LazyLock;

/// Accepted package id shape: a letter followed by up to 63 of
/// `[A-Za-z0-9_.-]`.
pub const PKGID_PATTERN: &str = r"^[A-Za-z][A-Za-z0-9_.\-]{0,63}$";

static PKGID_RE: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(PKGID_PATTERN).ok());

/// Returns true if `pkgid` has the accepted shape.
#[must_use]
pub fn is_valid_pkgid(pkgid: &str) -> bool {
    PKGID_RE.as_ref().is_some_and(|re| re.is_match(pkgid))
}

/// Validates a package id.
///
/// # Errors
///
/// Returns [`ContextError::EmptyPackageId`] for an empty id and
/// [`ContextError::InvalidPackageId`] for a malformed one.
pub fn validate_pkgid(pkgid: &str) -> Result<(), ContextError> {
    if pkgid.is_empty() {
        return Err(ContextError::EmptyPackageId);
    }
    if !is_valid_pkgid(pkgid) {
        return Err(ContextError::InvalidPackageId(pkgid.to_string()));
    }
    Ok(())
}
