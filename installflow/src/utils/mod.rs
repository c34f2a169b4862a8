//! Shared helpers: timestamps, input validation and filesystem operations.

pub mod fs;
pub mod timestamps;
mod validation;

pub use timestamps::{elapsed_ms, iso_timestamp, now_utc, Timestamp};
pub use validation::{is_valid_pkgid, validate_pkgid, PKGID_PATTERN};
