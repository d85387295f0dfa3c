//! Test helpers shared across crates.
//!
//! Provides serialised environment-variable guards and a small helper for
//! building argument vectors.

pub mod env;

use std::ffi::OsString;

/// Build an argument vector from string slices.
///
/// # Examples
///
/// ```
/// let argv = test_helpers::argv(&["--port", "80"]);
/// assert_eq!(argv.len(), 2);
/// ```
#[must_use]
pub fn argv(args: &[&str]) -> Vec<OsString> {
    args.iter().map(OsString::from).collect()
}
