//! Environment toggles.
//!
//! The core never reads the environment; callers decide rewrite mode up
//! front and pass it to [`crate::Runner::load`].

use std::ffi::OsString;

/// Setting this variable, to any value, requests rewrite mode.
pub const REWRITE_VAR: &str = "REWRITE";

/// Whether rewrite mode was requested through the process environment.
///
/// # Examples
///
/// ```
/// let rewrite = goldtest::env::rewrite_requested();
/// # let _ = rewrite;
/// ```
pub fn rewrite_requested() -> bool {
    rewrite_requested_with(|name| std::env::var_os(name))
}

/// Whether rewrite mode was requested, reading variables through `lookup`.
///
/// Only presence counts; an empty value still enables rewrite mode.
pub fn rewrite_requested_with<F>(lookup: F) -> bool
where
    F: Fn(&str) -> Option<OsString>,
{
    lookup(REWRITE_VAR).is_some()
}
