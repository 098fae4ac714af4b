//! Unified error interface for aerolink.
//!
//! Every error enum in the workspace implements [`ErrorCode`] so that
//! callers and logs can handle errors by stable machine-readable code
//! instead of by display string.
//!
//! # Code Convention
//!
//! - UPPER_SNAKE_CASE, prefixed per crate (`CATALOG_`, `EXPECT_`,
//!   `SESSION_`, `TRANSPORT_`)
//! - stable once published
//!
//! # Example
//!
//! ```
//! use aerolink_types::ErrorCode;
//!
//! #[derive(Debug)]
//! enum DemoError {
//!     Missing,
//!     Busy,
//! }
//!
//! impl ErrorCode for DemoError {
//!     fn code(&self) -> &'static str {
//!         match self {
//!             Self::Missing => "DEMO_MISSING",
//!             Self::Busy => "DEMO_BUSY",
//!         }
//!     }
//!
//!     fn is_recoverable(&self) -> bool {
//!         matches!(self, Self::Busy)
//!     }
//! }
//!
//! assert_eq!(DemoError::Busy.code(), "DEMO_BUSY");
//! assert!(DemoError::Busy.is_recoverable());
//! ```

/// Machine-readable error code interface.
///
/// An error is *recoverable* when retrying the operation may succeed
/// (timeouts, transient transport conditions). Construction errors and
/// schema mismatches are not: they will not change on retry.
pub trait ErrorCode {
    /// Returns the stable machine-readable code for this error.
    fn code(&self) -> &'static str;

    /// Returns whether retrying the failed operation may succeed.
    fn is_recoverable(&self) -> bool;
}

/// Asserts that one error code follows the workspace conventions.
///
/// # Panics
///
/// Panics if the code is empty, lacks the expected prefix, or is not
/// UPPER_SNAKE_CASE.
pub fn assert_error_code<E: ErrorCode>(err: &E, expected_prefix: &str) {
    let code = err.code();
    assert!(!code.is_empty(), "error code must not be empty");
    assert!(
        code.starts_with(expected_prefix),
        "error code '{code}' must start with '{expected_prefix}'"
    );
    assert!(
        is_upper_snake_case(code),
        "error code '{code}' must be UPPER_SNAKE_CASE"
    );
}

/// Asserts conventions for every variant of an error enum at once.
pub fn assert_error_codes<E: ErrorCode>(errors: &[E], expected_prefix: &str) {
    for err in errors {
        assert_error_code(err, expected_prefix);
    }
}

fn is_upper_snake_case(s: &str) -> bool {
    !s.is_empty()
        && !s.starts_with('_')
        && !s.ends_with('_')
        && !s.contains("__")
        && s.chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')
}
