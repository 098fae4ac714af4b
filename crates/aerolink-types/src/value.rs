//! Parameter values carried by commands and events.
//!
//! The peer protocol exchanges typed parameters: integers, floats,
//! strings, enumerated values, and bitfields. Expectation matching
//! never compares raw wire encodings; it compares [`ParamValue`]s
//! under the normalization rules below.
//!
//! # Comparison Rules
//!
//! | Variant | Rule |
//! |---------|------|
//! | `I64` / `U64` / `Bool` / `Str` | exact equality |
//! | `F64` | equal within a float tolerance |
//! | `Enum` | variant name, ASCII case-insensitive |
//! | `Bitfield` | normalized `u64` value |
//!
//! Values of different variants never match, with one exception:
//! `I64` and `U64` holding the same non-negative quantity compare
//! equal, since catalogs are not consistent about signedness.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Default tolerance for float parameter comparison.
///
/// Protocol floats travel through at least one single-precision
/// conversion, so exact equality is meaningless for them.
pub const DEFAULT_FLOAT_TOL: f64 = 1e-7;

/// One typed parameter value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamValue {
    /// Signed integer.
    I64(i64),
    /// Unsigned integer.
    U64(u64),
    /// Floating point. Compared within a tolerance.
    F64(f64),
    /// Boolean flag.
    Bool(bool),
    /// Plain string.
    Str(String),
    /// Enumerated value, identified by its variant name.
    Enum(String),
    /// Bitfield, normalized to the set of raised bits.
    Bitfield(u64),
}

impl ParamValue {
    /// Convenience constructor for enum values.
    #[must_use]
    pub fn enum_value(name: impl Into<String>) -> Self {
        Self::Enum(name.into())
    }

    /// Convenience constructor for string values.
    #[must_use]
    pub fn str_value(s: impl Into<String>) -> Self {
        Self::Str(s.into())
    }

    /// Returns the variant name, for diagnostics.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::I64(_) => "i64",
            Self::U64(_) => "u64",
            Self::F64(_) => "f64",
            Self::Bool(_) => "bool",
            Self::Str(_) => "str",
            Self::Enum(_) => "enum",
            Self::Bitfield(_) => "bitfield",
        }
    }

    /// Compares this received value against an expected value.
    ///
    /// `float_tol` bounds the absolute difference accepted between two
    /// `F64` values. Enum names compare case-insensitively; mixed
    /// signed/unsigned integers compare by quantity.
    #[must_use]
    pub fn matches(&self, expected: &ParamValue, float_tol: f64) -> bool {
        match (self, expected) {
            (Self::I64(a), Self::I64(b)) => a == b,
            (Self::U64(a), Self::U64(b)) => a == b,
            (Self::I64(a), Self::U64(b)) | (Self::U64(b), Self::I64(a)) => {
                u64::try_from(*a).is_ok_and(|a| a == *b)
            }
            (Self::F64(a), Self::F64(b)) => (a - b).abs() <= float_tol,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Str(a), Self::Str(b)) => a == b,
            (Self::Enum(a), Self::Enum(b)) => a.eq_ignore_ascii_case(b),
            (Self::Bitfield(a), Self::Bitfield(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::I64(v) => write!(f, "{v}"),
            Self::U64(v) => write!(f, "{v}"),
            Self::F64(v) => write!(f, "{v}"),
            Self::Bool(v) => write!(f, "{v}"),
            Self::Str(v) => write!(f, "{v:?}"),
            Self::Enum(v) => write!(f, "{v}"),
            Self::Bitfield(v) => write!(f, "{v:#b}"),
        }
    }
}

impl From<i64> for ParamValue {
    fn from(v: i64) -> Self {
        Self::I64(v)
    }
}

impl From<u64> for ParamValue {
    fn from(v: u64) -> Self {
        Self::U64(v)
    }
}

impl From<f64> for ParamValue {
    fn from(v: f64) -> Self {
        Self::F64(v)
    }
}

impl From<bool> for ParamValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        Self::Str(v.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(v: String) -> Self {
        Self::Str(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_variants_match() {
        assert!(ParamValue::I64(3).matches(&ParamValue::I64(3), DEFAULT_FLOAT_TOL));
        assert!(!ParamValue::I64(3).matches(&ParamValue::I64(4), DEFAULT_FLOAT_TOL));
        assert!(ParamValue::Bool(true).matches(&ParamValue::Bool(true), DEFAULT_FLOAT_TOL));
        assert!(ParamValue::from("abc").matches(&ParamValue::from("abc"), DEFAULT_FLOAT_TOL));
    }

    #[test]
    fn floats_match_within_tolerance() {
        let a = ParamValue::F64(1.0);
        assert!(a.matches(&ParamValue::F64(1.0 + 1e-9), DEFAULT_FLOAT_TOL));
        assert!(!a.matches(&ParamValue::F64(1.001), DEFAULT_FLOAT_TOL));
        // A wider tolerance accepts the same pair.
        assert!(a.matches(&ParamValue::F64(1.001), 0.01));
    }

    #[test]
    fn enums_match_case_insensitively() {
        let hovering = ParamValue::enum_value("hovering");
        assert!(hovering.matches(&ParamValue::enum_value("Hovering"), DEFAULT_FLOAT_TOL));
        assert!(!hovering.matches(&ParamValue::enum_value("landed"), DEFAULT_FLOAT_TOL));
    }

    #[test]
    fn mixed_sign_integers_match_by_quantity() {
        assert!(ParamValue::I64(5).matches(&ParamValue::U64(5), DEFAULT_FLOAT_TOL));
        assert!(ParamValue::U64(5).matches(&ParamValue::I64(5), DEFAULT_FLOAT_TOL));
        assert!(!ParamValue::I64(-5).matches(&ParamValue::U64(5), DEFAULT_FLOAT_TOL));
    }

    #[test]
    fn different_kinds_never_match() {
        assert!(!ParamValue::I64(1).matches(&ParamValue::Bool(true), DEFAULT_FLOAT_TOL));
        assert!(!ParamValue::enum_value("a").matches(&ParamValue::from("a"), DEFAULT_FLOAT_TOL));
    }

    #[test]
    fn bitfields_match_by_value() {
        assert!(ParamValue::Bitfield(0b101).matches(&ParamValue::Bitfield(0b101), 0.0));
        assert!(!ParamValue::Bitfield(0b101).matches(&ParamValue::Bitfield(0b001), 0.0));
    }
}
