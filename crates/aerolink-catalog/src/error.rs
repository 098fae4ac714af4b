//! Catalog layer errors.
//!
//! All construction-time schema violations surface here, eagerly.
//! A pattern or instance that references an unknown field is rejected
//! when it is built, never silently ignored at match time.
//!
//! | Error | Code | Recoverable |
//! |-------|------|-------------|
//! | [`CatalogError::UnknownMessage`] | `CATALOG_UNKNOWN_MESSAGE` | No |
//! | [`CatalogError::UnknownField`] | `CATALOG_UNKNOWN_FIELD` | No |
//! | [`CatalogError::MissingField`] | `CATALOG_MISSING_FIELD` | No |
//! | [`CatalogError::KindMismatch`] | `CATALOG_KIND_MISMATCH` | No |
//! | [`CatalogError::WrongDirection`] | `CATALOG_WRONG_DIRECTION` | No |
//! | [`CatalogError::DuplicateMessage`] | `CATALOG_DUPLICATE_MESSAGE` | No |
//! | [`CatalogError::Parse`] | `CATALOG_PARSE` | No |

use aerolink_types::ErrorCode;
use thiserror::Error;

/// Catalog construction and lookup error.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CatalogError {
    /// Referenced message is not in the catalog.
    #[error("unknown message: {0}")]
    UnknownMessage(String),

    /// Pattern or instance references a field the schema does not declare.
    #[error("message {message} has no field named {field:?}")]
    UnknownField {
        /// Full name of the message whose schema was consulted.
        message: String,
        /// The offending field name.
        field: String,
    },

    /// Command instance left a declared field unbound.
    #[error("message {message} requires field {field:?}")]
    MissingField {
        /// Full name of the message whose schema was consulted.
        message: String,
        /// The unbound field name.
        field: String,
    },

    /// Bound value kind does not fit the declared field kind.
    #[error("field {field:?} of {message} expects {expected}, got {got}")]
    KindMismatch {
        /// Full name of the message whose schema was consulted.
        message: String,
        /// The offending field name.
        field: String,
        /// Declared field kind.
        expected: &'static str,
        /// Kind of the value that was supplied.
        got: &'static str,
    },

    /// Command built from an event schema, or the other way round.
    #[error("message {message} is not a {expected}")]
    WrongDirection {
        /// Full name of the message.
        message: String,
        /// What the caller needed ("command" or "event").
        expected: &'static str,
    },

    /// Two schemas registered under the same id or name.
    #[error("duplicate message registration: {0}")]
    DuplicateMessage(String),

    /// Catalog text could not be parsed.
    #[error("catalog parse error: {0}")]
    Parse(String),
}

impl ErrorCode for CatalogError {
    fn code(&self) -> &'static str {
        match self {
            Self::UnknownMessage(_) => "CATALOG_UNKNOWN_MESSAGE",
            Self::UnknownField { .. } => "CATALOG_UNKNOWN_FIELD",
            Self::MissingField { .. } => "CATALOG_MISSING_FIELD",
            Self::KindMismatch { .. } => "CATALOG_KIND_MISMATCH",
            Self::WrongDirection { .. } => "CATALOG_WRONG_DIRECTION",
            Self::DuplicateMessage(_) => "CATALOG_DUPLICATE_MESSAGE",
            Self::Parse(_) => "CATALOG_PARSE",
        }
    }

    fn is_recoverable(&self) -> bool {
        // Schema violations never succeed on retry.
        false
    }
}
