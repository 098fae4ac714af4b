//! Expectation layer errors.
//!
//! | Error | Code | Recoverable |
//! |-------|------|-------------|
//! | [`ExpectError::Schema`] | `EXPECT_SCHEMA` | No |
//! | [`ExpectError::UnboundCommandArg`] | `EXPECT_UNBOUND_ARG` | No |
//! | [`ExpectError::EmptyCombinator`] | `EXPECT_EMPTY_COMBINATOR` | No |

use aerolink_catalog::CatalogError;
use aerolink_types::ErrorCode;
use thiserror::Error;

/// Error building or activating an expectation tree.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ExpectError {
    /// A pattern or instance inside the tree violates the catalog.
    #[error(transparent)]
    Schema(#[from] CatalogError),

    /// A template slot copies a command argument that was never bound.
    #[error("template for {command} copies unbound argument {arg:?}")]
    UnboundCommandArg {
        /// Full name of the command being expanded.
        command: String,
        /// The unbound command argument.
        arg: String,
    },

    /// An `and`, `or`, or `then` node has no children.
    #[error("combinator {0:?} has no children")]
    EmptyCombinator(&'static str),
}

impl ErrorCode for ExpectError {
    fn code(&self) -> &'static str {
        match self {
            Self::Schema(_) => "EXPECT_SCHEMA",
            Self::UnboundCommandArg { .. } => "EXPECT_UNBOUND_ARG",
            Self::EmptyCombinator(_) => "EXPECT_EMPTY_COMBINATOR",
        }
    }

    fn is_recoverable(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aerolink_types::assert_error_codes;

    #[test]
    fn all_codes_follow_convention() {
        assert_error_codes(
            &[
                ExpectError::Schema(CatalogError::UnknownMessage("x".into())),
                ExpectError::UnboundCommandArg {
                    command: "a.Cmd".into(),
                    arg: "mode".into(),
                },
                ExpectError::EmptyCombinator("and"),
            ],
            "EXPECT_",
        );
    }
}
