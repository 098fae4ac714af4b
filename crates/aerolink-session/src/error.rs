//! Session layer errors.
//!
//! | Error | Code | Recoverable |
//! |-------|------|-------------|
//! | [`SessionError::Closed`] | `SESSION_CLOSED` | No |
//! | [`SessionError::WaitTimeout`] | `SESSION_WAIT_TIMEOUT` | Yes |
//! | [`SessionError::Expect`] | `SESSION_EXPECT` | No |

use aerolink_expect::ExpectError;
use aerolink_types::ErrorCode;
use std::time::Duration;
use thiserror::Error;

/// Error from the session API.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SessionError {
    /// The scheduler task is gone; the session is unusable.
    #[error("session closed")]
    Closed,

    /// An outer wait bound elapsed before the expectation resolved.
    /// The expectation itself keeps running.
    #[error("wait timed out after {0:?}")]
    WaitTimeout(Duration),

    /// The submitted expectation could not be built.
    #[error(transparent)]
    Expect(#[from] ExpectError),
}

impl ErrorCode for SessionError {
    fn code(&self) -> &'static str {
        match self {
            Self::Closed => "SESSION_CLOSED",
            Self::WaitTimeout(_) => "SESSION_WAIT_TIMEOUT",
            Self::Expect(_) => "SESSION_EXPECT",
        }
    }

    fn is_recoverable(&self) -> bool {
        matches!(self, Self::WaitTimeout(_))
    }
}
