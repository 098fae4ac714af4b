//! Expectation satisfaction policies.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Governs whether a cached prior event can satisfy an expectation
/// without a fresh observation.
///
/// | Policy | Satisfied by |
/// |--------|--------------|
/// | `Check` | a cache hit only |
/// | `Wait` | a new event observed after activation |
/// | `CheckWait` | a cache hit, else a new event |
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Policy {
    /// Satisfied only by the last-observed-state cache.
    Check,
    /// Requires an event observed strictly after activation.
    Wait,
    /// Checks the cache first, falls back to waiting.
    #[default]
    CheckWait,
}

impl Policy {
    /// Returns `true` if this policy may consult the state cache.
    #[must_use]
    pub fn checks_cache(self) -> bool {
        matches!(self, Self::Check | Self::CheckWait)
    }

    /// Returns `true` if this policy may wait for a fresh event.
    #[must_use]
    pub fn waits(self) -> bool {
        matches!(self, Self::Wait | Self::CheckWait)
    }
}

impl fmt::Display for Policy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Check => "check",
            Self::Wait => "wait",
            Self::CheckWait => "check_wait",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capabilities() {
        assert!(Policy::Check.checks_cache());
        assert!(!Policy::Check.waits());
        assert!(!Policy::Wait.checks_cache());
        assert!(Policy::Wait.waits());
        assert!(Policy::CheckWait.checks_cache());
        assert!(Policy::CheckWait.waits());
    }

    #[test]
    fn default_is_check_wait() {
        assert_eq!(Policy::default(), Policy::CheckWait);
    }
}
