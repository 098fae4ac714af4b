//! Node resolution states and the cache lookup seam.

use aerolink_catalog::{Event, EventPattern};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Resolution state of one expectation node.
///
/// Every node starts `Pending` and resolves at most once. A resolved
/// node is frozen: later events, ticks, and acknowledgements cannot
/// change it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeState {
    /// Not yet resolved.
    Pending,
    /// The expectation was met.
    Success,
    /// The deadline elapsed, the send failed, or the link dropped.
    TimedOut,
}

impl NodeState {
    /// Returns `true` once the node is resolved either way.
    #[must_use]
    pub fn is_resolved(self) -> bool {
        self != Self::Pending
    }
}

impl fmt::Display for NodeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Pending => "pending",
            Self::Success => "success",
            Self::TimedOut => "timed_out",
        })
    }
}

/// Read access to the last-observed-state cache.
///
/// `check` and `check_wait` leaves consult this at activation. The
/// session layer implements it over its event cache; tests implement
/// it over a map.
pub trait StateLookup {
    /// Returns a cached event matching the pattern, if one exists.
    fn lookup(&self, pattern: &EventPattern, float_tol: f64) -> Option<Event>;
}

/// The empty cache. Every lookup misses.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCache;

impl StateLookup for NoCache {
    fn lookup(&self, _pattern: &EventPattern, _float_tol: f64) -> Option<Event> {
        None
    }
}
