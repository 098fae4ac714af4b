//! Session tuning knobs.

use aerolink_types::DEFAULT_FLOAT_TOL;
use serde::{Deserialize, Serialize};

/// Tuning knobs for one session.
///
/// The defaults suit a single drone link; none of them changes
/// resolution semantics.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Capacity of the API request mailbox.
    pub mailbox_capacity: usize,
    /// Capacity of the event broadcast channel. Slow subscribers lag,
    /// they never block the scheduler.
    pub broadcast_capacity: usize,
    /// Float comparison tolerance used for matching and the cache.
    pub float_tol: f64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            mailbox_capacity: 256,
            broadcast_capacity: 128,
            float_tol: DEFAULT_FLOAT_TOL,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let config = SessionConfig::default();
        assert!(config.mailbox_capacity > 0);
        assert!(config.broadcast_capacity > 0);
        assert!(config.float_tol > 0.0);
    }

    #[test]
    fn serde_fills_missing_fields() {
        let config: SessionConfig = serde_json::from_str("{\"mailbox_capacity\": 8}").unwrap();
        assert_eq!(config.mailbox_capacity, 8);
        assert_eq!(config.broadcast_capacity, SessionConfig::default().broadcast_capacity);
    }
}
