//! Identifier types for aerolink.
//!
//! Expectation-tree handles are UUID-based so they stay unique across
//! sessions and reconnections. Message ids come from the external
//! catalog and are plain numeric ids.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Identifier for a message schema in the catalog.
///
/// Assigned by the external message catalog. Two events carry the same
/// `MessageId` exactly when they are instances of the same schema.
///
/// # Example
///
/// ```
/// use aerolink_types::MessageId;
///
/// let takeoff = MessageId::new(0x0101);
/// assert_eq!(takeoff.value(), 0x0101);
/// assert_eq!(takeoff, MessageId::new(0x0101));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(u32);

impl MessageId {
    /// Creates a message id from its catalog value.
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Returns the raw catalog value.
    #[must_use]
    pub const fn value(self) -> u32 {
        self.0
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "msg:{:#06x}", self.0)
    }
}

/// Identifier for a submitted expectation tree.
///
/// Generated when a tree is handed to the session scheduler. Used to
/// address the tree afterwards (explain queries, log correlation).
///
/// # Example
///
/// ```
/// use aerolink_types::TreeId;
///
/// let a = TreeId::new();
/// let b = TreeId::new();
/// assert_ne!(a, b);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TreeId(Uuid);

impl TreeId {
    /// Creates a fresh, unique tree id.
    #[must_use]
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for TreeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tree:{}", self.0.simple())
    }
}

/// Sequence number of one outgoing command send.
///
/// The scheduler assigns a fresh `SendSeq` per send attempt and the
/// transport reports asynchronous acknowledgement or failure against
/// it. Monotonically increasing within a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SendSeq(u64);

impl SendSeq {
    /// First sequence number of a session.
    pub const FIRST: SendSeq = SendSeq(1);

    /// Returns the next sequence number.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }

    /// Returns the raw counter value.
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SendSeq {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "send:{}", self.0)
    }
}
