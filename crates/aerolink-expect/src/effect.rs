//! Effects requested by a running expectation tree.

use aerolink_catalog::MessageInstance;
use std::fmt;

/// Identifies one command leaf within a single tree.
///
/// The session layer pairs this with its global send sequence to route
/// transport acknowledgements back to the right leaf.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LeafId(pub(crate) usize);

impl fmt::Display for LeafId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "leaf:{}", self.0)
    }
}

/// One side effect the caller must perform on the tree's behalf.
///
/// The tree never touches the transport itself; activating a command
/// leaf emits a `SendCommand` and the scheduler performs the send,
/// reporting the outcome back through
/// [`ActiveTree::on_send_result`](crate::ActiveTree::on_send_result).
#[derive(Debug, Clone)]
pub enum Effect {
    /// Send this command exactly once and report the acknowledgement.
    SendCommand {
        /// The leaf awaiting the acknowledgement.
        leaf: LeafId,
        /// The fully bound command to send.
        instance: MessageInstance,
    },
}
