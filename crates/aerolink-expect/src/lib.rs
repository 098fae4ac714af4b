//! Expectation combinator algebra.
//!
//! An *expectation* describes what must be observed for a submitted
//! operation to count as done: events matching patterns, transport
//! acknowledgements for sent commands, or combinations of both. The
//! algebra is a small tree language:
//!
//! ```text
//! node := command(instance)            send once, succeed on ack
//!       | event(pattern, policy)      succeed on a matching event
//!       | and(node, node, ...)        all must succeed
//!       | or(node, node, ...)         first success wins
//!       | then(node, node, ...)       strictly sequential
//! ```
//!
//! [`ExpectNode`] is the inert description. [`ActiveTree`] is its
//! running form: a deterministic state machine that consumes events,
//! clock ticks, and send acknowledgements, and emits [`Effect`]s (the
//! commands that must be sent) instead of performing I/O itself. The
//! session layer owns the clock and the transport; this crate owns the
//! resolution rules:
//!
//! - a node resolves exactly once, to [`NodeState::Success`] or
//!   [`NodeState::TimedOut`], and never changes afterwards
//! - children are considered strictly left to right, so one event
//!   offered to two satisfiable branches resolves the leftmost
//! - `then` never activates (and never sends) a child whose
//!   predecessor timed out

mod effect;
mod error;
mod explain;
mod node;
mod state;
mod tree;

pub use effect::{Effect, LeafId};
pub use error::ExpectError;
pub use explain::ExplainNode;
pub use node::ExpectNode;
pub use state::{NoCache, NodeState, StateLookup};
pub use tree::{ActivationCtx, ActiveTree};
