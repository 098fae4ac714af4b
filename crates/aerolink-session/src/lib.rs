//! Session layer of the aerolink SDK.
//!
//! A [`Session`] owns one link to a peer. Internally it runs a single
//! scheduler task that is the only consumer of everything that
//! happens on that link:
//!
//! ```text
//!                 api mailbox                transport signals
//!  Session ───────────────────┐   ┌───────────────── TransportHook
//!  (submit, states, explain)  ▼   ▼                  (events, acks,
//!                         ┌───────────┐               link up/down)
//!                         │ scheduler │──► Transport::send_command
//!                         │   task    │──► broadcast events
//!                         └───────────┘──► resolve expectations
//! ```
//!
//! The scheduler feeds every incoming event, in strict arrival order,
//! to the state cache first and then to every pending expectation
//! tree in submission order. Deadlines are honored with a single
//! `sleep_until` on the earliest pending deadline. Because one task
//! owns all of it, resolution is deterministic: no lock ordering, no
//! racing consumers.

mod cache;
mod config;
mod error;
mod scheduler;
mod session;
mod transport;

pub use cache::StateCache;
pub use config::SessionConfig;
pub use error::SessionError;
pub use session::{Expectation, Session, TreeOutcome};
pub use transport::{MockLog, MockMode, MockTransport, Transport, TransportError, TransportHook};
