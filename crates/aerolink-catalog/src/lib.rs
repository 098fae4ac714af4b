//! Message catalog for the aerolink SDK.
//!
//! The peer protocol is described by a static catalog of message
//! schemas: each message has a numeric id, a direction (command sent
//! to the peer, or event notified by it), a typed parameter list, a
//! default timeout, and optionally a *default expectation template*
//! describing which events normally acknowledge the command.
//!
//! This crate models that catalog and the pattern/instance types built
//! from it:
//!
//! ```text
//! Catalog ──owns──► MessageDescriptor (schema, immutable)
//!                        │
//!         ┌──────────────┼────────────────┐
//!         ▼              ▼                ▼
//!   MessageInstance  EventPattern      Template
//!   (bound command)  (match filter)    (default expectations)
//!                        ▲
//!                        │ matches
//!                      Event (decoded notification)
//! ```
//!
//! Pattern and instance construction validate field names and kinds
//! against the schema and fail fast with [`CatalogError`]; nothing in
//! this crate performs I/O or owns runtime state.

mod catalog;
mod descriptor;
mod error;
mod event;
mod instance;
mod pattern;
mod template;

pub use catalog::{Catalog, CatalogBuilder};
pub use descriptor::{Direction, FieldKind, FieldSpec, MessageDescriptor};
pub use error::CatalogError;
pub use event::Event;
pub use instance::MessageInstance;
pub use pattern::EventPattern;
pub use template::{Template, TemplateArg, TemplatePattern};
