//! Decoded peer notifications.

use aerolink_types::{MessageId, ParamValue};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// One decoded event notification received from the peer.
///
/// Events carry their arguments by field name. The catalog layer does
/// not validate received events against the schema: the peer is the
/// source of truth for what it sent, and patterns simply fail to match
/// on fields that are absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    id: MessageId,
    #[serde(default)]
    args: BTreeMap<String, ParamValue>,
}

impl Event {
    /// Creates an event with no arguments.
    #[must_use]
    pub fn new(id: MessageId) -> Self {
        Self {
            id,
            args: BTreeMap::new(),
        }
    }

    /// Adds one argument.
    #[must_use]
    pub fn arg(mut self, name: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.args.insert(name.into(), value.into());
        self
    }

    /// Returns the message id.
    #[must_use]
    pub fn id(&self) -> MessageId {
        self.id
    }

    /// Looks up one argument by field name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.args.get(name)
    }

    /// Returns all arguments, ordered by field name.
    #[must_use]
    pub fn args(&self) -> &BTreeMap<String, ParamValue> {
        &self.args
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.id)?;
        let mut first = true;
        for (name, value) in &self.args {
            if !first {
                f.write_str(", ")?;
            }
            write!(f, "{name}={value}")?;
            first = false;
        }
        f.write_str(")")
    }
}
