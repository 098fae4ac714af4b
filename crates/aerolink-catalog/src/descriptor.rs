//! Message schemas.
//!
//! A [`MessageDescriptor`] is the static description of one protocol
//! message: identity, direction, parameter fields, default timeout and
//! (for commands) the default expectation [`Template`]. Descriptors
//! are immutable once registered in a [`Catalog`](crate::Catalog).

use crate::template::Template;
use crate::CatalogError;
use aerolink_types::{MessageId, ParamValue};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Default per-message timeout when the catalog does not declare one.
pub(crate) const FALLBACK_TIMEOUT: Duration = Duration::from_secs(10);

/// Direction of a message relative to this side of the link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Sent by us to the peer.
    Command,
    /// Notified asynchronously by the peer.
    Event,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Command => "command",
            Self::Event => "event",
        })
    }
}

/// Declared kind of one parameter field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    /// Signed integer.
    I64,
    /// Unsigned integer.
    U64,
    /// Floating point.
    F64,
    /// Boolean flag.
    Bool,
    /// Plain string.
    Str,
    /// Enumerated value.
    Enum,
    /// Bitfield.
    Bitfield,
}

impl FieldKind {
    /// Returns `true` if a value of this shape can be bound to the field.
    ///
    /// Signed and unsigned integers are interchangeable here; the value
    /// comparison rules take care of the sign at match time.
    #[must_use]
    pub fn accepts(self, value: &ParamValue) -> bool {
        matches!(
            (self, value),
            (Self::I64 | Self::U64, ParamValue::I64(_) | ParamValue::U64(_))
                | (Self::F64, ParamValue::F64(_))
                | (Self::Bool, ParamValue::Bool(_))
                | (Self::Str, ParamValue::Str(_))
                | (Self::Enum, ParamValue::Enum(_))
                | (Self::Bitfield, ParamValue::Bitfield(_))
        )
    }

    /// Returns the kind name, for diagnostics.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::I64 => "i64",
            Self::U64 => "u64",
            Self::F64 => "f64",
            Self::Bool => "bool",
            Self::Str => "str",
            Self::Enum => "enum",
            Self::Bitfield => "bitfield",
        }
    }
}

/// One declared parameter field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
    /// Field name, unique within the message.
    pub name: String,
    /// Declared kind.
    pub kind: FieldKind,
}

impl FieldSpec {
    /// Creates a field spec.
    #[must_use]
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}

/// Static schema of one protocol message.
///
/// Built with [`MessageDescriptor::command`] or
/// [`MessageDescriptor::event`] and frozen afterwards.
///
/// # Example
///
/// ```
/// use aerolink_catalog::{Direction, FieldKind, MessageDescriptor};
/// use aerolink_types::MessageId;
/// use std::time::Duration;
///
/// let max_tilt = MessageDescriptor::command(MessageId::new(0x0102), "ardrone3.MaxTilt")
///     .field("current", FieldKind::F64)
///     .default_timeout(Duration::from_secs(1));
///
/// assert_eq!(max_tilt.direction(), Direction::Command);
/// assert!(max_tilt.field_spec("current").is_some());
/// assert!(max_tilt.field_spec("tilt").is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageDescriptor {
    id: MessageId,
    name: String,
    direction: Direction,
    #[serde(default)]
    fields: Vec<FieldSpec>,
    #[serde(default)]
    default_timeout: Option<Duration>,
    /// Field whose value disambiguates map-like events in the state
    /// cache (one cached entry per distinct key value).
    #[serde(default)]
    key_field: Option<String>,
    /// Default expectation template, commands only.
    #[serde(default)]
    template: Option<Template>,
}

impl MessageDescriptor {
    /// Starts a command schema.
    #[must_use]
    pub fn command(id: MessageId, name: impl Into<String>) -> Self {
        Self::new(id, name, Direction::Command)
    }

    /// Starts an event schema.
    #[must_use]
    pub fn event(id: MessageId, name: impl Into<String>) -> Self {
        Self::new(id, name, Direction::Event)
    }

    fn new(id: MessageId, name: impl Into<String>, direction: Direction) -> Self {
        Self {
            id,
            name: name.into(),
            direction,
            fields: Vec::new(),
            default_timeout: None,
            key_field: None,
            template: None,
        }
    }

    /// Declares a parameter field.
    #[must_use]
    pub fn field(mut self, name: impl Into<String>, kind: FieldKind) -> Self {
        self.fields.push(FieldSpec::new(name, kind));
        self
    }

    /// Sets the default timeout applied to expectations on this message
    /// when neither the leaf nor the instance overrides it.
    #[must_use]
    pub fn default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = Some(timeout);
        self
    }

    /// Declares the key field for map-like events.
    #[must_use]
    pub fn key_field(mut self, name: impl Into<String>) -> Self {
        self.key_field = Some(name.into());
        self
    }

    /// Attaches the default expectation template (commands only; the
    /// catalog rejects templates on events at registration).
    #[must_use]
    pub fn template(mut self, template: Template) -> Self {
        self.template = Some(template);
        self
    }

    /// Returns the message id.
    #[must_use]
    pub fn id(&self) -> MessageId {
        self.id
    }

    /// Returns the full dotted message name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the message direction.
    #[must_use]
    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Returns `true` for command schemas.
    #[must_use]
    pub fn is_command(&self) -> bool {
        self.direction == Direction::Command
    }

    /// Returns the declared fields in declaration order.
    #[must_use]
    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    /// Looks up one field by name.
    #[must_use]
    pub fn field_spec(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Returns the default timeout, falling back to the catalog-wide
    /// fallback when the schema declares none.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.default_timeout.unwrap_or(FALLBACK_TIMEOUT)
    }

    /// Returns the key field name, if this is a map-like event.
    #[must_use]
    pub fn key(&self) -> Option<&str> {
        self.key_field.as_deref()
    }

    /// Returns the default expectation template, if any.
    #[must_use]
    pub fn default_template(&self) -> Option<&Template> {
        self.template.as_ref()
    }

    /// Validates a (field name, value) binding against this schema.
    pub(crate) fn validate_binding(
        &self,
        field: &str,
        value: &ParamValue,
    ) -> Result<(), CatalogError> {
        let Some(spec) = self.field_spec(field) else {
            return Err(CatalogError::UnknownField {
                message: self.name.clone(),
                field: field.to_string(),
            });
        };
        if !spec.kind.accepts(value) {
            return Err(CatalogError::KindMismatch {
                message: self.name.clone(),
                field: field.to_string(),
                expected: spec.kind.name(),
                got: value.kind(),
            });
        }
        Ok(())
    }
}

impl fmt::Display for MessageDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({} {})", self.name, self.direction, self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tilt_changed() -> MessageDescriptor {
        MessageDescriptor::event(MessageId::new(2), "ardrone3.MaxTiltChanged")
            .field("current", FieldKind::F64)
            .field("min", FieldKind::F64)
    }

    #[test]
    fn field_lookup() {
        let desc = tilt_changed();
        assert_eq!(desc.field_spec("current").unwrap().kind, FieldKind::F64);
        assert!(desc.field_spec("max").is_none());
    }

    #[test]
    fn timeout_falls_back() {
        let desc = tilt_changed();
        assert_eq!(desc.timeout(), FALLBACK_TIMEOUT);

        let desc = desc.default_timeout(Duration::from_secs(1));
        assert_eq!(desc.timeout(), Duration::from_secs(1));
    }

    #[test]
    fn binding_validation() {
        let desc = tilt_changed();
        assert!(desc.validate_binding("current", &ParamValue::F64(0.0)).is_ok());

        let err = desc
            .validate_binding("currant", &ParamValue::F64(0.0))
            .unwrap_err();
        assert!(matches!(err, CatalogError::UnknownField { .. }));

        let err = desc
            .validate_binding("current", &ParamValue::Bool(true))
            .unwrap_err();
        assert!(matches!(err, CatalogError::KindMismatch { .. }));
    }

    #[test]
    fn integer_kinds_are_interchangeable() {
        assert!(FieldKind::I64.accepts(&ParamValue::U64(1)));
        assert!(FieldKind::U64.accepts(&ParamValue::I64(1)));
        assert!(!FieldKind::U64.accepts(&ParamValue::F64(1.0)));
    }
}
