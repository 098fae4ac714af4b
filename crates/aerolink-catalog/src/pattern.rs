//! Event match filters.

use crate::descriptor::{Direction, MessageDescriptor};
use crate::event::Event;
use crate::CatalogError;
use aerolink_types::ParamValue;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// A filter over incoming events.
///
/// A pattern names one event message and binds expected values to some
/// of its fields. Fields left unbound are wildcards. Construction
/// validates every binding against the schema, so a pattern that built
/// successfully can never fail spuriously at match time because of a
/// misspelled field.
#[derive(Debug, Clone)]
pub struct EventPattern {
    descriptor: Arc<MessageDescriptor>,
    args: BTreeMap<String, ParamValue>,
}

impl EventPattern {
    /// Creates a wildcard pattern matching any instance of an event.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::WrongDirection`] for command schemas.
    pub fn new(descriptor: Arc<MessageDescriptor>) -> Result<Self, CatalogError> {
        if descriptor.direction() != Direction::Event {
            return Err(CatalogError::WrongDirection {
                message: descriptor.name().to_string(),
                expected: "event",
            });
        }
        Ok(Self {
            descriptor,
            args: BTreeMap::new(),
        })
    }

    /// Binds an expected value to one field.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::UnknownField`] or
    /// [`CatalogError::KindMismatch`] when the binding does not fit the
    /// schema.
    pub fn arg(
        mut self,
        name: impl Into<String>,
        value: impl Into<ParamValue>,
    ) -> Result<Self, CatalogError> {
        let name = name.into();
        let value = value.into();
        self.descriptor.validate_binding(&name, &value)?;
        self.args.insert(name, value);
        Ok(self)
    }

    /// Returns the schema this pattern filters on.
    #[must_use]
    pub fn descriptor(&self) -> &Arc<MessageDescriptor> {
        &self.descriptor
    }

    /// Returns the bound fields, ordered by name.
    #[must_use]
    pub fn args(&self) -> &BTreeMap<String, ParamValue> {
        &self.args
    }

    /// Returns the value bound to the schema's key field, if both the
    /// key field and a binding for it exist.
    ///
    /// The state cache stores map-like events per key value; a pattern
    /// that pins the key can therefore be answered from the matching
    /// cache slot only.
    #[must_use]
    pub fn key_value(&self) -> Option<&ParamValue> {
        self.descriptor.key().and_then(|k| self.args.get(k))
    }

    /// Tests an event against this pattern.
    ///
    /// The event must carry the pattern's message id and every bound
    /// field must be present and match under the value comparison
    /// rules. Extra event fields are ignored.
    #[must_use]
    pub fn matches(&self, event: &Event, float_tol: f64) -> bool {
        if event.id() != self.descriptor.id() {
            return false;
        }
        self.args.iter().all(|(name, expected)| {
            event
                .get(name)
                .is_some_and(|got| got.matches(expected, float_tol))
        })
    }
}

impl fmt::Display for EventPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.descriptor.name())?;
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::FieldKind;
    use aerolink_types::{MessageId, DEFAULT_FLOAT_TOL};

    fn flying_state() -> Arc<MessageDescriptor> {
        Arc::new(
            MessageDescriptor::event(MessageId::new(0x0401), "ardrone3.FlyingStateChanged")
                .field("state", FieldKind::Enum),
        )
    }

    #[test]
    fn wildcard_matches_any_args() {
        let pat = EventPattern::new(flying_state()).unwrap();
        let ev = Event::new(MessageId::new(0x0401)).arg("state", ParamValue::enum_value("landed"));
        assert!(pat.matches(&ev, DEFAULT_FLOAT_TOL));
    }

    #[test]
    fn bound_field_must_match() {
        let pat = EventPattern::new(flying_state())
            .unwrap()
            .arg("state", ParamValue::enum_value("hovering"))
            .unwrap();

        let hovering =
            Event::new(MessageId::new(0x0401)).arg("state", ParamValue::enum_value("Hovering"));
        let landed =
            Event::new(MessageId::new(0x0401)).arg("state", ParamValue::enum_value("landed"));

        assert!(pat.matches(&hovering, DEFAULT_FLOAT_TOL));
        assert!(!pat.matches(&landed, DEFAULT_FLOAT_TOL));
    }

    #[test]
    fn wrong_message_never_matches() {
        let pat = EventPattern::new(flying_state()).unwrap();
        let ev = Event::new(MessageId::new(0x0402));
        assert!(!pat.matches(&ev, DEFAULT_FLOAT_TOL));
    }

    #[test]
    fn missing_bound_field_never_matches() {
        let pat = EventPattern::new(flying_state())
            .unwrap()
            .arg("state", ParamValue::enum_value("hovering"))
            .unwrap();
        let ev = Event::new(MessageId::new(0x0401));
        assert!(!pat.matches(&ev, DEFAULT_FLOAT_TOL));
    }

    #[test]
    fn construction_rejects_bad_bindings() {
        let err = EventPattern::new(flying_state())
            .unwrap()
            .arg("status", ParamValue::enum_value("hovering"))
            .unwrap_err();
        assert!(matches!(err, CatalogError::UnknownField { .. }));

        let err = EventPattern::new(flying_state())
            .unwrap()
            .arg("state", 3_i64)
            .unwrap_err();
        assert!(matches!(err, CatalogError::KindMismatch { .. }));
    }

    #[test]
    fn construction_rejects_command_schemas() {
        let cmd = Arc::new(MessageDescriptor::command(
            MessageId::new(1),
            "ardrone3.TakeOff",
        ));
        let err = EventPattern::new(cmd).unwrap_err();
        assert!(matches!(err, CatalogError::WrongDirection { .. }));
    }

    #[test]
    fn key_value_requires_key_field() {
        let keyed = Arc::new(
            MessageDescriptor::event(MessageId::new(7), "common.SensorStates")
                .field("sensor", FieldKind::Enum)
                .field("ok", FieldKind::Bool)
                .key_field("sensor"),
        );
        let pat = EventPattern::new(keyed)
            .unwrap()
            .arg("sensor", ParamValue::enum_value("imu"))
            .unwrap();
        assert_eq!(pat.key_value(), Some(&ParamValue::enum_value("imu")));

        let unkeyed = EventPattern::new(flying_state()).unwrap();
        assert!(unkeyed.key_value().is_none());
    }
}
