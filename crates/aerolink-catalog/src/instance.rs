//! Bound command messages.

use crate::descriptor::{Direction, MessageDescriptor};
use crate::CatalogError;
use aerolink_types::ParamValue;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// One command message with its arguments bound, ready to send.
///
/// Like [`EventPattern`](crate::EventPattern), construction validates
/// every binding against the schema. Unlike patterns, an instance must
/// bind every declared field before it can be sent; completeness is
/// checked by [`MessageInstance::validate_complete`] at submission.
#[derive(Debug, Clone)]
pub struct MessageInstance {
    descriptor: Arc<MessageDescriptor>,
    args: BTreeMap<String, ParamValue>,
    timeout_override: Option<Duration>,
    no_default_expect: bool,
}

impl MessageInstance {
    /// Creates an instance with no arguments bound.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::WrongDirection`] for event schemas.
    pub fn new(descriptor: Arc<MessageDescriptor>) -> Result<Self, CatalogError> {
        if descriptor.direction() != Direction::Command {
            return Err(CatalogError::WrongDirection {
                message: descriptor.name().to_string(),
                expected: "command",
            });
        }
        Ok(Self {
            descriptor,
            args: BTreeMap::new(),
            timeout_override: None,
            no_default_expect: false,
        })
    }

    /// Binds one argument.
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

    /// Overrides the schema's default expectation timeout for this send.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout_override = Some(timeout);
        self
    }

    /// Suppresses the schema's default expectation template, so the
    /// command resolves on the transport acknowledgement alone.
    #[must_use]
    pub fn no_default_expect(mut self) -> Self {
        self.no_default_expect = true;
        self
    }

    /// Returns the schema this instance was built from.
    #[must_use]
    pub fn descriptor(&self) -> &Arc<MessageDescriptor> {
        &self.descriptor
    }

    /// Returns the bound arguments, ordered by field name.
    #[must_use]
    pub fn args(&self) -> &BTreeMap<String, ParamValue> {
        &self.args
    }

    /// Looks up one bound argument.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.args.get(name)
    }

    /// Returns the effective expectation timeout: the per-send override
    /// if set, otherwise the schema default.
    #[must_use]
    pub fn effective_timeout(&self) -> Duration {
        self.timeout_override.unwrap_or_else(|| self.descriptor.timeout())
    }

    /// Returns `true` if the default expectation template is suppressed.
    #[must_use]
    pub fn skips_default_expect(&self) -> bool {
        self.no_default_expect
    }

    /// Checks that every declared field is bound.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::MissingField`] naming the first unbound
    /// field.
    pub fn validate_complete(&self) -> Result<(), CatalogError> {
        for spec in self.descriptor.fields() {
            if !self.args.contains_key(&spec.name) {
                return Err(CatalogError::MissingField {
                    message: self.descriptor.name().to_string(),
                    field: spec.name.clone(),
                });
            }
        }
        Ok(())
    }
}

impl fmt::Display for MessageInstance {
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
