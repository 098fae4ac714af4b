//! The message registry.

use crate::descriptor::{Direction, MessageDescriptor};
use crate::instance::MessageInstance;
use crate::pattern::EventPattern;
use crate::template::{Template, TemplateArg};
use crate::CatalogError;
use aerolink_types::MessageId;
use std::collections::HashMap;
use std::sync::Arc;

/// Immutable registry of message schemas, indexed by id and by name.
///
/// Built once with [`CatalogBuilder`] (or [`Catalog::from_json`]) and
/// shared by `Arc` clones of the descriptors it hands out. Building
/// validates cross-references eagerly: duplicate registrations, key
/// fields that are not declared, and default templates that name
/// unknown events or fields are all rejected up front.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    by_id: HashMap<MessageId, Arc<MessageDescriptor>>,
    by_name: HashMap<String, Arc<MessageDescriptor>>,
}

impl Catalog {
    /// Starts an empty builder.
    #[must_use]
    pub fn builder() -> CatalogBuilder {
        CatalogBuilder::default()
    }

    /// Parses a catalog from its JSON form, an array of schemas.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Parse`] for malformed JSON and the usual
    /// builder errors for semantic violations.
    pub fn from_json(text: &str) -> Result<Self, CatalogError> {
        let descriptors: Vec<MessageDescriptor> =
            serde_json::from_str(text).map_err(|e| CatalogError::Parse(e.to_string()))?;
        let mut builder = Self::builder();
        for desc in descriptors {
            builder = builder.message(desc);
        }
        builder.build()
    }

    /// Looks up a schema by full dotted name.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::UnknownMessage`].
    pub fn descriptor(&self, name: &str) -> Result<&Arc<MessageDescriptor>, CatalogError> {
        self.by_name
            .get(name)
            .ok_or_else(|| CatalogError::UnknownMessage(name.to_string()))
    }

    /// Looks up a schema by message id.
    #[must_use]
    pub fn descriptor_by_id(&self, id: MessageId) -> Option<&Arc<MessageDescriptor>> {
        self.by_id.get(&id)
    }

    /// Starts a command instance from a schema name.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::UnknownMessage`] or
    /// [`CatalogError::WrongDirection`].
    pub fn command(&self, name: &str) -> Result<MessageInstance, CatalogError> {
        MessageInstance::new(Arc::clone(self.descriptor(name)?))
    }

    /// Starts a wildcard event pattern from a schema name.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::UnknownMessage`] or
    /// [`CatalogError::WrongDirection`].
    pub fn event_pattern(&self, name: &str) -> Result<EventPattern, CatalogError> {
        EventPattern::new(Arc::clone(self.descriptor(name)?))
    }

    /// Returns the number of registered schemas.
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    /// Returns `true` if no schema is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}

/// Accumulates schemas and validates them as a whole on `build`.
#[derive(Debug, Default)]
pub struct CatalogBuilder {
    descriptors: Vec<MessageDescriptor>,
}

impl CatalogBuilder {
    /// Adds one schema.
    #[must_use]
    pub fn message(mut self, descriptor: MessageDescriptor) -> Self {
        self.descriptors.push(descriptor);
        self
    }

    /// Validates and freezes the catalog.
    ///
    /// # Errors
    ///
    /// Returns the first violation found: duplicate ids or names,
    /// undeclared key fields, templates attached to event schemas, or
    /// templates referencing unknown messages or fields.
    pub fn build(self) -> Result<Catalog, CatalogError> {
        let mut catalog = Catalog::default();
        for desc in self.descriptors {
            if let Some(key) = desc.key() {
                if desc.field_spec(key).is_none() {
                    return Err(CatalogError::UnknownField {
                        message: desc.name().to_string(),
                        field: key.to_string(),
                    });
                }
            }
            if desc.default_template().is_some() && !desc.is_command() {
                return Err(CatalogError::WrongDirection {
                    message: desc.name().to_string(),
                    expected: "command",
                });
            }
            let desc = Arc::new(desc);
            if catalog.by_id.insert(desc.id(), Arc::clone(&desc)).is_some() {
                return Err(CatalogError::DuplicateMessage(desc.id().to_string()));
            }
            if catalog
                .by_name
                .insert(desc.name().to_string(), Arc::clone(&desc))
                .is_some()
            {
                return Err(CatalogError::DuplicateMessage(desc.name().to_string()));
            }
        }

        // Templates can reference schemas registered after their owner,
        // so cross-references are resolved only once everything is in.
        for desc in catalog.by_id.values() {
            if let Some(template) = desc.default_template() {
                validate_template(&catalog, desc, template)?;
            }
        }
        Ok(catalog)
    }
}

fn validate_template(
    catalog: &Catalog,
    command: &MessageDescriptor,
    template: &Template,
) -> Result<(), CatalogError> {
    let mut result = Ok(());
    template.for_each_pattern(&mut |pattern| {
        if result.is_err() {
            return;
        }
        result = (|| {
            let target = catalog.descriptor(&pattern.message)?;
            if target.direction() != Direction::Event {
                return Err(CatalogError::WrongDirection {
                    message: target.name().to_string(),
                    expected: "event",
                });
            }
            for (field, arg) in &pattern.args {
                match arg {
                    TemplateArg::Literal(value) => target.validate_binding(field, value)?,
                    TemplateArg::FromCommand(cmd_arg) => {
                        if target.field_spec(field).is_none() {
                            return Err(CatalogError::UnknownField {
                                message: target.name().to_string(),
                                field: field.clone(),
                            });
                        }
                        if command.field_spec(cmd_arg).is_none() {
                            return Err(CatalogError::UnknownField {
                                message: command.name().to_string(),
                                field: cmd_arg.clone(),
                            });
                        }
                    }
                }
            }
            Ok(())
        })();
    });
    result
}
