//! Inert expectation tree descriptions.

use crate::ExpectError;
use aerolink_catalog::{Catalog, EventPattern, MessageInstance, Template, TemplateArg};
use aerolink_types::Policy;
use std::time::Duration;

/// One node of an expectation tree, before activation.
///
/// Build leaves with [`ExpectNode::command`] and [`ExpectNode::event`],
/// combine them with [`and`](ExpectNode::and), [`or`](ExpectNode::or)
/// and [`then`](ExpectNode::then). Combinators flatten, so
/// `a.and(b).and(c)` is one three-way `And`.
#[derive(Debug, Clone)]
pub enum ExpectNode {
    /// Send a command once, succeed on its transport acknowledgement.
    Command(MessageInstance),
    /// Succeed on an event matching the pattern, under the policy.
    Event {
        /// The filter to satisfy.
        pattern: EventPattern,
        /// Cache versus fresh-event satisfaction.
        policy: Policy,
        /// Overrides the pattern schema's default timeout.
        timeout: Option<Duration>,
    },
    /// All children must succeed. Times out with the first child.
    And(Vec<ExpectNode>),
    /// The leftmost child to succeed wins. Times out when all do.
    Or(Vec<ExpectNode>),
    /// Children run strictly one after another.
    Then(Vec<ExpectNode>),
}

impl ExpectNode {
    /// Creates a command leaf.
    #[must_use]
    pub fn command(instance: MessageInstance) -> Self {
        Self::Command(instance)
    }

    /// Creates an event leaf with the default policy.
    #[must_use]
    pub fn event(pattern: EventPattern) -> Self {
        Self::event_with(pattern, Policy::default())
    }

    /// Creates an event leaf with an explicit policy.
    #[must_use]
    pub fn event_with(pattern: EventPattern, policy: Policy) -> Self {
        Self::Event {
            pattern,
            policy,
            timeout: None,
        }
    }

    /// Sets a per-leaf timeout. No-op on combinators.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        if let Self::Event { timeout: slot, .. } = &mut self {
            *slot = Some(timeout);
        }
        self
    }

    /// Combines with `other`; both must succeed.
    #[must_use]
    pub fn and(self, other: ExpectNode) -> Self {
        match self {
            Self::And(mut children) => {
                children.push(other);
                Self::And(children)
            }
            node => Self::And(vec![node, other]),
        }
    }

    /// Combines with `other`; the first to succeed wins.
    #[must_use]
    pub fn or(self, other: ExpectNode) -> Self {
        match self {
            Self::Or(mut children) => {
                children.push(other);
                Self::Or(children)
            }
            node => Self::Or(vec![node, other]),
        }
    }

    /// Sequences `other` after this node.
    #[must_use]
    pub fn then(self, other: ExpectNode) -> Self {
        match self {
            Self::Then(mut children) => {
                children.push(other);
                Self::Then(children)
            }
            node => Self::Then(vec![node, other]),
        }
    }

    /// Builds the full expectation for sending a command.
    ///
    /// When the schema declares a default template and the instance
    /// does not suppress it, the result is the command leaf sequenced
    /// before the expanded template. Otherwise it is the bare command
    /// leaf, resolved by the transport acknowledgement alone.
    ///
    /// # Errors
    ///
    /// Returns [`ExpectError::Schema`] for incomplete instances and
    /// template bindings that violate the catalog, and
    /// [`ExpectError::UnboundCommandArg`] when a template slot copies
    /// an argument the instance never bound.
    pub fn from_command(catalog: &Catalog, instance: MessageInstance) -> Result<Self, ExpectError> {
        instance.validate_complete()?;
        let template = if instance.skips_default_expect() {
            None
        } else {
            instance.descriptor().default_template().cloned()
        };
        let command = Self::Command(instance.clone());
        match template {
            None => Ok(command),
            Some(template) => {
                let expected = expand_template(catalog, &instance, &template)?;
                Ok(command.then(expected))
            }
        }
    }
}

/// Expands a catalog template into an expectation subtree, resolving
/// `FromCommand` slots against the instance's bound arguments.
fn expand_template(
    catalog: &Catalog,
    instance: &MessageInstance,
    template: &Template,
) -> Result<ExpectNode, ExpectError> {
    match template {
        Template::Pattern(slot) => {
            let mut pattern = catalog.event_pattern(&slot.message)?;
            for (field, arg) in &slot.args {
                let value = match arg {
                    TemplateArg::Literal(value) => value.clone(),
                    TemplateArg::FromCommand(cmd_arg) => instance
                        .get(cmd_arg)
                        .cloned()
                        .ok_or_else(|| ExpectError::UnboundCommandArg {
                            command: instance.descriptor().name().to_string(),
                            arg: cmd_arg.clone(),
                        })?,
                };
                pattern = pattern.arg(field.clone(), value)?;
            }
            Ok(ExpectNode::Event {
                pattern,
                policy: slot.policy,
                timeout: slot.timeout,
            })
        }
        Template::All(children) => expand_children(catalog, instance, children, ExpectNode::And),
        Template::Any(children) => expand_children(catalog, instance, children, ExpectNode::Or),
        Template::Seq(children) => expand_children(catalog, instance, children, ExpectNode::Then),
    }
}

fn expand_children(
    catalog: &Catalog,
    instance: &MessageInstance,
    children: &[Template],
    combine: impl FnOnce(Vec<ExpectNode>) -> ExpectNode,
) -> Result<ExpectNode, ExpectError> {
    let mut nodes = Vec::with_capacity(children.len());
    for child in children {
        nodes.push(expand_template(catalog, instance, child)?);
    }
    if nodes.len() == 1 {
        return Ok(nodes.remove(0));
    }
    Ok(combine(nodes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use aerolink_catalog::{FieldKind, MessageDescriptor, TemplatePattern};
    use aerolink_types::{MessageId, ParamValue};

    fn catalog() -> Catalog {
        Catalog::builder()
            .message(
                MessageDescriptor::command(MessageId::new(1), "ardrone3.MaxTilt")
                    .field("current", FieldKind::F64)
                    .template(Template::Pattern(
                        TemplatePattern::new("ardrone3.MaxTiltChanged")
                            .from_command("current", "current"),
                    )),
            )
            .message(
                MessageDescriptor::event(MessageId::new(2), "ardrone3.MaxTiltChanged")
                    .field("current", FieldKind::F64),
            )
            .message(MessageDescriptor::command(MessageId::new(3), "ardrone3.TakeOff"))
            .build()
            .unwrap()
    }

    #[test]
    fn combinators_flatten() {
        let cat = catalog();
        let a = ExpectNode::event(cat.event_pattern("ardrone3.MaxTiltChanged").unwrap());
        let b = ExpectNode::event(cat.event_pattern("ardrone3.MaxTiltChanged").unwrap());
        let c = ExpectNode::event(cat.event_pattern("ardrone3.MaxTiltChanged").unwrap());

        let three = a.and(b).and(c);
        match three {
            ExpectNode::And(children) => assert_eq!(children.len(), 3),
            other => panic!("expected And, got {other:?}"),
        }
    }

    #[test]
    fn command_with_template_becomes_a_sequence() {
        let cat = catalog();
        let instance = cat
            .command("ardrone3.MaxTilt")
            .unwrap()
            .arg("current", 10.0_f64)
            .unwrap();

        let node = ExpectNode::from_command(&cat, instance).unwrap();
        let ExpectNode::Then(children) = node else {
            panic!("expected Then");
        };
        assert_eq!(children.len(), 2);
        assert!(matches!(children[0], ExpectNode::Command(_)));
        let ExpectNode::Event { pattern, .. } = &children[1] else {
            panic!("expected Event");
        };
        // The template copied the command argument into the pattern.
        assert_eq!(pattern.args().get("current"), Some(&ParamValue::F64(10.0)));
    }

    #[test]
    fn no_default_expect_keeps_the_bare_command() {
        let cat = catalog();
        let instance = cat
            .command("ardrone3.MaxTilt")
            .unwrap()
            .arg("current", 10.0_f64)
            .unwrap()
            .no_default_expect();

        let node = ExpectNode::from_command(&cat, instance).unwrap();
        assert!(matches!(node, ExpectNode::Command(_)));
    }

    #[test]
    fn command_without_template_is_a_bare_leaf() {
        let cat = catalog();
        let instance = cat.command("ardrone3.TakeOff").unwrap();
        let node = ExpectNode::from_command(&cat, instance).unwrap();
        assert!(matches!(node, ExpectNode::Command(_)));
    }

    #[test]
    fn incomplete_command_is_rejected() {
        let cat = catalog();
        let instance = cat.command("ardrone3.MaxTilt").unwrap();
        let err = ExpectNode::from_command(&cat, instance).unwrap_err();
        assert!(matches!(err, ExpectError::Schema(_)));
    }

    #[test]
    fn unbound_template_arg_is_reported() {
        // A template that copies an argument never bound can only be
        // reached when completeness is not enforced first, so exercise
        // the expansion directly.
        let cat = catalog();
        let instance = cat.command("ardrone3.MaxTilt").unwrap();
        let template = Template::Pattern(
            TemplatePattern::new("ardrone3.MaxTiltChanged").from_command("current", "current"),
        );
        let err = expand_template(&cat, &instance, &template).unwrap_err();
        assert!(matches!(err, ExpectError::UnboundCommandArg { .. }));
    }
}
