//! Default expectation templates.
//!
//! A command schema can declare, in the catalog itself, which events
//! normally acknowledge it. The declaration is a [`Template`]: a small
//! combinator tree over [`TemplatePattern`]s whose argument slots are
//! either literals or copied from the sent command's arguments. The
//! expectation layer expands a template into live expectation nodes
//! each time the command is submitted.

use aerolink_types::{ParamValue, Policy};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// One argument slot of a template pattern.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemplateArg {
    /// Fixed value, the same for every send.
    Literal(ParamValue),
    /// Copied from the named argument of the command being sent.
    FromCommand(String),
}

/// One event pattern slot inside a template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplatePattern {
    /// Full dotted name of the expected event message.
    pub message: String,
    /// Satisfaction policy for the expanded leaf.
    #[serde(default)]
    pub policy: Policy,
    /// Field bindings, resolved at expansion time.
    #[serde(default)]
    pub args: BTreeMap<String, TemplateArg>,
    /// Per-leaf timeout override.
    #[serde(default)]
    pub timeout: Option<Duration>,
}

impl TemplatePattern {
    /// Creates a wildcard pattern slot with the default policy.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            policy: Policy::default(),
            args: BTreeMap::new(),
            timeout: None,
        }
    }

    /// Sets the satisfaction policy.
    #[must_use]
    pub fn policy(mut self, policy: Policy) -> Self {
        self.policy = policy;
        self
    }

    /// Binds a fixed value to one field.
    #[must_use]
    pub fn literal(mut self, field: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.args
            .insert(field.into(), TemplateArg::Literal(value.into()));
        self
    }

    /// Binds one field to an argument of the sent command.
    #[must_use]
    pub fn from_command(mut self, field: impl Into<String>, command_arg: impl Into<String>) -> Self {
        self.args
            .insert(field.into(), TemplateArg::FromCommand(command_arg.into()));
        self
    }

    /// Sets the per-leaf timeout override.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Combinator tree over template patterns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Template {
    /// One expected event.
    Pattern(TemplatePattern),
    /// All branches must succeed.
    All(Vec<Template>),
    /// The first branch to succeed wins.
    Any(Vec<Template>),
    /// Branches run strictly one after another.
    Seq(Vec<Template>),
}

impl Template {
    /// Creates a single-pattern template.
    #[must_use]
    pub fn pattern(pattern: TemplatePattern) -> Self {
        Self::Pattern(pattern)
    }

    /// Visits every pattern slot in the tree, left to right.
    pub fn for_each_pattern<'a>(&'a self, f: &mut impl FnMut(&'a TemplatePattern)) {
        match self {
            Self::Pattern(p) => f(p),
            Self::All(children) | Self::Any(children) | Self::Seq(children) => {
                for child in children {
                    child.for_each_pattern(f);
                }
            }
        }
    }
}

impl From<TemplatePattern> for Template {
    fn from(pattern: TemplatePattern) -> Self {
        Self::Pattern(pattern)
    }
}
