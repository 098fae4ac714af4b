//! Human-readable tree snapshots.

use crate::state::NodeState;
use serde::Serialize;
use std::fmt;

/// Snapshot of one node of a running tree.
///
/// Produced by [`ActiveTree::explain`](crate::ActiveTree::explain) so
/// a stuck or timed-out expectation can report which branch failed and
/// why. The `Display` impl renders the whole subtree as an indented
/// outline; `Serialize` gives the structured form.
#[derive(Debug, Clone, Serialize)]
pub struct ExplainNode {
    /// What the node is, e.g. `send ardrone3.TakeOff()` or `or`.
    pub label: String,
    /// Current resolution state.
    pub state: NodeState,
    /// How the node got into its state, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    /// Child snapshots, combinators only.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<ExplainNode>,
}

impl ExplainNode {
    pub(crate) fn leaf(label: String, state: NodeState, detail: Option<String>) -> Self {
        Self {
            label,
            state,
            detail,
            children: Vec::new(),
        }
    }

    pub(crate) fn branch(label: &str, state: NodeState, children: Vec<ExplainNode>) -> Self {
        Self {
            label: label.to_string(),
            state,
            detail: None,
            children,
        }
    }

    fn render(&self, f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
        for _ in 0..depth {
            f.write_str("  ")?;
        }
        write!(f, "{} [{}]", self.label, self.state)?;
        if let Some(detail) = &self.detail {
            write!(f, " ({detail})")?;
        }
        for child in &self.children {
            writeln!(f)?;
            child.render(f, depth + 1)?;
        }
        Ok(())
    }
}

impl fmt::Display for ExplainNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.render(f, 0)
    }
}
