//! Running expectation trees.
//!
//! [`ActiveTree`] is the live form of an [`ExpectNode`]: a
//! deterministic state machine driven entirely by its caller. It never
//! reads the clock and never touches the transport; the caller feeds
//! it events, ticks, and send acknowledgements, and executes the
//! [`Effect`]s it returns. That keeps every resolution rule unit
//! testable with plain instants.

use crate::effect::{Effect, LeafId};
use crate::explain::ExplainNode;
use crate::node::ExpectNode;
use crate::state::{NodeState, StateLookup};
use crate::ExpectError;
use aerolink_catalog::{Event, EventPattern, MessageInstance};
use aerolink_types::Policy;
use std::time::{Duration, Instant};
use tracing::debug;

/// What activation needs from the outside world.
pub struct ActivationCtx<'a> {
    /// Last-observed-state cache, consulted by check-capable leaves.
    pub cache: &'a dyn StateLookup,
    /// The current instant.
    pub now: Instant,
    /// Float comparison tolerance.
    pub float_tol: f64,
}

/// A live expectation tree.
///
/// Resolution is monotone: once [`ActiveTree::state`] reports
/// `Success` or `TimedOut` it never changes, and every input method
/// becomes a no-op.
#[derive(Debug)]
pub struct ActiveTree {
    root: RunNode,
}

impl ActiveTree {
    /// Compiles and activates a tree.
    ///
    /// Activation can resolve the tree on the spot (a `check` leaf
    /// answered from the cache, or missing from it) and can emit send
    /// effects for command leaves that became active.
    ///
    /// # Errors
    ///
    /// Returns [`ExpectError::EmptyCombinator`] for childless
    /// combinators.
    pub fn activate(
        node: ExpectNode,
        ctx: &ActivationCtx<'_>,
    ) -> Result<(Self, Vec<Effect>), ExpectError> {
        let mut next_leaf = 0;
        let root = compile(node, &mut next_leaf)?;
        let mut tree = Self { root };
        let mut effects = Vec::new();
        tree.root.activate(ctx, &mut effects);
        tree.log_if_resolved("activation");
        Ok((tree, effects))
    }

    /// Returns the root's resolution state.
    #[must_use]
    pub fn state(&self) -> NodeState {
        self.root.state()
    }

    /// Returns `true` once the root is resolved either way.
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        self.state().is_resolved()
    }

    /// Offers one fresh event to every active pending leaf, leftmost
    /// first.
    ///
    /// A success inside a `then` activates the next child immediately,
    /// and the same event is offered to it in turn. Newly activated
    /// command leaves surface as send effects.
    pub fn on_event(&mut self, event: &Event, ctx: &ActivationCtx<'_>) -> Vec<Effect> {
        let mut effects = Vec::new();
        if !self.is_resolved() {
            self.root.offer(event, ctx, &mut effects);
            self.log_if_resolved("event");
        }
        effects
    }

    /// Resolves every active leaf whose deadline has elapsed.
    pub fn on_tick(&mut self, now: Instant) {
        if !self.is_resolved() {
            self.root.tick(now);
            self.log_if_resolved("deadline");
        }
    }

    /// Reports the transport's verdict on a previously emitted send.
    ///
    /// An acknowledged send resolves its command leaf `Success`; a
    /// failed send folds into `TimedOut`. Advancing a `then` past the
    /// command can emit further send effects.
    pub fn on_send_result(
        &mut self,
        leaf: LeafId,
        ok: bool,
        ctx: &ActivationCtx<'_>,
    ) -> Vec<Effect> {
        let mut effects = Vec::new();
        if !self.is_resolved() {
            self.root.apply_send_result(leaf, ok, ctx, &mut effects);
            self.log_if_resolved("send result");
        }
        effects
    }

    /// Resolves every pending leaf `TimedOut` at once.
    ///
    /// Used when the link drops: nothing pending can be satisfied any
    /// more, cache-satisfied leaves keep their success.
    pub fn force_timeout(&mut self) {
        if !self.is_resolved() {
            self.root.force_timeout();
            self.log_if_resolved("link loss");
        }
    }

    /// Returns the earliest deadline among active pending leaves.
    #[must_use]
    pub fn next_deadline(&self) -> Option<Instant> {
        self.root.next_deadline()
    }

    /// Snapshots the whole tree for diagnostics.
    #[must_use]
    pub fn explain(&self) -> ExplainNode {
        self.root.explain()
    }

    fn log_if_resolved(&self, cause: &str) {
        if self.is_resolved() {
            debug!(state = %self.state(), cause, "expectation resolved");
        }
    }
}

/// Why a leaf is in its current state, kept for `explain`.
#[derive(Debug, Clone)]
enum Resolution {
    CacheHit(Event),
    CacheMiss,
    FreshEvent(Event),
    DeadlineElapsed,
    SendAcked,
    SendFailed,
    LinkLost,
}

impl Resolution {
    fn describe(&self) -> String {
        match self {
            Self::CacheHit(event) => format!("satisfied from cache by {event}"),
            Self::CacheMiss => "no cached state".to_string(),
            Self::FreshEvent(event) => format!("matched {event}"),
            Self::DeadlineElapsed => "deadline elapsed".to_string(),
            Self::SendAcked => "acknowledged".to_string(),
            Self::SendFailed => "send failed".to_string(),
            Self::LinkLost => "link lost".to_string(),
        }
    }
}

#[derive(Debug)]
struct CommandRun {
    leaf: LeafId,
    instance: MessageInstance,
    state: NodeState,
    sent: bool,
    deadline: Option<Instant>,
    resolution: Option<Resolution>,
}

#[derive(Debug)]
struct EventRun {
    pattern: EventPattern,
    policy: Policy,
    timeout: Duration,
    state: NodeState,
    activated: bool,
    deadline: Option<Instant>,
    resolution: Option<Resolution>,
}

#[derive(Debug)]
enum RunNode {
    Command(CommandRun),
    Event(EventRun),
    And {
        children: Vec<RunNode>,
        state: NodeState,
    },
    Or {
        children: Vec<RunNode>,
        state: NodeState,
    },
    Then {
        children: Vec<RunNode>,
        cursor: usize,
        state: NodeState,
    },
}

fn compile(node: ExpectNode, next_leaf: &mut usize) -> Result<RunNode, ExpectError> {
    Ok(match node {
        ExpectNode::Command(instance) => {
            let leaf = LeafId(*next_leaf);
            *next_leaf += 1;
            RunNode::Command(CommandRun {
                leaf,
                instance,
                state: NodeState::Pending,
                sent: false,
                deadline: None,
                resolution: None,
            })
        }
        ExpectNode::Event {
            pattern,
            policy,
            timeout,
        } => {
            let timeout = timeout.unwrap_or_else(|| pattern.descriptor().timeout());
            RunNode::Event(EventRun {
                pattern,
                policy,
                timeout,
                state: NodeState::Pending,
                activated: false,
                deadline: None,
                resolution: None,
            })
        }
        ExpectNode::And(children) => RunNode::And {
            children: compile_children(children, "and", next_leaf)?,
            state: NodeState::Pending,
        },
        ExpectNode::Or(children) => RunNode::Or {
            children: compile_children(children, "or", next_leaf)?,
            state: NodeState::Pending,
        },
        ExpectNode::Then(children) => RunNode::Then {
            children: compile_children(children, "then", next_leaf)?,
            cursor: 0,
            state: NodeState::Pending,
        },
    })
}

fn compile_children(
    children: Vec<ExpectNode>,
    kind: &'static str,
    next_leaf: &mut usize,
) -> Result<Vec<RunNode>, ExpectError> {
    if children.is_empty() {
        return Err(ExpectError::EmptyCombinator(kind));
    }
    children
        .into_iter()
        .map(|child| compile(child, next_leaf))
        .collect()
}

/// `and`: any timeout kills it, success requires all.
fn combine_and(children: &[RunNode]) -> NodeState {
    if children.iter().any(|c| c.state() == NodeState::TimedOut) {
        NodeState::TimedOut
    } else if children.iter().all(|c| c.state() == NodeState::Success) {
        NodeState::Success
    } else {
        NodeState::Pending
    }
}

/// `or`: any success wins, timeout requires all.
fn combine_or(children: &[RunNode]) -> NodeState {
    if children.iter().any(|c| c.state() == NodeState::Success) {
        NodeState::Success
    } else if children.iter().all(|c| c.state() == NodeState::TimedOut) {
        NodeState::TimedOut
    } else {
        NodeState::Pending
    }
}

/// Advances a `then` past freshly resolved children.
///
/// Each newly activated child is offered the triggering event, when
/// there is one, so a single event can satisfy a step and be seen by
/// the step it unlocked.
fn settle_then(
    children: &mut [RunNode],
    cursor: &mut usize,
    state: &mut NodeState,
    ctx: &ActivationCtx<'_>,
    effects: &mut Vec<Effect>,
    event: Option<&Event>,
) {
    loop {
        match children[*cursor].state() {
            NodeState::Pending => return,
            NodeState::TimedOut => {
                *state = NodeState::TimedOut;
                return;
            }
            NodeState::Success => {
                if *cursor + 1 == children.len() {
                    *state = NodeState::Success;
                    return;
                }
                *cursor += 1;
                children[*cursor].activate(ctx, effects);
                if let Some(event) = event {
                    children[*cursor].offer(event, ctx, effects);
                }
            }
        }
    }
}

impl RunNode {
    fn state(&self) -> NodeState {
        match self {
            Self::Command(run) => run.state,
            Self::Event(run) => run.state,
            Self::And { state, .. } | Self::Or { state, .. } | Self::Then { state, .. } => *state,
        }
    }

    fn activate(&mut self, ctx: &ActivationCtx<'_>, effects: &mut Vec<Effect>) {
        match self {
            Self::Command(run) => {
                run.sent = true;
                run.deadline = Some(ctx.now + run.instance.effective_timeout());
                effects.push(Effect::SendCommand {
                    leaf: run.leaf,
                    instance: run.instance.clone(),
                });
            }
            Self::Event(run) => {
                run.activated = true;
                if run.policy.checks_cache() {
                    if let Some(event) = ctx.cache.lookup(&run.pattern, ctx.float_tol) {
                        run.state = NodeState::Success;
                        run.resolution = Some(Resolution::CacheHit(event));
                        return;
                    }
                }
                if !run.policy.waits() {
                    // `check` with no cached state resolves immediately.
                    run.state = NodeState::TimedOut;
                    run.resolution = Some(Resolution::CacheMiss);
                    return;
                }
                run.deadline = Some(ctx.now + run.timeout);
            }
            Self::And { children, state } => {
                // Activating left to right and stopping at the first
                // timeout keeps later commands unsent when the outcome
                // is already decided.
                for child in children.iter_mut() {
                    child.activate(ctx, effects);
                    if child.state() == NodeState::TimedOut {
                        *state = NodeState::TimedOut;
                        return;
                    }
                }
                *state = combine_and(children);
            }
            Self::Or { children, state } => {
                for child in children.iter_mut() {
                    child.activate(ctx, effects);
                    if child.state() == NodeState::Success {
                        *state = NodeState::Success;
                        return;
                    }
                }
                *state = combine_or(children);
            }
            Self::Then {
                children,
                cursor,
                state,
            } => {
                children[*cursor].activate(ctx, effects);
                settle_then(children, cursor, state, ctx, effects, None);
            }
        }
    }

    fn offer(&mut self, event: &Event, ctx: &ActivationCtx<'_>, effects: &mut Vec<Effect>) {
        if self.state().is_resolved() {
            return;
        }
        match self {
            Self::Command(_) => {}
            Self::Event(run) => {
                if run.activated && run.pattern.matches(event, ctx.float_tol) {
                    run.state = NodeState::Success;
                    run.resolution = Some(Resolution::FreshEvent(event.clone()));
                }
            }
            Self::And { children, state } => {
                for child in children.iter_mut() {
                    child.offer(event, ctx, effects);
                }
                *state = combine_and(children);
            }
            Self::Or { children, state } => {
                // Leftmost success wins; later branches never see the
                // event that resolved the node.
                for child in children.iter_mut() {
                    child.offer(event, ctx, effects);
                    if child.state() == NodeState::Success {
                        *state = NodeState::Success;
                        return;
                    }
                }
            }
            Self::Then {
                children,
                cursor,
                state,
            } => {
                children[*cursor].offer(event, ctx, effects);
                settle_then(children, cursor, state, ctx, effects, Some(event));
            }
        }
    }

    fn tick(&mut self, now: Instant) {
        if self.state().is_resolved() {
            return;
        }
        match self {
            Self::Command(run) => {
                if run.deadline.is_some_and(|d| d <= now) {
                    run.state = NodeState::TimedOut;
                    run.resolution = Some(Resolution::DeadlineElapsed);
                }
            }
            Self::Event(run) => {
                if run.deadline.is_some_and(|d| d <= now) {
                    run.state = NodeState::TimedOut;
                    run.resolution = Some(Resolution::DeadlineElapsed);
                }
            }
            Self::And { children, state } => {
                for child in children.iter_mut() {
                    child.tick(now);
                }
                *state = combine_and(children);
            }
            Self::Or { children, state } => {
                for child in children.iter_mut() {
                    child.tick(now);
                }
                *state = combine_or(children);
            }
            Self::Then {
                children,
                cursor,
                state,
            } => {
                // A timeout never advances the sequence, it ends it.
                children[*cursor].tick(now);
                if children[*cursor].state() == NodeState::TimedOut {
                    *state = NodeState::TimedOut;
                }
            }
        }
    }

    fn apply_send_result(
        &mut self,
        leaf: LeafId,
        ok: bool,
        ctx: &ActivationCtx<'_>,
        effects: &mut Vec<Effect>,
    ) -> bool {
        match self {
            Self::Command(run) => {
                if run.leaf != leaf {
                    return false;
                }
                if run.state == NodeState::Pending {
                    if ok {
                        run.state = NodeState::Success;
                        run.resolution = Some(Resolution::SendAcked);
                    } else {
                        run.state = NodeState::TimedOut;
                        run.resolution = Some(Resolution::SendFailed);
                    }
                }
                true
            }
            Self::Event(_) => false,
            Self::And { children, state } => {
                let mut found = false;
                for child in children.iter_mut() {
                    if child.apply_send_result(leaf, ok, ctx, effects) {
                        found = true;
                        break;
                    }
                }
                if found && !state.is_resolved() {
                    *state = combine_and(children);
                }
                found
            }
            Self::Or { children, state } => {
                let mut found = false;
                for child in children.iter_mut() {
                    if child.apply_send_result(leaf, ok, ctx, effects) {
                        found = true;
                        break;
                    }
                }
                if found && !state.is_resolved() {
                    *state = combine_or(children);
                }
                found
            }
            Self::Then {
                children,
                cursor,
                state,
            } => {
                let mut found = false;
                for child in children[..=*cursor].iter_mut() {
                    if child.apply_send_result(leaf, ok, ctx, effects) {
                        found = true;
                        break;
                    }
                }
                if found && !state.is_resolved() {
                    settle_then(children, cursor, state, ctx, effects, None);
                }
                found
            }
        }
    }

    fn force_timeout(&mut self) {
        if self.state().is_resolved() {
            return;
        }
        match self {
            Self::Command(run) => {
                run.state = NodeState::TimedOut;
                run.resolution = Some(Resolution::LinkLost);
            }
            Self::Event(run) => {
                run.state = NodeState::TimedOut;
                run.resolution = Some(Resolution::LinkLost);
            }
            Self::And { children, state } | Self::Or { children, state } => {
                for child in children.iter_mut() {
                    child.force_timeout();
                }
                *state = NodeState::TimedOut;
            }
            Self::Then {
                children,
                cursor,
                state,
            } => {
                children[*cursor].force_timeout();
                *state = NodeState::TimedOut;
            }
        }
    }

    fn next_deadline(&self) -> Option<Instant> {
        if self.state().is_resolved() {
            return None;
        }
        match self {
            Self::Command(run) => run.deadline,
            Self::Event(run) => run.deadline,
            Self::And { children, .. } | Self::Or { children, .. } => {
                children.iter().filter_map(RunNode::next_deadline).min()
            }
            Self::Then {
                children, cursor, ..
            } => children[*cursor].next_deadline(),
        }
    }

    fn explain(&self) -> ExplainNode {
        match self {
            Self::Command(run) => {
                let detail = match &run.resolution {
                    Some(res) => Some(res.describe()),
                    None if run.sent => Some("awaiting acknowledgement".to_string()),
                    None => None,
                };
                ExplainNode::leaf(format!("send {}", run.instance), run.state, detail)
            }
            Self::Event(run) => {
                let detail = match &run.resolution {
                    Some(res) => Some(res.describe()),
                    None if run.activated => Some("waiting".to_string()),
                    None => None,
                };
                ExplainNode::leaf(
                    format!("{} {}", run.policy, run.pattern),
                    run.state,
                    detail,
                )
            }
            Self::And { children, state } => {
                ExplainNode::branch("and", *state, children.iter().map(Self::explain).collect())
            }
            Self::Or { children, state } => {
                ExplainNode::branch("or", *state, children.iter().map(Self::explain).collect())
            }
            Self::Then {
                children, state, ..
            } => ExplainNode::branch(
                "then",
                *state,
                children.iter().map(Self::explain).collect(),
            ),
        }
    }
}
