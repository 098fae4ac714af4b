//! The public session handle.

use crate::config::SessionConfig;
use crate::error::SessionError;
use crate::scheduler::{ApiRequest, Scheduler};
use crate::transport::{Transport, TransportHook};
use aerolink_catalog::{Catalog, Event, EventPattern, MessageInstance};
use aerolink_expect::{ExpectNode, ExplainNode, NodeState};
use aerolink_types::{Policy, TreeId};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, oneshot};

/// Final verdict of one expectation tree.
#[derive(Debug, Clone)]
pub struct TreeOutcome {
    /// `Success` or `TimedOut`; never `Pending`.
    pub state: NodeState,
    /// Snapshot of the tree at resolution, for diagnostics.
    pub explain: ExplainNode,
}

impl TreeOutcome {
    /// Returns `true` if the expectation was met.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.state == NodeState::Success
    }
}

/// Handle to one submitted expectation tree.
///
/// Dropping the handle does not cancel the tree; it keeps running to
/// resolution in the scheduler.
#[must_use = "an expectation resolves in the background; call wait() to observe it"]
#[derive(Debug)]
pub struct Expectation {
    id: TreeId,
    done: oneshot::Receiver<TreeOutcome>,
}

impl Expectation {
    /// Returns the tree id, usable with [`Session::explain`].
    #[must_use]
    pub fn id(&self) -> TreeId {
        self.id
    }

    /// Waits until the tree resolves.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Closed`] if the session shut down first.
    pub async fn wait(self) -> Result<TreeOutcome, SessionError> {
        self.done.await.map_err(|_| SessionError::Closed)
    }

    /// Waits with an outer bound.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::WaitTimeout`] when the bound elapses
    /// first. The tree itself keeps running; only this observer gives
    /// up.
    pub async fn wait_timeout(self, bound: Duration) -> Result<TreeOutcome, SessionError> {
        tokio::time::timeout(bound, self.done)
            .await
            .map_err(|_| SessionError::WaitTimeout(bound))?
            .map_err(|_| SessionError::Closed)
    }
}

/// Handle to one running session.
///
/// Cheap to clone; all clones talk to the same scheduler task.
#[derive(Debug, Clone)]
pub struct Session {
    api_tx: mpsc::Sender<ApiRequest>,
    catalog: Arc<Catalog>,
    // Keeps the signal channel open for the scheduler's lifetime even
    // if the caller drops its own hook.
    _hook: TransportHook,
}

impl Session {
    /// Spawns the scheduler task and returns the session handle plus
    /// the hook the transport feeds inbound traffic through.
    ///
    /// The transport is built inside so it can keep its own clone of
    /// the hook for acknowledgements.
    pub fn spawn<T, F>(
        catalog: Arc<Catalog>,
        config: SessionConfig,
        make_transport: F,
    ) -> (Self, TransportHook)
    where
        T: Transport,
        F: FnOnce(TransportHook) -> T,
    {
        let (api_tx, api_rx) = mpsc::channel(config.mailbox_capacity);
        let (signal_tx, signal_rx) = mpsc::unbounded_channel();
        let hook = TransportHook::new(signal_tx);
        let transport = make_transport(hook.clone());
        let scheduler = Scheduler::new(Arc::clone(&catalog), config, transport);
        tokio::spawn(scheduler.run(api_rx, signal_rx));
        let session = Self {
            api_tx,
            catalog,
            _hook: hook.clone(),
        };
        (session, hook)
    }

    /// Returns the catalog this session speaks.
    #[must_use]
    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    /// Submits an expectation tree.
    ///
    /// Activation happens in the scheduler: command leaves are sent,
    /// check-capable leaves consult the cache, and the returned
    /// [`Expectation`] may already be resolved by the time it is
    /// awaited.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Expect`] for trees that fail to build
    /// and [`SessionError::Closed`] when the scheduler is gone.
    pub async fn submit(&self, node: ExpectNode) -> Result<Expectation, SessionError> {
        let (done_tx, done_rx) = oneshot::channel();
        let (reply_tx, reply_rx) = oneshot::channel();
        self.request(ApiRequest::Submit {
            node,
            done: done_tx,
            reply: reply_tx,
        })
        .await?;
        let id = reply_rx.await.map_err(|_| SessionError::Closed)??;
        Ok(Expectation { id, done: done_rx })
    }

    /// Sends a command with its default expectations attached.
    ///
    /// Equivalent to building the node with
    /// [`ExpectNode::from_command`] and submitting it.
    ///
    /// # Errors
    ///
    /// See [`Session::submit`].
    pub async fn send(&self, command: MessageInstance) -> Result<Expectation, SessionError> {
        let node = ExpectNode::from_command(&self.catalog, command)?;
        self.submit(node).await
    }

    /// Reads the last observed event matching the pattern, if any.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Closed`] when the scheduler is gone.
    pub async fn get_state(&self, pattern: EventPattern) -> Result<Option<Event>, SessionError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.request(ApiRequest::GetState {
            pattern,
            reply: reply_tx,
        })
        .await?;
        reply_rx.await.map_err(|_| SessionError::Closed)
    }

    /// Returns `true` if a cached event matches the pattern.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Closed`] when the scheduler is gone.
    pub async fn check_state(&self, pattern: EventPattern) -> Result<bool, SessionError> {
        Ok(self.get_state(pattern).await?.is_some())
    }

    /// Waits for a fresh event matching the pattern, bypassing the
    /// cache, then returns the resulting state.
    ///
    /// Returns `None` when no matching event arrives within `timeout`.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Closed`] when the scheduler is gone.
    pub async fn query_state(
        &self,
        pattern: EventPattern,
        timeout: Duration,
    ) -> Result<Option<Event>, SessionError> {
        let node = ExpectNode::event_with(pattern.clone(), Policy::Wait).timeout(timeout);
        let outcome = self.submit(node).await?.wait().await?;
        if outcome.is_success() {
            self.get_state(pattern).await
        } else {
            Ok(None)
        }
    }

    /// Reads state under an explicit policy: `check` consults only the
    /// cache, `wait` only a fresh event, `check_wait` the cache first
    /// with a fresh-event fallback.
    ///
    /// `timeout` bounds the fresh-event wait and is ignored under
    /// `check`.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Closed`] when the scheduler is gone.
    pub async fn read_state(
        &self,
        pattern: EventPattern,
        policy: Policy,
        timeout: Duration,
    ) -> Result<Option<Event>, SessionError> {
        if policy.checks_cache() {
            if let Some(event) = self.get_state(pattern.clone()).await? {
                return Ok(Some(event));
            }
            if !policy.waits() {
                return Ok(None);
            }
        }
        self.query_state(pattern, timeout).await
    }

    /// Snapshots a pending tree for diagnostics.
    ///
    /// Returns `None` once the tree resolved (its final snapshot is in
    /// the [`TreeOutcome`]) or for an unknown id.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Closed`] when the scheduler is gone.
    pub async fn explain(&self, id: TreeId) -> Result<Option<ExplainNode>, SessionError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.request(ApiRequest::Explain { id, reply: reply_tx })
            .await?;
        reply_rx.await.map_err(|_| SessionError::Closed)
    }

    /// Subscribes to the raw event stream.
    ///
    /// Slow subscribers lag and lose old events; they never slow the
    /// scheduler down.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Closed`] when the scheduler is gone.
    pub async fn events(&self) -> Result<broadcast::Receiver<Event>, SessionError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.request(ApiRequest::Subscribe { reply: reply_tx })
            .await?;
        reply_rx.await.map_err(|_| SessionError::Closed)
    }

    /// Shuts the scheduler down. Pending waiters observe
    /// [`SessionError::Closed`].
    pub async fn close(&self) {
        let _ = self.api_tx.send(ApiRequest::Shutdown).await;
    }

    async fn request(&self, request: ApiRequest) -> Result<(), SessionError> {
        self.api_tx
            .send(request)
            .await
            .map_err(|_| SessionError::Closed)
    }
}
