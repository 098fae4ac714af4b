//! The single-consumer scheduler task.
//!
//! One task owns the cache, the pending trees, and the transport, and
//! processes four input sources in a `select!` loop: API requests,
//! transport signals, and the earliest pending deadline. Transport
//! signals are drained before API requests, so a state query issued
//! after an event was injected always sees that event applied.

use crate::cache::StateCache;
use crate::config::SessionConfig;
use crate::error::SessionError;
use crate::session::TreeOutcome;
use crate::transport::{Transport, TransportSignal};
use aerolink_catalog::{Catalog, Direction, Event, EventPattern};
use aerolink_expect::{
    ActivationCtx, ActiveTree, Effect, ExpectNode, ExplainNode, LeafId,
};
use aerolink_types::{SendSeq, TreeId};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::{debug, info, trace, warn};

/// Requests from [`Session`](crate::Session) handles.
pub(crate) enum ApiRequest {
    Submit {
        node: ExpectNode,
        done: oneshot::Sender<TreeOutcome>,
        reply: oneshot::Sender<Result<TreeId, SessionError>>,
    },
    GetState {
        pattern: EventPattern,
        reply: oneshot::Sender<Option<Event>>,
    },
    Explain {
        id: TreeId,
        reply: oneshot::Sender<Option<ExplainNode>>,
    },
    Subscribe {
        reply: oneshot::Sender<broadcast::Receiver<Event>>,
    },
    Shutdown,
}

struct TreeEntry {
    id: TreeId,
    tree: ActiveTree,
    done: Option<oneshot::Sender<TreeOutcome>>,
}

pub(crate) struct Scheduler<T: Transport> {
    catalog: Arc<Catalog>,
    config: SessionConfig,
    transport: T,
    cache: StateCache,
    /// Pending trees in submission order; fan-out order is fixed.
    trees: Vec<TreeEntry>,
    /// Outstanding sends awaiting a transport verdict.
    pending_sends: HashMap<SendSeq, (TreeId, LeafId)>,
    next_seq: SendSeq,
    events_tx: broadcast::Sender<Event>,
    connected: bool,
}

impl<T: Transport> Scheduler<T> {
    pub(crate) fn new(catalog: Arc<Catalog>, config: SessionConfig, transport: T) -> Self {
        let (events_tx, _) = broadcast::channel(config.broadcast_capacity);
        let cache = StateCache::new(config.float_tol);
        Self {
            catalog,
            config,
            transport,
            cache,
            trees: Vec::new(),
            pending_sends: HashMap::new(),
            next_seq: SendSeq::FIRST,
            events_tx,
            connected: true,
        }
    }

    pub(crate) async fn run(
        mut self,
        mut api_rx: mpsc::Receiver<ApiRequest>,
        mut signal_rx: mpsc::UnboundedReceiver<TransportSignal>,
    ) {
        info!("session scheduler started");
        loop {
            let deadline = self.next_deadline();
            tokio::select! {
                biased;
                signal = signal_rx.recv() => match signal {
                    Some(signal) => self.handle_signal(signal),
                    None => break,
                },
                request = api_rx.recv() => match request {
                    Some(request) => {
                        if !self.handle_request(request) {
                            break;
                        }
                    }
                    None => break,
                },
                () = sleep_or_never(deadline) => self.handle_tick(),
            }
        }
        info!("session scheduler stopped");
    }

    /// Clock reads go through tokio so paused-time tests control them.
    fn now() -> Instant {
        tokio::time::Instant::now().into_std()
    }

    fn ctx(&self) -> ActivationCtx<'_> {
        ActivationCtx {
            cache: &self.cache,
            now: Self::now(),
            float_tol: self.config.float_tol,
        }
    }

    fn next_deadline(&self) -> Option<Instant> {
        self.trees
            .iter()
            .filter_map(|entry| entry.tree.next_deadline())
            .min()
    }

    /// Returns `false` when the request asks the scheduler to stop.
    fn handle_request(&mut self, request: ApiRequest) -> bool {
        match request {
            ApiRequest::Submit { node, done, reply } => {
                let activated = ActiveTree::activate(node, &self.ctx());
                match activated {
                    Err(err) => {
                        let _ = reply.send(Err(err.into()));
                    }
                    Ok((tree, effects)) => {
                        let id = TreeId::new();
                        debug!(%id, "expectation submitted");
                        let mut entry = TreeEntry {
                            id,
                            tree,
                            done: Some(done),
                        };
                        self.run_effects(&mut entry, effects);
                        let _ = reply.send(Ok(id));
                        if !finish_if_resolved(&mut entry) {
                            self.trees.push(entry);
                        }
                    }
                }
            }
            ApiRequest::GetState { pattern, reply } => {
                let _ = reply.send(self.cache.get(&pattern));
            }
            ApiRequest::Explain { id, reply } => {
                let snapshot = self
                    .trees
                    .iter()
                    .find(|entry| entry.id == id)
                    .map(|entry| entry.tree.explain());
                let _ = reply.send(snapshot);
            }
            ApiRequest::Subscribe { reply } => {
                let _ = reply.send(self.events_tx.subscribe());
            }
            ApiRequest::Shutdown => return false,
        }
        true
    }

    fn handle_signal(&mut self, signal: TransportSignal) {
        match signal {
            TransportSignal::Event(event) => self.handle_event(event),
            TransportSignal::SendResult { seq, ok } => self.handle_send_result(seq, ok),
            TransportSignal::LinkLost => {
                info!("link lost, forcing pending expectations out");
                self.connected = false;
                self.pending_sends.clear();
                let mut trees = std::mem::take(&mut self.trees);
                for entry in &mut trees {
                    entry.tree.force_timeout();
                }
                trees.retain_mut(|entry| !finish_if_resolved(entry));
                self.trees = trees;
            }
            TransportSignal::LinkUp => {
                info!("link established, resetting cached state");
                self.connected = true;
                self.cache.clear();
            }
        }
    }

    /// Cache first, broadcast second, then fan-out to every pending
    /// tree in submission order.
    fn handle_event(&mut self, event: Event) {
        trace!(%event, "event received");
        match self.catalog.descriptor_by_id(event.id()) {
            Some(desc) if desc.direction() == Direction::Event => {
                let desc = Arc::clone(desc);
                self.cache.update(&desc, event.clone());
            }
            _ => warn!(id = %event.id(), "event not in catalog, not cached"),
        }
        let _ = self.events_tx.send(event.clone());

        let mut trees = std::mem::take(&mut self.trees);
        for entry in &mut trees {
            let effects = entry.tree.on_event(&event, &self.ctx());
            self.run_effects(entry, effects);
        }
        trees.retain_mut(|entry| !finish_if_resolved(entry));
        self.trees = trees;
    }

    fn handle_send_result(&mut self, seq: SendSeq, ok: bool) {
        let Some((tree_id, leaf)) = self.pending_sends.remove(&seq) else {
            warn!(%seq, "verdict for unknown send");
            return;
        };
        trace!(%seq, ok, "send verdict");
        let Some(pos) = self.trees.iter().position(|entry| entry.id == tree_id) else {
            return;
        };
        let mut entry = self.trees.remove(pos);
        let effects = entry.tree.on_send_result(leaf, ok, &self.ctx());
        self.run_effects(&mut entry, effects);
        if !finish_if_resolved(&mut entry) {
            // Keep the fan-out order stable.
            self.trees.insert(pos, entry);
        }
    }

    fn handle_tick(&mut self) {
        let now = Self::now();
        let mut trees = std::mem::take(&mut self.trees);
        for entry in &mut trees {
            entry.tree.on_tick(now);
        }
        trees.retain_mut(|entry| !finish_if_resolved(entry));
        self.trees = trees;
    }

    /// Performs the sends a tree requested. A synchronous transport
    /// error is fed straight back as a failed send, which can emit
    /// further effects.
    fn run_effects(&mut self, entry: &mut TreeEntry, effects: Vec<Effect>) {
        let mut queue: VecDeque<Effect> = effects.into();
        while let Some(Effect::SendCommand { leaf, instance }) = queue.pop_front() {
            let seq = self.next_seq;
            self.next_seq = self.next_seq.next();
            let sent = if self.connected {
                self.transport.send_command(seq, &instance)
            } else {
                Err(crate::transport::TransportError::LinkDown)
            };
            match sent {
                Ok(()) => {
                    trace!(%seq, command = %instance, "command queued");
                    self.pending_sends.insert(seq, (entry.id, leaf));
                }
                Err(err) => {
                    warn!(%seq, command = %instance, error = %err, "send failed");
                    queue.extend(entry.tree.on_send_result(leaf, false, &self.ctx()));
                }
            }
        }
    }
}

fn finish_if_resolved(entry: &mut TreeEntry) -> bool {
    if !entry.tree.is_resolved() {
        return false;
    }
    let outcome = TreeOutcome {
        state: entry.tree.state(),
        explain: entry.tree.explain(),
    };
    debug!(id = %entry.id, state = %outcome.state, "expectation finished");
    if let Some(done) = entry.done.take() {
        let _ = done.send(outcome);
    }
    true
}

async fn sleep_or_never(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => {
            tokio::time::sleep_until(tokio::time::Instant::from_std(deadline)).await;
        }
        None => std::future::pending().await,
    }
}
