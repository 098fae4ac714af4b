//! The transport seam.
//!
//! The session is transport-agnostic: anything that can ship a bound
//! command and feed back what the link says implements [`Transport`].
//! Outbound traffic goes through [`Transport::send_command`]; inbound
//! traffic (decoded events, send acknowledgements, link transitions)
//! comes back through the [`TransportHook`] handed out when the
//! session is spawned.

use aerolink_catalog::{Event, MessageInstance};
use aerolink_types::{ErrorCode, SendSeq};
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tokio::sync::mpsc;

/// Outbound half of the link.
///
/// `send_command` queues the command for transmission; `Ok` means
/// accepted for sending, not delivered. The delivery verdict arrives
/// later through [`TransportHook::send_result`]. A synchronous error
/// counts as a failed send immediately.
pub trait Transport: Send + 'static {
    /// Queues one command. The sequence number identifies it in the
    /// later acknowledgement.
    fn send_command(
        &mut self,
        seq: SendSeq,
        command: &MessageInstance,
    ) -> Result<(), TransportError>;
}

/// Transport layer errors.
///
/// | Error | Code | Recoverable |
/// |-------|------|-------------|
/// | [`TransportError::LinkDown`] | `TRANSPORT_LINK_DOWN` | Yes |
/// | [`TransportError::Rejected`] | `TRANSPORT_REJECTED` | No |
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    /// The link is not connected.
    #[error("link is down")]
    LinkDown,

    /// The transport refused the command.
    #[error("command rejected: {0}")]
    Rejected(String),
}

impl ErrorCode for TransportError {
    fn code(&self) -> &'static str {
        match self {
            Self::LinkDown => "TRANSPORT_LINK_DOWN",
            Self::Rejected(_) => "TRANSPORT_REJECTED",
        }
    }

    fn is_recoverable(&self) -> bool {
        matches!(self, Self::LinkDown)
    }
}

/// Inbound traffic from the transport to the scheduler.
#[derive(Debug)]
pub(crate) enum TransportSignal {
    Event(Event),
    SendResult { seq: SendSeq, ok: bool },
    LinkLost,
    LinkUp,
}

/// Inbound half of the link, held by the transport.
///
/// All methods are non-blocking and infallible; traffic pushed after
/// the session closed is silently dropped.
#[derive(Debug, Clone)]
pub struct TransportHook {
    tx: mpsc::UnboundedSender<TransportSignal>,
}

impl TransportHook {
    pub(crate) fn new(tx: mpsc::UnboundedSender<TransportSignal>) -> Self {
        Self { tx }
    }

    /// Delivers one decoded event notification.
    pub fn event(&self, event: Event) {
        let _ = self.tx.send(TransportSignal::Event(event));
    }

    /// Reports the delivery verdict for a previously queued send.
    pub fn send_result(&self, seq: SendSeq, ok: bool) {
        let _ = self.tx.send(TransportSignal::SendResult { seq, ok });
    }

    /// Reports that the link dropped.
    pub fn link_lost(&self) {
        let _ = self.tx.send(TransportSignal::LinkLost);
    }

    /// Reports that the link is (re-)established.
    pub fn link_up(&self) {
        let _ = self.tx.send(TransportSignal::LinkUp);
    }
}

/// How [`MockTransport`] answers sends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockMode {
    /// Acknowledge every send.
    AckAll,
    /// Accept every send, then report delivery failure.
    FailAll,
    /// Refuse every send synchronously.
    RejectAll,
}

/// Shared record of everything a [`MockTransport`] sent.
#[derive(Debug, Clone, Default)]
pub struct MockLog(Arc<Mutex<Vec<(SendSeq, MessageInstance)>>>);

impl MockLog {
    /// Returns the sends recorded so far, in order.
    #[must_use]
    pub fn sent(&self) -> Vec<(SendSeq, MessageInstance)> {
        self.0.lock().map(|log| log.clone()).unwrap_or_default()
    }

    /// Returns how many sends were recorded.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.lock().map(|log| log.len()).unwrap_or(0)
    }

    /// Returns `true` when nothing was sent.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn push(&self, seq: SendSeq, command: MessageInstance) {
        if let Ok(mut log) = self.0.lock() {
            log.push((seq, command));
        }
    }
}

/// In-memory transport for tests and examples.
///
/// Records every send into a [`MockLog`] and answers according to its
/// [`MockMode`]. Events and link transitions are injected by the test
/// through the [`TransportHook`] directly.
#[derive(Debug)]
pub struct MockTransport {
    hook: TransportHook,
    log: MockLog,
    mode: MockMode,
}

impl MockTransport {
    /// Creates a mock with the given answer mode.
    #[must_use]
    pub fn new(hook: TransportHook, log: MockLog, mode: MockMode) -> Self {
        Self { hook, log, mode }
    }
}

impl Transport for MockTransport {
    fn send_command(
        &mut self,
        seq: SendSeq,
        command: &MessageInstance,
    ) -> Result<(), TransportError> {
        if self.mode == MockMode::RejectAll {
            return Err(TransportError::Rejected("mock rejects all".to_string()));
        }
        self.log.push(seq, command.clone());
        self.hook.send_result(seq, self.mode == MockMode::AckAll);
        Ok(())
    }
}
