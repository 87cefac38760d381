//! Transport port - One persistent bidirectional connection to the server.
//!
//! A transport only opens, sends, receives and closes. It reports the
//! terminal outcome of a connection exactly once and never retries;
//! reconnection is the controller's job.

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;

/// Errors raised by a transport.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("connection to {url} failed: {reason}")]
    ConnectFailed { url: String, reason: String },

    #[error("connection to {url} timed out")]
    ConnectTimedOut { url: String },

    #[error("not connected")]
    NotConnected,
}

impl TransportError {
    pub fn connect_failed(url: impl Into<String>, reason: impl ToString) -> Self {
        TransportError::ConnectFailed {
            url: url.into(),
            reason: reason.to_string(),
        }
    }
}

/// Something that happened on an open connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// A complete inbound message.
    Message(Vec<u8>),
    /// The peer closed the connection, with its close code if one was sent.
    Closed(Option<u16>),
    /// The connection failed.
    Error(String),
}

impl TransportEvent {
    /// Returns true for events after which the connection is gone.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, TransportEvent::Message(_))
    }
}

/// Sending half of an open connection.
///
/// Sends are queued without blocking. Once the connection is gone every
/// send fails with [`TransportError::NotConnected`].
#[derive(Debug, Clone)]
pub struct LinkSender {
    outbound: mpsc::UnboundedSender<Vec<u8>>,
}

impl LinkSender {
    pub fn send(&self, frame: Vec<u8>) -> Result<(), TransportError> {
        self.outbound
            .send(frame)
            .map_err(|_| TransportError::NotConnected)
    }

    /// Returns true once the connection behind this sender has gone away.
    pub fn is_closed(&self) -> bool {
        self.outbound.is_closed()
    }
}

/// An open connection, as returned by [`Transport::connect`].
///
/// Dropping the link (or both of its halves) closes the connection.
#[derive(Debug)]
pub struct TransportLink {
    sender: LinkSender,
    events: mpsc::UnboundedReceiver<TransportEvent>,
}

impl TransportLink {
    /// Builds a link from the channels an adapter pumps.
    ///
    /// The adapter reads frames to write from `outbound` and reports what
    /// happens on the connection through `events`.
    pub fn new(
        outbound: mpsc::UnboundedSender<Vec<u8>>,
        events: mpsc::UnboundedReceiver<TransportEvent>,
    ) -> Self {
        Self {
            sender: LinkSender { outbound },
            events,
        }
    }

    /// Splits the link so sending and receiving can be driven independently.
    pub fn split(self) -> (LinkSender, mpsc::UnboundedReceiver<TransportEvent>) {
        (self.sender, self.events)
    }
}

/// Port for opening connections to the event server.
///
/// A successful `connect` means the connection is open. Failures are
/// reported once and are not retried here.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn connect(&self, url: &str) -> Result<TransportLink, TransportError>;
}
