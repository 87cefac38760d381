//! Scripted transport for testing the connection lifecycle.
//!
//! Each call to `connect` consumes the next planned outcome. Accepted
//! connections hand the server side to the test as a [`MockPeer`], which can
//! push messages, close the connection and inspect what the client sent.
//!
//! # Example
//!
//! ```ignore
//! let transport = Arc::new(MockTransport::new().accept().refuse().accept());
//! let client = SyncClient::new(config, transport.clone());
//! client.connect()?;
//!
//! let mut peer = transport.next_peer().await;
//! peer.send_json(r#"{"type":"ANIMAL_DELETED","data":"A1"}"#);
//! peer.close(1006);
//! ```

use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use tokio::sync::{mpsc, Notify};
use tokio::time::Instant;

use crate::ports::{Transport, TransportError, TransportEvent, TransportLink};

/// Planned result of one `connect` call.
#[derive(Debug, Clone)]
pub enum ConnectOutcome {
    /// Open the connection.
    Accept,
    /// Fail immediately with the given reason.
    Refuse(String),
    /// Never resolve; only a timeout or shutdown ends the attempt.
    Hang,
}

/// Server side of an accepted mock connection.
#[derive(Debug)]
pub struct MockPeer {
    events: mpsc::UnboundedSender<TransportEvent>,
    received: mpsc::UnboundedReceiver<Vec<u8>>,
}

impl MockPeer {
    /// Delivers a raw inbound message to the client.
    pub fn send_bytes(&self, bytes: impl Into<Vec<u8>>) {
        let _ = self.events.send(TransportEvent::Message(bytes.into()));
    }

    /// Delivers a text frame to the client.
    pub fn send_json(&self, frame: &str) {
        self.send_bytes(frame.as_bytes().to_vec());
    }

    /// Closes the connection from the server side.
    pub fn close(&self, code: u16) {
        let _ = self.events.send(TransportEvent::Closed(Some(code)));
    }

    /// Fails the connection with a transport error.
    pub fn fail(&self, reason: &str) {
        let _ = self.events.send(TransportEvent::Error(reason.to_string()));
    }

    /// Returns every frame the client has sent so far, oldest first.
    pub fn drain_sent(&mut self) -> Vec<String> {
        let mut frames = Vec::new();
        while let Ok(frame) = self.received.try_recv() {
            frames.push(String::from_utf8_lossy(&frame).into_owned());
        }
        frames
    }

    /// Returns true once the client has let go of the connection.
    pub fn is_released(&self) -> bool {
        self.events.is_closed()
    }
}

/// Transport whose connection attempts follow a script.
///
/// Once the script is exhausted every further attempt is refused.
#[derive(Debug, Default)]
pub struct MockTransport {
    script: Mutex<VecDeque<ConnectOutcome>>,
    attempts: Mutex<Vec<Instant>>,
    peers: Mutex<VecDeque<MockPeer>>,
    peer_ready: Notify,
}

impl MockTransport {
    /// Creates a transport with an empty script.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an accepted connection to the script.
    pub fn accept(self) -> Self {
        self.plan(ConnectOutcome::Accept);
        self
    }

    /// Appends a refused connection to the script.
    pub fn refuse(self) -> Self {
        self.plan(ConnectOutcome::Refuse("connection refused".to_string()));
        self
    }

    /// Appends a connection attempt that never completes.
    pub fn hang(self) -> Self {
        self.plan(ConnectOutcome::Hang);
        self
    }

    /// Appends an outcome at runtime.
    pub fn plan(&self, outcome: ConnectOutcome) {
        self.script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(outcome);
    }

    /// Number of `connect` calls made so far.
    pub fn attempt_count(&self) -> usize {
        self.attempts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Instants at which each `connect` call was made.
    pub fn attempt_times(&self) -> Vec<Instant> {
        self.attempts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Takes the oldest accepted peer, if any.
    pub fn take_peer(&self) -> Option<MockPeer> {
        self.peers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
    }

    /// Waits until a connection has been accepted and takes its peer.
    pub async fn next_peer(&self) -> MockPeer {
        loop {
            let notified = self.peer_ready.notified();
            if let Some(peer) = self.take_peer() {
                return peer;
            }
            notified.await;
        }
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn connect(&self, url: &str) -> Result<TransportLink, TransportError> {
        self.attempts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Instant::now());

        let outcome = self
            .script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
            .unwrap_or_else(|| ConnectOutcome::Refuse("script exhausted".to_string()));

        match outcome {
            ConnectOutcome::Accept => {
                let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
                let (events_tx, events_rx) = mpsc::unbounded_channel();
                self.peers
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .push_back(MockPeer {
                        events: events_tx,
                        received: outbound_rx,
                    });
                self.peer_ready.notify_waiters();
                Ok(TransportLink::new(outbound_tx, events_rx))
            }
            ConnectOutcome::Refuse(reason) => Err(TransportError::connect_failed(url, reason)),
            ConnectOutcome::Hang => std::future::pending().await,
        }
    }
}
