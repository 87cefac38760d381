//! Reconnection controller: owns the live connection and keeps it alive.
//!
//! The controller runs as one task per connected client. Everything that
//! can happen to the connection is multiplexed through a single
//! `tokio::select!`:
//!
//! ```text
//!            ┌──────────── shutdown (always checked first) ────────────┐
//!            ▼                                                          │
//! Connecting ──connect ok──▶ Connected ──close / error──▶ Reconnecting(n)
//!     ▲          │                │ inbound  → codec → publisher        │
//!     │     fail / timeout        │ outbound → link                     │
//!     │          ▼                │ keepalive tick → PING               │
//!     └─── backoff sleep ◀────────┴─────────────────────────────────────┘
//! ```
//!
//! When the retry policy is exhausted the task clears its `live` flag and
//! settles the state to `Disconnected` in one step, then exits. On shutdown
//! it exits without touching the state, which the client has already
//! reset. The backoff sleep and keepalive timer live on this task's stack,
//! so they are released on every exit path.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::time;
use tracing::{debug, info, trace, warn};

use crate::adapters::websocket::messages::{self, Inbound};
use crate::config::ClientConfig;
use crate::domain::{ConnectionState, RetryPolicy};
use crate::ports::{EventPublisher, Transport, TransportError, TransportEvent};

use super::liveness::{send_probe, LivenessMonitor};

/// How a connection period ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Shutdown,
    Lost,
}

pub(crate) struct ReconnectionController {
    transport: Arc<dyn Transport>,
    publisher: Arc<dyn EventPublisher>,
    url: String,
    connect_timeout: Duration,
    keepalive_interval: Duration,
    policy: RetryPolicy,
    state: Arc<watch::Sender<ConnectionState>>,
    live: Arc<AtomicBool>,
    outbound: mpsc::UnboundedReceiver<Vec<u8>>,
    shutdown: watch::Receiver<bool>,
}

impl ReconnectionController {
    pub(crate) fn new(
        config: &ClientConfig,
        transport: Arc<dyn Transport>,
        publisher: Arc<dyn EventPublisher>,
        state: Arc<watch::Sender<ConnectionState>>,
        live: Arc<AtomicBool>,
        outbound: mpsc::UnboundedReceiver<Vec<u8>>,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            transport,
            publisher,
            url: config.url.clone(),
            connect_timeout: config.connect_timeout(),
            keepalive_interval: config.keepalive_interval(),
            policy: config.retry.policy(),
            state,
            live,
            outbound,
            shutdown,
        }
    }

    /// Runs until shutdown or until the retry budget is spent.
    pub(crate) async fn run(mut self) {
        loop {
            self.set_state(ConnectionState::Connecting);
            self.discard_stale_outbound();

            if self.connect_and_serve().await == Outcome::Shutdown {
                break;
            }

            let Some(delay) = self.policy.next_delay() else {
                warn!(
                    url = %self.url,
                    attempts = self.policy.max_attempts(),
                    "reconnection attempts exhausted, real-time updates unavailable"
                );
                break;
            };

            let attempt = self.policy.current_attempt();
            self.set_state(ConnectionState::Reconnecting(attempt));
            warn!(
                url = %self.url,
                attempt,
                delay_ms = delay.as_millis() as u64,
                "scheduling reconnection attempt"
            );

            tokio::select! {
                biased;
                _ = self.shutdown.changed() => break,
                () = time::sleep(delay) => {}
            }
        }

        self.publish_state(ConnectionState::Disconnected, true);
        info!(url = %self.url, "connection controller stopped");
    }

    /// One connection period: connect, then serve until the link is lost.
    async fn connect_and_serve(&mut self) -> Outcome {
        let attempt = time::timeout(self.connect_timeout, self.transport.connect(&self.url));

        let link = tokio::select! {
            biased;
            _ = self.shutdown.changed() => return Outcome::Shutdown,
            result = attempt => match result {
                Ok(Ok(link)) => link,
                Ok(Err(e)) => {
                    warn!(url = %self.url, error = %e, "connection attempt failed");
                    return Outcome::Lost;
                }
                Err(_) => {
                    let e = TransportError::ConnectTimedOut { url: self.url.clone() };
                    warn!(
                        error = %e,
                        timeout_ms = self.connect_timeout.as_millis() as u64,
                        "connection attempt failed"
                    );
                    return Outcome::Lost;
                }
            },
        };

        self.policy.reset();
        self.set_state(ConnectionState::Connected);
        info!(url = %self.url, "connected to event server");

        let (sender, mut events) = link.split();
        let mut liveness = LivenessMonitor::arm(self.keepalive_interval);

        loop {
            tokio::select! {
                biased;
                _ = self.shutdown.changed() => {
                    debug!(url = %self.url, "shutdown requested, closing connection");
                    return Outcome::Shutdown;
                }
                event = events.recv() => match event {
                    Some(TransportEvent::Message(bytes)) => dispatch(self.publisher.as_ref(), &bytes),
                    Some(TransportEvent::Closed(code)) => {
                        warn!(url = %self.url, code = ?code, "connection closed by server");
                        return Outcome::Lost;
                    }
                    Some(TransportEvent::Error(reason)) => {
                        warn!(url = %self.url, error = %reason, "connection failed");
                        return Outcome::Lost;
                    }
                    None => {
                        warn!(url = %self.url, "connection ended without close");
                        return Outcome::Lost;
                    }
                },
                Some(frame) = self.outbound.recv() => {
                    if let Err(e) = sender.send(frame) {
                        debug!(error = %e, "dropping outbound event");
                    }
                }
                () = liveness.tick() => {
                    send_probe(&sender);
                }
            }
        }
    }

    fn set_state(&self, state: ConnectionState) {
        self.publish_state(state, false);
    }

    // The shutdown check runs under the state channel's write lock, and the
    // client raises shutdown before it writes `Disconnected`, so a stopped
    // controller can never overwrite the client's write. A final write also
    // clears `live` under that lock, so whoever observes the terminal
    // `Disconnected` also observes a controller that is no longer running.
    fn publish_state(&self, state: ConnectionState, last: bool) {
        let mut previous = None;
        self.state.send_if_modified(|current| {
            if *self.shutdown.borrow() {
                return false;
            }
            if last {
                self.live.store(false, Ordering::SeqCst);
            }
            let old = std::mem::replace(current, state);
            previous = Some(old);
            old != state
        });

        match previous {
            Some(previous) if previous != state => {
                debug!(from = %previous, to = %state, "connection state changed");
            }
            _ => {}
        }
    }

    // Events queued while no connection was open are not replayed later.
    fn discard_stale_outbound(&mut self) {
        let mut dropped = 0usize;
        while self.outbound.try_recv().is_ok() {
            dropped += 1;
        }
        if dropped > 0 {
            debug!(dropped, "discarded outbound events queued while disconnected");
        }
    }
}

/// Decodes one inbound frame and publishes it. Bad frames are logged and dropped.
fn dispatch(publisher: &dyn EventPublisher, bytes: &[u8]) {
    match messages::decode(bytes) {
        Ok(Inbound::Event(event)) => {
            let delivered = publisher.publish(&event);
            trace!(event_kind = %event.kind(), delivered, "event published");
        }
        Ok(Inbound::Pong) => trace!("keepalive acknowledged"),
        Err(e) => warn!(error = %e, bytes = bytes.len(), "dropping malformed message"),
    }
}
