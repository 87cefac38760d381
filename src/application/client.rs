//! `SyncClient`: the consumer-facing handle to one logical connection.
//!
//! A client owns a subscriber registry and, while connected, one
//! reconnection controller task. Handles are cheap to clone and share the
//! same connection; the controller is told to stop when the last handle
//! is dropped.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use thiserror::Error;
use tokio::runtime::Handle;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, info_span, Instrument};

use crate::adapters::events::{SubscriberRegistry, Subscription};
use crate::adapters::websocket::{messages, WebSocketTransport};
use crate::config::{AppConfig, ClientConfig, ConfigError};
use crate::domain::{ClientId, ConnectionState, DomainEvent};
use crate::ports::{handler_fn, EventHandler, EventSubscriber, HandlerError, Transport};

use super::bindings::{Binding, EventCallbacks};
use super::controller::ReconnectionController;

/// Errors returned directly to callers of [`SyncClient`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    #[error("not connected to the event server")]
    NotConnected,

    #[error("no tokio runtime available to drive the connection")]
    NoRuntime,
}

struct Driver {
    shutdown: watch::Sender<bool>,
    outbound: mpsc::UnboundedSender<Vec<u8>>,
    // Cleared by the controller together with its terminal `Disconnected`.
    live: Arc<AtomicBool>,
    task: JoinHandle<()>,
}

impl Driver {
    fn is_live(&self) -> bool {
        self.live.load(Ordering::SeqCst) && !self.task.is_finished()
    }

    // The task is detached; it exits once it observes the signal.
    fn stop(self) {
        let _ = self.shutdown.send(true);
    }
}

struct ClientInner {
    id: ClientId,
    config: ClientConfig,
    transport: Arc<dyn Transport>,
    registry: SubscriberRegistry,
    state: Arc<watch::Sender<ConnectionState>>,
    driver: Mutex<Option<Driver>>,
    active_bindings: AtomicUsize,
}

impl Drop for ClientInner {
    fn drop(&mut self) {
        let driver = self
            .driver
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(driver) = driver {
            debug!(client_id = %self.id, "last client handle dropped, stopping connection");
            driver.stop();
            self.state.send_replace(ConnectionState::Disconnected);
        }
    }
}

/// Reconnecting real-time event client.
///
/// # Example
///
/// ```no_run
/// use livestock_sync::{EventCallbacks, SyncClient};
///
/// # async fn run() -> Result<(), Box<dyn std::error::Error>> {
/// let client = SyncClient::websocket(Some("ws://localhost:5000"))?;
///
/// let _binding = client.bind(
///     EventCallbacks::named("herd-table")
///         .on_entity_added(|animal| println!("added {animal}"))
///         .on_entity_deleted(|id| println!("removed {id}")),
/// )?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct SyncClient {
    inner: Arc<ClientInner>,
}

impl SyncClient {
    /// Creates a disconnected client over the given transport.
    pub fn new(config: ClientConfig, transport: Arc<dyn Transport>) -> Self {
        let (state, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            inner: Arc::new(ClientInner {
                id: ClientId::new(),
                config,
                transport,
                registry: SubscriberRegistry::new(),
                state: Arc::new(state),
                driver: Mutex::new(None),
                active_bindings: AtomicUsize::new(0),
            }),
        }
    }

    /// Creates a WebSocket client from environment configuration.
    ///
    /// `url` overrides the configured endpoint.
    pub fn websocket(url: Option<&str>) -> Result<Self, ConfigError> {
        let mut config = AppConfig::load()?.client;
        if let Some(url) = url {
            config = config.with_url(url);
        }
        config.validate()?;

        Ok(Self::new(config, Arc::new(WebSocketTransport::new())))
    }

    pub fn id(&self) -> ClientId {
        self.inner.id
    }

    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    /// Starts the connection if it is not already running.
    ///
    /// Returns immediately; progress is observable through [`state`](Self::state).
    /// Calling this after the retry budget was exhausted starts over with a
    /// fresh budget.
    pub fn connect(&self) -> Result<(), ClientError> {
        let mut driver = self.lock_driver();
        if driver.as_ref().is_some_and(Driver::is_live) {
            return Ok(());
        }

        let runtime = Handle::try_current().map_err(|_| ClientError::NoRuntime)?;

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let live = Arc::new(AtomicBool::new(true));
        let controller = ReconnectionController::new(
            &self.inner.config,
            self.inner.transport.clone(),
            Arc::new(self.inner.registry.clone()),
            self.inner.state.clone(),
            live.clone(),
            outbound_rx,
            shutdown_rx,
        );

        self.inner.state.send_replace(ConnectionState::Connecting);
        let span = info_span!("sync_client", client_id = %self.inner.id, url = %self.inner.config.url);
        let task = runtime.spawn(controller.run().instrument(span));

        info!(client_id = %self.inner.id, url = %self.inner.config.url, "connection started");
        *driver = Some(Driver {
            shutdown: shutdown_tx,
            outbound: outbound_tx,
            live,
            task,
        });
        Ok(())
    }

    /// Stops the connection. Idempotent.
    ///
    /// No reconnect or keepalive happens after this returns. Shutdown is
    /// raised before `Disconnected` is written; the controller relies on
    /// that order.
    pub fn disconnect(&self) {
        let mut slot = self.lock_driver();
        let Some(driver) = slot.take() else {
            return;
        };
        driver.stop();
        // Written under the driver lock so a concurrent `connect` cannot
        // publish `Connecting` first and then be overwritten.
        self.inner.state.send_replace(ConnectionState::Disconnected);
        drop(slot);
        info!(client_id = %self.inner.id, "disconnected");
    }

    /// Encodes and queues an event on the live connection.
    pub fn send(&self, event: &DomainEvent) -> Result<(), ClientError> {
        if !self.state().is_connected() {
            return Err(ClientError::NotConnected);
        }

        let driver = self.lock_driver();
        let outbound = driver.as_ref().ok_or(ClientError::NotConnected)?;
        outbound
            .outbound
            .send(messages::encode(event))
            .map_err(|_| ClientError::NotConnected)?;

        debug!(event_kind = %event.kind(), "event queued");
        Ok(())
    }

    /// Registers a handler for every inbound event.
    pub fn subscribe(&self, handler: Arc<dyn EventHandler>) -> Subscription {
        self.inner.registry.subscribe(handler)
    }

    /// Registers a closure for every inbound event.
    pub fn subscribe_fn<F>(&self, name: &'static str, f: F) -> Subscription
    where
        F: Fn(&DomainEvent) -> Result<(), HandlerError> + Send + Sync + 'static,
    {
        self.subscribe(handler_fn(name, f))
    }

    pub fn unsubscribe(&self, subscription: &Subscription) {
        self.inner.registry.unsubscribe(subscription);
    }

    /// Connects (or reuses the connection) and attaches typed callbacks.
    pub fn bind(&self, callbacks: EventCallbacks) -> Result<Binding, ClientError> {
        self.connect()?;
        let subscription = self.subscribe(Arc::new(callbacks));
        self.inner.active_bindings.fetch_add(1, Ordering::SeqCst);
        Ok(Binding::new(self.clone(), subscription))
    }

    /// Current connection state.
    pub fn state(&self) -> ConnectionState {
        *self.inner.state.borrow()
    }

    /// Receiver that observes every state change.
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.inner.state.subscribe()
    }

    /// Number of bindings that have not been torn down.
    pub fn active_bindings(&self) -> usize {
        self.inner.active_bindings.load(Ordering::SeqCst)
    }

    /// Returns the number of bindings left after releasing one.
    pub(crate) fn release_binding(&self) -> usize {
        let previous = self
            .inner
            .active_bindings
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .unwrap_or(0);
        previous.saturating_sub(1)
    }

    fn lock_driver(&self) -> std::sync::MutexGuard<'_, Option<Driver>> {
        self.inner
            .driver
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for SyncClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncClient")
            .field("id", &self.inner.id)
            .field("url", &self.inner.config.url)
            .field("state", &self.state())
            .field("registry", &self.inner.registry)
            .finish()
    }
}
