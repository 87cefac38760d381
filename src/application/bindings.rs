//! Typed callback bindings over the untyped event stream.
//!
//! A binding is how a view consumes events: it supplies one callback per
//! event kind it cares about, and gets a handle whose lifetime is the
//! subscription's lifetime.

use std::sync::atomic::{AtomicBool, Ordering};

use serde_json::Value;
use tracing::{debug, info};

use crate::adapters::events::Subscription;
use crate::domain::{BatchUpdate, DomainEvent, EntityId};
use crate::ports::{EventHandler, HandlerError};

use super::client::SyncClient;

type EntityCallback = Box<dyn Fn(&Value) + Send + Sync>;
type DeletedCallback = Box<dyn Fn(&EntityId) + Send + Sync>;
type BatchCallback = Box<dyn Fn(&BatchUpdate) + Send + Sync>;
type SnapshotCallback = Box<dyn Fn(&[Value]) + Send + Sync>;

/// Per-kind callbacks. Every slot is optional; an empty slot ignores its kind.
pub struct EventCallbacks {
    name: &'static str,
    entity_added: Option<EntityCallback>,
    entity_updated: Option<EntityCallback>,
    entity_deleted: Option<DeletedCallback>,
    batch_updated: Option<BatchCallback>,
    snapshot_replaced: Option<SnapshotCallback>,
}

impl EventCallbacks {
    pub fn new() -> Self {
        Self::named("EventCallbacks")
    }

    /// Empty callback set reporting `name` in failure logs.
    pub fn named(name: &'static str) -> Self {
        Self {
            name,
            entity_added: None,
            entity_updated: None,
            entity_deleted: None,
            batch_updated: None,
            snapshot_replaced: None,
        }
    }

    pub fn on_entity_added(mut self, f: impl Fn(&Value) + Send + Sync + 'static) -> Self {
        self.entity_added = Some(Box::new(f));
        self
    }

    pub fn on_entity_updated(mut self, f: impl Fn(&Value) + Send + Sync + 'static) -> Self {
        self.entity_updated = Some(Box::new(f));
        self
    }

    pub fn on_entity_deleted(mut self, f: impl Fn(&EntityId) + Send + Sync + 'static) -> Self {
        self.entity_deleted = Some(Box::new(f));
        self
    }

    pub fn on_batch_updated(mut self, f: impl Fn(&BatchUpdate) + Send + Sync + 'static) -> Self {
        self.batch_updated = Some(Box::new(f));
        self
    }

    pub fn on_snapshot_replaced(mut self, f: impl Fn(&[Value]) + Send + Sync + 'static) -> Self {
        self.snapshot_replaced = Some(Box::new(f));
        self
    }
}

impl Default for EventCallbacks {
    fn default() -> Self {
        Self::new()
    }
}

impl EventHandler for EventCallbacks {
    fn handle(&self, event: &DomainEvent) -> Result<(), HandlerError> {
        match event {
            DomainEvent::EntityAdded(entity) => {
                if let Some(f) = &self.entity_added {
                    f(entity);
                }
            }
            DomainEvent::EntityUpdated(entity) => {
                if let Some(f) = &self.entity_updated {
                    f(entity);
                }
            }
            DomainEvent::EntityDeleted(id) => {
                if let Some(f) = &self.entity_deleted {
                    f(id);
                }
            }
            DomainEvent::BatchUpdated(batch) => {
                if let Some(f) = &self.batch_updated {
                    f(batch);
                }
            }
            DomainEvent::SnapshotReplaced(entities) => {
                if let Some(f) = &self.snapshot_replaced {
                    f(entities);
                }
            }
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        self.name
    }
}

impl std::fmt::Debug for EventCallbacks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventCallbacks")
            .field("name", &self.name)
            .field("entity_added", &self.entity_added.is_some())
            .field("entity_updated", &self.entity_updated.is_some())
            .field("entity_deleted", &self.entity_deleted.is_some())
            .field("batch_updated", &self.batch_updated.is_some())
            .field("snapshot_replaced", &self.snapshot_replaced.is_some())
            .finish()
    }
}

/// Live attachment of [`EventCallbacks`] to a client.
///
/// Tearing down the last binding of a client closes its connection.
/// Dropping a binding tears it down.
#[derive(Debug)]
pub struct Binding {
    client: SyncClient,
    subscription: Subscription,
    released: AtomicBool,
}

impl Binding {
    pub(crate) fn new(client: SyncClient, subscription: Subscription) -> Self {
        Self {
            client,
            subscription,
            released: AtomicBool::new(false),
        }
    }

    /// Removes the callbacks. Idempotent.
    pub fn teardown(&self) {
        if self.released.swap(true, Ordering::SeqCst) {
            return;
        }

        self.client.unsubscribe(&self.subscription);
        let remaining = self.client.release_binding();
        debug!(subscription = %self.subscription.id(), remaining, "binding torn down");

        if remaining == 0 {
            info!(client_id = %self.client.id(), "last binding released, closing connection");
            self.client.disconnect();
        }
    }

    pub fn is_active(&self) -> bool {
        !self.released.load(Ordering::SeqCst)
    }

    pub fn client(&self) -> &SyncClient {
        &self.client
    }
}

impl Drop for Binding {
    fn drop(&mut self) {
        self.teardown();
    }
}
