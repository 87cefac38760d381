//! In-process subscriber registry: fan-out of decoded events to consumers.
//!
//! Delivery is synchronous and in registration order. The handler list is
//! snapshotted before each pass and the lock is released while handlers
//! run, so a handler may subscribe or unsubscribe (itself or others)
//! without deadlocking. Each entry carries an `active` flag that is checked
//! immediately before invocation: a handler removed mid-pass is skipped,
//! and every other handler still runs exactly once.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock, Weak};

use tracing::{error, warn};

use crate::domain::{DomainEvent, SubscriptionId};
use crate::ports::{EventHandler, EventPublisher, EventSubscriber};

struct Entry {
    id: SubscriptionId,
    handler: Arc<dyn EventHandler>,
    active: AtomicBool,
}

#[derive(Default)]
struct Handlers {
    entries: RwLock<Vec<Arc<Entry>>>,
    next_id: AtomicU64,
}

impl Handlers {
    fn snapshot(&self) -> Vec<Arc<Entry>> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn remove(&self, id: SubscriptionId) {
        let mut entries = self
            .entries
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(position) = entries.iter().position(|entry| entry.id == id) {
            let entry = entries.remove(position);
            entry.active.store(false, Ordering::SeqCst);
        }
    }
}

/// Handle returned by [`SubscriberRegistry::subscribe`].
///
/// Owns nothing: dropping it leaves the handler registered. Call
/// [`unsubscribe`](Subscription::unsubscribe) (any number of times) to remove it.
#[derive(Clone)]
pub struct Subscription {
    id: SubscriptionId,
    handlers: Weak<Handlers>,
}

impl Subscription {
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Removes the handler from its registry. Idempotent.
    pub fn unsubscribe(&self) {
        if let Some(handlers) = self.handlers.upgrade() {
            handlers.remove(self.id);
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}

/// Fan-out dispatcher shared by every consumer of a client.
///
/// Cloning yields another handle to the same handler list.
#[derive(Clone, Default)]
pub struct SubscriberRegistry {
    handlers: Arc<Handlers>,
}

impl SubscriberRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of currently registered handlers.
    pub fn handler_count(&self) -> usize {
        self.handlers
            .entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Returns true if the subscription is still registered here.
    pub fn is_subscribed(&self, subscription: &Subscription) -> bool {
        self.handlers
            .entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .any(|entry| entry.id == subscription.id)
    }

    fn invoke(entry: &Entry, event: &DomainEvent) -> bool {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| entry.handler.handle(event)));
        match outcome {
            Ok(Ok(())) => true,
            Ok(Err(e)) => {
                warn!(
                    handler = entry.handler.name(),
                    subscription = %entry.id,
                    event_kind = %event.kind(),
                    error = %e,
                    "event handler failed"
                );
                false
            }
            Err(_) => {
                error!(
                    handler = entry.handler.name(),
                    subscription = %entry.id,
                    event_kind = %event.kind(),
                    "event handler panicked"
                );
                false
            }
        }
    }
}

impl EventSubscriber for SubscriberRegistry {
    type Subscription = Subscription;

    fn subscribe(&self, handler: Arc<dyn EventHandler>) -> Subscription {
        let id = SubscriptionId::from_raw(self.handlers.next_id.fetch_add(1, Ordering::SeqCst));
        let entry = Arc::new(Entry {
            id,
            handler,
            active: AtomicBool::new(true),
        });

        self.handlers
            .entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(entry);

        Subscription {
            id,
            handlers: Arc::downgrade(&self.handlers),
        }
    }

    fn unsubscribe(&self, subscription: &Subscription) {
        // Handles from another registry never match an id here.
        if Weak::ptr_eq(&subscription.handlers, &Arc::downgrade(&self.handlers)) {
            self.handlers.remove(subscription.id);
        }
    }
}

impl EventPublisher for SubscriberRegistry {
    fn publish(&self, event: &DomainEvent) -> usize {
        self.handlers
            .snapshot()
            .iter()
            .filter(|entry| entry.active.load(Ordering::SeqCst))
            .filter(|entry| Self::invoke(entry, event))
            .count()
    }
}

impl std::fmt::Debug for SubscriberRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriberRegistry")
            .field("handlers", &self.handler_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::EntityId;
    use crate::ports::{handler_fn, HandlerError};
    use serde_json::json;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Mutex;

    fn added() -> DomainEvent {
        DomainEvent::EntityAdded(json!({"id": "A1", "tag": "T-01"}))
    }

    fn counting(counter: &Arc<AtomicUsize>) -> Arc<dyn EventHandler> {
        let counter = counter.clone();
        handler_fn("counting", move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
    }

    #[test]
    fn publish_reaches_every_handler() {
        let registry = SubscriberRegistry::new();
        let counter = Arc::new(AtomicUsize::new(0));
        registry.subscribe(counting(&counter));
        registry.subscribe(counting(&counter));
        registry.subscribe(counting(&counter));

        assert_eq!(registry.publish(&added()), 3);
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn handlers_run_in_registration_order() {
        let registry = SubscriberRegistry::new();
        let order = Arc::new(Mutex::new(Vec::new()));

        for label in ["first", "second", "third"] {
            let order = order.clone();
            registry.subscribe(handler_fn("ordered", move |_| {
                order.lock().unwrap().push(label);
                Ok(())
            }));
        }

        registry.publish(&added());

        assert_eq!(*order.lock().unwrap(), vec!["first", "second", "third"]);
    }

    #[test]
    fn failing_handler_does_not_stop_the_others() {
        let registry = SubscriberRegistry::new();
        let first = Arc::new(AtomicUsize::new(0));
        let third = Arc::new(AtomicUsize::new(0));

        registry.subscribe(counting(&first));
        registry.subscribe(handler_fn("failing", |_| Err(HandlerError::new("boom"))));
        registry.subscribe(counting(&third));

        assert_eq!(registry.publish(&added()), 2);
        assert_eq!(first.load(Ordering::SeqCst), 1);
        assert_eq!(third.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn panicking_handler_does_not_stop_the_others() {
        let registry = SubscriberRegistry::new();
        let first = Arc::new(AtomicUsize::new(0));
        let third = Arc::new(AtomicUsize::new(0));

        registry.subscribe(counting(&first));
        registry.subscribe(handler_fn("panicking", |_| panic!("consumer bug")));
        registry.subscribe(counting(&third));

        assert_eq!(registry.publish(&added()), 2);
        assert_eq!(first.load(Ordering::SeqCst), 1);
        assert_eq!(third.load(Ordering::SeqCst), 1);

        // The registry stays usable afterwards.
        registry.publish(&added());
        assert_eq!(first.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn unsubscribe_twice_is_a_noop() {
        let registry = SubscriberRegistry::new();
        let counter = Arc::new(AtomicUsize::new(0));
        let subscription = registry.subscribe(counting(&counter));

        registry.unsubscribe(&subscription);
        registry.unsubscribe(&subscription);
        subscription.unsubscribe();

        registry.publish(&added());
        assert_eq!(counter.load(Ordering::SeqCst), 0);
        assert_eq!(registry.handler_count(), 0);
    }

    #[test]
    fn unsubscribe_only_removes_its_own_handler() {
        let registry = SubscriberRegistry::new();
        let kept = Arc::new(AtomicUsize::new(0));
        let removed = Arc::new(AtomicUsize::new(0));

        registry.subscribe(counting(&kept));
        let subscription = registry.subscribe(counting(&removed));
        registry.unsubscribe(&subscription);

        registry.publish(&added());

        assert_eq!(kept.load(Ordering::SeqCst), 1);
        assert_eq!(removed.load(Ordering::SeqCst), 0);
        assert!(!registry.is_subscribed(&subscription));
    }

    #[test]
    fn foreign_subscription_is_ignored() {
        let registry = SubscriberRegistry::new();
        let other = SubscriberRegistry::new();
        let counter = Arc::new(AtomicUsize::new(0));

        registry.subscribe(counting(&counter));
        let foreign = other.subscribe(counting(&counter));

        // Same raw id (0) in both registries.
        registry.unsubscribe(&foreign);

        assert_eq!(registry.handler_count(), 1);
        assert_eq!(other.handler_count(), 1);
    }

    #[test]
    fn handler_can_unsubscribe_itself_mid_publish() {
        let registry = SubscriberRegistry::new();
        let slot: Arc<Mutex<Option<Subscription>>> = Arc::new(Mutex::new(None));
        let self_calls = Arc::new(AtomicUsize::new(0));
        let after = Arc::new(AtomicUsize::new(0));

        let handler = {
            let slot = slot.clone();
            let self_calls = self_calls.clone();
            handler_fn("one-shot", move |_| {
                self_calls.fetch_add(1, Ordering::SeqCst);
                if let Some(subscription) = slot.lock().unwrap().as_ref() {
                    subscription.unsubscribe();
                }
                Ok(())
            })
        };
        *slot.lock().unwrap() = Some(registry.subscribe(handler));
        registry.subscribe(counting(&after));

        registry.publish(&added());
        registry.publish(&added());

        assert_eq!(self_calls.load(Ordering::SeqCst), 1);
        assert_eq!(after.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn handler_removed_by_earlier_handler_is_not_invoked() {
        let registry = SubscriberRegistry::new();
        let victim_slot: Arc<Mutex<Option<Subscription>>> = Arc::new(Mutex::new(None));
        let victim_calls = Arc::new(AtomicUsize::new(0));
        let last_calls = Arc::new(AtomicUsize::new(0));

        {
            let victim_slot = victim_slot.clone();
            registry.subscribe(handler_fn("remover", move |_| {
                if let Some(victim) = victim_slot.lock().unwrap().as_ref() {
                    victim.unsubscribe();
                }
                Ok(())
            }));
        }
        *victim_slot.lock().unwrap() = Some(registry.subscribe(counting(&victim_calls)));
        registry.subscribe(counting(&last_calls));

        registry.publish(&added());

        assert_eq!(victim_calls.load(Ordering::SeqCst), 0);
        assert_eq!(last_calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn handler_subscribed_mid_publish_starts_with_next_event() {
        let registry = SubscriberRegistry::new();
        let late_calls = Arc::new(AtomicUsize::new(0));

        {
            let registry_handle = registry.clone();
            let late_calls = late_calls.clone();
            let done = AtomicBool::new(false);
            registry.subscribe(handler_fn("spawner", move |_| {
                if !done.swap(true, Ordering::SeqCst) {
                    registry_handle.subscribe(counting(&late_calls));
                }
                Ok(())
            }));
        }

        registry.publish(&added());
        assert_eq!(late_calls.load(Ordering::SeqCst), 0);

        registry.publish(&DomainEvent::EntityDeleted(EntityId::from("A1")));
        assert_eq!(late_calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn subscription_outliving_registry_unsubscribes_quietly() {
        let registry = SubscriberRegistry::new();
        let counter = Arc::new(AtomicUsize::new(0));
        let subscription = registry.subscribe(counting(&counter));

        drop(registry);

        subscription.unsubscribe();
    }
}
