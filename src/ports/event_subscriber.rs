//! EventSubscriber port - Interface for subscribing to domain events.
//!
//! This port defines how consumers register interest in domain events
//! without knowing which connection the events arrive on.

use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::domain::DomainEvent;

/// Failure reported by a consumer's handler.
///
/// The registry logs it and moves on to the next handler; it never reaches
/// the connection.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct HandlerError {
    message: String,
}

impl HandlerError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Handler for processing domain events.
///
/// Implementations should be:
/// - **Quick** - Handlers run on the connection task; slow work delays later events
/// - **Isolated** - Errors and panics are contained to the failing handler
///
/// # Example
///
/// ```ignore
/// struct HerdCounter(AtomicUsize);
///
/// impl EventHandler for HerdCounter {
///     fn handle(&self, event: &DomainEvent) -> Result<(), HandlerError> {
///         if let DomainEvent::EntityAdded(_) = event {
///             self.0.fetch_add(1, Ordering::SeqCst);
///         }
///         Ok(())
///     }
///
///     fn name(&self) -> &'static str {
///         "HerdCounter"
///     }
/// }
/// ```
pub trait EventHandler: Send + Sync {
    /// Process an event.
    fn handle(&self, event: &DomainEvent) -> Result<(), HandlerError>;

    /// Handler name for logging.
    fn name(&self) -> &'static str;
}

/// Adapts a closure into an [`EventHandler`].
pub struct FnHandler<F> {
    name: &'static str,
    f: F,
}

impl<F> FnHandler<F>
where
    F: Fn(&DomainEvent) -> Result<(), HandlerError> + Send + Sync,
{
    pub fn new(name: &'static str, f: F) -> Self {
        Self { name, f }
    }
}

impl<F> EventHandler for FnHandler<F>
where
    F: Fn(&DomainEvent) -> Result<(), HandlerError> + Send + Sync,
{
    fn handle(&self, event: &DomainEvent) -> Result<(), HandlerError> {
        (self.f)(event)
    }

    fn name(&self) -> &'static str {
        self.name
    }
}

impl<F> fmt::Debug for FnHandler<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnHandler").field("name", &self.name).finish()
    }
}

/// Wraps a closure as a shared handler.
pub fn handler_fn<F>(name: &'static str, f: F) -> Arc<dyn EventHandler>
where
    F: Fn(&DomainEvent) -> Result<(), HandlerError> + Send + Sync + 'static,
{
    Arc::new(FnHandler::new(name, f))
}

/// Port for registering and removing event handlers.
///
/// Every registered handler receives every published event. The returned
/// handle is the only way to remove a handler.
pub trait EventSubscriber: Send + Sync {
    /// Handle type returned by `subscribe`.
    type Subscription;

    /// Register a handler; it receives all events published from now on.
    fn subscribe(&self, handler: Arc<dyn EventHandler>) -> Self::Subscription;

    /// Remove a handler. Unsubscribing an already-removed handle is a no-op.
    fn unsubscribe(&self, subscription: &Self::Subscription);
}
