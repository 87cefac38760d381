//! EventPublisher port - Interface for delivering decoded events to consumers.
//!
//! The connection task publishes every successfully decoded event through
//! this port; it does not know who is listening.

use crate::domain::DomainEvent;

/// Port for publishing domain events to in-process consumers.
///
/// Implementations must ensure:
/// - Every currently-registered handler is invoked, in registration order
/// - A failing handler does not prevent delivery to the others
/// - Publishing never fails from the caller's point of view
pub trait EventPublisher: Send + Sync {
    /// Deliver one event, returning how many handlers completed successfully.
    fn publish(&self, event: &DomainEvent) -> usize;
}

#[cfg(test)]
mod tests {
    use super::*;

    // Compile-time check that trait is object-safe
    #[allow(dead_code)]
    fn assert_object_safe(_: &dyn EventPublisher) {}

    #[allow(dead_code)]
    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn event_publisher_is_send_sync() {
        fn check<T: EventPublisher>() {
            assert_send_sync::<T>();
        }
    }
}
