//! Identifier value objects for clients and subscriptions.

use std::fmt;

use uuid::Uuid;

/// Unique identifier of a sync client instance.
///
/// Attached to every log line emitted by the client so that several
/// clients in one process can be told apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClientId(Uuid);

impl ClientId {
    /// Create a new random client ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ClientId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Registry-local identifier of a subscription, assigned in registration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    pub(crate) fn from_raw(raw: u64) -> Self {
        Self(raw)
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_ids_are_unique() {
        assert_ne!(ClientId::new(), ClientId::new());
    }

    #[test]
    fn client_id_displays_as_uuid() {
        assert_eq!(ClientId::new().to_string().len(), 36);
    }

    #[test]
    fn subscription_id_orders_by_registration() {
        assert!(SubscriptionId::from_raw(1) < SubscriptionId::from_raw(2));
        assert_eq!(SubscriptionId::from_raw(7).to_string(), "sub-7");
    }
}
