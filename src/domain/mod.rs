//! Domain layer: the events being synchronized and the connection lifecycle.
//!
//! # Module Organization
//!
//! - `events` - Closed set of domain events and their payload types
//! - `connection` - Connection state machine values and retry policy
//! - `ids` - Client and subscription identifiers

pub mod connection;
pub mod events;
pub mod ids;

pub use connection::{ConnectionState, RetryPolicy};
pub use events::{BatchUpdate, DomainEvent, EntityId, EventKind};
pub use ids::{ClientId, SubscriptionId};
