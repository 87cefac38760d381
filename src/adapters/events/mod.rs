//! Event delivery adapters.
//!
//! - `SubscriberRegistry` - Synchronous, in-process fan-out to registered handlers

mod registry;

pub use registry::{SubscriberRegistry, Subscription};
