//! Application layer - Connection lifecycle and consumer bindings.
//!
//! This layer drives the ports: the reconnection controller owns the
//! transport link, and the client exposes it to consumers through
//! subscriptions and typed bindings.

mod bindings;
mod client;
mod controller;
mod liveness;

pub use bindings::{Binding, EventCallbacks};
pub use client::{ClientError, SyncClient};
pub use liveness::{send_probe, LivenessMonitor};
