//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the sync core and the outside world. Adapters implement these ports.
//!
//! ## Event Ports
//!
//! - `EventPublisher` - Delivers decoded events to in-process consumers
//! - `EventSubscriber` - Registers and removes consumer handlers
//! - `EventHandler` - Handler that processes incoming events
//!
//! ## Connection Ports
//!
//! - `Transport` - Opens one persistent connection to the event server

mod event_publisher;
mod event_subscriber;
mod transport;

pub use event_publisher::EventPublisher;
pub use event_subscriber::{handler_fn, EventHandler, EventSubscriber, FnHandler, HandlerError};
pub use transport::{LinkSender, Transport, TransportError, TransportEvent, TransportLink};
