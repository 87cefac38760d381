//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the sync core to external systems:
//! - `websocket` - Wire codec and the WebSocket transport
//! - `events` - In-process subscriber registry
//! - `mock` - Scripted transport for tests and demos

pub mod events;
pub mod mock;
pub mod websocket;

pub use events::{SubscriberRegistry, Subscription};
pub use mock::{ConnectOutcome, MockPeer, MockTransport};
pub use websocket::WebSocketTransport;
