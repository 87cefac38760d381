//! WebSocket adapters for the event-sync connection.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────┐        JSON text frames        ┌──────────────┐
//! │ WebSocketTransport (pump)    │ ◀────────────────────────────▶ │ Event server │
//! └──────────────────────────────┘                                └──────────────┘
//!          │ TransportEvent::Message(bytes)
//!          ▼
//! ┌──────────────────────────────┐
//! │ messages::decode             │  → DomainEvent | Pong | DecodeError
//! └──────────────────────────────┘
//! ```
//!
//! # Components
//!
//! - [`messages`] - Wire codec for event and keepalive frames
//! - [`transport`] - `tokio-tungstenite` implementation of the `Transport` port

pub mod messages;
pub mod transport;

pub use messages::{decode, encode, encode_ping, DecodeError, Inbound, PING_TYPE, PONG_TYPE};
pub use transport::WebSocketTransport;
