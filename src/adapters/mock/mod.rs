//! Mock adapters for testing without a live event server.

mod transport;

pub use transport::{ConnectOutcome, MockPeer, MockTransport};
