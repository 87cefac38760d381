//! Livestock Sync - Real-time event synchronization client
//!
//! This crate keeps a farm-management dashboard in step with the server by
//! holding one reconnecting WebSocket connection, decoding livestock domain
//! events and fanning them out to in-process subscribers.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;

pub use application::{Binding, ClientError, EventCallbacks, SyncClient};
pub use domain::{BatchUpdate, ConnectionState, DomainEvent, EntityId, EventKind};
