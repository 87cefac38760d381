//! Domain events propagated from the server to connected dashboards.
//!
//! Each event describes one server-side mutation of the livestock
//! collection. The set of kinds is closed: adding a kind is a compile-time
//! change everywhere events are matched.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Discriminant of a [`DomainEvent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// A new entity was created.
    EntityAdded,
    /// An existing entity was modified.
    EntityUpdated,
    /// An entity was removed.
    EntityDeleted,
    /// A partial patch was applied to several entities at once.
    BatchUpdated,
    /// The whole collection was replaced.
    SnapshotReplaced,
}

impl EventKind {
    /// All kinds, in declaration order.
    pub const ALL: [EventKind; 5] = [
        EventKind::EntityAdded,
        EventKind::EntityUpdated,
        EventKind::EntityDeleted,
        EventKind::BatchUpdated,
        EventKind::SnapshotReplaced,
    ];

    /// The `type` string used on the wire.
    pub fn wire_name(&self) -> &'static str {
        match self {
            EventKind::EntityAdded => "ANIMAL_ADDED",
            EventKind::EntityUpdated => "ANIMAL_UPDATED",
            EventKind::EntityDeleted => "ANIMAL_DELETED",
            EventKind::BatchUpdated => "BATCH_UPDATED",
            EventKind::SnapshotReplaced => "DATA_UPDATED",
        }
    }

    /// Resolves a wire `type` string, returning `None` for unknown types.
    pub fn from_wire_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.wire_name() == name)
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_name())
    }
}

/// Identifier of a livestock entity as assigned by the server.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct EntityId(String);

impl EntityId {
    /// Creates an id from any string-like value.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EntityId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

// Deletions arrive either as a bare id or as `{ "id": ... }`.
impl<'de> Deserialize<'de> for EntityId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Bare(String),
            Object { id: String },
        }

        Ok(match Repr::deserialize(deserializer)? {
            Repr::Bare(id) | Repr::Object { id } => EntityId(id),
        })
    }
}

/// Partial patch applied to a set of entities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchUpdate {
    /// Entities the patch applies to.
    pub ids: Vec<EntityId>,
    /// Fields to overwrite on each entity.
    #[serde(default)]
    pub updates: serde_json::Map<String, Value>,
}

/// A typed notification that some entity was created, changed, removed, or
/// batch-modified.
///
/// Entities are kept as JSON objects: the sync layer forwards them to
/// consumers without interpreting their fields.
#[derive(Debug, Clone, PartialEq)]
pub enum DomainEvent {
    EntityAdded(Value),
    EntityUpdated(Value),
    EntityDeleted(EntityId),
    BatchUpdated(BatchUpdate),
    SnapshotReplaced(Vec<Value>),
}

impl DomainEvent {
    /// Returns the kind of this event.
    pub fn kind(&self) -> EventKind {
        match self {
            DomainEvent::EntityAdded(_) => EventKind::EntityAdded,
            DomainEvent::EntityUpdated(_) => EventKind::EntityUpdated,
            DomainEvent::EntityDeleted(_) => EventKind::EntityDeleted,
            DomainEvent::BatchUpdated(_) => EventKind::BatchUpdated,
            DomainEvent::SnapshotReplaced(_) => EventKind::SnapshotReplaced,
        }
    }

    /// Returns the payload as a JSON value, as it appears in the wire `data` field.
    pub fn payload(&self) -> Value {
        match self {
            DomainEvent::EntityAdded(entity) | DomainEvent::EntityUpdated(entity) => entity.clone(),
            DomainEvent::EntityDeleted(id) => Value::String(id.as_str().to_string()),
            DomainEvent::BatchUpdated(batch) => serde_json::json!({
                "ids": batch.ids.iter().map(EntityId::as_str).collect::<Vec<_>>(),
                "updates": batch.updates,
            }),
            DomainEvent::SnapshotReplaced(entities) => Value::Array(entities.clone()),
        }
    }
}
