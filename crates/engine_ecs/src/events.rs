//! Lifecycle notifications published on [`World::events`](crate::World::events).

use engine_component::EntityId;
use serde::Serialize;

use crate::system::SystemId;

pub const ENTITY_CREATED: &str = "entity_created";
pub const ENTITY_REMOVED: &str = "entity_removed";
pub const SYSTEM_ADDED: &str = "system_added";
pub const SYSTEM_REMOVED: &str = "system_removed";

/// Payload of the world's event bus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum WorldEvent {
    /// Emitted by `create_entity`, even when the entity only joins the
    /// world at the end of the current tick.
    EntityCreated { entity: EntityId, name: String },
    /// Emitted once the entity has been torn down.
    EntityRemoved { entity: EntityId },
    SystemAdded { system: SystemId, name: String },
    SystemRemoved { system: SystemId, name: String },
}

impl WorldEvent {
    /// The bus channel this event is emitted on.
    #[must_use]
    pub fn event_name(&self) -> &'static str {
        match self {
            Self::EntityCreated { .. } => ENTITY_CREATED,
            Self::EntityRemoved { .. } => ENTITY_REMOVED,
            Self::SystemAdded { .. } => SYSTEM_ADDED,
            Self::SystemRemoved { .. } => SYSTEM_REMOVED,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_names_match_channels() {
        let event = WorldEvent::EntityRemoved {
            entity: EntityId(3),
        };
        assert_eq!(event.event_name(), ENTITY_REMOVED);

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "entity_removed");
        assert_eq!(json["entity"], 3);
    }
}
