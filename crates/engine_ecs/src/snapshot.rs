//! Entity and world snapshots.
//!
//! Component data goes through the world's
//! [`ComponentRegistry`](engine_component::ComponentRegistry): registered
//! types are captured as JSON values, unregistered ones are skipped. A
//! [`WorldSnapshot`] can then be encoded as JSON or MessagePack.
//!
//! Restoring always creates new entities with fresh ids; the id stored in a
//! snapshot is informational.

use engine_component::EntityId;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use crate::error::EcsError;
use crate::world::World;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentSnapshot {
    pub type_name: String,
    pub enabled: bool,
    pub data: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntitySnapshot {
    pub id: EntityId,
    pub name: String,
    pub active: bool,
    pub components: Vec<ComponentSnapshot>,
}

/// Every stored entity, ascending by id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorldSnapshot {
    pub tick: u64,
    pub entities: Vec<EntitySnapshot>,
}

impl WorldSnapshot {
    /// # Errors
    ///
    /// [`EcsError::Json`] if a component value cannot be encoded.
    pub fn to_json(&self) -> Result<String, EcsError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// # Errors
    ///
    /// [`EcsError::Json`] on malformed input.
    pub fn from_json(input: &str) -> Result<Self, EcsError> {
        Ok(serde_json::from_str(input)?)
    }

    /// Encode as MessagePack with named fields.
    ///
    /// # Errors
    ///
    /// [`EcsError::Encode`] if encoding fails.
    pub fn to_msgpack(&self) -> Result<Vec<u8>, EcsError> {
        Ok(rmp_serde::to_vec_named(self)?)
    }

    /// # Errors
    ///
    /// [`EcsError::Decode`] on malformed input.
    pub fn from_msgpack(bytes: &[u8]) -> Result<Self, EcsError> {
        Ok(rmp_serde::from_slice(bytes)?)
    }
}

impl World {
    /// Capture an entity's name, active flag, and registered components.
    ///
    /// # Errors
    ///
    /// [`EcsError::EntityNotFound`], or [`EcsError::Registry`] if a
    /// registered component fails to serialise.
    pub fn snapshot_entity(&self, id: EntityId) -> Result<EntitySnapshot, EcsError> {
        let entity = self.get_entity(id).ok_or(EcsError::EntityNotFound(id))?;

        let mut components = Vec::with_capacity(entity.component_count());
        for attached in entity.components() {
            match self.registry().serialize(attached.data())? {
                Some(data) => components.push(ComponentSnapshot {
                    type_name: attached.type_name().to_string(),
                    enabled: attached.is_enabled(),
                    data,
                }),
                None => debug!(
                    entity = %id,
                    component = attached.type_name(),
                    "component type not registered, skipped in snapshot"
                ),
            }
        }

        Ok(EntitySnapshot {
            id,
            name: entity.name().to_string(),
            active: entity.is_active(),
            components,
        })
    }

    /// Create a new entity from `snapshot` and return its id.
    ///
    /// Every component is decoded before the entity is created, so a failure
    /// leaves the world untouched.
    ///
    /// # Errors
    ///
    /// [`EcsError::Registry`] for an unregistered type name or data that does
    /// not decode.
    pub fn restore_entity(&mut self, snapshot: &EntitySnapshot) -> Result<EntityId, EcsError> {
        let decoded = snapshot
            .components
            .iter()
            .map(|c| {
                self.registry()
                    .deserialize(&c.type_name, c.data.clone())
                    .map(|data| (data, c.enabled))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let entity = self.create_named_entity(snapshot.name.clone());
        entity.set_active(snapshot.active);
        for (data, enabled) in decoded {
            let id = entity.add_boxed(data);
            if !enabled && let Some(attached) = entity.component_mut(id) {
                attached.set_enabled(false);
            }
        }
        Ok(entity.id())
    }

    /// Capture every stored entity, including ones created earlier in the
    /// current tick.
    ///
    /// # Errors
    ///
    /// See [`World::snapshot_entity`].
    pub fn snapshot(&self) -> Result<WorldSnapshot, EcsError> {
        let entities = self
            .entities()
            .chain(self.pending_entities())
            .map(|e| self.snapshot_entity(e.id()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(WorldSnapshot {
            tick: self.tick(),
            entities,
        })
    }

    /// Restore every entity in `snapshot`, returning the new ids in order.
    ///
    /// # Errors
    ///
    /// See [`World::restore_entity`]. Entities restored before the failing
    /// one are kept.
    pub fn restore(&mut self, snapshot: &WorldSnapshot) -> Result<Vec<EntityId>, EcsError> {
        let ids = snapshot
            .entities
            .iter()
            .map(|e| self.restore_entity(e))
            .collect::<Result<Vec<_>, _>>()?;
        info!(entities = ids.len(), from_tick = snapshot.tick, "world restored");
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use engine_component::{Component, ComponentRegistry, RegistryError};

    use super::*;
    use crate::system::{FnSystem, SystemContext};

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Health {
        current: i32,
        max: i32,
    }

    impl Component for Health {
        fn type_name() -> &'static str {
            "Health"
        }
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Tag(String);

    impl Component for Tag {
        fn type_name() -> &'static str {
            "Tag"
        }
    }

    /// Not registered: skipped by snapshots.
    struct Scratch;

    impl Component for Scratch {
        fn type_name() -> &'static str {
            "Scratch"
        }
    }

    fn world() -> World {
        let mut registry = ComponentRegistry::new();
        registry.register::<Health>().register::<Tag>();
        World::with_registry(registry)
    }

    fn populate(world: &mut World) -> EntityId {
        let e = world.create_named_entity("orc");
        e.add_component(Health { current: 3, max: 10 });
        let tag = e.add_component(Tag("boss".into()));
        e.add_component(Tag("green".into()));
        e.add_component(Scratch);
        e.component_mut(tag).unwrap().set_enabled(false);
        e.id()
    }

    #[test]
    fn test_snapshot_skips_unregistered() {
        let mut world = world();
        let id = populate(&mut world);
        let snap = world.snapshot_entity(id).unwrap();

        assert_eq!(snap.name, "orc");
        let names: Vec<&str> = snap.components.iter().map(|c| c.type_name.as_str()).collect();
        assert_eq!(names, vec!["Health", "Tag", "Tag"]);
        assert!(!snap.components[1].enabled);
        assert_eq!(snap.components[0].data["current"], 3);
    }

    #[test]
    fn test_restore_creates_equivalent_entity() {
        let mut world = world();
        let id = populate(&mut world);
        let snap = world.snapshot_entity(id).unwrap();

        let restored = world.restore_entity(&snap).unwrap();
        assert_ne!(restored, id);

        let entity = world.get_entity(restored).unwrap();
        assert_eq!(entity.name(), "orc");
        assert_eq!(
            entity.get_component::<Health>(),
            Some(&Health { current: 3, max: 10 })
        );
        let tags: Vec<&str> = entity.get_components::<Tag>().map(|t| t.0.as_str()).collect();
        assert_eq!(tags, vec!["boss", "green"]);
        assert!(!entity.has_component::<Scratch>());
        assert!(!entity.components().nth(1).unwrap().is_enabled());
    }

    #[test]
    fn test_restore_unknown_type_leaves_world_untouched() {
        let mut world = world();
        let snap = EntitySnapshot {
            id: EntityId(7),
            name: "ghost".into(),
            active: true,
            components: vec![ComponentSnapshot {
                type_name: "Ghost".into(),
                enabled: true,
                data: Value::Null,
            }],
        };
        let err = world.restore_entity(&snap).unwrap_err();
        assert!(matches!(err, EcsError::Registry(RegistryError::UnknownType(_))));
        assert_eq!(world.stats().entities, 0);
    }

    #[test]
    fn test_world_snapshot_through_both_encodings() {
        let mut source = world();
        populate(&mut source);
        source.create_named_entity("empty").set_active(false);
        let snap = source.snapshot().unwrap();
        assert_eq!(snap.entities.len(), 2);

        let json = WorldSnapshot::from_json(&snap.to_json().unwrap()).unwrap();
        assert_eq!(json, snap);
        let packed = WorldSnapshot::from_msgpack(&snap.to_msgpack().unwrap()).unwrap();
        assert_eq!(packed.entities.len(), 2);

        let mut target = world();
        let ids = target.restore(&packed).unwrap();
        assert_eq!(ids.len(), 2);
        assert!(!target.get_entity(ids[1]).unwrap().is_active());
        assert_eq!(
            target.require_component::<Health>(ids[0]).unwrap().max,
            10
        );
    }

    #[test]
    fn test_snapshot_inside_tick_includes_new_entities() {
        let mut world = world();
        populate(&mut world);
        let captured = Rc::new(RefCell::new(None));

        let sink = captured.clone();
        world.add_system(FnSystem::new("capture", move |ctx: &mut SystemContext<'_>| {
            ctx.world
                .create_named_entity("spawned")
                .add_component(Health { current: 1, max: 1 });
            *sink.borrow_mut() = Some(ctx.world.snapshot()?);
            Ok(())
        }));
        world.update(0.1).unwrap();

        let snap = captured.borrow_mut().take().unwrap();
        let names: Vec<&str> = snap.entities.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["orc", "spawned"]);
        assert_eq!(snap.entities[1].components[0].data["max"], 1);
    }

    #[test]
    fn test_snapshot_missing_entity() {
        let world = world();
        assert!(matches!(
            world.snapshot_entity(EntityId(1)),
            Err(EcsError::EntityNotFound(_))
        ));
    }
}
