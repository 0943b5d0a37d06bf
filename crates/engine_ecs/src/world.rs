//! The [`World`]: entity storage, system scheduling, and the tick loop.
//!
//! ## Tick sequence
//!
//! ```text
//! update(dt)
//!   tick += 1
//!   for each system in (priority, insertion) order:
//!     skip if disabled or removed this tick
//!     system.update(ctx)            error -> log, stop running systems
//!   flush: removed systems torn down, added systems scheduled
//!   flush: created entities joined, removed entities torn down
//! ```
//!
//! While a tick is in progress, structural changes are queued instead of
//! applied:
//!
//! - `create_entity` returns the new entity at once (reachable through
//!   `get_entity`), but queries only see it after the flush.
//! - `remove_entity` deactivates at once, so queries skip the entity for the
//!   rest of the tick; teardown happens at the flush.
//! - `add_system` calls `on_init` at once; the system first runs next tick.
//! - `remove_system` stops the system from running for the rest of the tick;
//!   `on_destroy` runs at the flush.

use std::collections::BTreeMap;

use engine_component::{
    Component, ComponentIdAllocator, ComponentRegistry, ComponentTypeId, EntityAllocator,
    EntityId, Query,
};
use engine_events::EventBus;
use serde::Serialize;
use tracing::{debug, error, info, trace, warn};

use crate::entity::Entity;
use crate::error::EcsError;
use crate::events::WorldEvent;
use crate::system::{System, SystemContext, SystemId};

struct SystemEntry {
    id: SystemId,
    name: String,
    priority: i32,
    enabled: bool,
    removed: bool,
    query: Query,
    // `None` only while the system's own `update` is running.
    system: Option<Box<dyn System>>,
}

/// Counts reported by [`World::stats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct WorldStats {
    /// Entities currently stored, including inactive ones and ones queued
    /// for removal.
    pub entities: usize,
    pub active_entities: usize,
    pub systems: usize,
}

/// Container of entities and systems.
pub struct World {
    entities: BTreeMap<EntityId, Entity>,
    pending_add: BTreeMap<EntityId, Entity>,
    pending_remove: Vec<EntityId>,
    systems: Vec<SystemEntry>,
    pending_systems: Vec<SystemEntry>,
    entity_ids: EntityAllocator,
    component_ids: ComponentIdAllocator,
    next_system_id: u64,
    updating: bool,
    destroy_requested: bool,
    tick: u64,
    registry: ComponentRegistry,
    events: EventBus<WorldEvent>,
}

impl World {
    #[must_use]
    pub fn new() -> Self {
        Self::with_registry(ComponentRegistry::new())
    }

    /// Create a world whose snapshots use `registry`.
    #[must_use]
    pub fn with_registry(registry: ComponentRegistry) -> Self {
        Self {
            entities: BTreeMap::new(),
            pending_add: BTreeMap::new(),
            pending_remove: Vec::new(),
            systems: Vec::new(),
            pending_systems: Vec::new(),
            entity_ids: EntityAllocator::new(),
            component_ids: ComponentIdAllocator::new(),
            next_system_id: 1,
            updating: false,
            destroy_requested: false,
            tick: 0,
            registry,
            events: EventBus::new(),
        }
    }

    #[must_use]
    pub fn registry(&self) -> &ComponentRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut ComponentRegistry {
        &mut self.registry
    }

    /// Lifecycle notifications. See [`crate::events`] for channel names.
    #[must_use]
    pub fn events(&self) -> &EventBus<WorldEvent> {
        &self.events
    }

    /// Number of ticks run so far.
    #[must_use]
    pub fn tick(&self) -> u64 {
        self.tick
    }

    /// Returns `true` while [`World::update`] is running systems.
    #[must_use]
    pub fn is_updating(&self) -> bool {
        self.updating
    }

    // ── Entities ───────────────────────────────────────────────────

    /// Create an unnamed entity.
    pub fn create_entity(&mut self) -> &mut Entity {
        self.create_named_entity(String::new())
    }

    /// Create an entity. Ids are strictly increasing and never reused.
    pub fn create_named_entity(&mut self, name: impl Into<String>) -> &mut Entity {
        let id = self.entity_ids.allocate();
        let name = name.into();
        trace!(entity = %id, name = %name, deferred = self.updating, "entity created");
        self.notify(WorldEvent::EntityCreated {
            entity: id,
            name: name.clone(),
        });

        let entity = Entity::new(id, name, self.component_ids.clone());
        let target = if self.updating {
            &mut self.pending_add
        } else {
            &mut self.entities
        };
        target.entry(id).or_insert(entity)
    }

    /// Remove an entity and tear down its components.
    ///
    /// During a tick the entity is deactivated immediately and torn down at
    /// the end of the tick. Returns `false` if the id is unknown or already
    /// queued for removal.
    pub fn remove_entity(&mut self, id: EntityId) -> bool {
        if self.pending_remove.contains(&id) {
            return false;
        }
        let Some(entity) = self.get_entity_mut(id) else {
            return false;
        };
        entity.set_active(false);

        if self.updating {
            trace!(entity = %id, "entity removal deferred");
            self.pending_remove.push(id);
            true
        } else {
            self.destroy_entity(id)
        }
    }

    fn destroy_entity(&mut self, id: EntityId) -> bool {
        let entity = self
            .entities
            .remove(&id)
            .or_else(|| self.pending_add.remove(&id));
        let Some(mut entity) = entity else {
            return false;
        };
        entity.teardown();
        trace!(entity = %id, "entity removed");
        self.notify(WorldEvent::EntityRemoved { entity: id });
        true
    }

    /// Look up an entity, including one created during the current tick.
    #[must_use]
    pub fn get_entity(&self, id: EntityId) -> Option<&Entity> {
        self.entities
            .get(&id)
            .or_else(|| self.pending_add.get(&id))
    }

    pub fn get_entity_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        match self.entities.get_mut(&id) {
            Some(entity) => Some(entity),
            None => self.pending_add.get_mut(&id),
        }
    }

    #[must_use]
    pub fn has_entity(&self, id: EntityId) -> bool {
        self.get_entity(id).is_some()
    }

    /// Active entities carrying every type in `types`, ascending by id.
    #[must_use]
    pub fn get_entities_with_components(&self, types: &[ComponentTypeId]) -> Vec<EntityId> {
        self.query(&Query::all_of(types))
    }

    /// Active entities matching `query`, ascending by id.
    #[must_use]
    pub fn query(&self, query: &Query) -> Vec<EntityId> {
        self.entities
            .values()
            .filter(|e| self.is_live(e) && query.matches(e.store()))
            .map(Entity::id)
            .collect()
    }

    /// Active and not queued for removal.
    fn is_live(&self, entity: &Entity) -> bool {
        entity.is_active() && !self.pending_remove.contains(&entity.id())
    }

    /// Toggle an entity's active flag.
    ///
    /// An entity queued for removal stays inactive. Returns `false` if the id
    /// is unknown or the entity is being removed.
    pub fn set_entity_active(&mut self, id: EntityId, active: bool) -> bool {
        if active && self.pending_remove.contains(&id) {
            warn!(entity = %id, "entity is queued for removal, not reactivating");
            return false;
        }
        let Some(entity) = self.get_entity_mut(id) else {
            return false;
        };
        entity.set_active(active);
        true
    }

    /// Every stored entity (active or not), ascending by id.
    pub fn entities(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values()
    }

    /// Entities created during the current tick, not yet flushed.
    pub(crate) fn pending_entities(&self) -> impl Iterator<Item = &Entity> {
        self.pending_add.values()
    }

    // ── Typed component access ─────────────────────────────────────

    /// The first component of type `T` on entity `id`.
    #[must_use]
    pub fn get_component<T: Component>(&self, id: EntityId) -> Option<&T> {
        self.get_entity(id)?.get_component::<T>()
    }

    pub fn get_component_mut<T: Component>(&mut self, id: EntityId) -> Option<&mut T> {
        self.get_entity_mut(id)?.get_component_mut::<T>()
    }

    /// Like [`World::get_component`], reporting why the lookup failed.
    ///
    /// # Errors
    ///
    /// [`EcsError::EntityNotFound`] or [`EcsError::ComponentMissing`].
    pub fn require_component<T: Component>(&self, id: EntityId) -> Result<&T, EcsError> {
        let entity = self.get_entity(id).ok_or(EcsError::EntityNotFound(id))?;
        entity
            .get_component::<T>()
            .ok_or(EcsError::ComponentMissing {
                entity: id,
                component: T::type_name(),
            })
    }

    /// Apply `f` to the first component of type `T` on entity `id`.
    ///
    /// # Errors
    ///
    /// [`EcsError::EntityNotFound`] or [`EcsError::ComponentMissing`].
    pub fn update_component<T: Component, R>(
        &mut self,
        id: EntityId,
        f: impl FnOnce(&mut T) -> R,
    ) -> Result<R, EcsError> {
        let entity = self
            .get_entity_mut(id)
            .ok_or(EcsError::EntityNotFound(id))?;
        let component = entity
            .get_component_mut::<T>()
            .ok_or(EcsError::ComponentMissing {
                entity: id,
                component: T::type_name(),
            })?;
        Ok(f(component))
    }

    // ── Systems ────────────────────────────────────────────────────

    /// Register a system. `on_init` runs before this returns.
    pub fn add_system(&mut self, system: impl System + 'static) -> SystemId {
        self.add_boxed_system(Box::new(system))
    }

    pub fn add_boxed_system(&mut self, mut system: Box<dyn System>) -> SystemId {
        let id = SystemId(self.next_system_id);
        self.next_system_id += 1;

        system.on_init(self);

        let name = system.name().to_string();
        let entry = SystemEntry {
            id,
            name: name.clone(),
            priority: system.priority(),
            enabled: true,
            removed: false,
            query: Query::all_of(&system.required_components()),
            system: Some(system),
        };
        debug!(system = %name, %id, priority = entry.priority, deferred = self.updating, "system added");

        if self.updating {
            self.pending_systems.push(entry);
        } else {
            schedule(&mut self.systems, entry);
        }
        self.notify(WorldEvent::SystemAdded { system: id, name });
        id
    }

    /// Unregister a system and run its `on_destroy`.
    ///
    /// During a tick the system is skipped for the rest of the tick and torn
    /// down at the end of it. Returns `false` if the id is unknown.
    pub fn remove_system(&mut self, id: SystemId) -> bool {
        if let Some(pos) = self.pending_systems.iter().position(|e| e.id == id) {
            let entry = self.pending_systems.remove(pos);
            self.teardown_system(entry);
            return true;
        }
        let Some(pos) = self
            .systems
            .iter()
            .position(|e| e.id == id && !e.removed)
        else {
            return false;
        };

        if self.updating {
            self.systems[pos].removed = true;
        } else {
            let entry = self.systems.remove(pos);
            self.teardown_system(entry);
        }
        true
    }

    fn teardown_system(&mut self, entry: SystemEntry) {
        if let Some(mut system) = entry.system {
            system.on_destroy(self);
        }
        debug!(system = %entry.name, id = %entry.id, "system removed");
        self.notify(WorldEvent::SystemRemoved {
            system: entry.id,
            name: entry.name,
        });
    }

    /// Enable or disable a system. Disabled systems stay registered but are
    /// not run. Returns `false` if the id is unknown.
    pub fn set_system_enabled(&mut self, id: SystemId, enabled: bool) -> bool {
        match self.system_entry_mut(id) {
            Some(entry) => {
                entry.enabled = enabled;
                true
            }
            None => false,
        }
    }

    #[must_use]
    pub fn is_system_enabled(&self, id: SystemId) -> Option<bool> {
        self.systems
            .iter()
            .chain(&self.pending_systems)
            .find(|e| e.id == id && !e.removed)
            .map(|e| e.enabled)
    }

    fn system_entry_mut(&mut self, id: SystemId) -> Option<&mut SystemEntry> {
        self.systems
            .iter_mut()
            .chain(&mut self.pending_systems)
            .find(|e| e.id == id && !e.removed)
    }

    /// Names of scheduled systems in run order. Systems added during the
    /// current tick are not listed until it ends.
    #[must_use]
    pub fn system_names(&self) -> Vec<&str> {
        self.systems
            .iter()
            .filter(|e| !e.removed)
            .map(|e| e.name.as_str())
            .collect()
    }

    // ── Tick ───────────────────────────────────────────────────────

    /// Run one tick: every enabled system in order, then apply deferred
    /// changes.
    ///
    /// A reentrant call (from inside a system) is ignored with a warning.
    ///
    /// # Errors
    ///
    /// The first error returned by a system. Systems after it are skipped
    /// for this tick; deferred changes are still applied.
    pub fn update(&mut self, dt: f32) -> Result<(), EcsError> {
        if self.updating {
            warn!(tick = self.tick, "World::update called during a tick, ignoring");
            return Ok(());
        }
        self.updating = true;
        self.tick += 1;
        let tick = self.tick;
        trace!(tick, dt, systems = self.systems.len(), "tick start");

        let mut outcome = Ok(());
        for index in 0..self.systems.len() {
            let Some(entry) = self.systems.get_mut(index) else {
                break;
            };
            if !entry.enabled || entry.removed {
                continue;
            }
            let Some(mut system) = entry.system.take() else {
                continue;
            };
            let query = entry.query.clone();

            let result = {
                let mut ctx = SystemContext::new(self, dt, tick, &query);
                system.update(&mut ctx)
            };
            if let Some(entry) = self.systems.get_mut(index) {
                entry.system = Some(system);
            }

            if let Err(err) = result {
                let name = self.systems.get(index).map_or("", |e| e.name.as_str());
                error!(tick, system = name, error = %err, "system failed, halting tick");
                outcome = Err(err);
                break;
            }
        }

        self.updating = false;
        self.flush_systems();
        self.flush_entities();
        trace!(tick, "tick end");

        if self.destroy_requested {
            self.destroy_requested = false;
            self.destroy();
        }
        outcome
    }

    fn flush_systems(&mut self) {
        let (removed, kept): (Vec<SystemEntry>, Vec<SystemEntry>) =
            std::mem::take(&mut self.systems)
                .into_iter()
                .partition(|e| e.removed);
        self.systems = kept;
        for entry in removed {
            self.teardown_system(entry);
        }
        for entry in std::mem::take(&mut self.pending_systems) {
            schedule(&mut self.systems, entry);
        }
    }

    fn flush_entities(&mut self) {
        let added = std::mem::take(&mut self.pending_add);
        let removed = std::mem::take(&mut self.pending_remove);
        if added.is_empty() && removed.is_empty() {
            return;
        }
        debug!(
            added = added.len(),
            removed = removed.len(),
            "applying deferred entity changes"
        );
        self.entities.extend(added);
        for id in removed {
            self.destroy_entity(id);
        }
    }

    // ── Lifecycle ──────────────────────────────────────────────────

    #[must_use]
    pub fn stats(&self) -> WorldStats {
        WorldStats {
            entities: self.entities.len(),
            active_entities: self.entities.values().filter(|e| self.is_live(e)).count(),
            systems: self.systems.iter().filter(|e| !e.removed).count() + self.pending_systems.len(),
        }
    }

    /// Tear down every system, then every entity.
    ///
    /// Called from a system, the teardown happens once the tick ends.
    pub fn destroy(&mut self) {
        if self.updating {
            debug!("world destroy requested during a tick, deferring");
            self.destroy_requested = true;
            return;
        }
        if self.systems.is_empty() && self.entities.is_empty() {
            return;
        }

        let stats = self.stats();
        let systems: Vec<SystemEntry> = std::mem::take(&mut self.systems)
            .into_iter()
            .chain(std::mem::take(&mut self.pending_systems))
            .collect();
        for entry in systems {
            self.teardown_system(entry);
        }

        let ids: Vec<EntityId> = self.entities.keys().copied().collect();
        for id in ids {
            self.destroy_entity(id);
        }
        self.pending_remove.clear();
        info!(
            entities = stats.entities,
            systems = stats.systems,
            "world destroyed"
        );
    }

    fn notify(&self, event: WorldEvent) {
        self.events.emit(event.event_name(), &event);
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for World {
    fn drop(&mut self) {
        self.destroy();
    }
}

/// Insert after every entry with priority `<=` the new one, keeping ties in
/// insertion order.
fn schedule(systems: &mut Vec<SystemEntry>, entry: SystemEntry) {
    let pos = systems.partition_point(|e| e.priority <= entry.priority);
    systems.insert(pos, entry);
}

#[cfg(test)]
mod tests {
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    use super::*;
    use crate::events::{ENTITY_CREATED, ENTITY_REMOVED, SYSTEM_REMOVED};
    use crate::system::FnSystem;

    #[derive(Debug, PartialEq)]
    struct Position(f32);

    impl Component for Position {
        fn type_name() -> &'static str {
            "Position"
        }
    }

    #[derive(Debug, PartialEq)]
    struct Velocity(f32);

    impl Component for Velocity {
        fn type_name() -> &'static str {
            "Velocity"
        }
    }

    type Log = Rc<RefCell<Vec<String>>>;

    /// System appending its name to a shared log on every hook.
    struct Recorder {
        name: String,
        priority: i32,
        log: Log,
    }

    impl Recorder {
        fn new(name: &str, priority: i32, log: &Log) -> Self {
            Self {
                name: name.into(),
                priority,
                log: log.clone(),
            }
        }
    }

    impl System for Recorder {
        fn name(&self) -> &str {
            &self.name
        }

        fn priority(&self) -> i32 {
            self.priority
        }

        fn on_init(&mut self, _world: &mut World) {
            self.log.borrow_mut().push(format!("init {}", self.name));
        }

        fn update(&mut self, _ctx: &mut SystemContext<'_>) -> Result<(), EcsError> {
            self.log.borrow_mut().push(format!("update {}", self.name));
            Ok(())
        }

        fn on_destroy(&mut self, _world: &mut World) {
            self.log.borrow_mut().push(format!("destroy {}", self.name));
        }
    }

    fn log() -> Log {
        Rc::new(RefCell::new(Vec::new()))
    }

    fn updates(log: &Log) -> Vec<String> {
        log.borrow()
            .iter()
            .filter(|l| l.starts_with("update"))
            .cloned()
            .collect()
    }

    #[test]
    fn test_entity_ids_strictly_increase() {
        let mut world = World::new();
        let a = world.create_entity().id();
        let b = world.create_entity().id();
        world.remove_entity(b);
        let c = world.create_entity().id();
        assert!(a < b && b < c);
        assert!(a.is_valid());
    }

    #[test]
    fn test_remove_entity_outside_tick_is_immediate() {
        let mut world = World::new();
        let id = world.create_entity().id();
        assert!(world.remove_entity(id));
        assert!(world.get_entity(id).is_none());
        assert!(!world.remove_entity(id));
    }

    #[test]
    fn test_query_requires_all_types_and_active() {
        let mut world = World::new();
        let both = {
            let e = world.create_entity();
            e.add_component(Position(0.0));
            e.add_component(Velocity(1.0));
            e.id()
        };
        world.create_entity().add_component(Position(0.0));
        let inactive = {
            let e = world.create_entity();
            e.add_component(Position(0.0));
            e.add_component(Velocity(1.0));
            e.set_active(false);
            e.id()
        };

        let types = [Position::component_type_id(), Velocity::component_type_id()];
        assert_eq!(world.get_entities_with_components(&types), vec![both]);

        world.get_entity_mut(inactive).unwrap().set_active(true);
        assert_eq!(
            world.get_entities_with_components(&types),
            vec![both, inactive]
        );

        let without = Query::new()
            .with_type::<Position>()
            .without_type::<Velocity>();
        assert_eq!(world.query(&without).len(), 1);
    }

    #[test]
    fn test_systems_run_in_priority_order() {
        let log = log();
        let mut world = World::new();
        world.add_system(Recorder::new("five", 5, &log));
        world.add_system(Recorder::new("one", 1, &log));
        world.add_system(Recorder::new("three", 3, &log));
        world.add_system(Recorder::new("one-again", 1, &log));

        world.update(0.016).unwrap();
        assert_eq!(
            updates(&log),
            vec!["update one", "update one-again", "update three", "update five"]
        );
        assert_eq!(world.system_names(), vec!["one", "one-again", "three", "five"]);
    }

    #[test]
    fn test_on_init_is_synchronous() {
        let log = log();
        let mut world = World::new();
        world.add_system(Recorder::new("a", 0, &log));
        assert_eq!(*log.borrow(), vec!["init a"]);
    }

    #[test]
    fn test_disabled_system_is_skipped() {
        let log = log();
        let mut world = World::new();
        let id = world.add_system(Recorder::new("a", 0, &log));
        assert!(world.set_system_enabled(id, false));
        world.update(0.1).unwrap();
        assert!(updates(&log).is_empty());
        assert_eq!(world.is_system_enabled(id), Some(false));

        world.set_system_enabled(id, true);
        world.update(0.1).unwrap();
        assert_eq!(updates(&log), vec!["update a"]);
    }

    #[test]
    fn test_remove_system_runs_on_destroy() {
        let log = log();
        let mut world = World::new();
        let id = world.add_system(Recorder::new("a", 0, &log));
        assert!(world.remove_system(id));
        assert!(!world.remove_system(id));
        assert_eq!(log.borrow().last().map(String::as_str), Some("destroy a"));
        assert_eq!(world.stats().systems, 0);
    }

    #[test]
    fn test_entity_removed_mid_tick_is_excluded_but_still_counted() {
        let mut world = World::new();
        let victim = {
            let e = world.create_entity();
            e.add_component(Position(0.0));
            e.id()
        };
        let observed = Rc::new(RefCell::new(None));

        let seen = observed.clone();
        world.add_system(
            FnSystem::new("remover", move |ctx: &mut SystemContext<'_>| {
                ctx.world.remove_entity(victim);
                Ok(())
            })
            .with_priority(0),
        );
        world.add_system(
            FnSystem::new("observer", move |ctx: &mut SystemContext<'_>| {
                *seen.borrow_mut() = Some((ctx.entities(), ctx.world.stats()));
                Ok(())
            })
            .with_priority(1)
            .with_required(vec![Position::component_type_id()]),
        );

        world.update(0.016).unwrap();

        let (entities, stats) = observed.borrow_mut().take().unwrap();
        assert!(entities.is_empty());
        assert_eq!(stats.entities, 1);
        assert_eq!(stats.active_entities, 0);
        assert!(world.get_entity(victim).is_none());
        assert_eq!(world.stats().entities, 0);
    }

    #[test]
    fn test_entity_queued_for_removal_cannot_be_reactivated() {
        let mut world = World::new();
        let victim = {
            let e = world.create_entity();
            e.add_component(Position(0.0));
            e.id()
        };
        let reactivated = Rc::new(Cell::new(true));
        let observed = Rc::new(RefCell::new(None));

        let flag = reactivated.clone();
        world.add_system(
            FnSystem::new("remover", move |ctx: &mut SystemContext<'_>| {
                ctx.world.remove_entity(victim);
                flag.set(ctx.world.set_entity_active(victim, true));
                if let Some(e) = ctx.world.get_entity_mut(victim) {
                    e.set_active(true);
                }
                Ok(())
            })
            .with_priority(0),
        );
        let seen = observed.clone();
        world.add_system(
            FnSystem::new("observer", move |ctx: &mut SystemContext<'_>| {
                *seen.borrow_mut() = Some((
                    ctx.world.get_entities_with_components(&[Position::component_type_id()]),
                    ctx.world.stats().active_entities,
                ));
                Ok(())
            })
            .with_priority(1),
        );

        world.update(0.016).unwrap();

        assert!(!reactivated.get());
        let (entities, active) = observed.borrow_mut().take().unwrap();
        assert!(entities.is_empty());
        assert_eq!(active, 0);
        assert!(!world.has_entity(victim));
    }

    #[test]
    fn test_set_entity_active_outside_tick() {
        let mut world = World::new();
        let id = world.create_entity().id();
        assert!(world.set_entity_active(id, false));
        assert!(world.query(&Query::new()).is_empty());
        assert!(world.set_entity_active(id, true));
        assert_eq!(world.query(&Query::new()), vec![id]);
        assert!(!world.set_entity_active(EntityId(99), true));
    }

    #[test]
    fn test_entity_created_mid_tick_joins_after_flush() {
        let mut world = World::new();
        let created = Rc::new(RefCell::new(Vec::new()));

        let sink = created.clone();
        world.add_system(FnSystem::new(
            "spawner",
            move |ctx: &mut SystemContext<'_>| {
                if ctx.tick == 1 {
                    let e = ctx.world.create_entity();
                    e.add_component(Position(1.0));
                    let id = e.id();
                    assert!(ctx.world.get_entity(id).is_some());
                    assert!(ctx.world.get_entity_mut(id).is_some());
                    sink.borrow_mut().push(id);
                }
                Ok(())
            },
        ));
        let counts = Rc::new(RefCell::new(Vec::new()));
        let sink = counts.clone();
        world.add_system(
            FnSystem::new("counter", move |ctx: &mut SystemContext<'_>| {
                sink.borrow_mut().push(ctx.entities().len());
                Ok(())
            })
            .with_priority(1)
            .with_required(vec![Position::component_type_id()]),
        );

        world.update(0.1).unwrap();
        world.update(0.1).unwrap();

        assert_eq!(*counts.borrow(), vec![0, 1]);
        let id = created.borrow()[0];
        assert_eq!(world.get_component::<Position>(id), Some(&Position(1.0)));
    }

    #[test]
    fn test_system_added_mid_tick_runs_next_tick() {
        let log = log();
        let mut world = World::new();
        let late = log.clone();
        world.add_system(FnSystem::new(
            "installer",
            move |ctx: &mut SystemContext<'_>| {
                if ctx.tick == 1 {
                    // Priority lower than ours: would run first if scheduled now.
                    ctx.world.add_system(Recorder::new("late", -1, &late));
                }
                Ok(())
            },
        ));

        world.update(0.1).unwrap();
        assert_eq!(*log.borrow(), vec!["init late"]);
        assert_eq!(world.stats().systems, 2);

        world.update(0.1).unwrap();
        assert_eq!(updates(&log), vec!["update late"]);
        assert_eq!(world.system_names(), vec!["late", "installer"]);
    }

    #[test]
    fn test_system_removed_mid_tick_is_skipped_then_destroyed() {
        let log = log();
        let mut world = World::new();
        let target = Rc::new(RefCell::new(None));

        let victim_slot = target.clone();
        world.add_system(FnSystem::new(
            "remover",
            move |ctx: &mut SystemContext<'_>| {
                if let Some(id) = victim_slot.borrow_mut().take() {
                    assert!(ctx.world.remove_system(id));
                    assert!(!ctx.world.remove_system(id));
                }
                Ok(())
            },
        ));
        let victim = world.add_system(Recorder::new("victim", 1, &log));
        *target.borrow_mut() = Some(victim);

        world.update(0.1).unwrap();
        assert!(updates(&log).is_empty());
        assert_eq!(log.borrow().last().map(String::as_str), Some("destroy victim"));
        assert_eq!(world.system_names(), vec!["remover"]);
    }

    #[test]
    fn test_failing_system_halts_tick_but_flushes() {
        let log = log();
        let mut world = World::new();
        let id = world.create_entity().id();
        world.add_system(FnSystem::new("fails", move |ctx: &mut SystemContext<'_>| {
            ctx.world.remove_entity(id);
            Err(EcsError::system("fails", "boom"))
        }));
        world.add_system(Recorder::new("after", 1, &log));

        let err = world.update(0.1).unwrap_err();
        assert!(matches!(err, EcsError::SystemFailed { .. }));
        assert!(updates(&log).is_empty());
        assert!(world.get_entity(id).is_none());
        assert!(!world.is_updating());
    }

    #[test]
    fn test_reentrant_update_is_ignored() {
        let mut world = World::new();
        let ticks = Rc::new(RefCell::new(Vec::new()));
        let sink = ticks.clone();
        world.add_system(FnSystem::new("nested", move |ctx: &mut SystemContext<'_>| {
            ctx.world.update(1.0)?;
            sink.borrow_mut().push(ctx.world.tick());
            Ok(())
        }));
        world.update(0.1).unwrap();
        assert_eq!(*ticks.borrow(), vec![1]);
        assert_eq!(world.tick(), 1);
    }

    #[test]
    fn test_typed_component_access() {
        let mut world = World::new();
        let id = world.create_entity().id();
        assert!(matches!(
            world.require_component::<Position>(id),
            Err(EcsError::ComponentMissing { .. })
        ));
        assert!(matches!(
            world.require_component::<Position>(EntityId(99)),
            Err(EcsError::EntityNotFound(_))
        ));

        world.get_entity_mut(id).unwrap().add_component(Position(1.0));
        let doubled = world
            .update_component::<Position, _>(id, |p| {
                p.0 *= 2.0;
                p.0
            })
            .unwrap();
        assert_eq!(doubled, 2.0);
        assert_eq!(world.require_component::<Position>(id).unwrap(), &Position(2.0));
    }

    #[test]
    fn test_lifecycle_events_are_emitted() {
        let mut world = World::new();
        let seen = Rc::new(RefCell::new(Vec::new()));
        for channel in [ENTITY_CREATED, ENTITY_REMOVED, SYSTEM_REMOVED] {
            let sink = seen.clone();
            let _ = world
                .events()
                .on(channel, move |e: &WorldEvent| sink.borrow_mut().push(e.clone()));
        }

        let id = world.create_named_entity("crate").id();
        world.remove_entity(id);
        let sys = world.add_system(FnSystem::new("noop", |_: &mut SystemContext<'_>| Ok(())));
        world.remove_system(sys);

        assert_eq!(
            *seen.borrow(),
            vec![
                WorldEvent::EntityCreated {
                    entity: id,
                    name: "crate".into()
                },
                WorldEvent::EntityRemoved { entity: id },
                WorldEvent::SystemRemoved {
                    system: sys,
                    name: "noop".into()
                },
            ]
        );
    }

    #[test]
    fn test_destroy_tears_down_systems_then_entities() {
        let log = log();
        let mut world = World::new();
        world.add_system(Recorder::new("a", 0, &log));
        world.add_system(Recorder::new("b", 1, &log));
        world.create_entity();

        world.destroy();
        assert_eq!(
            *log.borrow(),
            vec!["init a", "init b", "destroy a", "destroy b"]
        );
        assert_eq!(world.stats(), WorldStats::default());
    }

    #[test]
    fn test_destroy_during_tick_is_deferred() {
        let mut world = World::new();
        world.create_entity();
        world.add_system(FnSystem::new("quit", |ctx: &mut SystemContext<'_>| {
            ctx.world.destroy();
            assert_eq!(ctx.world.stats().entities, 1);
            Ok(())
        }));
        world.update(0.1).unwrap();
        assert_eq!(world.stats(), WorldStats::default());
    }
}
