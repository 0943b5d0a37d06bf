//! # engine_ecs
//!
//! Frame-driven entity-component-system runtime built on `engine_component`.
//!
//! - [`World`]: owns entities and systems, runs one tick per
//!   [`World::update`], and defers structural changes made mid-tick.
//! - [`Entity`]: a named, activatable bag of components.
//! - [`System`]: per-tick logic ordered by priority.
//! - [`WorldEvent`]: lifecycle notifications on the world's event bus.
//! - [`WorldSnapshot`]: registry-driven capture and restore of entities.

pub mod entity;
pub mod error;
pub mod events;
pub mod snapshot;
pub mod system;
pub mod world;

pub use engine_component::{
    Component, ComponentId, ComponentRegistry, ComponentTypeId, EntityId, Query,
};
pub use entity::Entity;
pub use error::EcsError;
pub use events::WorldEvent;
pub use snapshot::{ComponentSnapshot, EntitySnapshot, WorldSnapshot};
pub use system::{FnSystem, System, SystemContext, SystemId};
pub use world::{World, WorldStats};
