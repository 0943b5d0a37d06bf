//! # engine_component
//!
//! The "C" in ECS. Defines what a component is, how an entity stores the
//! components it owns, and how component types are registered for
//! serialisation.
//!
//! This crate provides:
//!
//! - [`Component`] trait: the contract all component data satisfies.
//! - [`ComponentTypeId`]: compile-time type tag derived from the type name.
//! - [`ComponentStore`]: the per-entity bag of components, several
//!   instances per type allowed.
//! - [`EntityId`] / [`EntityAllocator`]: never-reused entity identifiers.
//! - [`ComponentRegistry`]: explicit registry of serialisable types.
//! - [`Query`]: with/without component filters.

pub mod component;
pub mod entity;
pub mod error;
pub mod query;
pub mod registry;
pub mod storage;

pub use component::{Component, ComponentId, ComponentIdAllocator, ComponentTypeId, ErasedComponent};
pub use entity::{EntityAllocator, EntityId};
pub use error::RegistryError;
pub use query::Query;
pub use registry::{ComponentInfo, ComponentRegistry};
pub use storage::{AttachedComponent, ComponentStore};
