//! Core [`Component`] trait and the type-erased form entities store.
//!
//! A component is plain data tagged with a type. Its tag is a
//! [`ComponentTypeId`] derived from the component's **string name** using the
//! FNV-1a 64-bit hash, so the id is a compile-time constant for every
//! [`Component`] impl and stays stable for the whole process.
//!
//! Entities hold their components behind [`ErasedComponent`], which every
//! [`Component`] implements through a blanket impl.

use std::any::Any;
use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::entity::EntityId;

/// A unique identifier for a component type, derived from its string name
/// using the FNV-1a 64-bit hash algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
pub struct ComponentTypeId(pub u64);

impl ComponentTypeId {
    /// FNV-1a 64-bit offset basis.
    const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;

    /// FNV-1a 64-bit prime.
    const FNV_PRIME: u64 = 0x0100_0000_01b3;

    /// Compute the [`ComponentTypeId`] from a component's string name.
    ///
    /// # Algorithm (FNV-1a 64-bit)
    ///
    /// ```text
    /// hash = 0xcbf29ce484222325          (offset basis)
    /// for each byte in name.as_bytes():
    ///     hash = hash XOR byte
    ///     hash = hash * 0x00000100000001b3  (prime)
    /// return hash
    /// ```
    #[must_use]
    pub const fn from_name(name: &str) -> Self {
        let bytes = name.as_bytes();
        let mut hash = Self::FNV_OFFSET_BASIS;
        let mut i = 0;
        while i < bytes.len() {
            hash ^= bytes[i] as u64;
            hash = hash.wrapping_mul(Self::FNV_PRIME);
            i += 1;
        }
        Self(hash)
    }

    /// Compute the [`ComponentTypeId`] for a Rust component type `T`.
    #[must_use]
    pub fn of<T: Component>() -> Self {
        Self::from_name(T::type_name())
    }
}

impl fmt::Display for ComponentTypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ComponentType({:#018x})", self.0)
    }
}

/// The core component trait.
///
/// Components are owned by exactly one entity. Serialisation is opt-in: a
/// component only takes part in snapshots once its type is registered with a
/// [`ComponentRegistry`](crate::ComponentRegistry), which additionally
/// requires `Serialize + Deserialize`.
///
/// # Examples
///
/// ```rust
/// use serde::{Serialize, Deserialize};
/// use engine_component::Component;
///
/// #[derive(Debug, Clone, Serialize, Deserialize)]
/// struct Health {
///     current: f32,
///     max: f32,
/// }
///
/// impl Component for Health {
///     fn type_name() -> &'static str { "Health" }
/// }
/// ```
pub trait Component: 'static {
    /// A human-readable name for this component type.
    fn type_name() -> &'static str;

    /// Returns the [`ComponentTypeId`] for this component.
    fn component_type_id() -> ComponentTypeId {
        ComponentTypeId::from_name(Self::type_name())
    }

    /// Called once when the component is attached to `entity`.
    fn on_attach(&mut self, _entity: EntityId) {}

    /// Teardown hook, called once when the component is detached or its
    /// entity is destroyed.
    fn on_destroy(&mut self) {}
}

/// Object-safe view of a [`Component`] used by type-erased storage.
pub trait ErasedComponent: Any {
    /// The component's type id.
    fn erased_type_id(&self) -> ComponentTypeId;

    /// The component's type name.
    fn erased_type_name(&self) -> &'static str;

    /// Upcast for downcasting to the concrete type.
    fn as_any(&self) -> &dyn Any;

    /// Mutable upcast for downcasting to the concrete type.
    fn as_any_mut(&mut self) -> &mut dyn Any;

    /// Forwards to [`Component::on_attach`].
    fn attach(&mut self, entity: EntityId);

    /// Forwards to [`Component::on_destroy`].
    fn destroy(&mut self);
}

impl<T: Component> ErasedComponent for T {
    fn erased_type_id(&self) -> ComponentTypeId {
        T::component_type_id()
    }

    fn erased_type_name(&self) -> &'static str {
        T::type_name()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn attach(&mut self, entity: EntityId) {
        self.on_attach(entity);
    }

    fn destroy(&mut self) {
        self.on_destroy();
    }
}

impl fmt::Debug for dyn ErasedComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ErasedComponent")
            .field(&self.erased_type_name())
            .finish()
    }
}

/// Identifier of a single attached component instance.
///
/// Unique across every component of every type within one world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ComponentId(pub u64);

impl fmt::Display for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Component({})", self.0)
    }
}

/// Shared, monotonically increasing [`ComponentId`] source.
///
/// A world hands a clone of its allocator to every entity it creates, so
/// components attached through any entity draw from the same sequence.
#[derive(Debug, Clone, Default)]
pub struct ComponentIdAllocator {
    next: Rc<Cell<u64>>,
}

impl ComponentIdAllocator {
    /// Creates a new allocator. IDs start at 1.
    #[must_use]
    pub fn new() -> Self {
        Self {
            next: Rc::new(Cell::new(1)),
        }
    }

    /// Allocates a fresh component ID.
    pub fn allocate(&self) -> ComponentId {
        // `Default` starts at zero; skip it so 0 is never handed out.
        let id = self.next.get().max(1);
        self.next.set(id + 1);
        ComponentId(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Health {
        current: f32,
        max: f32,
    }

    impl Component for Health {
        fn type_name() -> &'static str {
            "Health"
        }
    }

    #[test]
    fn test_component_type_id_matches_from_name() {
        assert_eq!(
            Health::component_type_id(),
            ComponentTypeId::from_name("Health")
        );
        assert_eq!(ComponentTypeId::of::<Health>(), Health::component_type_id());
    }

    #[test]
    fn test_component_type_id_differs_between_names() {
        assert_ne!(
            ComponentTypeId::from_name("Health"),
            ComponentTypeId::from_name("Velocity")
        );
    }

    #[test]
    fn test_fnv1a_known_vector() {
        assert_eq!(
            ComponentTypeId::from_name(""),
            ComponentTypeId(0xcbf2_9ce4_8422_2325)
        );
        // FNV-1a 64 of "a".
        assert_eq!(
            ComponentTypeId::from_name("a"),
            ComponentTypeId(0xaf63_dc4c_8601_ec8c)
        );
    }

    #[test]
    fn test_erased_downcast() {
        let boxed: Box<dyn ErasedComponent> = Box::new(Health {
            current: 5.0,
            max: 10.0,
        });
        assert_eq!(boxed.erased_type_name(), "Health");
        assert_eq!(boxed.erased_type_id(), Health::component_type_id());
        let health = boxed.as_any().downcast_ref::<Health>().unwrap();
        assert_eq!(health.current, 5.0);
    }

    #[test]
    fn test_component_id_allocator_is_shared() {
        let a = ComponentIdAllocator::new();
        let b = a.clone();
        assert_eq!(a.allocate(), ComponentId(1));
        assert_eq!(b.allocate(), ComponentId(2));
        assert_eq!(a.allocate(), ComponentId(3));
    }

    #[test]
    fn test_default_allocator_skips_zero() {
        let a = ComponentIdAllocator::default();
        assert_eq!(a.allocate(), ComponentId(1));
    }
}
