//! Per-entity component storage.
//!
//! A [`ComponentStore`] is the bag of components owned by one entity. It is
//! keyed by [`ComponentTypeId`] and each type holds an ordered list of
//! instances, so an entity may carry several components of the same type.
//!
//! ```text
//!  order:   [Transform, Health, Tag]
//!  buckets: Transform -> [#1]
//!           Health    -> [#2, #5]      (insertion order, compacts on removal)
//!           Tag       -> [#3]
//! ```

use std::collections::HashMap;

use crate::component::{Component, ComponentId, ComponentTypeId, ErasedComponent};
use crate::entity::EntityId;

/// A component instance attached to an entity, together with its metadata.
///
/// The owning entity id is readable only while attached: detaching consumes
/// the value through [`AttachedComponent::destroy`].
#[derive(Debug)]
pub struct AttachedComponent {
    id: ComponentId,
    entity: EntityId,
    enabled: bool,
    data: Box<dyn ErasedComponent>,
}

impl AttachedComponent {
    /// Attach `data` to `entity`, running its `on_attach` hook.
    #[must_use]
    pub fn new(id: ComponentId, entity: EntityId, mut data: Box<dyn ErasedComponent>) -> Self {
        data.attach(entity);
        Self {
            id,
            entity,
            enabled: true,
            data,
        }
    }

    /// The unique id of this instance.
    #[must_use]
    pub fn id(&self) -> ComponentId {
        self.id
    }

    /// The type tag of this instance.
    #[must_use]
    pub fn component_type(&self) -> ComponentTypeId {
        self.data.erased_type_id()
    }

    /// The type name of this instance.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        self.data.erased_type_name()
    }

    /// The entity that owns this instance.
    #[must_use]
    pub fn entity_id(&self) -> EntityId {
        self.entity
    }

    /// Whether the component is enabled.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Enable or disable the component.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// The type-erased component data.
    #[must_use]
    pub fn data(&self) -> &dyn ErasedComponent {
        self.data.as_ref()
    }

    /// Downcast to the concrete component type.
    #[must_use]
    pub fn downcast_ref<T: Component>(&self) -> Option<&T> {
        self.data.as_any().downcast_ref::<T>()
    }

    /// Mutably downcast to the concrete component type.
    pub fn downcast_mut<T: Component>(&mut self) -> Option<&mut T> {
        self.data.as_any_mut().downcast_mut::<T>()
    }

    /// Detach and tear the component down, running its `on_destroy` hook.
    pub fn destroy(mut self) {
        self.data.destroy();
    }
}

/// The components owned by a single entity.
#[derive(Debug, Default)]
pub struct ComponentStore {
    buckets: HashMap<ComponentTypeId, Vec<AttachedComponent>>,
    /// Types in first-attached order, for deterministic enumeration.
    order: Vec<ComponentTypeId>,
}

impl ComponentStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a component to the end of its type's bucket.
    pub fn insert(&mut self, component: AttachedComponent) -> ComponentId {
        let id = component.id();
        let ty = component.component_type();
        let bucket = self.buckets.entry(ty).or_default();
        if bucket.is_empty() {
            self.order.push(ty);
        }
        bucket.push(component);
        id
    }

    /// Returns `true` if at least one instance of `ty` is attached.
    #[must_use]
    pub fn contains(&self, ty: ComponentTypeId) -> bool {
        self.buckets.contains_key(&ty)
    }

    /// All instances of `ty`, in insertion order.
    #[must_use]
    pub fn bucket(&self, ty: ComponentTypeId) -> &[AttachedComponent] {
        self.buckets.get(&ty).map(Vec::as_slice).unwrap_or_default()
    }

    /// The first attached instance of `T`.
    #[must_use]
    pub fn first<T: Component>(&self) -> Option<&T> {
        self.buckets
            .get(&T::component_type_id())?
            .first()?
            .downcast_ref::<T>()
    }

    /// The first attached instance of `T`, mutably.
    pub fn first_mut<T: Component>(&mut self) -> Option<&mut T> {
        self.buckets
            .get_mut(&T::component_type_id())?
            .first_mut()?
            .downcast_mut::<T>()
    }

    /// Every attached instance of `T`, in insertion order.
    pub fn all_of<T: Component>(&self) -> impl Iterator<Item = &T> {
        self.bucket(T::component_type_id())
            .iter()
            .filter_map(AttachedComponent::downcast_ref::<T>)
    }

    /// Every attached instance of `T`, mutably, in insertion order.
    pub fn all_of_mut<T: Component>(&mut self) -> impl Iterator<Item = &mut T> {
        self.buckets
            .get_mut(&T::component_type_id())
            .into_iter()
            .flat_map(|bucket| bucket.iter_mut())
            .filter_map(AttachedComponent::downcast_mut::<T>)
    }

    /// Look up an instance by id.
    #[must_use]
    pub fn get(&self, id: ComponentId) -> Option<&AttachedComponent> {
        self.iter().find(|c| c.id() == id)
    }

    /// Look up an instance by id, mutably.
    pub fn get_mut(&mut self, id: ComponentId) -> Option<&mut AttachedComponent> {
        self.buckets
            .values_mut()
            .flat_map(|bucket| bucket.iter_mut())
            .find(|c| c.id() == id)
    }

    /// Remove one instance by id. Empty buckets are dropped.
    ///
    /// Returns `None` if no attached instance has that id.
    pub fn remove(&mut self, id: ComponentId) -> Option<AttachedComponent> {
        let (ty, index) = self.buckets.iter().find_map(|(ty, bucket)| {
            bucket
                .iter()
                .position(|c| c.id() == id)
                .map(|index| (*ty, index))
        })?;
        let bucket = self.buckets.get_mut(&ty)?;
        let removed = bucket.remove(index);
        if bucket.is_empty() {
            self.drop_bucket(ty);
        }
        Some(removed)
    }

    /// Remove every instance of `ty`, returning them in insertion order.
    pub fn remove_type(&mut self, ty: ComponentTypeId) -> Vec<AttachedComponent> {
        let removed = self.buckets.remove(&ty).unwrap_or_default();
        self.order.retain(|t| *t != ty);
        removed
    }

    /// Remove every component, returning them grouped by type in
    /// first-attached order.
    pub fn drain(&mut self) -> Vec<AttachedComponent> {
        let order = std::mem::take(&mut self.order);
        let mut drained = Vec::with_capacity(self.len());
        for ty in order {
            if let Some(bucket) = self.buckets.remove(&ty) {
                drained.extend(bucket);
            }
        }
        drained
    }

    /// Iterate every attached instance, grouped by type in first-attached
    /// order, then by insertion order within the type.
    pub fn iter(&self) -> impl Iterator<Item = &AttachedComponent> {
        self.order
            .iter()
            .filter_map(|ty| self.buckets.get(ty))
            .flat_map(|bucket| bucket.iter())
    }

    /// The attached component types in first-attached order.
    #[must_use]
    pub fn types(&self) -> &[ComponentTypeId] {
        &self.order
    }

    /// Total number of attached instances.
    #[must_use]
    pub fn len(&self) -> usize {
        self.buckets.values().map(Vec::len).sum()
    }

    /// Returns `true` if nothing is attached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    fn drop_bucket(&mut self, ty: ComponentTypeId) {
        self.buckets.remove(&ty);
        self.order.retain(|t| *t != ty);
    }
}
