//! [`Entity`]: a named container of components owned by a [`World`](crate::World).
//!
//! Entities are created through the world and never constructed directly.
//! Every component attached through an entity draws its [`ComponentId`] from
//! the world's shared allocator.

use engine_component::{
    AttachedComponent, Component, ComponentId, ComponentIdAllocator, ComponentStore,
    ComponentTypeId, EntityId, ErasedComponent,
};
use tracing::trace;

/// A container of components identified by an [`EntityId`].
#[derive(Debug)]
pub struct Entity {
    id: EntityId,
    name: String,
    active: bool,
    components: ComponentStore,
    component_ids: ComponentIdAllocator,
}

impl Entity {
    pub(crate) fn new(id: EntityId, name: String, component_ids: ComponentIdAllocator) -> Self {
        Self {
            id,
            name,
            active: true,
            components: ComponentStore::new(),
            component_ids,
        }
    }

    #[must_use]
    pub fn id(&self) -> EntityId {
        self.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// Inactive entities are skipped by every query.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    /// Attach `component`, firing its `on_attach` hook. Several components of
    /// the same type may be attached.
    pub fn add_component<T: Component>(&mut self, component: T) -> ComponentId {
        self.add_boxed(Box::new(component))
    }

    /// Attach an already type-erased component.
    pub fn add_boxed(&mut self, component: Box<dyn ErasedComponent>) -> ComponentId {
        let id = self.component_ids.allocate();
        let attached = AttachedComponent::new(id, self.id, component);
        trace!(entity = %self.id, component = attached.type_name(), %id, "component attached");
        self.components.insert(attached)
    }

    /// The first attached component of type `T`.
    #[must_use]
    pub fn get_component<T: Component>(&self) -> Option<&T> {
        self.components.first::<T>()
    }

    pub fn get_component_mut<T: Component>(&mut self) -> Option<&mut T> {
        self.components.first_mut::<T>()
    }

    /// Every attached component of type `T`, in attach order.
    pub fn get_components<T: Component>(&self) -> impl Iterator<Item = &T> {
        self.components.all_of::<T>()
    }

    pub fn get_components_mut<T: Component>(&mut self) -> impl Iterator<Item = &mut T> {
        self.components.all_of_mut::<T>()
    }

    #[must_use]
    pub fn has_component<T: Component>(&self) -> bool {
        self.components.contains(T::component_type_id())
    }

    #[must_use]
    pub fn has_component_type(&self, type_id: ComponentTypeId) -> bool {
        self.components.contains(type_id)
    }

    /// Look up a single component instance by id.
    #[must_use]
    pub fn component(&self, id: ComponentId) -> Option<&AttachedComponent> {
        self.components.get(id)
    }

    pub fn component_mut(&mut self, id: ComponentId) -> Option<&mut AttachedComponent> {
        self.components.get_mut(id)
    }

    /// Detach one component instance and run its `on_destroy` hook.
    ///
    /// Returns `false` if no component with that id is attached here.
    pub fn remove_component(&mut self, id: ComponentId) -> bool {
        match self.components.remove(id) {
            Some(attached) => {
                trace!(entity = %self.id, component = attached.type_name(), %id, "component removed");
                attached.destroy();
                true
            }
            None => false,
        }
    }

    /// Detach every component of type `T`. Returns how many were removed.
    pub fn remove_components<T: Component>(&mut self) -> usize {
        let removed = self.components.remove_type(T::component_type_id());
        let count = removed.len();
        for attached in removed {
            attached.destroy();
        }
        count
    }

    /// Every attached component: grouped by type in first-attach order, then
    /// in attach order within a type.
    pub fn components(&self) -> impl Iterator<Item = &AttachedComponent> {
        self.components.iter()
    }

    /// The distinct component types attached, in first-attach order.
    #[must_use]
    pub fn component_types(&self) -> &[ComponentTypeId] {
        self.components.types()
    }

    #[must_use]
    pub fn component_count(&self) -> usize {
        self.components.len()
    }

    pub(crate) fn store(&self) -> &ComponentStore {
        &self.components
    }

    /// Detach and tear down every component, then deactivate.
    pub(crate) fn teardown(&mut self) {
        for attached in self.components.drain() {
            attached.destroy();
        }
        self.active = false;
    }
}
