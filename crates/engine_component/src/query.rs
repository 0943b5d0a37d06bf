//! Query descriptors for entity selection.
//!
//! A [`Query`] declares which component types an entity must carry and which
//! it must not. Queries are evaluated against a [`ComponentStore`] and hold
//! no cached results.

use serde::{Deserialize, Serialize};

use crate::component::{Component, ComponentTypeId};
use crate::storage::ComponentStore;

/// Component-type filter used to select entities.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Query {
    /// Component types the entity must have (all of them).
    pub with: Vec<ComponentTypeId>,
    /// Component types the entity must NOT have (none of them).
    pub without: Vec<ComponentTypeId>,
}

impl Query {
    /// Create a query that matches every entity.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a query requiring every type in `types`.
    #[must_use]
    pub fn all_of(types: &[ComponentTypeId]) -> Self {
        Self {
            with: types.to_vec(),
            without: Vec::new(),
        }
    }

    /// Require a component type.
    #[must_use]
    pub fn with(mut self, type_id: ComponentTypeId) -> Self {
        self.with.push(type_id);
        self
    }

    /// Require component type `T`.
    #[must_use]
    pub fn with_type<T: Component>(self) -> Self {
        self.with(T::component_type_id())
    }

    /// Exclude a component type.
    #[must_use]
    pub fn without(mut self, type_id: ComponentTypeId) -> Self {
        self.without.push(type_id);
        self
    }

    /// Exclude component type `T`.
    #[must_use]
    pub fn without_type<T: Component>(self) -> Self {
        self.without(T::component_type_id())
    }

    /// Returns `true` if the query has no constraints.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.with.is_empty() && self.without.is_empty()
    }

    /// Checks whether a component store satisfies this query.
    #[must_use]
    pub fn matches(&self, store: &ComponentStore) -> bool {
        self.with.iter().all(|ty| store.contains(*ty))
            && !self.without.iter().any(|ty| store.contains(*ty))
    }
}

impl From<&[ComponentTypeId]> for Query {
    fn from(types: &[ComponentTypeId]) -> Self {
        Self::all_of(types)
    }
}
