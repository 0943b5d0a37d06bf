//! Component registry: serialisable component types and their factories.
//!
//! The registry is an explicit object owned by a world. It records, per
//! component type, how to turn an attached instance into a JSON value and
//! how to build a fresh instance back from one. Only registered types take
//! part in snapshots.

use std::collections::HashMap;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::warn;

use crate::component::{Component, ComponentTypeId, ErasedComponent};
use crate::error::RegistryError;

type SerializeFn = fn(&dyn ErasedComponent) -> Result<Value, RegistryError>;
type DeserializeFn = fn(Value) -> Result<Box<dyn ErasedComponent>, RegistryError>;

/// Everything the registry knows about one component type.
#[derive(Debug, Clone)]
pub struct ComponentInfo {
    /// The unique type identifier.
    pub type_id: ComponentTypeId,
    /// The component's type name (e.g. `"Health"`).
    pub name: &'static str,
    serialize_fn: SerializeFn,
    deserialize_fn: DeserializeFn,
}

impl ComponentInfo {
    /// Describe component type `T`.
    #[must_use]
    pub fn of<T>() -> Self
    where
        T: Component + Serialize + DeserializeOwned,
    {
        Self {
            type_id: T::component_type_id(),
            name: T::type_name(),
            serialize_fn: serialize_erased::<T>,
            deserialize_fn: deserialize_erased::<T>,
        }
    }

    /// Convert an attached instance of this type into a JSON value.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::TypeMismatch`] if `data` is not of this type,
    /// or [`RegistryError::Serde`] if serialisation fails.
    pub fn serialize(&self, data: &dyn ErasedComponent) -> Result<Value, RegistryError> {
        (self.serialize_fn)(data)
    }

    /// Build a new, unattached instance of this type from a JSON value.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Serde`] if the value does not describe this
    /// component type.
    pub fn deserialize(&self, value: Value) -> Result<Box<dyn ErasedComponent>, RegistryError> {
        (self.deserialize_fn)(value)
    }
}

fn serialize_erased<T>(data: &dyn ErasedComponent) -> Result<Value, RegistryError>
where
    T: Component + Serialize,
{
    let value = data
        .as_any()
        .downcast_ref::<T>()
        .ok_or(RegistryError::TypeMismatch {
            expected: T::type_name(),
        })?;
    serde_json::to_value(value).map_err(|source| RegistryError::Serde {
        component: T::type_name(),
        source,
    })
}

fn deserialize_erased<T>(value: Value) -> Result<Box<dyn ErasedComponent>, RegistryError>
where
    T: Component + DeserializeOwned,
{
    let component: T = serde_json::from_value(value).map_err(|source| RegistryError::Serde {
        component: T::type_name(),
        source,
    })?;
    Ok(Box::new(component))
}

/// Registry of serialisable component types.
#[derive(Debug, Default, Clone)]
pub struct ComponentRegistry {
    types: HashMap<ComponentTypeId, ComponentInfo>,
}

impl ComponentRegistry {
    /// Create a new empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register component type `T`.
    ///
    /// Registering a type twice overwrites the earlier entry. Both that and a
    /// type-id collision between different names are reported as warnings.
    pub fn register<T>(&mut self) -> &mut Self
    where
        T: Component + Serialize + DeserializeOwned,
    {
        let info = ComponentInfo::of::<T>();
        if let Some(existing) = self.types.get(&info.type_id) {
            if existing.name == info.name {
                warn!(component = info.name, "component type registered twice, overwriting");
            } else {
                warn!(
                    component = info.name,
                    existing = existing.name,
                    type_id = info.type_id.0,
                    "component type id collision, overwriting"
                );
            }
        }
        self.types.insert(info.type_id, info);
        self
    }

    /// Returns the entry for a type id.
    #[must_use]
    pub fn get(&self, type_id: ComponentTypeId) -> Option<&ComponentInfo> {
        self.types.get(&type_id)
    }

    /// Returns the entry for a type name.
    #[must_use]
    pub fn get_by_name(&self, name: &str) -> Option<&ComponentInfo> {
        self.types
            .get(&ComponentTypeId::from_name(name))
            .filter(|info| info.name == name)
    }

    /// Returns `true` if the type id is registered.
    #[must_use]
    pub fn contains(&self, type_id: ComponentTypeId) -> bool {
        self.types.contains_key(&type_id)
    }

    /// Serialise an attached instance using its registered entry.
    ///
    /// Returns `Ok(None)` if the instance's type is not registered.
    ///
    /// # Errors
    ///
    /// Propagates serialisation failures from [`ComponentInfo::serialize`].
    pub fn serialize(&self, data: &dyn ErasedComponent) -> Result<Option<Value>, RegistryError> {
        match self.types.get(&data.erased_type_id()) {
            Some(info) => info.serialize(data).map(Some),
            None => Ok(None),
        }
    }

    /// Build an instance of the named type from a JSON value.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::UnknownType`] for unregistered names, or a
    /// deserialisation error.
    pub fn deserialize(&self, name: &str, value: Value) -> Result<Box<dyn ErasedComponent>, RegistryError> {
        self.get_by_name(name)
            .ok_or_else(|| RegistryError::UnknownType(name.to_string()))?
            .deserialize(value)
    }

    /// Returns an iterator over all registered types.
    pub fn iter(&self) -> impl Iterator<Item = &ComponentInfo> {
        self.types.values()
    }

    /// Returns the number of registered types.
    #[must_use]
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Returns `true` if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}
