//! Error types for world-level operations.

use engine_component::{EntityId, RegistryError};
use thiserror::Error;

/// Errors raised by [`World`](crate::World) and its systems.
///
/// Storage operations (adding, looking up or removing components) never
/// fail; these errors cover typed access to a specific entity, snapshot
/// encoding, and user systems reporting failure from `update`.
#[derive(Debug, Error)]
pub enum EcsError {
    #[error("entity {0} not found")]
    EntityNotFound(EntityId),

    #[error("component '{component}' not found on {entity}")]
    ComponentMissing {
        entity: EntityId,
        component: &'static str,
    },

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("snapshot json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("snapshot encode error: {0}")]
    Encode(#[from] rmp_serde::encode::Error),

    #[error("snapshot decode error: {0}")]
    Decode(#[from] rmp_serde::decode::Error),

    #[error("system '{system}' failed: {message}")]
    SystemFailed { system: String, message: String },
}

impl EcsError {
    /// Shorthand for [`EcsError::SystemFailed`].
    pub fn system(system: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SystemFailed {
            system: system.into(),
            message: message.into(),
        }
    }
}
