//! Component registry error types.

/// Errors raised while converting components to and from their serialised form.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// The component data could not be converted to or from JSON.
    #[error("failed to convert component '{component}': {source}")]
    Serde {
        /// Name of the component type.
        component: &'static str,
        /// Underlying serde error.
        #[source]
        source: serde_json::Error,
    },

    /// The erased value passed to a serialiser was not of the registered type.
    #[error("component data is not a '{expected}'")]
    TypeMismatch {
        /// Name of the registered component type.
        expected: &'static str,
    },

    /// No component type with this name has been registered.
    #[error("unknown component type: {0}")]
    UnknownType(String),
}
