//! Service-level registry errors.

use crate::binder::services::BinderError;
use crate::registry::{
    domain::RegistryDomainError,
    ports::{BinderFactoryError, ManifestLocatorError},
};
use thiserror::Error;

/// Result type for registry operations.
pub type BinderRegistryResult<T> = Result<T, BinderRegistryError>;

/// Errors returned while resolving binders and binding channels.
#[derive(Debug, Clone, Error)]
pub enum BinderRegistryError {
    /// Names, manifests or configurations are invalid.
    #[error(transparent)]
    Domain(#[from] RegistryDomainError),

    /// Manifest resources could not be read.
    #[error(transparent)]
    Manifest(#[from] ManifestLocatorError),

    /// A binder was requested but none is configured or discovered.
    #[error("a binder was requested but no binder is configured")]
    NoBinderConfigured,

    /// A default binder was requested but no single candidate exists.
    #[error(
        "a default binder was requested but there is no single candidate among [{}]",
        .0.join(", ")
    )]
    AmbiguousDefaultBinder(Vec<String>),

    /// No configuration or manifest type has the requested name.
    #[error("unknown binder configuration: {0}")]
    UnknownBinder(String),

    /// The configured binder type has no registered implementation.
    #[error("binder '{binder}' has unknown binder type '{binder_type}'")]
    UnknownBinderType {
        /// Binder configuration name.
        binder: String,
        /// Unresolvable binder type.
        binder_type: String,
    },

    /// The factory failed to create the binder.
    #[error(transparent)]
    Factory(#[from] BinderFactoryError),

    /// The binder rejected a bind or unbind request.
    #[error(transparent)]
    Binder(#[from] BinderError),
}
