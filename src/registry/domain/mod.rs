//! Domain model for binder discovery and configuration.

mod configuration;
mod error;
mod manifest;
mod name;

pub use configuration::{BinderConfiguration, BinderSpec, BindingSpec, StreamConfiguration};
pub use error::RegistryDomainError;
pub use manifest::{BinderManifest, ManifestEntry};
pub use name::BinderName;
