//! Port definitions for binder discovery.

pub mod factory;
pub mod locator;

pub use factory::{BinderFactory, BinderFactoryError, BinderFactoryResult};
pub use locator::{MANIFEST_RESOURCE, ManifestLocator, ManifestLocatorError, ManifestResource};
