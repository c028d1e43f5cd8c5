//! Binder discovery adapters.

pub mod memory;
pub mod search_path;

pub use memory::InMemoryBinderFactory;
pub use search_path::{SearchPathManifestLocator, StaticManifestLocator};
