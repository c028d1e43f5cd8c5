//! Registry services: binder resolution and channel binding.

mod channels;
mod error;
mod registry;
mod types;

pub use channels::ChannelBindingService;
pub use error::{BinderRegistryError, BinderRegistryResult};
pub use registry::BinderRegistry;
pub use types::BinderTypeTable;
