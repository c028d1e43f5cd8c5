//! Binder factory port implemented by transport modules.

use crate::binder::services::Binder;
use crate::registry::domain::BinderConfiguration;
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Result type for binder factory operations.
pub type BinderFactoryResult<T> = Result<T, BinderFactoryError>;

/// Creates binders of one transport type.
#[async_trait]
pub trait BinderFactory: Send + Sync {
    /// Creates a binder for `configuration`.
    ///
    /// # Errors
    ///
    /// Returns [`BinderFactoryError::InvalidProperty`] when the
    /// configuration properties are unusable, or
    /// [`BinderFactoryError::Runtime`] when the transport cannot be set up.
    async fn create(
        &self,
        configuration: &BinderConfiguration,
    ) -> BinderFactoryResult<Arc<dyn Binder>>;
}

/// Errors returned by binder factories.
#[derive(Debug, Clone, Error)]
pub enum BinderFactoryError {
    /// A binder property has an unusable value.
    #[error("binder '{binder}' property '{key}' is invalid: {reason}")]
    InvalidProperty {
        /// Binder configuration name.
        binder: String,
        /// Property key.
        key: String,
        /// Why the value was rejected.
        reason: String,
    },

    /// Transport setup failed.
    #[error("binder factory failed: {0}")]
    Runtime(Arc<dyn std::error::Error + Send + Sync>),
}

impl BinderFactoryError {
    /// Wraps a transport setup failure.
    pub fn runtime(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Runtime(Arc::new(err))
    }
}
