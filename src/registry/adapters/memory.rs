//! In-memory binder factory.

use crate::binder::adapters::InMemoryTransport;
use crate::binder::services::{Binder, MessageBinder};
use crate::registry::{
    domain::BinderConfiguration,
    ports::{BinderFactory, BinderFactoryError, BinderFactoryResult},
};
use async_trait::async_trait;
use mockable::DefaultClock;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::debug;

const NATIVE_HEADERS: &str = "nativeHeaders";

/// Creates binders over shared in-memory transports.
///
/// Binders created from configurations with `nativeHeaders=true` share the
/// header-capable transport; all others share the embedding one.
#[derive(Debug)]
pub struct InMemoryBinderFactory {
    transport: Arc<InMemoryTransport>,
    native_transport: Arc<InMemoryTransport>,
    created: AtomicUsize,
}

impl Default for InMemoryBinderFactory {
    fn default() -> Self {
        Self::new(Arc::new(InMemoryTransport::new()))
    }
}

impl InMemoryBinderFactory {
    /// Creates a factory whose embedding binders use `transport`.
    #[must_use]
    pub fn new(transport: Arc<InMemoryTransport>) -> Self {
        Self {
            transport,
            native_transport: Arc::new(InMemoryTransport::with_native_headers()),
            created: AtomicUsize::new(0),
        }
    }

    /// Returns the transport used without native headers.
    #[must_use]
    pub const fn transport(&self) -> &Arc<InMemoryTransport> {
        &self.transport
    }

    /// Returns the header-capable transport.
    #[must_use]
    pub const fn native_transport(&self) -> &Arc<InMemoryTransport> {
        &self.native_transport
    }

    /// Returns how many binders this factory has created.
    #[must_use]
    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BinderFactory for InMemoryBinderFactory {
    async fn create(
        &self,
        configuration: &BinderConfiguration,
    ) -> BinderFactoryResult<Arc<dyn Binder>> {
        let native = match configuration.properties().get(NATIVE_HEADERS) {
            None => false,
            Some(raw) => raw
                .parse::<bool>()
                .map_err(|err| BinderFactoryError::InvalidProperty {
                    binder: configuration.name().to_string(),
                    key: NATIVE_HEADERS.to_owned(),
                    reason: err.to_string(),
                })?,
        };
        let transport = if native {
            &self.native_transport
        } else {
            &self.transport
        };
        self.created.fetch_add(1, Ordering::SeqCst);
        debug!(binder = %configuration.name(), native, "in-memory binder created");
        Ok(Arc::new(MessageBinder::new(
            Arc::clone(transport),
            Arc::new(DefaultClock),
        )))
    }
}
