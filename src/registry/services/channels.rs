//! Binds named channels as declared in a stream configuration.

use super::{BinderRegistry, BinderRegistryResult};
use crate::binder::{
    domain::{BinderDomainError, ConsumerProperties, ProducerProperties},
    ports::MessageHandler,
    services::{Binder, BinderError, Binding, ProducerBinding},
};
use crate::message::domain::ContentType;
use crate::registry::domain::{BindingSpec, StreamConfiguration};
use std::sync::Arc;
use tracing::debug;

const CONTENT_TYPE_PROPERTY: &str = "contentType";

/// Resolves channel declarations to destinations, groups, binders and
/// binding properties.
///
/// A channel without a declaration binds a destination of the same name on
/// the default binder with default properties.
#[derive(Debug)]
pub struct ChannelBindingService {
    registry: Arc<BinderRegistry>,
    configuration: StreamConfiguration,
}

impl ChannelBindingService {
    /// Creates a service over `registry`.
    #[must_use]
    pub const fn new(registry: Arc<BinderRegistry>, configuration: StreamConfiguration) -> Self {
        Self {
            registry,
            configuration,
        }
    }

    /// Returns the registry binders are resolved from.
    #[must_use]
    pub const fn registry(&self) -> &Arc<BinderRegistry> {
        &self.registry
    }

    /// Binds `channel` as a producer.
    ///
    /// # Errors
    ///
    /// Returns registry errors when the binder cannot be resolved, and
    /// [`super::BinderRegistryError::Binder`] for invalid binding properties
    /// or transport failures.
    pub async fn bind_producer(&self, channel: &str) -> BinderRegistryResult<ProducerBinding> {
        let spec = self.spec(channel);
        let mut properties =
            ProducerProperties::from_properties(&spec.producer).map_err(BinderError::from)?;
        if let Some(raw) = spec.content_type.as_deref() {
            let content_type = ContentType::parse(raw).map_err(|err| {
                BinderError::from(BinderDomainError::invalid_property(
                    CONTENT_TYPE_PROPERTY,
                    raw,
                    err.to_string(),
                ))
            })?;
            properties = properties.with_content_type(content_type);
        }
        let binder = self.binder(&spec).await?;
        let destination = destination(channel, &spec);
        debug!(channel, destination, "binding producer channel");
        Ok(binder.bind_producer(destination, properties).await?)
    }

    /// Binds `channel` as a consumer feeding `handler`.
    ///
    /// # Errors
    ///
    /// Returns registry errors when the binder cannot be resolved, and
    /// [`super::BinderRegistryError::Binder`] for invalid binding properties
    /// or transport failures.
    pub async fn bind_consumer(
        &self,
        channel: &str,
        handler: Arc<dyn MessageHandler>,
    ) -> BinderRegistryResult<Binding> {
        let spec = self.spec(channel);
        let properties =
            ConsumerProperties::from_properties(&spec.consumer).map_err(BinderError::from)?;
        let binder = self.binder(&spec).await?;
        let destination = destination(channel, &spec);
        debug!(channel, destination, group = ?spec.group, "binding consumer channel");
        Ok(binder
            .bind_consumer(destination, spec.group.as_deref(), handler, properties)
            .await?)
    }

    /// Unbinds a binding created for `channel`.
    ///
    /// # Errors
    ///
    /// Returns registry errors when the binder cannot be resolved and
    /// binder errors when the endpoint fails to stop.
    pub async fn unbind(&self, channel: &str, binding: &Binding) -> BinderRegistryResult<()> {
        let spec = self.spec(channel);
        let binder = self.binder(&spec).await?;
        Ok(binder.unbind(binding).await?)
    }

    fn spec(&self, channel: &str) -> BindingSpec {
        self.configuration
            .binding(channel)
            .cloned()
            .unwrap_or_default()
    }

    async fn binder(&self, spec: &BindingSpec) -> BinderRegistryResult<Arc<dyn Binder>> {
        self.registry.get_binder(spec.binder.as_deref()).await
    }
}

fn destination<'a>(channel: &'a str, spec: &'a BindingSpec) -> &'a str {
    spec.destination
        .as_deref()
        .filter(|name| !name.trim().is_empty())
        .unwrap_or(channel)
}
