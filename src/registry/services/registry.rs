//! Binder registry: resolves configuration names to cached binders.

use super::{BinderRegistryError, BinderRegistryResult, BinderTypeTable};
use crate::binder::services::Binder;
use crate::registry::{
    domain::{
        BinderConfiguration, BinderManifest, BinderName, RegistryDomainError, StreamConfiguration,
    },
    ports::{BinderFactory, ManifestLocator},
};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};

/// Process-scoped owner of every binder instance.
///
/// Binders are created on first request and cached by configuration name,
/// so a default request and a request by name share one instance. When no
/// configuration is supplied, every manifest type acts as a configuration
/// of the same name with empty properties.
pub struct BinderRegistry {
    manifest: BinderManifest,
    types: BinderTypeTable,
    configurations: Vec<BinderConfiguration>,
    default_binder: Option<BinderName>,
    instances: Mutex<HashMap<BinderName, Arc<dyn Binder>>>,
}

impl BinderRegistry {
    /// Creates a registry over a merged manifest.
    #[must_use]
    pub fn new(manifest: BinderManifest, types: BinderTypeTable) -> Self {
        Self {
            manifest,
            types,
            configurations: Vec::new(),
            default_binder: None,
            instances: Mutex::new(HashMap::new()),
        }
    }

    /// Creates a registry from every manifest resource `locator` finds.
    ///
    /// # Errors
    ///
    /// Returns [`BinderRegistryError::Manifest`] when a resource cannot be
    /// read and [`BinderRegistryError::Domain`] for malformed or duplicate
    /// manifest entries.
    pub fn discover(
        locator: &dyn ManifestLocator,
        types: BinderTypeTable,
    ) -> BinderRegistryResult<Self> {
        let mut manifest = BinderManifest::new();
        for resource in locator.locate()? {
            manifest.merge(BinderManifest::parse(&resource.origin, &resource.content)?)?;
        }
        info!(binder_types = manifest.len(), "binder manifest loaded");
        Ok(Self::new(manifest, types))
    }

    /// Adds an explicit binder configuration.
    ///
    /// # Errors
    ///
    /// Returns [`BinderRegistryError::Domain`] when a configuration with the
    /// same name exists.
    pub fn with_configuration(
        mut self,
        configuration: BinderConfiguration,
    ) -> BinderRegistryResult<Self> {
        if self
            .configurations
            .iter()
            .any(|existing| existing.name() == configuration.name())
        {
            return Err(RegistryDomainError::DuplicateBinderConfiguration(
                configuration.name().to_string(),
            )
            .into());
        }
        self.configurations.push(configuration);
        Ok(self)
    }

    /// Names the binder that serves default requests.
    #[must_use]
    pub fn with_default_binder(mut self, name: BinderName) -> Self {
        self.default_binder = Some(name);
        self
    }

    /// Applies the binder section of a stream configuration.
    ///
    /// # Errors
    ///
    /// Returns [`BinderRegistryError::Domain`] for invalid or duplicate
    /// binder names.
    pub fn configure(self, configuration: &StreamConfiguration) -> BinderRegistryResult<Self> {
        let default_binder = configuration.default_binder()?;
        let mut registry = configuration
            .binder_configurations()?
            .into_iter()
            .try_fold(self, Self::with_configuration)?;
        if let Some(name) = default_binder {
            registry = registry.with_default_binder(name);
        }
        Ok(registry)
    }

    /// Returns the merged manifest.
    #[must_use]
    pub const fn manifest(&self) -> &BinderManifest {
        &self.manifest
    }

    /// Returns the configurations requests are resolved against.
    #[must_use]
    pub fn configurations(&self) -> Vec<BinderConfiguration> {
        if self.configurations.is_empty() {
            return self
                .manifest
                .entries()
                .iter()
                .map(|entry| BinderConfiguration::implicit(entry.binder_type()))
                .collect();
        }
        self.configurations.clone()
    }

    /// Returns the binder for `name`, creating it on first use.
    ///
    /// `None` and a blank name both request the default binder: the
    /// configured default when set, otherwise the only default candidate.
    ///
    /// # Errors
    ///
    /// Returns [`BinderRegistryError::NoBinderConfigured`] when nothing is
    /// configured, [`BinderRegistryError::AmbiguousDefaultBinder`] when a
    /// default is requested without a single candidate,
    /// [`BinderRegistryError::UnknownBinder`] for unknown names,
    /// [`BinderRegistryError::UnknownBinderType`] when no registered
    /// implementation backs the binder type, and factory failures.
    pub async fn get_binder(&self, name: Option<&str>) -> BinderRegistryResult<Arc<dyn Binder>> {
        let configuration = match BinderName::optional(name)? {
            Some(requested) => self
                .configuration(&requested)
                .ok_or_else(|| BinderRegistryError::UnknownBinder(requested.to_string()))?,
            None => self.default_configuration()?,
        };

        let mut instances = self.instances.lock().await;
        if let Some(existing) = instances.get(configuration.name()) {
            return Ok(Arc::clone(existing));
        }
        let (implementation, factory) = self.factory_for(&configuration)?;
        let binder = factory.create(&configuration).await?;
        info!(
            binder = %configuration.name(),
            binder_type = %configuration.binder_type(),
            implementation = %implementation,
            "binder created"
        );
        instances.insert(configuration.name().clone(), Arc::clone(&binder));
        Ok(binder)
    }

    /// Closes every binder created so far and forgets them.
    ///
    /// # Errors
    ///
    /// Returns the first close failure after closing every binder.
    pub async fn close(&self) -> BinderRegistryResult<()> {
        let instances = std::mem::take(&mut *self.instances.lock().await);
        let mut first_failure = None;
        for (name, binder) in instances {
            if let Err(err) = binder.close().await {
                warn!(binder = %name, error = %err, "failed to close binder");
                first_failure.get_or_insert(err);
            }
        }
        first_failure.map_or(Ok(()), |err| Err(err.into()))
    }

    fn configuration(&self, name: &BinderName) -> Option<BinderConfiguration> {
        self.configurations
            .iter()
            .find(|configuration| configuration.name() == name)
            .cloned()
            .or_else(|| {
                self.manifest
                    .get(name)
                    .map(|entry| BinderConfiguration::implicit(entry.binder_type()))
            })
    }

    fn default_configuration(&self) -> BinderRegistryResult<BinderConfiguration> {
        if let Some(name) = &self.default_binder {
            return self
                .configuration(name)
                .ok_or_else(|| BinderRegistryError::UnknownBinder(name.to_string()));
        }
        let configured = self.configurations();
        if configured.is_empty() {
            return Err(BinderRegistryError::NoBinderConfigured);
        }
        let mut candidates: Vec<BinderConfiguration> = configured
            .iter()
            .filter(|configuration| configuration.is_default_candidate())
            .cloned()
            .collect();
        if candidates.len() == 1
            && let Some(only) = candidates.pop()
        {
            return Ok(only);
        }
        let names = if candidates.is_empty() {
            configured
        } else {
            candidates
        };
        Err(BinderRegistryError::AmbiguousDefaultBinder(
            names
                .iter()
                .map(|configuration| configuration.name().to_string())
                .collect(),
        ))
    }

    fn factory_for(
        &self,
        configuration: &BinderConfiguration,
    ) -> BinderRegistryResult<(String, Arc<dyn BinderFactory>)> {
        self.manifest
            .get(configuration.binder_type())
            .and_then(|entry| self.types.resolve(entry))
            .map(|(implementation, factory)| (implementation.to_owned(), factory))
            .ok_or_else(|| BinderRegistryError::UnknownBinderType {
                binder: configuration.name().to_string(),
                binder_type: configuration.binder_type().to_string(),
            })
    }
}

impl fmt::Debug for BinderRegistry {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("BinderRegistry")
            .field("manifest", &self.manifest)
            .field("types", &self.types)
            .field("configurations", &self.configurations)
            .field("default_binder", &self.default_binder)
            .finish_non_exhaustive()
    }
}
