//! Binder configurations and the declarative stream configuration.

use super::{BinderName, RegistryDomainError};
use crate::binder::domain::PropertyBag;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A named binder instance: which binder type to create and with which
/// properties.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinderConfiguration {
    name: BinderName,
    binder_type: BinderName,
    properties: PropertyBag,
    default_candidate: bool,
}

impl BinderConfiguration {
    /// Creates a configuration that may serve default requests.
    #[must_use]
    pub const fn new(name: BinderName, binder_type: BinderName, properties: PropertyBag) -> Self {
        Self {
            name,
            binder_type,
            properties,
            default_candidate: true,
        }
    }

    /// Creates the configuration implied by a manifest type when nothing is
    /// configured explicitly.
    #[must_use]
    pub fn implicit(binder_type: &BinderName) -> Self {
        Self::new(binder_type.clone(), binder_type.clone(), PropertyBag::new())
    }

    /// Excludes or includes this configuration when resolving the default
    /// binder.
    #[must_use]
    pub const fn with_default_candidate(mut self, default_candidate: bool) -> Self {
        self.default_candidate = default_candidate;
        self
    }

    /// Returns the configuration name.
    #[must_use]
    pub const fn name(&self) -> &BinderName {
        &self.name
    }

    /// Returns the binder type declared in the manifest.
    #[must_use]
    pub const fn binder_type(&self) -> &BinderName {
        &self.binder_type
    }

    /// Returns the binder properties.
    #[must_use]
    pub const fn properties(&self) -> &PropertyBag {
        &self.properties
    }

    /// Returns whether the configuration may serve default requests.
    #[must_use]
    pub const fn is_default_candidate(&self) -> bool {
        self.default_candidate
    }
}

const fn default_candidate() -> bool {
    true
}

/// Binder section of a [`StreamConfiguration`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BinderSpec {
    /// Manifest binder type.
    #[serde(rename = "type")]
    pub binder_type: String,
    /// Properties handed to the binder factory.
    #[serde(default)]
    pub properties: PropertyBag,
    /// Whether the binder may serve default requests.
    #[serde(default = "default_candidate")]
    pub default_candidate: bool,
}

/// Channel section of a [`StreamConfiguration`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BindingSpec {
    /// Destination name; the channel name when absent.
    #[serde(default)]
    pub destination: Option<String>,
    /// Binder configuration name; the default binder when absent.
    #[serde(default)]
    pub binder: Option<String>,
    /// Consumer group; anonymous when absent.
    #[serde(default)]
    pub group: Option<String>,
    /// Default content type for produced messages.
    #[serde(default)]
    pub content_type: Option<String>,
    /// Producer binding properties.
    #[serde(default)]
    pub producer: PropertyBag,
    /// Consumer binding properties.
    #[serde(default)]
    pub consumer: PropertyBag,
}

/// Declarative description of binders and channel bindings.
///
/// The crate only consumes this shape; reading it from files or the
/// environment is up to the application.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamConfiguration {
    /// Binder used for default requests when several are configured.
    #[serde(default)]
    pub default_binder: Option<String>,
    /// Binder configurations by name.
    #[serde(default)]
    pub binders: BTreeMap<String, BinderSpec>,
    /// Channel bindings by channel name.
    #[serde(default)]
    pub bindings: BTreeMap<String, BindingSpec>,
}

impl StreamConfiguration {
    /// Validates and returns the binder configurations.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryDomainError`] when a binder name or type is
    /// invalid, or when two names collide after trimming.
    pub fn binder_configurations(&self) -> Result<Vec<BinderConfiguration>, RegistryDomainError> {
        let mut configurations: Vec<BinderConfiguration> = Vec::with_capacity(self.binders.len());
        for (name, spec) in &self.binders {
            let configuration = BinderConfiguration::new(
                BinderName::new(name)?,
                BinderName::new(&spec.binder_type)?,
                spec.properties.clone(),
            )
            .with_default_candidate(spec.default_candidate);
            if configurations
                .iter()
                .any(|existing| existing.name == configuration.name)
            {
                return Err(RegistryDomainError::DuplicateBinderConfiguration(
                    configuration.name.to_string(),
                ));
            }
            configurations.push(configuration);
        }
        Ok(configurations)
    }

    /// Returns the validated default binder name, if set and not blank.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryDomainError::InvalidBinderName`] for an invalid
    /// name.
    pub fn default_binder(&self) -> Result<Option<BinderName>, RegistryDomainError> {
        BinderName::optional(self.default_binder.as_deref())
    }

    /// Returns the binding declared for `channel`.
    #[must_use]
    pub fn binding(&self, channel: &str) -> Option<&BindingSpec> {
        self.bindings.get(channel)
    }
}
