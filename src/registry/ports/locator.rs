//! Manifest locator port.

use std::sync::Arc;
use thiserror::Error;

/// Relative name of the manifest resource inside each search-path entry.
pub const MANIFEST_RESOURCE: &str = "META-INF/stream.binders";

/// Raw contents of one manifest resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestResource {
    /// Where the resource was found, used in error messages.
    pub origin: String,
    /// Manifest text.
    pub content: String,
}

impl ManifestResource {
    /// Creates a resource.
    #[must_use]
    pub fn new(origin: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            origin: origin.into(),
            content: content.into(),
        }
    }
}

/// Finds every binder manifest resource.
pub trait ManifestLocator: Send + Sync {
    /// Returns the manifest resources in search order.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestLocatorError`] when a resource exists but cannot be
    /// read.
    fn locate(&self) -> Result<Vec<ManifestResource>, ManifestLocatorError>;
}

/// Errors returned while locating manifests.
#[derive(Debug, Clone, Error)]
pub enum ManifestLocatorError {
    /// A manifest resource could not be read.
    #[error("failed to read binder manifest {origin}: {source}")]
    Unreadable {
        /// Resource location.
        origin: String,
        /// Underlying I/O failure.
        #[source]
        source: Arc<std::io::Error>,
    },
}

impl ManifestLocatorError {
    /// Wraps a read failure for `origin`.
    pub fn unreadable(origin: impl Into<String>, source: std::io::Error) -> Self {
        Self::Unreadable {
            origin: origin.into(),
            source: Arc::new(source),
        }
    }
}
