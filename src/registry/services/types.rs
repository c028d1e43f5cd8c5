//! Startup-time table of binder implementations.

use crate::registry::{domain::ManifestEntry, ports::BinderFactory};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Maps the implementation identifiers named in manifests to factories.
///
/// Transport modules register their factories once at startup; manifests
/// then only reference them by identifier.
#[derive(Clone, Default)]
pub struct BinderTypeTable {
    factories: HashMap<String, Arc<dyn BinderFactory>>,
}

impl BinderTypeTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns this table with one more implementation.
    #[must_use]
    pub fn with(mut self, implementation: impl Into<String>, factory: Arc<dyn BinderFactory>) -> Self {
        self.register(implementation, factory);
        self
    }

    /// Registers an implementation, replacing any factory with the same
    /// identifier.
    pub fn register(&mut self, implementation: impl Into<String>, factory: Arc<dyn BinderFactory>) {
        self.factories.insert(implementation.into(), factory);
    }

    /// Returns whether `implementation` is registered.
    #[must_use]
    pub fn contains(&self, implementation: &str) -> bool {
        self.factories.contains_key(implementation)
    }

    /// Returns the factory of the first registered implementation the
    /// manifest entry lists.
    #[must_use]
    pub fn resolve<'a>(
        &self,
        entry: &'a ManifestEntry,
    ) -> Option<(&'a str, Arc<dyn BinderFactory>)> {
        entry.implementations().iter().find_map(|implementation| {
            self.factories
                .get(implementation)
                .map(|factory| (implementation.as_str(), Arc::clone(factory)))
        })
    }
}

impl fmt::Debug for BinderTypeTable {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut implementations: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        implementations.sort_unstable();
        formatter
            .debug_struct("BinderTypeTable")
            .field("implementations", &implementations)
            .finish()
    }
}
