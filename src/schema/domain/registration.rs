//! Result of registering a schema.

use super::SchemaReference;

/// Reference assigned by the registry plus its global id, when the registry
/// reports one.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SchemaRegistration {
    reference: SchemaReference,
    id: Option<u32>,
}

impl SchemaRegistration {
    /// Creates a registration result.
    #[must_use]
    pub const fn new(reference: SchemaReference, id: Option<u32>) -> Self {
        Self { reference, id }
    }

    /// Returns the schema reference.
    #[must_use]
    pub const fn reference(&self) -> &SchemaReference {
        &self.reference
    }

    /// Returns the registry-wide schema id.
    #[must_use]
    pub const fn id(&self) -> Option<u32> {
        self.id
    }

    /// Consumes the registration, returning the reference.
    #[must_use]
    pub fn into_reference(self) -> SchemaReference {
        self.reference
    }
}
