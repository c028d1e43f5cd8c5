//! Schema registry port.

use crate::schema::domain::{SchemaDomainError, SchemaReference, SchemaRegistration, Subject};
use apache_avro::Schema;
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Result type for schema registry operations.
pub type SchemaRegistryResult<T> = Result<T, SchemaRegistryError>;

/// Registers and resolves schemas.
#[async_trait]
pub trait SchemaRegistryClient: Send + Sync {
    /// Registers `schema` under `subject`.
    ///
    /// Registering content identical to an existing version of the subject
    /// returns that version; otherwise the next version is allocated.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaRegistryError`] when the registry rejects the schema
    /// or cannot be reached.
    async fn register(
        &self,
        subject: &Subject,
        schema: &Schema,
    ) -> SchemaRegistryResult<SchemaRegistration>;

    /// Fetches the schema named by `reference`.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaRegistryError::SchemaNotFound`] when no such schema
    /// exists.
    async fn fetch(&self, reference: &SchemaReference) -> SchemaRegistryResult<Schema>;

    /// Fetches a schema by its registry-wide id.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaRegistryError::SchemaNotFound`] when the id is unknown.
    async fn fetch_by_id(&self, id: u32) -> SchemaRegistryResult<Schema>;
}

#[async_trait]
impl<T: SchemaRegistryClient + ?Sized> SchemaRegistryClient for Arc<T> {
    async fn register(
        &self,
        subject: &Subject,
        schema: &Schema,
    ) -> SchemaRegistryResult<SchemaRegistration> {
        self.as_ref().register(subject, schema).await
    }

    async fn fetch(&self, reference: &SchemaReference) -> SchemaRegistryResult<Schema> {
        self.as_ref().fetch(reference).await
    }

    async fn fetch_by_id(&self, id: u32) -> SchemaRegistryResult<Schema> {
        self.as_ref().fetch_by_id(id).await
    }
}

/// Errors returned by schema registry clients.
#[derive(Debug, Clone, Error)]
pub enum SchemaRegistryError {
    /// No schema matches the reference or id.
    #[error("schema not found: {0}")]
    SchemaNotFound(String),

    /// The registry answered with a non-success status.
    #[error("schema registry returned HTTP status {status}")]
    Http {
        /// HTTP status code.
        status: u16,
    },

    /// The schema definition could not be parsed.
    #[error("invalid schema definition: {0}")]
    InvalidSchema(Arc<dyn std::error::Error + Send + Sync>),

    /// The registry response lacks a required field.
    #[error("invalid schema registry response: {0}")]
    InvalidResponse(String),

    /// The registry returned values that are not valid references.
    #[error(transparent)]
    Domain(#[from] SchemaDomainError),

    /// The registry could not be reached.
    #[error("schema registry transport error: {0}")]
    Transport(Arc<dyn std::error::Error + Send + Sync>),

    /// Local registry state could not be accessed.
    #[error("schema registry state error: {0}")]
    State(Arc<dyn std::error::Error + Send + Sync>),
}

impl SchemaRegistryError {
    /// Wraps a schema parse failure.
    pub fn invalid_schema(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::InvalidSchema(Arc::new(err))
    }

    /// Wraps a transport failure.
    pub fn transport(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Transport(Arc::new(err))
    }

    /// Wraps a local state failure such as lock poisoning.
    pub fn state(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::State(Arc::new(err))
    }
}
