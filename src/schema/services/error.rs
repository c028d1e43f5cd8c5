//! Error types for the Avro payload codec.

use crate::message::domain::MessageDomainError;
use crate::schema::domain::SchemaDomainError;
use crate::schema::ports::SchemaRegistryError;
use std::sync::Arc;
use thiserror::Error;

/// Result type for codec operations.
pub type SchemaCodecResult<T> = Result<T, SchemaCodecError>;

/// Errors returned by [`super::AvroSchemaCodec`].
#[derive(Debug, Clone, Error)]
pub enum SchemaCodecError {
    /// No schema is known for the payload and it cannot be generated.
    #[error("schema not found: {0}")]
    SchemaNotFound(String),

    /// The inbound content type does not name a schema reference.
    #[error("content type {0} does not carry a schema reference")]
    MissingSchemaReference(String),

    /// The content type is not an Avro content type.
    #[error("unsupported content type: {0}")]
    UnsupportedContentType(String),

    /// The message has no content type to negotiate with.
    #[error("message has no content type")]
    MissingContentType,

    /// The payload is not binary.
    #[error("expected a binary payload, got {0}")]
    NonBinaryPayload(&'static str),

    /// The schema is not a named type and has no subject.
    #[error("schema has no name to derive a subject from")]
    UnnamedSchema,

    /// A decoded value is not a record.
    #[error("expected an Avro record, got {0}")]
    NotARecord(String),

    /// A schema could not be derived from the payload's shape.
    #[error("cannot infer a schema for {type_name}: {reason}")]
    SchemaInference {
        /// Fully qualified type name.
        type_name: String,
        /// Why inference failed.
        reason: String,
    },

    /// Avro serialization, deserialization or schema resolution failed.
    #[error("avro error: {0}")]
    Avro(Arc<apache_avro::Error>),

    /// Schema files could not be read.
    #[error("cannot read schema locations: {0}")]
    SchemaLocation(Arc<std::io::Error>),

    /// Schema registry failure other than a missing schema.
    #[error(transparent)]
    Registry(SchemaRegistryError),

    /// A schema reference or subject is invalid.
    #[error(transparent)]
    Domain(#[from] SchemaDomainError),

    /// A content type is invalid.
    #[error(transparent)]
    Message(#[from] MessageDomainError),
}

impl SchemaCodecError {
    /// Wraps an Avro error.
    #[must_use]
    pub fn avro(err: apache_avro::Error) -> Self {
        Self::Avro(Arc::new(err))
    }

    /// Wraps an I/O error raised while scanning schema locations.
    #[must_use]
    pub fn schema_location(err: std::io::Error) -> Self {
        Self::SchemaLocation(Arc::new(err))
    }
}

impl From<SchemaRegistryError> for SchemaCodecError {
    fn from(err: SchemaRegistryError) -> Self {
        match err {
            SchemaRegistryError::SchemaNotFound(what) => Self::SchemaNotFound(what),
            other => Self::Registry(other),
        }
    }
}
