//! Error types for schema domain validation.

use thiserror::Error;

/// Errors returned when constructing schema domain values.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SchemaDomainError {
    /// The subject is empty after trimming.
    #[error("schema subject must not be empty")]
    EmptySubject,

    /// The subject contains characters that cannot appear in a content type.
    #[error("invalid schema subject: {0}")]
    InvalidSubject(String),

    /// Schema versions start at 1.
    #[error("schema version must be positive, got {0}")]
    InvalidVersion(u32),

    /// The format tag is empty.
    #[error("schema format must not be empty")]
    EmptyFormat,
}
