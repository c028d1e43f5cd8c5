//! Error types for message domain validation and parsing.

use thiserror::Error;

/// Errors returned while constructing message domain values.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MessageDomainError {
    /// The content type is not of the form `type/subtype`.
    #[error("invalid content type '{0}'")]
    InvalidContentType(String),

    /// A header that must hold text holds a non-text value.
    #[error("header '{name}' must hold a text value")]
    NonTextHeader {
        /// Header name.
        name: String,
    },
}
