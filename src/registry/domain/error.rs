//! Error types for binder registry domain validation.

use thiserror::Error;

/// Errors returned while building registry domain values.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RegistryDomainError {
    /// The binder name is empty after trimming.
    #[error("binder name must not be empty")]
    EmptyBinderName,

    /// The binder name contains characters outside `[A-Za-z0-9._-]`.
    #[error(
        "binder name '{0}' contains invalid characters (only alphanumerics, '.', '_' and '-' allowed)"
    )]
    InvalidBinderName(String),

    /// A manifest line is not of the form `name=implementation[,...]`.
    #[error("invalid binder manifest line {line} in {origin}: '{content}'")]
    InvalidManifestLine {
        /// Resource the line was read from.
        origin: String,
        /// One-based line number.
        line: usize,
        /// The offending line.
        content: String,
    },

    /// The same binder type is declared twice across manifest resources.
    #[error("binder type '{name}' is declared in both {first} and {second}")]
    DuplicateManifestEntry {
        /// Duplicated binder type.
        name: String,
        /// Resource of the first declaration.
        first: String,
        /// Resource of the second declaration.
        second: String,
    },

    /// Two binder configurations share a name.
    #[error("binder configuration '{0}' is defined more than once")]
    DuplicateBinderConfiguration(String),
}
