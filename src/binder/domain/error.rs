//! Error types for binding validation and lifecycle transitions.

use crate::partition::PartitionError;
use thiserror::Error;

/// Errors returned while constructing or transitioning binding domain values.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BinderDomainError {
    /// The destination name is empty after trimming.
    #[error("destination name must not be empty")]
    EmptyDestination,

    /// The destination name contains whitespace or control characters.
    #[error("destination name '{0}' contains whitespace or control characters")]
    InvalidDestination(String),

    /// The consumer group contains whitespace or control characters.
    #[error("consumer group '{0}' contains whitespace or control characters")]
    InvalidGroup(String),

    /// A binding property has a value the binder cannot use.
    #[error("invalid value '{value}' for binding property '{key}': {reason}")]
    InvalidProperty {
        /// Property key.
        key: String,
        /// Offending value.
        value: String,
        /// Why the value was rejected.
        reason: String,
    },

    /// Partition settings are invalid.
    #[error(transparent)]
    Partition(#[from] PartitionError),

    /// Transitioning between two lifecycle states is invalid.
    #[error("invalid binding lifecycle transition: {from} -> {to}")]
    InvalidLifecycleTransition {
        /// Current lifecycle state.
        from: String,
        /// Requested target lifecycle state.
        to: String,
    },
}

impl BinderDomainError {
    pub(crate) fn invalid_property(
        key: &str,
        value: &str,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidProperty {
            key: key.to_owned(),
            value: value.to_owned(),
            reason: reason.into(),
        }
    }
}

/// Error returned when parsing an unknown binding state.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown binding state: {0}")]
pub struct ParseBindingStateError(pub String);
