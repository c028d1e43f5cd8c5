//! Service-level binder errors.

use crate::binder::domain::{BinderDomainError, BindingDirection, BindingId, BindingState};
use crate::binder::ports::TransportError;
use crate::envelope::EnvelopeError;
use std::sync::Arc;
use thiserror::Error;

/// Result type for binder operations.
pub type BinderResult<T> = Result<T, BinderError>;

/// Errors returned by binders and bindings.
#[derive(Debug, Clone, Error)]
pub enum BinderError {
    /// Binding properties or names are invalid.
    #[error(transparent)]
    Domain(#[from] BinderDomainError),

    /// Provisioning or endpoint construction failed. Any partially created
    /// transport resource was released first.
    #[error("failed to bind {direction} to '{destination}': {source}")]
    Binding {
        /// Destination being bound.
        destination: String,
        /// Producer or consumer.
        direction: BindingDirection,
        /// Transport failure.
        #[source]
        source: TransportError,
    },

    /// The binding no longer holds a transport endpoint.
    #[error("binding {id} to '{destination}' is not active (state: {state})")]
    BindingNotActive {
        /// Binding identifier.
        id: BindingId,
        /// Bound destination.
        destination: String,
        /// Current lifecycle state.
        state: BindingState,
    },

    /// Raw header mode only carries byte payloads.
    #[error("header mode 'none' only accepts byte payloads, got {0}")]
    RawPayloadRequired(&'static str),

    /// Headers could not be embedded in the payload.
    #[error(transparent)]
    Envelope(#[from] EnvelopeError),

    /// A JSON payload could not be serialized.
    #[error("failed to serialize JSON payload: {0}")]
    Serialization(Arc<serde_json::Error>),

    /// Releasing a transport endpoint failed.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The result stream adapter is not running.
    #[error("result stream adapter is not running")]
    AdapterStopped,
}

impl BinderError {
    pub(super) fn binding(
        destination: &impl ToString,
        direction: BindingDirection,
        source: TransportError,
    ) -> Self {
        Self::Binding {
            destination: destination.to_string(),
            direction,
            source,
        }
    }
}
