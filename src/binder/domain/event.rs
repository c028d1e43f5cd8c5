//! Asynchronous binder notifications.

use super::{BindingId, DestinationName};
use crate::message::domain::Message;
use bytes::Bytes;

/// Notification published on a binder's event channel.
///
/// Failures that happen outside a caller's request, such as a lost broker
/// connection, are reported here rather than returned from `send`.
#[derive(Debug, Clone, PartialEq)]
pub enum BinderEvent {
    /// The transport failed while the binding was active. The binding is now
    /// failed.
    TransportFailure {
        /// Affected binding.
        binding: BindingId,
        /// Bound destination.
        destination: DestinationName,
        /// Transport error description.
        reason: String,
    },
    /// An inbound payload had undecodable embedded headers.
    MalformedEnvelope {
        /// Consuming binding.
        binding: BindingId,
        /// Bound destination.
        destination: DestinationName,
        /// Decoder error description, including the failing offset.
        reason: String,
        /// The payload exactly as received.
        raw: Bytes,
    },
    /// A handler kept failing after every configured delivery attempt.
    DeliveryFailed {
        /// Consuming binding.
        binding: BindingId,
        /// Bound destination.
        destination: DestinationName,
        /// Attempts made.
        attempts: u32,
        /// Last handler error description.
        reason: String,
        /// The undelivered message.
        message: Box<Message>,
    },
}

impl BinderEvent {
    /// Returns the binding the event concerns.
    #[must_use]
    pub const fn binding(&self) -> BindingId {
        match self {
            Self::TransportFailure { binding, .. }
            | Self::MalformedEnvelope { binding, .. }
            | Self::DeliveryFailed { binding, .. } => *binding,
        }
    }
}
