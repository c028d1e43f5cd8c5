//! Inbound message handler port.

use crate::message::domain::Message;
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Application callback for messages received by a consumer binding.
///
/// A failed handling is retried according to the binding's retry policy. A
/// successful handling is never re-delivered.
///
/// A handler may unbind the binding it serves. The unbind returns once the
/// other workers have stopped; no further message reaches the handler after
/// the current one.
#[async_trait]
pub trait MessageHandler: Send + Sync {
    /// Handles one message.
    ///
    /// # Errors
    ///
    /// Returns [`HandlerError`] when the message could not be processed.
    async fn handle(&self, message: Message) -> Result<(), HandlerError>;
}

/// Error returned by a message handler.
#[derive(Debug, Clone, Error)]
#[error("message handler failed: {0}")]
pub struct HandlerError(Arc<dyn std::error::Error + Send + Sync>);

impl HandlerError {
    /// Wraps a handler failure.
    pub fn new(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self(Arc::new(err))
    }

    /// Builds a handler failure from a description.
    pub fn message(description: impl Into<String>) -> Self {
        Self::new(std::io::Error::other(description.into()))
    }
}
