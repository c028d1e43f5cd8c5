//! Transport port implemented by broker integrations.

use crate::binder::domain::{ConsumerGroup, DestinationName};
use crate::envelope::EmbeddedHeaders;
use crate::partition::PartitionCount;
use async_trait::async_trait;
use bytes::Bytes;
use std::num::NonZeroUsize;
use std::sync::Arc;
use thiserror::Error;

/// Result type for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;

/// One record as the transport sees it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportRecord {
    /// Serialized payload, possibly carrying embedded headers.
    pub payload: Bytes,
    /// Headers carried natively by the transport.
    pub headers: EmbeddedHeaders,
    /// Target partition for partitioned destinations.
    pub partition: Option<u32>,
}

impl TransportRecord {
    /// Creates an unpartitioned record without native headers.
    #[must_use]
    pub const fn new(payload: Bytes) -> Self {
        Self {
            payload,
            headers: EmbeddedHeaders::new(),
            partition: None,
        }
    }
}

/// A consumer subscription resolved by provisioning.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Subscription {
    /// Destination the subscription reads from.
    pub destination: DestinationName,
    /// Transport-level subscription name.
    pub name: String,
    /// Whether the transport generated the subscription for one consumer.
    pub anonymous: bool,
}

/// Broker integration behind a binder.
///
/// Provisioning calls are idempotent: provisioning an existing destination
/// or group subscription succeeds.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Returns whether records carry headers natively.
    fn supports_native_headers(&self) -> bool;

    /// Ensures the destination exists for publishing.
    async fn provision_producer_destination(
        &self,
        destination: &DestinationName,
        partitions: Option<PartitionCount>,
    ) -> TransportResult<()>;

    /// Ensures a subscription exists for consuming.
    ///
    /// A named group shares one competing subscription. Without a group the
    /// transport creates a unique subscription that sees every record.
    async fn provision_consumer_destination(
        &self,
        destination: &DestinationName,
        group: Option<&ConsumerGroup>,
    ) -> TransportResult<Subscription>;

    /// Releases a subscription created for a consumer that never started.
    async fn release_subscription(&self, subscription: &Subscription) -> TransportResult<()>;

    /// Creates a producer for the destination. The producer is not started.
    async fn create_producer(
        &self,
        destination: &DestinationName,
        listener: Arc<dyn TransportListener>,
    ) -> TransportResult<Box<dyn TransportProducer>>;

    /// Creates a consumer feeding `sink` with up to `concurrency` records at
    /// a time. The consumer is not started.
    async fn create_consumer(
        &self,
        subscription: &Subscription,
        concurrency: NonZeroUsize,
        sink: Arc<dyn RecordSink>,
        listener: Arc<dyn TransportListener>,
    ) -> TransportResult<Box<dyn TransportEndpoint>>;
}

/// Start and stop control shared by producers and consumers.
#[async_trait]
pub trait TransportEndpoint: Send + Sync {
    /// Starts the endpoint.
    async fn start(&self) -> TransportResult<()>;

    /// Stops the endpoint and releases its resources.
    async fn stop(&self) -> TransportResult<()>;
}

/// Publishing endpoint.
#[async_trait]
pub trait TransportProducer: TransportEndpoint {
    /// Publishes one record.
    async fn send(&self, record: TransportRecord) -> TransportResult<()>;
}

/// Receives records delivered by a consumer endpoint.
#[async_trait]
pub trait RecordSink: Send + Sync {
    /// Processes one record. Returns once processing, including retries,
    /// has finished.
    async fn accept(&self, record: TransportRecord);
}

/// Receives asynchronous transport failures.
#[async_trait]
pub trait TransportListener: Send + Sync {
    /// Called when the endpoint fails outside a caller's request.
    async fn on_failure(&self, error: TransportError);
}

/// Errors returned by transports.
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    /// The broker connection failed.
    #[error("transport connection failed: {0}")]
    Connection(String),

    /// The broker rejected a request for a destination.
    #[error("destination '{destination}' rejected the request: {reason}")]
    Rejected {
        /// Affected destination.
        destination: String,
        /// Rejection reason.
        reason: String,
    },

    /// Generic runtime failure.
    #[error("transport runtime error: {0}")]
    Runtime(Arc<dyn std::error::Error + Send + Sync>),
}

impl TransportError {
    /// Wraps a runtime error from a transport adapter.
    pub fn runtime(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Runtime(Arc::new(err))
    }

    /// Builds a rejection for `destination`.
    pub fn rejected(destination: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Rejected {
            destination: destination.into(),
            reason: reason.into(),
        }
    }
}
