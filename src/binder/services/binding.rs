//! Binding handles and their lifecycle.

use super::{BinderError, BinderResult, outbound::OutboundPipeline};
use crate::binder::{
    domain::{
        BinderEvent, BindingDescriptor, BindingDirection, BindingId, BindingState,
        ConsumerGroup, DestinationName,
    },
    ports::{
        TransportEndpoint, TransportError, TransportListener, TransportProducer, TransportRecord,
    },
};
use crate::message::domain::Message;
use async_trait::async_trait;
use mockable::Clock;
use std::fmt;
use std::sync::{Arc, Weak};
use tokio::sync::{Mutex, RwLock, broadcast};
use tracing::{debug, error, warn};

/// Transport endpoint owned by an active binding.
pub(super) enum Endpoint {
    Producer(Box<dyn TransportProducer>),
    Consumer(Box<dyn TransportEndpoint>),
}

impl Endpoint {
    pub(super) async fn stop(&self) -> Result<(), TransportError> {
        match self {
            Self::Producer(producer) => producer.stop().await,
            Self::Consumer(consumer) => consumer.stop().await,
        }
    }
}

/// Handle to one producer or consumer attachment.
///
/// Clones share the same binding. Lifecycle transitions are serialized per
/// binding; the endpoint sits behind a read-write lock so a send racing an
/// unbind either completes against the live endpoint or observes the
/// binding as inactive.
#[derive(Clone)]
pub struct Binding {
    inner: Arc<BindingInner>,
}

struct BindingInner {
    id: BindingId,
    destination: DestinationName,
    group: Option<ConsumerGroup>,
    direction: BindingDirection,
    descriptor: Mutex<BindingDescriptor>,
    endpoint: RwLock<Option<Endpoint>>,
}

enum SendFailure {
    NotActive,
    Transport(TransportError),
}

impl Binding {
    pub(super) fn new(descriptor: BindingDescriptor) -> Self {
        Self {
            inner: Arc::new(BindingInner {
                id: descriptor.id(),
                destination: descriptor.destination().clone(),
                group: descriptor.group().cloned(),
                direction: descriptor.direction(),
                descriptor: Mutex::new(descriptor),
                endpoint: RwLock::new(None),
            }),
        }
    }

    /// Returns the binding identifier.
    #[must_use]
    pub fn id(&self) -> BindingId {
        self.inner.id
    }

    /// Returns the bound destination.
    #[must_use]
    pub fn destination(&self) -> &DestinationName {
        &self.inner.destination
    }

    /// Returns the consumer group; `None` for producers and anonymous
    /// consumers.
    #[must_use]
    pub fn group(&self) -> Option<&ConsumerGroup> {
        self.inner.group.as_ref()
    }

    /// Returns whether this binding publishes or consumes.
    #[must_use]
    pub fn direction(&self) -> BindingDirection {
        self.inner.direction
    }

    /// Returns the current lifecycle state.
    pub async fn state(&self) -> BindingState {
        self.inner.descriptor.lock().await.state()
    }

    /// Returns a snapshot of the binding descriptor.
    pub async fn descriptor(&self) -> BindingDescriptor {
        self.inner.descriptor.lock().await.clone()
    }

    pub(super) fn downgrade(&self) -> WeakBinding {
        WeakBinding(Arc::downgrade(&self.inner))
    }

    /// Installs the started endpoint and moves the binding to `active`.
    ///
    /// On failure the endpoint is released and the binding is failed.
    pub(super) async fn activate(
        &self,
        endpoint: Endpoint,
        clock: &impl Clock,
    ) -> BinderResult<()> {
        let mut descriptor = self.inner.descriptor.lock().await;
        *self.inner.endpoint.write().await = Some(endpoint);
        if let Err(err) = descriptor.mark_active(clock) {
            drop(descriptor);
            self.abandon(clock).await;
            return Err(err.into());
        }
        Ok(())
    }

    /// Releases whatever endpoint was installed and fails the binding.
    pub(super) async fn abandon(&self, clock: &impl Clock) {
        let mut descriptor = self.inner.descriptor.lock().await;
        self.release_endpoint().await;
        if let Err(err) = descriptor.mark_failed(clock) {
            debug!(binding = %self.inner.id, error = %err, "binding already terminal");
        }
    }

    /// Fails an active binding after a transport failure.
    ///
    /// Returns `false` when the binding was not active, so each failure is
    /// reported at most once.
    pub(super) async fn fail_active(&self, clock: &impl Clock) -> bool {
        let mut descriptor = self.inner.descriptor.lock().await;
        if !descriptor.state().is_active() || descriptor.mark_failed(clock).is_err() {
            return false;
        }
        self.release_endpoint().await;
        true
    }

    /// Stops an active binding. Any other state is left untouched.
    pub(super) async fn stop(&self, clock: &impl Clock) -> BinderResult<()> {
        let mut descriptor = self.inner.descriptor.lock().await;
        if !descriptor.state().is_active() {
            debug!(
                binding = %self.inner.id,
                state = %descriptor.state(),
                "unbind ignored for inactive binding"
            );
            return Ok(());
        }
        descriptor.mark_stopping(clock)?;
        let endpoint = self.inner.endpoint.write().await.take();
        let outcome = match endpoint {
            Some(active) => active.stop().await,
            None => Ok(()),
        };
        match outcome {
            Ok(()) => {
                descriptor.mark_stopped(clock)?;
                Ok(())
            }
            Err(err) => {
                descriptor.mark_failed(clock)?;
                Err(err.into())
            }
        }
    }

    async fn release_endpoint(&self) {
        let endpoint = self.inner.endpoint.write().await.take();
        if let Some(active) = endpoint
            && let Err(err) = active.stop().await
        {
            warn!(binding = %self.inner.id, error = %err, "failed to release transport endpoint");
        }
    }

    async fn send(&self, record: TransportRecord) -> Result<(), SendFailure> {
        let endpoint = self.inner.endpoint.read().await;
        let Some(Endpoint::Producer(producer)) = endpoint.as_ref() else {
            return Err(SendFailure::NotActive);
        };
        producer.send(record).await.map_err(SendFailure::Transport)
    }

    async fn not_active(&self) -> BinderError {
        BinderError::BindingNotActive {
            id: self.inner.id,
            destination: self.inner.destination.to_string(),
            state: self.state().await,
        }
    }
}

impl fmt::Debug for Binding {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Binding")
            .field("id", &self.inner.id)
            .field("destination", &self.inner.destination)
            .field("group", &self.inner.group)
            .field("direction", &self.inner.direction)
            .finish_non_exhaustive()
    }
}

pub(super) struct WeakBinding(Weak<BindingInner>);

impl WeakBinding {
    fn upgrade(&self) -> Option<Binding> {
        self.0.upgrade().map(|inner| Binding { inner })
    }
}

/// Publishes an event, tolerating a channel without subscribers.
pub(super) fn publish_event(events: &broadcast::Sender<BinderEvent>, event: BinderEvent) {
    if events.send(event).is_err() {
        debug!("binder event dropped: no subscribers");
    }
}

/// Turns asynchronous transport failures into binder events.
pub(super) struct FailureReporter<C> {
    binding: WeakBinding,
    events: broadcast::Sender<BinderEvent>,
    clock: Arc<C>,
}

impl<C: Clock + Send + Sync> FailureReporter<C> {
    pub(super) const fn new(
        binding: WeakBinding,
        events: broadcast::Sender<BinderEvent>,
        clock: Arc<C>,
    ) -> Self {
        Self {
            binding,
            events,
            clock,
        }
    }
}

#[async_trait]
impl<C: Clock + Send + Sync> TransportListener for FailureReporter<C> {
    async fn on_failure(&self, error: TransportError) {
        let Some(binding) = self.binding.upgrade() else {
            return;
        };
        if !binding.fail_active(&*self.clock).await {
            debug!(binding = %binding.id(), error = %error, "transport failure after binding ended");
            return;
        }
        error!(
            binding = %binding.id(),
            destination = %binding.destination(),
            error = %error,
            "transport failed; binding is now failed"
        );
        publish_event(
            &self.events,
            BinderEvent::TransportFailure {
                binding: binding.id(),
                destination: binding.destination().clone(),
                reason: error.to_string(),
            },
        );
    }
}

/// Outbound binding: routes, serializes and publishes messages.
#[derive(Clone)]
pub struct ProducerBinding {
    binding: Binding,
    pipeline: Arc<OutboundPipeline>,
    reporter: Arc<dyn TransportListener>,
}

impl ProducerBinding {
    pub(super) fn new(
        binding: Binding,
        pipeline: OutboundPipeline,
        reporter: Arc<dyn TransportListener>,
    ) -> Self {
        Self {
            binding,
            pipeline: Arc::new(pipeline),
            reporter,
        }
    }

    /// Returns the underlying binding, as accepted by `unbind`.
    #[must_use]
    pub const fn binding(&self) -> &Binding {
        &self.binding
    }

    /// Sends one message.
    ///
    /// A transport failure during the send is reported as a
    /// [`BinderEvent::TransportFailure`] and fails the binding; the call
    /// itself still returns `Ok`.
    ///
    /// # Errors
    ///
    /// Returns [`BinderError::BindingNotActive`] once the binding is
    /// unbound or failed, and serialization or header-embedding errors for
    /// messages that cannot be put on the wire.
    pub async fn send(&self, message: Message) -> BinderResult<()> {
        let record = self.pipeline.prepare(message)?;
        match self.binding.send(record).await {
            Ok(()) => Ok(()),
            Err(SendFailure::NotActive) => Err(self.binding.not_active().await),
            Err(SendFailure::Transport(err)) => {
                warn!(binding = %self.binding.id(), error = %err, "send failed at the transport");
                self.reporter.on_failure(err).await;
                Ok(())
            }
        }
    }
}

impl fmt::Debug for ProducerBinding {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("ProducerBinding")
            .field("binding", &self.binding)
            .finish_non_exhaustive()
    }
}
