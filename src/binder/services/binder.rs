//! The binder contract and its transport-generic implementation.

use super::{
    BinderError, BinderResult,
    binding::{Binding, Endpoint, FailureReporter, ProducerBinding},
    inbound::InboundPipeline,
    outbound::OutboundPipeline,
};
use crate::binder::{
    domain::{
        BinderEvent, BindingDescriptor, BindingDirection, ConsumerGroup, ConsumerProperties,
        DestinationName, ProducerProperties,
    },
    ports::{MessageHandler, RecordSink, Subscription, Transport, TransportListener},
};
use crate::partition::PartitionRouter;
use async_trait::async_trait;
use mockable::Clock;
use std::fmt;
use std::sync::Arc;
use tokio::sync::{Mutex, broadcast};
use tracing::{debug, info, warn};

const EVENT_CAPACITY: usize = 256;

/// Attaches logical channels to a transport.
#[async_trait]
pub trait Binder: Send + Sync {
    /// Binds a producer to `destination`.
    ///
    /// # Errors
    ///
    /// Returns [`BinderError::Domain`] for invalid names or properties, such
    /// as a partition count below one, and [`BinderError::Binding`] when the
    /// transport cannot provision or start the producer.
    async fn bind_producer(
        &self,
        destination: &str,
        properties: ProducerProperties,
    ) -> BinderResult<ProducerBinding>;

    /// Binds `handler` to `destination`.
    ///
    /// A missing or blank group creates an anonymous consumer that sees
    /// every message; consumers sharing a group compete for messages.
    ///
    /// # Errors
    ///
    /// Returns [`BinderError::Domain`] for invalid names and
    /// [`BinderError::Binding`] when the transport cannot provision or start
    /// the consumer.
    async fn bind_consumer(
        &self,
        destination: &str,
        group: Option<&str>,
        handler: Arc<dyn MessageHandler>,
        properties: ConsumerProperties,
    ) -> BinderResult<Binding>;

    /// Stops a binding and releases its transport resources. Unbinding a
    /// binding that is not active does nothing.
    ///
    /// # Errors
    ///
    /// Returns [`BinderError::Transport`] when the endpoint fails to stop;
    /// the binding is failed in that case.
    async fn unbind(&self, binding: &Binding) -> BinderResult<()>;

    /// Subscribes to asynchronous binder notifications.
    fn subscribe_events(&self) -> broadcast::Receiver<BinderEvent>;

    /// Unbinds every binding created by this binder.
    ///
    /// # Errors
    ///
    /// Returns the first unbind failure after attempting every binding.
    async fn close(&self) -> BinderResult<()>;
}

/// Binder implementation shared by every transport.
pub struct MessageBinder<T, C>
where
    T: Transport,
    C: Clock + Send + Sync + 'static,
{
    transport: Arc<T>,
    clock: Arc<C>,
    events: broadcast::Sender<BinderEvent>,
    bindings: Mutex<Vec<Binding>>,
}

impl<T, C> MessageBinder<T, C>
where
    T: Transport,
    C: Clock + Send + Sync + 'static,
{
    /// Creates a binder over `transport`.
    #[must_use]
    pub fn new(transport: Arc<T>, clock: Arc<C>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            transport,
            clock,
            events,
            bindings: Mutex::new(Vec::new()),
        }
    }

    /// Returns the transport this binder drives.
    #[must_use]
    pub const fn transport(&self) -> &Arc<T> {
        &self.transport
    }

    /// Returns the bindings created and not yet unbound.
    pub async fn bindings(&self) -> Vec<Binding> {
        self.bindings.lock().await.clone()
    }

    fn reporter(&self, binding: &Binding) -> Arc<dyn TransportListener> {
        Arc::new(FailureReporter::new(
            binding.downgrade(),
            self.events.clone(),
            Arc::clone(&self.clock),
        ))
    }

    async fn track(&self, binding: Binding) {
        self.bindings.lock().await.push(binding);
    }

    async fn untrack(&self, binding: &Binding) {
        self.bindings
            .lock()
            .await
            .retain(|tracked| tracked.id() != binding.id());
    }

    /// Stops a partially started endpoint and fails the binding.
    async fn roll_back(
        &self,
        binding: &Binding,
        endpoint: Option<Endpoint>,
        subscription: Option<&Subscription>,
    ) {
        if let Some(started) = endpoint
            && let Err(err) = started.stop().await
        {
            warn!(binding = %binding.id(), error = %err, "failed to stop endpoint during rollback");
        }
        if let Some(provisioned) = subscription
            && let Err(err) = self.transport.release_subscription(provisioned).await
        {
            warn!(
                binding = %binding.id(),
                subscription = %provisioned.name,
                error = %err,
                "failed to release subscription during rollback"
            );
        }
        binding.abandon(&*self.clock).await;
    }
}

impl<T, C> fmt::Debug for MessageBinder<T, C>
where
    T: Transport,
    C: Clock + Send + Sync + 'static,
{
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("MessageBinder")
            .field("native_headers", &self.transport.supports_native_headers())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl<T, C> Binder for MessageBinder<T, C>
where
    T: Transport,
    C: Clock + Send + Sync + 'static,
{
    async fn bind_producer(
        &self,
        destination: &str,
        properties: ProducerProperties,
    ) -> BinderResult<ProducerBinding> {
        let name = DestinationName::new(destination)?;
        let router = properties.partition_router()?;
        let direction = BindingDirection::Producer;

        self.transport
            .provision_producer_destination(&name, router.as_ref().map(PartitionRouter::count))
            .await
            .map_err(|err| BinderError::binding(&name, direction, err))?;

        let binding = Binding::new(BindingDescriptor::producer(name.clone(), &*self.clock));
        let reporter = self.reporter(&binding);
        let producer = match self
            .transport
            .create_producer(&name, Arc::clone(&reporter))
            .await
        {
            Ok(producer) => producer,
            Err(err) => {
                self.roll_back(&binding, None, None).await;
                return Err(BinderError::binding(&name, direction, err));
            }
        };
        if let Err(err) = producer.start().await {
            self.roll_back(&binding, Some(Endpoint::Producer(producer)), None)
                .await;
            return Err(BinderError::binding(&name, direction, err));
        }
        binding
            .activate(Endpoint::Producer(producer), &*self.clock)
            .await?;

        let pipeline = OutboundPipeline::new(
            name,
            router,
            &properties,
            self.transport.supports_native_headers(),
        );
        self.track(binding.clone()).await;
        info!(
            binding = %binding.id(),
            destination = %binding.destination(),
            partitioned = properties.is_partitioned(),
            header_mode = %properties.header_mode(),
            "producer bound"
        );
        Ok(ProducerBinding::new(binding, pipeline, reporter))
    }

    async fn bind_consumer(
        &self,
        destination: &str,
        group: Option<&str>,
        handler: Arc<dyn MessageHandler>,
        properties: ConsumerProperties,
    ) -> BinderResult<Binding> {
        let name = DestinationName::new(destination)?;
        let consumer_group = ConsumerGroup::optional(group)?;
        let direction = BindingDirection::Consumer;

        let subscription = self
            .transport
            .provision_consumer_destination(&name, consumer_group.as_ref())
            .await
            .map_err(|err| BinderError::binding(&name, direction, err))?;

        let binding = Binding::new(BindingDescriptor::consumer(
            name.clone(),
            consumer_group,
            &*self.clock,
        ));
        let sink: Arc<dyn RecordSink> = Arc::new(InboundPipeline::new(
            binding.id(),
            name.clone(),
            handler,
            &properties,
            self.transport.supports_native_headers(),
            self.events.clone(),
        ));
        let consumer = match self
            .transport
            .create_consumer(
                &subscription,
                properties.concurrency(),
                sink,
                self.reporter(&binding),
            )
            .await
        {
            Ok(consumer) => consumer,
            Err(err) => {
                self.roll_back(&binding, None, Some(&subscription)).await;
                return Err(BinderError::binding(&name, direction, err));
            }
        };
        if let Err(err) = consumer.start().await {
            self.roll_back(
                &binding,
                Some(Endpoint::Consumer(consumer)),
                Some(&subscription),
            )
            .await;
            return Err(BinderError::binding(&name, direction, err));
        }
        binding
            .activate(Endpoint::Consumer(consumer), &*self.clock)
            .await?;

        self.track(binding.clone()).await;
        info!(
            binding = %binding.id(),
            destination = %binding.destination(),
            subscription = %subscription.name,
            anonymous = subscription.anonymous,
            "consumer bound"
        );
        Ok(binding)
    }

    async fn unbind(&self, binding: &Binding) -> BinderResult<()> {
        let outcome = binding.stop(&*self.clock).await;
        self.untrack(binding).await;
        if outcome.is_ok() {
            let state = binding.state().await;
            debug!(binding = %binding.id(), %state, "unbind finished");
        }
        outcome
    }

    fn subscribe_events(&self) -> broadcast::Receiver<BinderEvent> {
        self.events.subscribe()
    }

    async fn close(&self) -> BinderResult<()> {
        let tracked = std::mem::take(&mut *self.bindings.lock().await);
        let mut first_failure = None;
        for binding in &tracked {
            if let Err(err) = binding.stop(&*self.clock).await {
                warn!(binding = %binding.id(), error = %err, "failed to unbind during close");
                first_failure.get_or_insert(err);
            }
        }
        first_failure.map_or(Ok(()), Err)
    }
}
