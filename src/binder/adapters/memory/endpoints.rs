//! In-memory producers and consumers.

use super::transport::{SharedReceiver, SharedState, write_state};
use crate::binder::{
    domain::DestinationName,
    ports::{
        RecordSink, Subscription, TransportEndpoint, TransportError, TransportProducer,
        TransportRecord, TransportResult,
    },
};
use async_trait::async_trait;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

pub(super) struct InMemoryProducer {
    endpoint: u64,
    destination: DestinationName,
    state: SharedState,
    running: AtomicBool,
}

impl InMemoryProducer {
    pub(super) const fn new(endpoint: u64, destination: DestinationName, state: SharedState) -> Self {
        Self {
            endpoint,
            destination,
            state,
            running: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl TransportEndpoint for InMemoryProducer {
    async fn start(&self) -> TransportResult<()> {
        write_state(&self.state, |state| {
            if state.failures.producer_start.remove(&self.destination) {
                return Err(TransportError::Connection(format!(
                    "producer for '{}' could not connect",
                    self.destination
                )));
            }
            if !self.running.swap(true, Ordering::SeqCst) {
                let entry = state.destinations.entry(self.destination.clone()).or_default();
                entry.active_producers = entry.active_producers.saturating_add(1);
            }
            Ok(())
        })
    }

    async fn stop(&self) -> TransportResult<()> {
        write_state(&self.state, |state| {
            state.listeners.remove(&self.endpoint);
            if self.running.swap(false, Ordering::SeqCst)
                && let Some(entry) = state.destinations.get_mut(&self.destination)
            {
                entry.active_producers = entry.active_producers.saturating_sub(1);
            }
            Ok(())
        })
    }
}

#[async_trait]
impl TransportProducer for InMemoryProducer {
    async fn send(&self, record: TransportRecord) -> TransportResult<()> {
        if !self.running.load(Ordering::SeqCst) {
            return Err(TransportError::Connection(format!(
                "producer for '{}' is not running",
                self.destination
            )));
        }
        write_state(&self.state, |state| {
            if state.failures.send.remove(&self.destination) {
                return Err(TransportError::Connection(format!(
                    "lost connection while sending to '{}'",
                    self.destination
                )));
            }
            let partitions = state
                .destinations
                .get(&self.destination)
                .and_then(|entry| entry.partitions);
            if let (Some(partition), Some(count)) = (record.partition, partitions)
                && partition >= count
            {
                return Err(TransportError::rejected(
                    self.destination.as_str(),
                    format!("partition {partition} is outside 0..{count}"),
                ));
            }
            state.fan_out(&self.destination, record);
            Ok(())
        })
    }
}

struct RunningConsumer {
    shutdown: watch::Sender<bool>,
    workers: Vec<JoinHandle<()>>,
}

pub(super) struct InMemoryConsumer {
    endpoint: u64,
    subscription: Subscription,
    concurrency: NonZeroUsize,
    sink: Arc<dyn RecordSink>,
    state: SharedState,
    running: Mutex<Option<RunningConsumer>>,
}

impl InMemoryConsumer {
    pub(super) fn new(
        endpoint: u64,
        subscription: Subscription,
        concurrency: NonZeroUsize,
        sink: Arc<dyn RecordSink>,
        state: SharedState,
    ) -> Self {
        Self {
            endpoint,
            subscription,
            concurrency,
            sink,
            state,
            running: Mutex::new(None),
        }
    }

    fn spawn_worker(
        &self,
        receiver: &SharedReceiver,
        mut shutdown: watch::Receiver<bool>,
    ) -> JoinHandle<()> {
        let queue = Arc::clone(receiver);
        let sink = Arc::clone(&self.sink);
        tokio::spawn(async move {
            loop {
                let next = tokio::select! {
                    biased;
                    _ = shutdown.changed() => None,
                    record = async { queue.lock().await.recv().await } => record,
                };
                let Some(record) = next else {
                    break;
                };
                sink.accept(record).await;
            }
        })
    }

    /// Drops the listener registration; anonymous subscriptions go with
    /// their only consumer.
    fn release(&self, started: bool) -> TransportResult<()> {
        let subscription = &self.subscription;
        write_state(&self.state, |state| {
            state.listeners.remove(&self.endpoint);
            if let Some(entry) = state.destinations.get_mut(&subscription.destination) {
                if subscription.anonymous {
                    entry.subscriptions.remove(&subscription.name);
                } else if started
                    && let Some(queue) = entry.subscriptions.get_mut(&subscription.name)
                {
                    queue.active_consumers = queue.active_consumers.saturating_sub(1);
                }
            }
            Ok(())
        })
    }
}

#[async_trait]
impl TransportEndpoint for InMemoryConsumer {
    async fn start(&self) -> TransportResult<()> {
        let mut running = self.running.lock().await;
        if running.is_some() {
            return Ok(());
        }
        let subscription = &self.subscription;
        let receiver = write_state(&self.state, |state| {
            if state.failures.consumer_start.remove(&subscription.destination) {
                return Err(TransportError::Connection(format!(
                    "consumer for '{}' could not connect",
                    subscription.destination
                )));
            }
            let queue = state
                .destinations
                .get_mut(&subscription.destination)
                .and_then(|entry| entry.subscriptions.get_mut(&subscription.name))
                .ok_or_else(|| {
                    TransportError::rejected(
                        subscription.destination.as_str(),
                        format!("subscription {} no longer exists", subscription.name),
                    )
                })?;
            queue.active_consumers = queue.active_consumers.saturating_add(1);
            Ok(Arc::clone(&queue.receiver))
        })?;

        let (shutdown, _) = watch::channel(false);
        let workers = (0..self.concurrency.get())
            .map(|_| self.spawn_worker(&receiver, shutdown.subscribe()))
            .collect();
        debug!(
            subscription = %subscription.name,
            concurrency = self.concurrency.get(),
            "consumer started"
        );
        *running = Some(RunningConsumer { shutdown, workers });
        Ok(())
    }

    async fn stop(&self) -> TransportResult<()> {
        let mut running = self.running.lock().await;
        let Some(consumer) = running.take() else {
            return self.release(false);
        };

        if consumer.shutdown.send(true).is_err() {
            debug!(subscription = %self.subscription.name, "all consumer workers already exited");
        }
        // A handler may stop its own consumer; that worker exits once the
        // handler returns, so it is not joined here.
        let current = tokio::task::try_id();
        for worker in consumer.workers {
            if current.is_some_and(|id| id == worker.id()) {
                debug!(subscription = %self.subscription.name, "consumer stopped from its own worker");
                continue;
            }
            if let Err(err) = worker.await {
                warn!(subscription = %self.subscription.name, error = %err, "consumer worker ended abnormally");
            }
        }
        self.release(true)
    }
}
