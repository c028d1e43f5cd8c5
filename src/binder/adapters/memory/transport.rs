//! In-memory transport state and provisioning.

use super::endpoints::{InMemoryConsumer, InMemoryProducer};
use crate::binder::{
    domain::{ConsumerGroup, DestinationName},
    ports::{
        RecordSink, Subscription, Transport, TransportEndpoint, TransportError, TransportListener,
        TransportProducer, TransportRecord, TransportResult,
    },
};
use crate::partition::PartitionCount;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::num::NonZeroUsize;
use std::sync::{Arc, RwLock};
use tokio::sync::{Mutex, mpsc};
use tracing::debug;
use uuid::Uuid;

pub(super) type SharedState = Arc<RwLock<TransportState>>;

pub(super) type SharedReceiver = Arc<Mutex<mpsc::UnboundedReceiver<TransportRecord>>>;

/// Thread-safe in-memory transport.
///
/// Clones share the same destinations.
#[derive(Clone, Default)]
pub struct InMemoryTransport {
    state: SharedState,
    native_headers: bool,
}

#[derive(Default)]
pub(super) struct TransportState {
    pub(super) destinations: HashMap<DestinationName, DestinationState>,
    pub(super) listeners: HashMap<u64, (DestinationName, Arc<dyn TransportListener>)>,
    pub(super) failures: FailurePlan,
    next_endpoint: u64,
}

#[derive(Default)]
pub(super) struct DestinationState {
    pub(super) partitions: Option<u32>,
    pub(super) subscriptions: HashMap<String, SubscriptionQueue>,
    pub(super) sent: Vec<TransportRecord>,
    pub(super) active_producers: usize,
}

pub(super) struct SubscriptionQueue {
    pub(super) sender: mpsc::UnboundedSender<TransportRecord>,
    pub(super) receiver: SharedReceiver,
    pub(super) anonymous: bool,
    pub(super) active_consumers: usize,
}

/// One-shot failures armed per destination.
#[derive(Debug, Default)]
pub(super) struct FailurePlan {
    pub(super) provisioning: HashSet<DestinationName>,
    pub(super) producer_start: HashSet<DestinationName>,
    pub(super) consumer_start: HashSet<DestinationName>,
    pub(super) send: HashSet<DestinationName>,
}

pub(super) fn state_error(err: &impl fmt::Display) -> TransportError {
    TransportError::runtime(std::io::Error::other(err.to_string()))
}

pub(super) fn read_state<T>(
    state: &SharedState,
    lookup: impl FnOnce(&TransportState) -> T,
) -> TransportResult<T> {
    let guard = state.read().map_err(|err| state_error(&err))?;
    Ok(lookup(&guard))
}

pub(super) fn write_state<T>(
    state: &SharedState,
    update: impl FnOnce(&mut TransportState) -> TransportResult<T>,
) -> TransportResult<T> {
    let mut guard = state.write().map_err(|err| state_error(&err))?;
    update(&mut guard)
}

impl TransportState {
    pub(super) fn register_listener(
        &mut self,
        destination: &DestinationName,
        listener: Arc<dyn TransportListener>,
    ) -> u64 {
        self.next_endpoint = self.next_endpoint.saturating_add(1);
        self.listeners
            .insert(self.next_endpoint, (destination.clone(), listener));
        self.next_endpoint
    }

    /// Copies a record to every subscription of the destination.
    pub(super) fn fan_out(&mut self, destination: &DestinationName, record: TransportRecord) {
        let entry = self.destinations.entry(destination.clone()).or_default();
        for queue in entry.subscriptions.values() {
            if queue.sender.send(record.clone()).is_err() {
                debug!(%destination, "subscription queue closed; record skipped");
            }
        }
        entry.sent.push(record);
    }
}

fn armed(plan: &mut HashSet<DestinationName>, destination: &DestinationName) -> bool {
    plan.remove(destination)
}

fn destination_name(destination: &str) -> TransportResult<DestinationName> {
    DestinationName::new(destination).map_err(TransportError::runtime)
}

impl InMemoryTransport {
    /// Creates a transport without native header support, so bindings embed
    /// headers in payloads.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a transport whose records carry headers natively.
    #[must_use]
    pub fn with_native_headers() -> Self {
        Self {
            native_headers: true,
            ..Self::default()
        }
    }

    fn arm(
        &self,
        destination: &str,
        plan: impl FnOnce(&mut FailurePlan) -> &mut HashSet<DestinationName>,
    ) -> TransportResult<()> {
        let name = destination_name(destination)?;
        write_state(&self.state, |state| {
            plan(&mut state.failures).insert(name);
            Ok(())
        })
    }

    /// Makes the next provisioning of `destination` fail.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] when the destination name is invalid or
    /// lock acquisition fails.
    pub fn fail_next_provisioning(&self, destination: &str) -> TransportResult<()> {
        self.arm(destination, |plan| &mut plan.provisioning)
    }

    /// Makes the next producer start on `destination` fail.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] when the destination name is invalid or
    /// lock acquisition fails.
    pub fn fail_next_producer_start(&self, destination: &str) -> TransportResult<()> {
        self.arm(destination, |plan| &mut plan.producer_start)
    }

    /// Makes the next consumer start on `destination` fail.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] when the destination name is invalid or
    /// lock acquisition fails.
    pub fn fail_next_consumer_start(&self, destination: &str) -> TransportResult<()> {
        self.arm(destination, |plan| &mut plan.consumer_start)
    }

    /// Makes the next send to `destination` fail with a connection error.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] when the destination name is invalid or
    /// lock acquisition fails.
    pub fn fail_next_send(&self, destination: &str) -> TransportResult<()> {
        self.arm(destination, |plan| &mut plan.send)
    }

    /// Reports a connection failure to every endpoint of `destination`.
    ///
    /// Returns the number of endpoints notified.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] when the destination name is invalid or
    /// lock acquisition fails.
    pub async fn inject_connection_failure(
        &self,
        destination: &str,
        reason: &str,
    ) -> TransportResult<usize> {
        let name = destination_name(destination)?;
        let listeners: Vec<Arc<dyn TransportListener>> = read_state(&self.state, |state| {
            state
                .listeners
                .values()
                .filter(|(listened, _)| *listened == name)
                .map(|(_, listener)| Arc::clone(listener))
                .collect()
        })?;
        for listener in &listeners {
            listener
                .on_failure(TransportError::Connection(reason.to_owned()))
                .await;
        }
        Ok(listeners.len())
    }

    /// Publishes a record directly, bypassing any producer.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] when the destination name is invalid or
    /// lock acquisition fails.
    pub fn publish(&self, destination: &str, record: TransportRecord) -> TransportResult<()> {
        let name = destination_name(destination)?;
        write_state(&self.state, |state| {
            state.fan_out(&name, record);
            Ok(())
        })
    }

    /// Returns every record sent to `destination`, in order.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] when the destination name is invalid or
    /// lock acquisition fails.
    pub fn sent_records(&self, destination: &str) -> TransportResult<Vec<TransportRecord>> {
        let name = destination_name(destination)?;
        read_state(&self.state, |state| {
            state
                .destinations
                .get(&name)
                .map(|entry| entry.sent.clone())
                .unwrap_or_default()
        })
    }

    /// Returns the number of started, not yet stopped producers.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] when the destination name is invalid or
    /// lock acquisition fails.
    pub fn active_producers(&self, destination: &str) -> TransportResult<usize> {
        let name = destination_name(destination)?;
        read_state(&self.state, |state| {
            state
                .destinations
                .get(&name)
                .map_or(0, |entry| entry.active_producers)
        })
    }

    /// Returns the number of started, not yet stopped consumers across all
    /// subscriptions of `destination`.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] when the destination name is invalid or
    /// lock acquisition fails.
    pub fn active_consumers(&self, destination: &str) -> TransportResult<usize> {
        let name = destination_name(destination)?;
        read_state(&self.state, |state| {
            state.destinations.get(&name).map_or(0, |entry| {
                entry
                    .subscriptions
                    .values()
                    .map(|queue| queue.active_consumers)
                    .sum()
            })
        })
    }

    /// Returns the subscription names of `destination`, sorted.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] when the destination name is invalid or
    /// lock acquisition fails.
    pub fn subscriptions(&self, destination: &str) -> TransportResult<Vec<String>> {
        let name = destination_name(destination)?;
        read_state(&self.state, |state| {
            let mut names: Vec<String> = state
                .destinations
                .get(&name)
                .map(|entry| entry.subscriptions.keys().cloned().collect())
                .unwrap_or_default();
            names.sort();
            names
        })
    }

    /// Returns the partition count provisioned for `destination`.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] when the destination name is invalid or
    /// lock acquisition fails.
    pub fn partitions(&self, destination: &str) -> TransportResult<Option<u32>> {
        let name = destination_name(destination)?;
        read_state(&self.state, |state| {
            state
                .destinations
                .get(&name)
                .and_then(|entry| entry.partitions)
        })
    }
}

impl fmt::Debug for InMemoryTransport {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("InMemoryTransport")
            .field("native_headers", &self.native_headers)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Transport for InMemoryTransport {
    fn supports_native_headers(&self) -> bool {
        self.native_headers
    }

    async fn provision_producer_destination(
        &self,
        destination: &DestinationName,
        partitions: Option<PartitionCount>,
    ) -> TransportResult<()> {
        write_state(&self.state, |state| {
            if armed(&mut state.failures.provisioning, destination) {
                return Err(TransportError::rejected(
                    destination.as_str(),
                    "provisioning failed",
                ));
            }
            let entry = state.destinations.entry(destination.clone()).or_default();
            if let Some(count) = partitions.map(PartitionCount::get) {
                entry.partitions = Some(entry.partitions.map_or(count, |known| known.max(count)));
            }
            Ok(())
        })
    }

    async fn provision_consumer_destination(
        &self,
        destination: &DestinationName,
        group: Option<&ConsumerGroup>,
    ) -> TransportResult<Subscription> {
        write_state(&self.state, |state| {
            if armed(&mut state.failures.provisioning, destination) {
                return Err(TransportError::rejected(
                    destination.as_str(),
                    "provisioning failed",
                ));
            }
            let (name, anonymous) = group.map_or_else(
                || (format!("{destination}.anonymous.{}", Uuid::new_v4()), true),
                |named| (format!("{destination}.{named}"), false),
            );
            let entry = state.destinations.entry(destination.clone()).or_default();
            entry.subscriptions.entry(name.clone()).or_insert_with(|| {
                let (sender, receiver) = mpsc::unbounded_channel();
                SubscriptionQueue {
                    sender,
                    receiver: Arc::new(Mutex::new(receiver)),
                    anonymous,
                    active_consumers: 0,
                }
            });
            debug!(%destination, subscription = %name, anonymous, "provisioned subscription");
            Ok(Subscription {
                destination: destination.clone(),
                name,
                anonymous,
            })
        })
    }

    async fn release_subscription(&self, subscription: &Subscription) -> TransportResult<()> {
        if !subscription.anonymous {
            return Ok(());
        }
        write_state(&self.state, |state| {
            if let Some(entry) = state.destinations.get_mut(&subscription.destination) {
                entry.subscriptions.remove(&subscription.name);
            }
            Ok(())
        })
    }

    async fn create_producer(
        &self,
        destination: &DestinationName,
        listener: Arc<dyn TransportListener>,
    ) -> TransportResult<Box<dyn TransportProducer>> {
        let endpoint = write_state(&self.state, |state| {
            Ok(state.register_listener(destination, listener))
        })?;
        Ok(Box::new(InMemoryProducer::new(
            endpoint,
            destination.clone(),
            Arc::clone(&self.state),
        )))
    }

    async fn create_consumer(
        &self,
        subscription: &Subscription,
        concurrency: NonZeroUsize,
        sink: Arc<dyn RecordSink>,
        listener: Arc<dyn TransportListener>,
    ) -> TransportResult<Box<dyn TransportEndpoint>> {
        let endpoint = write_state(&self.state, |state| {
            let known = state
                .destinations
                .get(&subscription.destination)
                .is_some_and(|entry| entry.subscriptions.contains_key(&subscription.name));
            if !known {
                return Err(TransportError::rejected(
                    subscription.destination.as_str(),
                    format!("unknown subscription {}", subscription.name),
                ));
            }
            Ok(state.register_listener(&subscription.destination, listener))
        })?;
        Ok(Box::new(InMemoryConsumer::new(
            endpoint,
            subscription.clone(),
            concurrency,
            sink,
            Arc::clone(&self.state),
        )))
    }
}
