//! Binding lifecycle, delivery and failure handling over the in-memory
//! transport.
#![expect(clippy::expect_used, reason = "test assertions")]

use async_trait::async_trait;
use bytes::Bytes;
use mockable::DefaultClock;
use rstest::{fixture, rstest};
use serde_json::json;
use std::num::{NonZeroU32, NonZeroUsize};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use stream_binder::binder::{
    adapters::InMemoryTransport,
    domain::{
        BinderEvent, BindingState, ConsumerProperties, HeaderMode, MalformedEnvelopePolicy,
        ProducerProperties, RetryPolicy,
    },
    ports::{HandlerError, MessageHandler, TransportRecord},
    services::{Binder, BinderError, Binding, MessageBinder, ResultStreamAdapter},
};
use stream_binder::message::domain::{Message, Payload};
use tokio::sync::{broadcast, mpsc};
use tokio::time::timeout;
use tracing_subscriber::EnvFilter;

const WAIT: Duration = Duration::from_secs(5);

/// Header section declaring five headers with nothing behind it.
const GARBAGE: &[u8] = b"\x05abc";

type TestBinder = MessageBinder<InMemoryTransport, DefaultClock>;

/// Forwards every delivered message to the test.
struct Recorder(mpsc::UnboundedSender<Message>);

#[async_trait]
impl MessageHandler for Recorder {
    async fn handle(&self, message: Message) -> Result<(), HandlerError> {
        self.0
            .send(message)
            .map_err(|_| HandlerError::message("test receiver dropped"))
    }
}

/// Fails the first `failures` deliveries, then records.
struct Flaky {
    failures: u32,
    attempts: AtomicU32,
    delivered: mpsc::UnboundedSender<Message>,
}

#[async_trait]
impl MessageHandler for Flaky {
    async fn handle(&self, message: Message) -> Result<(), HandlerError> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst);
        if attempt < self.failures {
            return Err(HandlerError::message(format!("attempt {attempt} refused")));
        }
        self.delivered
            .send(message)
            .map_err(|_| HandlerError::message("test receiver dropped"))
    }
}

/// Unbinds its own binding from inside the first delivery.
struct SelfUnbinding {
    binder: Arc<TestBinder>,
    binding: OnceLock<Binding>,
    unbound: mpsc::UnboundedSender<bool>,
}

#[async_trait]
impl MessageHandler for SelfUnbinding {
    async fn handle(&self, _message: Message) -> Result<(), HandlerError> {
        let binding = self
            .binding
            .get()
            .ok_or_else(|| HandlerError::message("binding not recorded yet"))?;
        let outcome = self.binder.unbind(binding).await;
        self.unbound
            .send(outcome.is_ok())
            .map_err(|_| HandlerError::message("test receiver dropped"))
    }
}

/// Routes binder logs to the test harness; `RUST_LOG` overrides the level.
fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ignored = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}

#[fixture]
fn binder() -> TestBinder {
    init_logging();
    MessageBinder::new(Arc::new(InMemoryTransport::new()), Arc::new(DefaultClock))
}

fn recorder() -> (Arc<Recorder>, mpsc::UnboundedReceiver<Message>) {
    let (sender, receiver) = mpsc::unbounded_channel();
    (Arc::new(Recorder(sender)), receiver)
}

async fn next_message(receiver: &mut mpsc::UnboundedReceiver<Message>) -> Message {
    timeout(WAIT, receiver.recv())
        .await
        .expect("message delivered in time")
        .expect("handler alive")
}

async fn next_event(events: &mut broadcast::Receiver<BinderEvent>) -> BinderEvent {
    timeout(WAIT, events.recv())
        .await
        .expect("event published in time")
        .expect("event channel open")
}

fn quick_retry(max_attempts: u32) -> RetryPolicy {
    RetryPolicy::default()
        .with_max_attempts(NonZeroU32::new(max_attempts).expect("non-zero attempts"))
        .with_back_off(Duration::from_millis(1), 2.0, Duration::from_millis(4))
        .expect("valid back-off")
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn unbinding_twice_is_a_no_op(binder: TestBinder) {
    let producer = binder
        .bind_producer("orders", ProducerProperties::new())
        .await
        .expect("producer binds");

    binder.unbind(producer.binding()).await.expect("first unbind");
    binder.unbind(producer.binding()).await.expect("second unbind");

    assert_eq!(producer.binding().state().await, BindingState::Stopped);
    assert_eq!(binder.transport().active_producers("orders").expect("state"), 0);
    assert!(binder.bindings().await.is_empty());
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn sending_after_unbind_reports_an_inactive_binding(binder: TestBinder) {
    let producer = binder
        .bind_producer("orders", ProducerProperties::new())
        .await
        .expect("producer binds");
    binder.unbind(producer.binding()).await.expect("unbind");

    let result = producer.send(Message::new("late")).await;

    assert!(matches!(
        result,
        Err(BinderError::BindingNotActive {
            state: BindingState::Stopped,
            ..
        })
    ));
    assert!(binder.transport().sent_records("orders").expect("records").is_empty());
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn failed_provisioning_leaves_nothing_behind(binder: TestBinder) {
    binder
        .transport()
        .fail_next_provisioning("orders")
        .expect("arm failure");

    let result = binder
        .bind_producer("orders", ProducerProperties::new())
        .await;

    assert!(matches!(result, Err(BinderError::Binding { .. })));
    assert!(binder.bindings().await.is_empty());
    assert_eq!(binder.transport().active_producers("orders").expect("state"), 0);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn failed_producer_start_is_rolled_back(binder: TestBinder) {
    binder
        .transport()
        .fail_next_producer_start("orders")
        .expect("arm failure");

    let result = binder
        .bind_producer("orders", ProducerProperties::new())
        .await;

    assert!(matches!(result, Err(BinderError::Binding { .. })));
    assert!(binder.bindings().await.is_empty());

    let retried = binder
        .bind_producer("orders", ProducerProperties::new())
        .await
        .expect("next bind succeeds");
    assert_eq!(retried.binding().state().await, BindingState::Active);
    assert_eq!(binder.transport().active_producers("orders").expect("state"), 1);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn failed_anonymous_consumer_start_releases_its_subscription(binder: TestBinder) {
    let (handler, _received) = recorder();
    binder
        .transport()
        .fail_next_consumer_start("orders")
        .expect("arm failure");

    let result = binder
        .bind_consumer("orders", None, handler, ConsumerProperties::new())
        .await;

    assert!(matches!(result, Err(BinderError::Binding { .. })));
    assert!(binder.transport().subscriptions("orders").expect("state").is_empty());
    assert_eq!(binder.transport().active_consumers("orders").expect("state"), 0);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn group_subscriptions_outlive_their_consumers(binder: TestBinder) {
    let (audit_handler, _audit) = recorder();
    let (anonymous_handler, _anonymous) = recorder();
    let grouped = binder
        .bind_consumer("orders", Some("audit"), audit_handler, ConsumerProperties::new())
        .await
        .expect("group consumer binds");
    let anonymous = binder
        .bind_consumer("orders", None, anonymous_handler, ConsumerProperties::new())
        .await
        .expect("anonymous consumer binds");
    assert_eq!(binder.transport().subscriptions("orders").expect("state").len(), 2);
    assert_eq!(grouped.group().map(|group| group.as_str()), Some("audit"));
    assert!(anonymous.group().is_none());

    binder.unbind(&grouped).await.expect("unbind group");
    binder.unbind(&anonymous).await.expect("unbind anonymous");

    assert_eq!(
        binder.transport().subscriptions("orders").expect("state"),
        vec!["orders.audit".to_owned()]
    );
    assert_eq!(binder.transport().active_consumers("orders").expect("state"), 0);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn group_members_share_records_and_anonymous_consumers_each_get_all(binder: TestBinder) {
    let (group_sender, mut group_received) = mpsc::unbounded_channel();
    let (solo_handler, mut solo_received) = recorder();
    let mut members = Vec::new();
    for _ in 0..2 {
        members.push(
            binder
                .bind_consumer(
                    "orders",
                    Some("billing"),
                    Arc::new(Recorder(group_sender.clone())),
                    ConsumerProperties::new(),
                )
                .await
                .expect("group member binds"),
        );
    }
    let solo = binder
        .bind_consumer("orders", None, solo_handler, ConsumerProperties::new())
        .await
        .expect("anonymous consumer binds");
    let producer = binder
        .bind_producer("orders", ProducerProperties::new())
        .await
        .expect("producer binds");

    for index in 0..10 {
        producer
            .send(Message::new(format!("order {index}")))
            .await
            .expect("send");
    }
    for _ in 0..10 {
        next_message(&mut group_received).await;
        next_message(&mut solo_received).await;
    }
    binder.close().await.expect("close");

    assert!(group_received.try_recv().is_err());
    assert!(solo_received.try_recv().is_err());
    assert_eq!(solo.state().await, BindingState::Stopped);
    for member in &members {
        assert_eq!(member.state().await, BindingState::Stopped);
    }
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn typed_payloads_arrive_with_their_content_types(binder: TestBinder) {
    let (handler, mut received) = recorder();
    binder
        .bind_consumer("orders", Some("audit"), handler, ConsumerProperties::new())
        .await
        .expect("consumer binds");
    let producer = binder
        .bind_producer("orders", ProducerProperties::new())
        .await
        .expect("producer binds");

    producer
        .send(Message::new(json!({"id": 7})).with_header("traceId", "abc"))
        .await
        .expect("send");
    let delivered = next_message(&mut received).await;

    assert_eq!(delivered.payload(), &Payload::Json(json!({"id": 7})));
    assert_eq!(
        delivered.headers().get_text("contentType"),
        Some("application/json")
    );
    assert_eq!(delivered.headers().get_text("traceId"), Some("abc"));
    assert!(!delivered.headers().contains("originalContentType"));
}

#[tokio::test(flavor = "multi_thread")]
async fn native_header_transports_keep_headers_out_of_the_payload() {
    let binder = MessageBinder::new(
        Arc::new(InMemoryTransport::with_native_headers()),
        Arc::new(DefaultClock),
    );
    let (handler, mut received) = recorder();
    binder
        .bind_consumer("orders", Some("audit"), handler, ConsumerProperties::new())
        .await
        .expect("consumer binds");
    let producer = binder
        .bind_producer("orders", ProducerProperties::new())
        .await
        .expect("producer binds");

    producer
        .send(Message::new("hello").with_header("traceId", "abc"))
        .await
        .expect("send");
    let delivered = next_message(&mut received).await;
    let records = binder.transport().sent_records("orders").expect("records");
    let record = records.first().expect("one record");

    assert_eq!(record.payload, Bytes::from_static(b"hello"));
    assert_eq!(
        record.headers.get("traceId"),
        Some(&Bytes::from_static(b"abc"))
    );
    assert_eq!(delivered.payload(), &Payload::Text("hello".to_owned()));
    assert_eq!(delivered.headers().get_text("traceId"), Some("abc"));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn raw_mode_sends_bytes_without_headers(binder: TestBinder) {
    let (handler, mut received) = recorder();
    binder
        .bind_consumer(
            "orders",
            None,
            handler,
            ConsumerProperties::new().with_header_mode(HeaderMode::None),
        )
        .await
        .expect("consumer binds");
    let producer = binder
        .bind_producer(
            "orders",
            ProducerProperties::new().with_header_mode(HeaderMode::None),
        )
        .await
        .expect("producer binds");

    let rejected = producer.send(Message::new("text")).await;
    producer
        .send(Message::new(Bytes::from_static(b"\x01\x02")).with_header("traceId", "abc"))
        .await
        .expect("bytes are accepted");
    let delivered = next_message(&mut received).await;

    assert!(matches!(rejected, Err(BinderError::RawPayloadRequired("text"))));
    assert_eq!(
        delivered.payload(),
        &Payload::Bytes(Bytes::from_static(b"\x01\x02"))
    );
    assert!(delivered.headers().is_empty());
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn malformed_envelopes_are_dropped_by_default(binder: TestBinder) {
    let (handler, mut received) = recorder();
    binder
        .bind_consumer("orders", None, handler, ConsumerProperties::new())
        .await
        .expect("consumer binds");
    let producer = binder
        .bind_producer("orders", ProducerProperties::new())
        .await
        .expect("producer binds");

    binder
        .transport()
        .publish("orders", TransportRecord::new(Bytes::from_static(GARBAGE)))
        .expect("publish garbage");
    producer.send(Message::new("valid")).await.expect("send");

    let delivered = next_message(&mut received).await;
    assert_eq!(delivered.payload(), &Payload::Text("valid".to_owned()));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn malformed_envelopes_can_be_routed_to_the_error_channel(binder: TestBinder) {
    let (handler, _received) = recorder();
    let mut events = binder.subscribe_events();
    let consumer = binder
        .bind_consumer(
            "orders",
            None,
            handler,
            ConsumerProperties::new()
                .with_malformed_envelope_policy(MalformedEnvelopePolicy::ErrorChannel),
        )
        .await
        .expect("consumer binds");

    binder
        .transport()
        .publish("orders", TransportRecord::new(Bytes::from_static(GARBAGE)))
        .expect("publish garbage");

    match next_event(&mut events).await {
        BinderEvent::MalformedEnvelope { binding, raw, .. } => {
            assert_eq!(binding, consumer.id());
            assert_eq!(raw, Bytes::from_static(GARBAGE));
        }
        other => panic!("unexpected event {other:?}"),
    }
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn malformed_envelopes_can_be_delivered_raw(binder: TestBinder) {
    let (handler, mut received) = recorder();
    binder
        .bind_consumer(
            "orders",
            None,
            handler,
            ConsumerProperties::new().with_malformed_envelope_policy(MalformedEnvelopePolicy::Raw),
        )
        .await
        .expect("consumer binds");

    binder
        .transport()
        .publish("orders", TransportRecord::new(Bytes::from_static(GARBAGE)))
        .expect("publish garbage");

    let delivered = next_message(&mut received).await;
    assert_eq!(
        delivered.payload(),
        &Payload::Bytes(Bytes::from_static(GARBAGE))
    );
    assert!(delivered.headers().is_empty());
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn transient_handler_failures_are_retried(binder: TestBinder) {
    let (sender, mut delivered) = mpsc::unbounded_channel();
    let handler = Arc::new(Flaky {
        failures: 2,
        attempts: AtomicU32::new(0),
        delivered: sender,
    });
    binder
        .bind_consumer(
            "orders",
            None,
            Arc::clone(&handler) as Arc<dyn MessageHandler>,
            ConsumerProperties::new().with_retry(quick_retry(3)),
        )
        .await
        .expect("consumer binds");
    let producer = binder
        .bind_producer("orders", ProducerProperties::new())
        .await
        .expect("producer binds");

    producer.send(Message::new("retry me")).await.expect("send");
    let message = next_message(&mut delivered).await;

    assert_eq!(message.payload(), &Payload::Text("retry me".to_owned()));
    assert_eq!(handler.attempts.load(Ordering::SeqCst), 3);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn exhausted_retries_publish_a_delivery_failure(binder: TestBinder) {
    let (sender, _delivered) = mpsc::unbounded_channel();
    let handler = Arc::new(Flaky {
        failures: u32::MAX,
        attempts: AtomicU32::new(0),
        delivered: sender,
    });
    let mut events = binder.subscribe_events();
    let consumer = binder
        .bind_consumer(
            "orders",
            None,
            Arc::clone(&handler) as Arc<dyn MessageHandler>,
            ConsumerProperties::new().with_retry(quick_retry(3)),
        )
        .await
        .expect("consumer binds");
    let producer = binder
        .bind_producer("orders", ProducerProperties::new())
        .await
        .expect("producer binds");

    producer.send(Message::new("poison")).await.expect("send");

    match next_event(&mut events).await {
        BinderEvent::DeliveryFailed {
            binding,
            attempts,
            message,
            ..
        } => {
            assert_eq!(binding, consumer.id());
            assert_eq!(attempts, 3);
            assert_eq!(message.payload(), &Payload::Text("poison".to_owned()));
        }
        other => panic!("unexpected event {other:?}"),
    }
    assert_eq!(handler.attempts.load(Ordering::SeqCst), 3);
    assert_eq!(consumer.state().await, BindingState::Active);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn send_time_transport_failure_fails_the_binding(binder: TestBinder) {
    let mut events = binder.subscribe_events();
    let producer = binder
        .bind_producer("orders", ProducerProperties::new())
        .await
        .expect("producer binds");
    binder.transport().fail_next_send("orders").expect("arm failure");

    producer
        .send(Message::new("lost"))
        .await
        .expect("failure is reported asynchronously");

    assert!(matches!(
        next_event(&mut events).await,
        BinderEvent::TransportFailure { binding, .. } if binding == producer.binding().id()
    ));
    assert_eq!(producer.binding().state().await, BindingState::Failed);
    assert!(matches!(
        producer.send(Message::new("after")).await,
        Err(BinderError::BindingNotActive {
            state: BindingState::Failed,
            ..
        })
    ));
    assert_eq!(binder.transport().active_producers("orders").expect("state"), 0);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn connection_loss_fails_each_binding_once(binder: TestBinder) {
    let (handler, _received) = recorder();
    let mut events = binder.subscribe_events();
    let consumer = binder
        .bind_consumer("orders", Some("audit"), handler, ConsumerProperties::new())
        .await
        .expect("consumer binds");

    let notified = binder
        .transport()
        .inject_connection_failure("orders", "broker went away")
        .await
        .expect("inject");

    assert_eq!(notified, 1);
    assert!(matches!(
        next_event(&mut events).await,
        BinderEvent::TransportFailure { binding, .. } if binding == consumer.id()
    ));
    assert_eq!(consumer.state().await, BindingState::Failed);
    assert_eq!(binder.transport().active_consumers("orders").expect("state"), 0);

    binder.unbind(&consumer).await.expect("unbinding a failed binding is a no-op");
    assert_eq!(consumer.state().await, BindingState::Failed);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn concurrent_consumers_deliver_every_record(binder: TestBinder) {
    let (handler, mut received) = recorder();
    binder
        .bind_consumer(
            "orders",
            Some("workers"),
            handler,
            ConsumerProperties::new()
                .with_concurrency(NonZeroUsize::new(4).expect("non-zero concurrency")),
        )
        .await
        .expect("consumer binds");
    let producer = binder
        .bind_producer("orders", ProducerProperties::new())
        .await
        .expect("producer binds");

    for index in 0..20 {
        producer
            .send(Message::new(format!("job {index}")))
            .await
            .expect("send");
    }
    let mut payloads = Vec::new();
    for _ in 0..20 {
        payloads.push(next_message(&mut received).await.payload().clone());
    }

    assert_eq!(payloads.len(), 20);
    for index in 0..20 {
        assert!(payloads.contains(&Payload::Text(format!("job {index}"))));
    }
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn handler_can_unbind_its_own_consumer(binder: TestBinder) {
    let binder = Arc::new(binder);
    let (unbound, mut outcomes) = mpsc::unbounded_channel();
    let handler = Arc::new(SelfUnbinding {
        binder: Arc::clone(&binder),
        binding: OnceLock::new(),
        unbound,
    });
    let consumer = binder
        .bind_consumer(
            "orders",
            Some("audit"),
            Arc::clone(&handler) as Arc<dyn MessageHandler>,
            ConsumerProperties::new(),
        )
        .await
        .expect("consumer binds");
    handler
        .binding
        .set(consumer.clone())
        .expect("binding recorded once");
    let producer = binder
        .bind_producer("orders", ProducerProperties::new())
        .await
        .expect("producer binds");

    producer.send(Message::new("last")).await.expect("send");
    let unbound_cleanly = timeout(WAIT, outcomes.recv())
        .await
        .expect("handler unbinds without waiting on itself")
        .expect("handler alive");

    assert!(unbound_cleanly);
    assert_eq!(consumer.state().await, BindingState::Stopped);
    assert_eq!(binder.transport().active_consumers("orders").expect("state"), 0);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn result_streams_skip_errors_and_drain_on_stop(binder: TestBinder) {
    let producer = binder
        .bind_producer("results", ProducerProperties::new())
        .await
        .expect("producer binds");
    let adapter = ResultStreamAdapter::new();
    let items: Vec<Result<Payload, &str>> = vec![
        Ok(Payload::from("first")),
        Err("upstream hiccup"),
        Ok(Payload::from("second")),
    ];

    let not_started = adapter
        .adapt(futures::stream::iter(items.clone()), producer.clone())
        .await;
    adapter.start().await;
    let task = adapter
        .adapt(futures::stream::iter(items), producer.clone())
        .await
        .expect("adapter running");
    task.await.expect("stream task completes");
    adapter.stop().await;

    assert!(matches!(not_started, Err(BinderError::AdapterStopped)));
    assert!(!adapter.is_running().await);
    assert_eq!(
        binder.transport().sent_records("results").expect("records").len(),
        2
    );
}
