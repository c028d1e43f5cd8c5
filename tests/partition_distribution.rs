//! Partition distribution of a partitioned producer binding.
//!
//! Keys come from a seeded xorshift stream so the observed distribution is
//! reproducible from run to run.
#![expect(clippy::expect_used, reason = "test assertions")]

use mockable::DefaultClock;
use rstest::{fixture, rstest};
use std::sync::Arc;
use stream_binder::binder::{
    adapters::InMemoryTransport,
    domain::ProducerProperties,
    services::{Binder, MessageBinder},
};
use stream_binder::message::domain::Message;
use stream_binder::partition::PartitionKeyRule;

const MESSAGES: usize = 1000;
const PARTITIONS: i64 = 4;

/// Deterministic xorshift64 key source.
struct KeyStream(u64);

impl Iterator for KeyStream {
    type Item = String;

    fn next(&mut self) -> Option<Self::Item> {
        self.0 ^= self.0 << 13;
        self.0 ^= self.0 >> 7;
        self.0 ^= self.0 << 17;
        Some(format!("order-{}", self.0))
    }
}

type TestBinder = MessageBinder<InMemoryTransport, DefaultClock>;

#[fixture]
fn binder() -> TestBinder {
    MessageBinder::new(Arc::new(InMemoryTransport::new()), Arc::new(DefaultClock))
}

fn keyed_producer_properties() -> ProducerProperties {
    ProducerProperties::new()
        .partitioned(PARTITIONS)
        .with_partition_key(PartitionKeyRule::parse_expression("headers.key").expect("rule"))
}

async fn send_keyed(binder: &TestBinder, seed: u64) -> Vec<usize> {
    let producer = binder
        .bind_producer("orders", keyed_producer_properties())
        .await
        .expect("producer binds");
    for key in KeyStream(seed).take(MESSAGES) {
        producer
            .send(Message::new("order placed").with_header("key", key))
            .await
            .expect("send succeeds");
    }
    binder.unbind(producer.binding()).await.expect("unbind");

    let mut counts = vec![0_usize; 4];
    for record in binder.transport().sent_records("orders").expect("records") {
        let partition = record.partition.expect("partitioned record");
        let slot = counts
            .get_mut(usize::try_from(partition).expect("partition index"))
            .expect("partition within count");
        *slot += 1;
    }
    counts
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn uniform_keys_spread_evenly_across_partitions(binder: TestBinder) {
    let counts = send_keyed(&binder, 42).await;

    assert_eq!(counts.iter().sum::<usize>(), MESSAGES);
    for count in &counts {
        assert!(
            (225..=275).contains(count),
            "partition count {count} outside 250 ± 10% in {counts:?}"
        );
    }
    assert_eq!(binder.transport().partitions("orders").expect("state"), Some(4));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn distribution_is_reproducible_for_a_seed(binder: TestBinder) {
    let counts = send_keyed(&binder, 42).await;

    assert_eq!(counts, vec![234, 270, 255, 241]);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn keyless_messages_rotate_through_partitions(binder: TestBinder) {
    let producer = binder
        .bind_producer("orders", ProducerProperties::new().partitioned(PARTITIONS))
        .await
        .expect("producer binds");

    for _ in 0..8 {
        producer
            .send(Message::new("no key"))
            .await
            .expect("send succeeds");
    }

    let partitions: Vec<Option<u32>> = binder
        .transport()
        .sent_records("orders")
        .expect("records")
        .into_iter()
        .map(|record| record.partition)
        .collect();
    assert_eq!(
        partitions,
        [0, 1, 2, 3, 0, 1, 2, 3].map(Some).to_vec()
    );
}
