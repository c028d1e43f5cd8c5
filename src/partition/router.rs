//! Per-producer partition router.

use super::{Fnv1aSelector, PartitionCount, PartitionKeyRule, PartitionSelector};
use crate::message::domain::Message;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Selects a partition for each outbound message of one destination.
#[derive(Debug)]
pub struct PartitionRouter {
    rule: Option<PartitionKeyRule>,
    count: PartitionCount,
    selector: Arc<dyn PartitionSelector>,
    round_robin: AtomicU64,
}

impl PartitionRouter {
    /// Creates a router using FNV-1a selection.
    ///
    /// Without a rule every message is routed round-robin.
    #[must_use]
    pub fn new(rule: Option<PartitionKeyRule>, count: PartitionCount) -> Self {
        Self {
            rule,
            count,
            selector: Arc::new(Fnv1aSelector),
            round_robin: AtomicU64::new(0),
        }
    }

    /// Replaces the key selector.
    #[must_use]
    pub fn with_selector(mut self, selector: Arc<dyn PartitionSelector>) -> Self {
        self.selector = selector;
        self
    }

    /// Returns the partition count.
    #[must_use]
    pub const fn count(&self) -> PartitionCount {
        self.count
    }

    /// Returns the partition index for `message`, always in `[0, count)`.
    #[must_use]
    pub fn select(&self, message: &Message) -> u32 {
        let key = self.rule.as_ref().and_then(|rule| rule.extract(message));
        match key {
            Some(partition_key) => {
                let selected = self.selector.select(&partition_key, self.count);
                self.count.reduce(u64::from(selected))
            }
            None => {
                let next = self.round_robin.fetch_add(1, Ordering::Relaxed);
                self.count.reduce(next)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::partition::PartitionKey;

    #[derive(Debug)]
    struct OutOfRange;

    impl PartitionSelector for OutOfRange {
        fn select(&self, _key: &PartitionKey, _count: PartitionCount) -> u32 {
            u32::MAX
        }
    }

    fn count(value: i64) -> PartitionCount {
        PartitionCount::new(value).expect("valid count")
    }

    #[test]
    fn keyless_messages_cycle_round_robin() {
        let router = PartitionRouter::new(None, count(3));
        let message = Message::new("body");

        let selected: Vec<u32> = (0..6).map(|_| router.select(&message)).collect();

        assert_eq!(selected, vec![0, 1, 2, 0, 1, 2]);
    }

    #[test]
    fn missing_key_falls_back_to_round_robin() {
        let router = PartitionRouter::new(Some(PartitionKeyRule::Header("id".to_owned())), count(2));
        let message = Message::new("body");

        assert_eq!(router.select(&message), 0);
        assert_eq!(router.select(&message), 1);
    }

    #[test]
    fn same_key_selects_same_partition() {
        let router = PartitionRouter::new(Some(PartitionKeyRule::Header("id".to_owned())), count(5));
        let message = Message::new("body").with_header("id", "order-1");

        let first = router.select(&message);
        assert!((0..5).all(|_| router.select(&message) == first));
    }

    #[test]
    fn custom_selector_output_is_reduced_into_range() {
        let router = PartitionRouter::new(
            Some(PartitionKeyRule::Fixed(PartitionKey::Integer(1))),
            count(4),
        )
        .with_selector(Arc::new(OutOfRange));

        assert_eq!(router.select(&Message::new("body")), 3);
    }
}
