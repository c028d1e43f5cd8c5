//! Partition routing for partitioned producers.
//!
//! A [`PartitionRouter`] evaluates a [`PartitionKeyRule`] against each
//! outbound message, hashes the resulting key with a [`PartitionSelector`]
//! and reduces it into `[0, count)`. Messages without a key fall back to a
//! round-robin counter owned by the router, which is created once per
//! producer binding.

mod error;
mod key;
mod router;
mod selector;

pub use error::PartitionError;
pub use key::{PartitionKey, PartitionKeyExtractor, PartitionKeyRule};
pub use router::PartitionRouter;
pub use selector::{Fnv1aSelector, PartitionCount, PartitionSelector, fnv1a_32};
