//! In-memory transport.
//!
//! Destinations live in process memory. Each subscription is an unbounded
//! queue; every record published to a destination is copied to each of its
//! subscriptions, and the consumers of one subscription compete for its
//! records. The transport also records what was sent and can inject
//! failures, which makes it the reference transport for tests.

mod endpoints;
mod transport;

pub use transport::InMemoryTransport;
