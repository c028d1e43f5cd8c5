//! Partition count and key hashing strategies.

use super::{PartitionError, PartitionKey};
use std::fmt;
use std::num::NonZeroU32;

const FNV_OFFSET_BASIS: u32 = 0x811c_9dc5;
const FNV_PRIME: u32 = 0x0100_0193;

/// Validated number of partitions of a destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PartitionCount(NonZeroU32);

impl PartitionCount {
    /// Validates a configured partition count.
    ///
    /// # Errors
    ///
    /// Returns [`PartitionError::InvalidPartitionCount`] when `count` is zero,
    /// negative or larger than `u32::MAX`.
    pub fn new(count: i64) -> Result<Self, PartitionError> {
        u32::try_from(count)
            .ok()
            .and_then(NonZeroU32::new)
            .map(Self)
            .ok_or(PartitionError::InvalidPartitionCount(count))
    }

    /// Returns the count.
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0.get()
    }

    /// Reduces an arbitrary value into `[0, count)`.
    #[must_use]
    pub fn reduce(self, value: u64) -> u32 {
        value
            .checked_rem(u64::from(self.get()))
            .and_then(|index| u32::try_from(index).ok())
            .unwrap_or(0)
    }
}

impl fmt::Display for PartitionCount {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// Maps a partition key onto a partition index.
pub trait PartitionSelector: Send + Sync + fmt::Debug {
    /// Returns a partition index for `key`.
    ///
    /// Routers reduce the result into `[0, count)` again, so out-of-range
    /// values never reach a transport.
    fn select(&self, key: &PartitionKey, count: PartitionCount) -> u32;
}

/// 32-bit FNV-1a hash over the key's canonical text.
///
/// The result depends only on the key bytes, so it is stable across
/// processes and platforms.
#[derive(Debug, Clone, Copy, Default)]
pub struct Fnv1aSelector;

impl PartitionSelector for Fnv1aSelector {
    fn select(&self, key: &PartitionKey, count: PartitionCount) -> u32 {
        count.reduce(u64::from(fnv1a_32(key.canonical_text().as_bytes())))
    }
}

/// Computes the 32-bit FNV-1a hash of `bytes`.
#[must_use]
pub fn fnv1a_32(bytes: &[u8]) -> u32 {
    bytes.iter().fold(FNV_OFFSET_BASIS, |hash, byte| {
        (hash ^ u32::from(*byte)).wrapping_mul(FNV_PRIME)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(0)]
    #[case(-3)]
    #[case(i64::from(u32::MAX) + 1)]
    fn rejects_out_of_range_counts(#[case] count: i64) {
        assert_eq!(
            PartitionCount::new(count),
            Err(PartitionError::InvalidPartitionCount(count))
        );
    }

    #[test]
    fn fnv1a_matches_reference_vectors() {
        assert_eq!(fnv1a_32(b""), 0x811c_9dc5);
        assert_eq!(fnv1a_32(b"a"), 0xe40c_292c);
        assert_eq!(fnv1a_32(b"foobar"), 0xbf9c_f968);
    }

    #[test]
    fn selection_is_deterministic_and_in_range() {
        let count = PartitionCount::new(7).expect("valid count");
        let key = PartitionKey::Text("customer-17".to_owned());

        let first = Fnv1aSelector.select(&key, count);
        let second = Fnv1aSelector.select(&key, count);

        assert_eq!(first, second);
        assert!(first < 7);
    }
}
