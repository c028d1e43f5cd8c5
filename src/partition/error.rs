//! Partition configuration errors.

use thiserror::Error;

/// Errors raised while configuring partition routing.
///
/// Both variants are configuration errors and surface at bind time.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PartitionError {
    /// The partition count is zero, negative or out of range.
    #[error("partition count must be a positive 32-bit integer, got {0}")]
    InvalidPartitionCount(i64),

    /// The key expression uses an unsupported form.
    #[error("unsupported partition key expression: {0}")]
    InvalidKeyExpression(String),
}
