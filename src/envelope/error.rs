//! Error types for embedded-header encoding and decoding.

use std::fmt;
use thiserror::Error;

/// Result type for envelope operations.
pub type EnvelopeResult<T> = Result<T, EnvelopeError>;

/// Errors returned by the embedded-header codec.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EnvelopeError {
    /// The input is not a well-formed envelope.
    #[error("malformed envelope at offset {offset}: {reason}")]
    Malformed {
        /// Byte offset at which validation failed.
        offset: usize,
        /// What was wrong at that offset.
        reason: MalformedReason,
    },

    /// More headers than the one-byte count can describe.
    #[error("cannot embed {0} headers (at most 255)")]
    TooManyHeaders(usize),

    /// A header name is empty or contains non-ASCII characters.
    #[error("header name '{0}' must be non-empty ASCII")]
    InvalidHeaderName(String),

    /// A header name does not fit the one-byte length prefix.
    #[error("header name '{0}' exceeds 255 bytes")]
    HeaderNameTooLong(String),

    /// A header value does not fit the four-byte length prefix.
    #[error("value of header '{name}' is {length} bytes, above the u32 limit")]
    HeaderValueTooLong {
        /// Header name.
        name: String,
        /// Value length in bytes.
        length: usize,
    },
}

impl EnvelopeError {
    pub(super) const fn malformed(offset: usize, reason: MalformedReason) -> Self {
        Self::Malformed { offset, reason }
    }
}

/// Reason a received envelope failed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MalformedReason {
    /// The input has no header-count byte.
    Empty,
    /// The declared header count needs more bytes than remain.
    HeaderCountExceedsInput {
        /// Declared header count.
        declared: u8,
    },
    /// The input ends before a name-length byte.
    TruncatedNameLength,
    /// A header name runs past the end of the input.
    TruncatedName,
    /// The input ends inside a value-length field.
    TruncatedValueLength,
    /// A header value runs past the end of the input.
    TruncatedValue,
    /// A header name is empty or not ASCII.
    InvalidName,
    /// The same header name appears twice.
    DuplicateName,
}

impl fmt::Display for MalformedReason {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => formatter.write_str("input is empty"),
            Self::HeaderCountExceedsInput { declared } => write!(
                formatter,
                "declared header count {declared} exceeds the available bytes"
            ),
            Self::TruncatedNameLength => formatter.write_str("name length runs past the end"),
            Self::TruncatedName => formatter.write_str("header name runs past the end"),
            Self::TruncatedValueLength => formatter.write_str("value length runs past the end"),
            Self::TruncatedValue => formatter.write_str("header value runs past the end"),
            Self::InvalidName => formatter.write_str("header name is empty or not ASCII"),
            Self::DuplicateName => formatter.write_str("header name is repeated"),
        }
    }
}
