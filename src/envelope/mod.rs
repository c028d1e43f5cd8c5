//! Embedded-header wire format.
//!
//! Transports without native header support carry headers inside the
//! payload. The layout is a one-byte header count followed by, per header, a
//! one-byte name length, the ASCII name, a four-byte big-endian value length
//! and the value bytes; the original payload follows unchanged:
//!
//! ```text
//! [N][Ln][name][Lv:u32 BE][value] ... [payload]
//! ```
//!
//! Encoding and decoding are pure functions with no I/O.

mod codec;
mod error;
mod headers;

pub use codec::{DecodedEnvelope, decode, encode, encode_selected};
pub use error::{EnvelopeError, EnvelopeResult, MalformedReason};
pub use headers::EmbeddedHeaders;
